#![allow(dead_code)]

use crudgen::config::GenConfig;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// One `Article` entity, one full-CRUD store and a `/cms` web mapping.
pub const CMS_DOC: &str = r#"
modelpkg: cms
models:
  - name: Article
    comment: article of the site
    tableTag: cms_article
    fields:
      - name: comm.DefaultModel
      - name: Author
        type: string
        tags: {json: author, db: author}
        basic: true
      - name: Title
        type: string
        tags: {json: title, db: title}
        basic: true
        isset: true
        query: match
      - name: Content
        type: string
        tags: {json: content, db: content}
        basic: true
        isset: true
stores:
  - name: contentStore
    hodBread: [Article]
webapi:
  pkg: api
  uris:
    - model: Article
      prefix: /cms
"#;

/// A project directory holding `docs/<name>.yaml`.
pub struct Project {
    pub dir: TempDir,
    pub doc: PathBuf,
}

impl Project {
    pub fn new(name: &str, content: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("docs").join(format!("{name}.yaml"));
        fs::create_dir_all(doc.parent().unwrap()).unwrap();
        fs::write(&doc, content).unwrap();
        Self { dir, doc }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn config(&self) -> GenConfig {
        GenConfig {
            output_root: self.root().to_path_buf(),
            rustfmt: false,
            ..GenConfig::default()
        }
    }

    pub fn set_doc(&self, content: &str) {
        fs::write(&self.doc, content).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        fs::read_to_string(self.root().join(rel)).unwrap_or_else(|e| panic!("read {rel}: {e}"))
    }

    pub fn write(&self, rel: &str, content: &str) {
        fs::write(self.root().join(rel), content).unwrap();
    }

    pub fn exists(&self, rel: &str) -> bool {
        self.root().join(rel).exists()
    }

    /// Every file under `src/`, keyed by path relative to the project root.
    pub fn snapshot(&self) -> BTreeMap<PathBuf, String> {
        let mut out = BTreeMap::new();
        collect(self.root(), &self.root().join("src"), &mut out);
        out
    }
}

fn collect(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, String>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries {
        let path = entry.unwrap().path();
        if path.is_dir() {
            collect(root, &path, out);
        } else {
            let rel = path.strip_prefix(root).unwrap().to_path_buf();
            out.insert(rel, fs::read_to_string(&path).unwrap());
        }
    }
}

pub fn count(haystack: &str, needle: &str) -> usize {
    haystack.matches(needle).count()
}
