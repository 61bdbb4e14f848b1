//! # Patch Module
//!
//! Additive edits to long-lived, hand-maintained files: the store aggregator, the storage
//! interface registry, hook-stub extension files and the web API module list.
//!
//! [`tree`] holds the language-agnostic find-or-insert algorithm, [`rust`] the `syn` backed
//! tree for Rust sources. [`FilePatch`] ties them to a file on disk: it queues the members a
//! file must contain, inserts the missing ones and writes the file back only when something
//! changed. A file that does not parse is left untouched and reported as
//! [`GenError::Patch`].

pub mod rust;
pub mod tree;

use crate::error::{GenError, Result};
use rust::{RustSource, VerbatimPrinter};
use std::path::{Path, PathBuf};
use tree::{find_or_insert, Printer};

pub use tree::{Member, MemberKind, StructuralTree};

/// Result of applying a [`FilePatch`].
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    /// Members that were missing and got inserted, in insertion order
    pub inserted: Vec<String>,
}

impl PatchOutcome {
    pub fn is_changed(&self) -> bool {
        !self.inserted.is_empty()
    }
}

/// Members a single Rust file must contain.
#[derive(Debug)]
pub struct FilePatch {
    path: PathBuf,
    ensures: Vec<(Member, String)>,
}

impl FilePatch {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ensures: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Queues `member`; `code` is inserted only when the member is absent at apply time.
    pub fn ensure(&mut self, member: Member, code: impl Into<String>) -> &mut Self {
        self.ensures.push((member, code.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.ensures.is_empty()
    }

    /// Inserts every missing member, in queue order, and writes the file if it changed.
    ///
    /// # Errors
    ///
    /// `Patch` when the file does not parse or an insertion has no anchor; the file is not
    /// written in that case. `Io` when the file cannot be read or written.
    pub fn apply(&self) -> Result<PatchOutcome> {
        let text = std::fs::read_to_string(&self.path)?;
        let mut source = RustSource::parse(text).map_err(|e| GenError::patch(&self.path, e))?;
        let mut outcome = PatchOutcome::default();
        for (member, code) in &self.ensures {
            let inserted = find_or_insert(&mut source, member, || code.clone())
                .map_err(|e| GenError::patch(&self.path, e))?;
            if inserted {
                outcome.inserted.push(member.to_string());
            }
        }
        if outcome.is_changed() {
            std::fs::write(&self.path, VerbatimPrinter.print(&source))?;
            tracing::info!(
                path = %self.path.display(),
                inserted = outcome.inserted.len(),
                "patched"
            );
        } else {
            tracing::debug!(path = %self.path.display(), "unchanged");
        }
        Ok(outcome)
    }
}

/// Whether the Rust file at `path` declares `member`. A missing file declares nothing.
pub fn probe(path: &Path, member: &Member) -> Result<bool> {
    if !path.exists() {
        return Ok(false);
    }
    let text = std::fs::read_to_string(path)?;
    let source = RustSource::parse(text).map_err(|e| GenError::patch(path, e))?;
    Ok(source.find(member))
}

#[cfg(test)]
mod tests {
    use super::*;

    const WRAP: &str = "use super::*;\n\n/// hand-written aggregator\npub struct Wrap {\n    db: OrmDb,\n}\n";

    fn field(name: &str) -> Member {
        Member::StructField {
            strukt: "Wrap".to_string(),
            field: name.to_string(),
        }
    }

    #[test]
    fn test_apply_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wrap.rs");
        std::fs::write(&path, WRAP).unwrap();

        let mut patch = FilePatch::new(&path);
        patch.ensure(field("content_store"), "content_store: ContentStoreImpl,");
        let first = patch.apply().unwrap();
        assert_eq!(first.inserted, vec!["field Wrap.content_store".to_string()]);
        let once = std::fs::read_to_string(&path).unwrap();

        let second = patch.apply().unwrap();
        assert!(!second.is_changed());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), once);
        assert!(once.contains("/// hand-written aggregator"));
    }

    #[test]
    fn test_unparsable_file_is_left_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wrap.rs");
        let broken = "pub struct Wrap {\n    db: OrmDb,\n";
        std::fs::write(&path, broken).unwrap();

        let mut patch = FilePatch::new(&path);
        patch.ensure(field("content_store"), "content_store: ContentStoreImpl,");
        let err = patch.apply().unwrap_err();
        assert!(err.is_isolated());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), broken);
    }

    #[test]
    fn test_probe() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wrap.rs");
        assert!(!probe(&path, &field("db")).unwrap());
        std::fs::write(&path, WRAP).unwrap();
        assert!(probe(&path, &field("db")).unwrap());
        assert!(!probe(&path, &field("content_store")).unwrap());
    }
}
