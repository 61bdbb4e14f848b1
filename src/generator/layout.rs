//! Where every emitted file goes, and the Rust paths the emitted files use for each other.
//!
//! ```text
//! <root>/<models_dir>/<modelpkg>/mod.rs          bootstrap, patched (mod lines)
//! <root>/<models_dir>/<modelpkg>/<doc>_gen.rs    generated
//! <root>/<stores_dir>/mod.rs                     bootstrap, patched (mod lines)
//! <root>/<stores_dir>/wrap.rs                    bootstrap, patched (aggregator)
//! <root>/<stores_dir>/interfaces.rs              bootstrap, patched (Storage trait)
//! <root>/<stores_dir>/<doc>_gen.rs               generated
//! <root>/<stores_dir>/<doc>_x.rs                 bootstrap, patched (hook stubs)
//! <root>/<stores_dir>/<doc>_iface.json           generated interface description
//! <root>/<web_dir>/<pkg>/mod.rs                  bootstrap, patched (mod lines)
//! <root>/<web_dir>/<pkg>/handle_<doc>_gen.rs     generated
//! ```

use crate::config::GenConfig;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
    config: GenConfig,
    doc: String,
}

impl OutputLayout {
    pub fn new(config: &GenConfig, doc: &str) -> Self {
        Self {
            root: config.output_root.clone(),
            config: config.clone(),
            doc: doc.to_string(),
        }
    }

    pub fn doc(&self) -> &str {
        &self.doc
    }

    pub fn models_dir(&self, model_pkg: &str) -> PathBuf {
        self.root.join(&self.config.models_dir).join(model_pkg)
    }

    pub fn models_mod(&self, model_pkg: &str) -> PathBuf {
        self.models_dir(model_pkg).join("mod.rs")
    }

    pub fn models_gen(&self, model_pkg: &str) -> PathBuf {
        self.models_dir(model_pkg).join(format!("{}_gen.rs", self.doc))
    }

    pub fn stores_dir(&self) -> PathBuf {
        self.root.join(&self.config.stores_dir)
    }

    pub fn stores_mod(&self) -> PathBuf {
        self.stores_dir().join("mod.rs")
    }

    pub fn stores_gen(&self) -> PathBuf {
        self.stores_dir().join(format!("{}.rs", self.stores_gen_mod()))
    }

    pub fn stores_x(&self) -> PathBuf {
        self.stores_dir().join(format!("{}.rs", self.stores_x_mod()))
    }

    pub fn wrap(&self) -> PathBuf {
        self.stores_dir().join("wrap.rs")
    }

    pub fn interfaces(&self) -> PathBuf {
        self.stores_dir().join("interfaces.rs")
    }

    pub fn iface_json(&self) -> PathBuf {
        self.stores_dir().join(format!("{}_iface.json", self.doc))
    }

    pub fn web_dir(&self, pkg: &str) -> PathBuf {
        self.root.join(&self.config.web_dir).join(pkg)
    }

    pub fn web_mod(&self, pkg: &str) -> PathBuf {
        self.web_dir(pkg).join("mod.rs")
    }

    pub fn handles_gen(&self, pkg: &str) -> PathBuf {
        self.web_dir(pkg).join(format!("{}.rs", self.handles_gen_mod()))
    }

    /// Module names of the per-document files.
    pub fn models_gen_mod(&self) -> String {
        format!("{}_gen", self.doc)
    }

    pub fn stores_gen_mod(&self) -> String {
        format!("{}_gen", self.doc)
    }

    pub fn stores_x_mod(&self) -> String {
        format!("{}_x", self.doc)
    }

    pub fn handles_gen_mod(&self) -> String {
        format!("handle_{}_gen", self.doc)
    }

    /// `crate::models::cms`
    pub fn models_path(&self, model_pkg: &str) -> String {
        format!("{}::{model_pkg}", self.config.module_path(&self.config.models_dir))
    }

    /// `crate::stores`
    pub fn stores_path(&self) -> String {
        self.config.module_path(&self.config.stores_dir)
    }

    pub fn runtime_prefix(&self) -> &str {
        &self.config.runtime_prefix
    }
}
