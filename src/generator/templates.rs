use askama::Template;
use std::fs;
use std::path::Path;

use crate::error::{GenError, Result};

/// Template data for `models/<pkg>/<doc>_gen.rs`
#[derive(Template)]
#[template(path = "models_gen.rs.txt", escape = "none")]
pub struct ModelsGenTemplate<'a> {
    /// First line of the file
    pub header: &'a str,
    /// Document name
    pub doc: &'a str,
    /// `use` lines of the namespaces the body refers to
    pub uses: Vec<String>,
    /// Pre-rendered items
    pub body: String,
}

/// Template data for `stores/<doc>_gen.rs`
#[derive(Template)]
#[template(path = "stores_gen.rs.txt", escape = "none")]
pub struct StoresGenTemplate<'a> {
    pub header: &'a str,
    pub doc: &'a str,
    /// Module of the extension file (`cms_x`)
    pub ext_mod: &'a str,
    pub uses: Vec<String>,
    pub body: String,
}

/// Template data for `web/<pkg>/handle_<doc>_gen.rs`
#[derive(Template)]
#[template(path = "handles_gen.rs.txt", escape = "none")]
pub struct HandlesGenTemplate<'a> {
    pub header: &'a str,
    pub doc: &'a str,
    pub uses: Vec<String>,
    pub body: String,
}

/// Bootstrap skeleton of `stores/<doc>_x.rs`
#[derive(Template)]
#[template(path = "stores_x.rs.txt", escape = "none")]
pub struct StoresExtTemplate<'a> {
    pub doc: &'a str,
    /// Module of the generated store file (`cms_gen`)
    pub gen_mod: &'a str,
    pub uses: Vec<String>,
}

/// Bootstrap skeleton of `stores/wrap.rs`
#[derive(Template)]
#[template(path = "stores_wrap.rs.txt", escape = "none")]
pub struct WrapTemplate<'a> {
    /// Path of the persistence runtime (`crate::pgx`)
    pub pgx_path: &'a str,
}

/// Bootstrap skeleton of `stores/interfaces.rs`
#[derive(Template)]
#[template(path = "stores_interfaces.rs.txt", escape = "none")]
pub struct InterfacesTemplate;

/// Bootstrap skeleton of `stores/mod.rs`
#[derive(Template)]
#[template(path = "stores_mod.rs.txt", escape = "none")]
pub struct StoresModTemplate;

/// Bootstrap skeleton of `models/<pkg>/mod.rs`
#[derive(Template)]
#[template(path = "models_mod.rs.txt", escape = "none")]
pub struct ModelsModTemplate<'a> {
    pub pkg: &'a str,
}

/// Bootstrap skeleton of `web/<pkg>/mod.rs`
#[derive(Template)]
#[template(path = "web_mod.rs.txt", escape = "none")]
pub struct WebModTemplate<'a> {
    pub pkg: &'a str,
    /// Module re-exported as the handler prelude (`crate::web::prelude`)
    pub web_prelude: &'a str,
    pub stores_path: &'a str,
}

/// Write a fully generated file, replacing any previous version
///
/// # Errors
///
/// `Emit` when the directory or the file cannot be written.
pub fn write_generated(path: &Path, rendered: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| GenError::emit(path, e))?;
    }
    fs::write(path, rendered).map_err(|e| GenError::emit(path, e))?;
    tracing::info!(path = %path.display(), bytes = rendered.len(), "generated");
    Ok(())
}

/// Create a bootstrap file unless it already exists
///
/// Returns `true` when the file was created. Existing files are never rewritten; later runs
/// only patch them.
///
/// # Errors
///
/// `Emit` when rendering or writing fails.
pub fn write_bootstrap(path: &Path, template: &impl Template) -> Result<bool> {
    if path.exists() {
        tracing::debug!(path = %path.display(), "bootstrap exists, kept");
        return Ok(false);
    }
    let rendered = template.render()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| GenError::emit(path, e))?;
    }
    fs::write(path, format!("{}\n", rendered.trim_end())).map_err(|e| GenError::emit(path, e))?;
    tracing::info!(path = %path.display(), "bootstrap created");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_models_gen_layout() {
        let rendered = ModelsGenTemplate {
            header: "// generated",
            doc: "cms",
            uses: vec!["use crate::models::comm;".to_string()],
            body: "pub struct Article {}\n".to_string(),
        }
        .render()
        .unwrap();
        assert!(rendered.starts_with("// generated\n//! Models, companions and constants generated from `cms`.\n"));
        assert!(rendered.contains(
            "use serde::{Deserialize, Serialize};\nuse crate::models::comm;\n\npub struct Article {}"
        ));
    }

    #[test]
    fn test_bootstrap_is_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stores/interfaces.rs");
        assert!(write_bootstrap(&path, &InterfacesTemplate).unwrap());
        fs::write(&path, "// edited\n").unwrap();
        assert!(!write_bootstrap(&path, &InterfacesTemplate).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "// edited\n");
    }

    #[test]
    fn test_wrap_skeleton_parses() {
        let rendered = WrapTemplate {
            pgx_path: "crate::pgx",
        }
        .render()
        .unwrap();
        assert!(rendered.contains("pub use crate::pgx::prelude::*;"));
        assert!(syn::parse_file(&rendered).is_ok());
    }
}
