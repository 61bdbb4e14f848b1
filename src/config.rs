//! Generator configuration
//!
//! Output locations and emission switches are read from a `crudgen.toml` that sits next to
//! the input document, or from a file passed with `--config`. Every key is optional:
//!
//! ```toml
//! output_root = "."
//! models_dir = "src/models"
//! stores_dir = "src/stores"
//! web_dir = "src/web"
//! rustfmt = true
//! header = "// Code generated by crudgen. DO NOT EDIT."
//! runtime_prefix = "crate"
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name looked up next to the document.
pub const CONFIG_FILE_NAME: &str = "crudgen.toml";

/// Settings shared by all emitters of one run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GenConfig {
    /// Project root every `*_dir` is relative to
    pub output_root: PathBuf,
    pub models_dir: String,
    pub stores_dir: String,
    pub web_dir: String,
    /// Run rustfmt over fully generated files
    pub rustfmt: bool,
    /// First line of every fully generated file
    pub header: String,
    /// Crate path the runtime modules (`models`, `pgx`, `web`) live under
    pub runtime_prefix: String,
}

impl Default for GenConfig {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("."),
            models_dir: "src/models".to_string(),
            stores_dir: "src/stores".to_string(),
            web_dir: "src/web".to_string(),
            rustfmt: true,
            header: "// Code generated by crudgen. DO NOT EDIT.".to_string(),
            runtime_prefix: "crate".to_string(),
        }
    }
}

impl GenConfig {
    /// Loads the configuration for `doc_path`: explicit file first, then the file next to
    /// the document, defaults when neither exists.
    pub fn resolve(explicit_path: Option<&Path>, doc_path: &Path) -> anyhow::Result<Self> {
        match resolve_config_path(explicit_path, doc_path) {
            Some(path) => {
                let config = load_config(&path)?.unwrap_or_default();
                tracing::debug!(path = %path.display(), "configuration loaded");
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Rust module path of a source directory: `src/models` → `crate::models`.
    pub fn module_path(&self, dir: &str) -> String {
        let rel = dir.trim_end_matches('/');
        let rel = rel.strip_prefix("src/").unwrap_or(rel);
        let mut path = self.runtime_prefix.clone();
        for seg in rel.split('/').filter(|s| !s.is_empty()) {
            path.push_str("::");
            path.push_str(seg);
        }
        path
    }
}

/// Load the configuration from a TOML file
///
/// Returns `Ok(None)` if the file does not exist, `Err` if it exists but cannot be read or
/// parsed.
pub fn load_config(config_path: &Path) -> anyhow::Result<Option<GenConfig>> {
    if !config_path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(config_path)
        .with_context(|| format!("Failed to read config: {}", config_path.display()))?;

    let config: GenConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config: {}", config_path.display()))?;

    Ok(Some(config))
}

/// Auto-detect `crudgen.toml` alongside the document
pub fn auto_detect_config_path(doc_path: &Path) -> Option<PathBuf> {
    let doc_dir = doc_path.parent()?;
    let config_path = doc_dir.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        Some(config_path)
    } else {
        None
    }
}

/// Resolve the configuration path
///
/// Priority:
/// 1. Explicitly provided path (via CLI)
/// 2. Auto-detected alongside the document
/// 3. None (defaults)
pub fn resolve_config_path(explicit_path: Option<&Path>, doc_path: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Some(path.to_path_buf());
        }
        tracing::warn!(path = %path.display(), "config file not found, falling back");
    }

    auto_detect_config_path(doc_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "rustfmt = false\nweb_dir = \"src/api\"\n").unwrap();
        let config = load_config(&path).unwrap().unwrap();
        assert!(!config.rustfmt);
        assert_eq!(config.web_dir, "src/api");
        assert_eq!(config.models_dir, "src/models");
    }

    #[test]
    fn test_missing_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert!(load_config(&path).unwrap().is_none());
        fs::write(&path, "rustfmt = [").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_resolution_order() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("cms.yaml");
        assert_eq!(resolve_config_path(None, &doc), None);

        let detected = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&detected, "").unwrap();
        assert_eq!(resolve_config_path(None, &doc), Some(detected.clone()));

        let explicit = dir.path().join("other.toml");
        fs::write(&explicit, "rustfmt = false\n").unwrap();
        assert_eq!(resolve_config_path(Some(&explicit), &doc), Some(explicit.clone()));
        assert!(!GenConfig::resolve(Some(&explicit), &doc).unwrap().rustfmt);

        let missing = dir.path().join("missing.toml");
        assert_eq!(resolve_config_path(Some(&missing), &doc), Some(detected));
    }

    #[test]
    fn test_module_path() {
        let config = GenConfig::default();
        assert_eq!(config.module_path("src/models"), "crate::models");
        assert_eq!(config.module_path("src/web/v1/"), "crate::web::v1");
    }
}
