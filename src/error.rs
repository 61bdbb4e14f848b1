//! # Error taxonomy
//!
//! Every failure inside the generator is a [`GenError`]. The variant decides how far the
//! failure reaches:
//!
//! | Variant       | Raised by                         | Effect                               |
//! |---------------|-----------------------------------|--------------------------------------|
//! | `Schema`      | document loading and validation   | fatal, nothing is emitted            |
//! | `Resolution`  | qualification / method lookup     | fatal for the current phase          |
//! | `Emit`        | rendering, writing or formatting  | aborts that phase, earlier output stays |
//! | `Patch`       | parsing a hand-edited file        | logged, only that file is skipped    |
//!
//! Errors that the *generated* code raises at runtime (empty key, empty id, not found) are
//! part of the emitted source and never appear here.

use std::path::{Path, PathBuf};

/// Generator-internal error.
#[derive(Debug, thiserror::Error)]
pub enum GenError {
    /// Malformed or incomplete input document.
    #[error("schema error: {0}")]
    Schema(String),

    /// A qualification, model or store method could not be resolved.
    #[error("resolution error: {0}")]
    Resolution(String),

    /// Writing, rendering or formatting a generated file failed.
    #[error("emit error for {path}: {message}")]
    Emit { path: PathBuf, message: String },

    /// A hand-maintained file could not be parsed or patched.
    #[error("patch error for {path}: {message}")]
    Patch { path: PathBuf, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("template error: {0}")]
    Template(#[from] askama::Error),
}

impl GenError {
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    pub fn emit(path: &Path, msg: impl std::fmt::Display) -> Self {
        Self::Emit {
            path: path.to_path_buf(),
            message: msg.to_string(),
        }
    }

    pub fn patch(path: &Path, msg: impl std::fmt::Display) -> Self {
        Self::Patch {
            path: path.to_path_buf(),
            message: msg.to_string(),
        }
    }

    /// True for errors that only affect a single file and must not stop the run.
    pub fn is_isolated(&self) -> bool {
        matches!(self, Self::Patch { .. })
    }
}

pub type Result<T> = std::result::Result<T, GenError>;
