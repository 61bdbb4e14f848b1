use crate::error::{GenError, Result};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Command;

/// Overrides the rustfmt binary (tests point it at a stub script).
pub const RUSTFMT_BIN_ENV: &str = "CRUDGEN_RUSTFMT_BIN";

/// Formats fully generated files in place.
///
/// Returns `Ok(false)` when no rustfmt binary is available; the files stay as rendered.
///
/// # Errors
///
/// `Emit` when rustfmt runs and fails.
pub fn format_files(paths: &[PathBuf]) -> Result<bool> {
    if paths.is_empty() {
        return Ok(true);
    }
    let bin = std::env::var(RUSTFMT_BIN_ENV).unwrap_or_else(|_| "rustfmt".to_string());

    let mut cmd = Command::new(&bin);
    cmd.arg("--edition").arg("2021").args(paths);
    let status = match cmd.status() {
        Ok(status) => status,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::warn!(bin = %bin, "rustfmt not found, generated files left unformatted");
            return Ok(false);
        }
        Err(err) => return Err(GenError::emit(&paths[0], err)),
    };
    if !status.success() {
        return Err(GenError::emit(&paths[0], format!("{bin} exited with {status}")));
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use std::sync::{Mutex, OnceLock};

    // Serialize environment mutations to avoid test races
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn stub(dir: &Path, code: i32) -> PathBuf {
        let stub = dir.join("rustfmt");
        fs::write(&stub, format!("#!/bin/sh\nexit {code}\n")).unwrap();
        let mut perms = fs::metadata(&stub).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&stub, perms).unwrap();
        stub
    }

    fn with_bin<T>(bin: &Path, f: impl FnOnce() -> T) -> T {
        let _guard = ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let old_bin = env::var(RUSTFMT_BIN_ENV).ok();
        env::set_var(RUSTFMT_BIN_ENV, bin);
        let res = f();
        match old_bin {
            Some(v) => env::set_var(RUSTFMT_BIN_ENV, v),
            None => env::remove_var(RUSTFMT_BIN_ENV),
        }
        res
    }

    #[test]
    fn test_format_files_ok() {
        let dir = tempfile::tempdir().unwrap();
        let bin = stub(dir.path(), 0);
        let file = dir.path().join("cms_gen.rs");
        fs::write(&file, "fn a(){}\n").unwrap();
        assert!(with_bin(&bin, || format_files(&[file])).unwrap());
    }

    #[test]
    fn test_format_files_failure_is_emit_error() {
        let dir = tempfile::tempdir().unwrap();
        let bin = stub(dir.path(), 1);
        let file = dir.path().join("cms_gen.rs");
        fs::write(&file, "fn a(){}\n").unwrap();
        let err = with_bin(&bin, || format_files(&[file])).unwrap_err();
        assert!(matches!(err, GenError::Emit { .. }));
    }

    #[test]
    fn test_missing_binary_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let bin = dir.path().join("no-such-rustfmt");
        let file = dir.path().join("cms_gen.rs");
        fs::write(&file, "fn a(){}\n").unwrap();
        assert!(!with_bin(&bin, || format_files(&[file])).unwrap());
    }
}
