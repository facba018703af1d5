//! Env-file template for the application container.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::{info, instrument};

use crate::core::app_env::AppEnv;
use crate::core::types::{EnvFileOutcome, Step};
use crate::error::ProvisionError;

/// Write `env` as a `KEY=value` file at `path` unless a file is already there.
///
/// An existing file is never modified: operators keep secrets in it.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn write_env_template(path: &Path, env: &AppEnv) -> Result<EnvFileOutcome, ProvisionError> {
    if path.exists() {
        info!("env file exists, keeping it");
        return Ok(EnvFileOutcome::Kept);
    }
    let written = write_new(path, &env.render_env_file()).map_err(|source| {
        ProvisionError::Write {
            step: Step::EnvFile,
            path: path.to_path_buf(),
            source,
        }
    })?;
    if !written {
        info!("env file appeared concurrently, keeping it");
        return Ok(EnvFileOutcome::Kept);
    }
    info!("wrote env file template");
    Ok(EnvFileOutcome::Written)
}

/// Write `contents` to `path` through a uniquely named sibling temp file.
///
/// Returns `Ok(false)` without touching `path` if it exists by the time the
/// temp file is linked into place.
fn write_new(path: &Path, contents: &str) -> std::io::Result<bool> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent)?;
    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.as_file().sync_all()?;
    match tmp.persist_noclobber(path) {
        Ok(_) => Ok(true),
        Err(err) if err.error.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(err) => Err(err.error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_template_when_missing() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("app").join(".env");
        let outcome = write_env_template(&path, &AppEnv::default()).expect("write");
        assert_eq!(outcome, EnvFileOutcome::Written);
        let contents = fs::read_to_string(&path).expect("read");
        assert!(contents.contains("PORT=8080\n"));
        let entries = fs::read_dir(path.parent().expect("parent"))
            .expect("read_dir")
            .count();
        assert_eq!(entries, 1, "temp file left behind");
    }

    #[test]
    fn sibling_files_are_not_touched() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("app.env");
        let sibling = temp.path().join("app.tmp");
        fs::write(&sibling, "operator data\n").expect("seed");

        let outcome = write_env_template(&path, &AppEnv::default()).expect("write");
        assert_eq!(outcome, EnvFileOutcome::Written);
        assert_eq!(
            fs::read_to_string(&sibling).expect("read sibling"),
            "operator data\n"
        );
        assert!(fs::read_to_string(&path).expect("read").contains("HOST=0.0.0.0\n"));
        assert_eq!(fs::read_dir(temp.path()).expect("read_dir").count(), 2);
    }

    #[test]
    fn existing_target_is_never_replaced() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".env");
        fs::write(&path, "SECRET_KEY=keep-me\n").expect("seed");
        assert!(!write_new(&path, "HOST=0.0.0.0\n").expect("write"));
        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            "SECRET_KEY=keep-me\n"
        );
        assert_eq!(fs::read_dir(temp.path()).expect("read_dir").count(), 1);
    }

    #[test]
    fn keeps_existing_file() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join(".env");
        fs::write(&path, "SECRET_KEY=keep-me\n").expect("seed");
        let outcome = write_env_template(&path, &AppEnv::default()).expect("write");
        assert_eq!(outcome, EnvFileOutcome::Kept);
        assert_eq!(
            fs::read_to_string(&path).expect("read"),
            "SECRET_KEY=keep-me\n"
        );
    }
}
