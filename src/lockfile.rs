//! Single-instance marker.
//!
//! The launcher expects a marker file per interface once the responder is
//! up. A present marker means another instance already owns the interface,
//! so startup is refused. The marker is never removed by this process; a
//! restarted sidecar gets a fresh filesystem from the orchestrator.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockFile {
    path: PathBuf,
}

impl LockFile {
    /// Refuses with [`Error::AlreadyRunning`] if `path` exists.
    pub fn check<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if path.exists() {
            return Err(Error::AlreadyRunning(path.to_path_buf()));
        }
        Ok(())
    }

    /// Creates the marker, failing if it already exists.
    ///
    /// `create_new` narrows the check-then-create window to the kernel's
    /// `O_EXCL` open. Missing parent directories are created.
    pub fn acquire<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        Self::check(path)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match OpenOptions::new().write(true).create_new(true).open(path) {
            Ok(_) => {}
            Err(error) if error.kind() == ErrorKind::AlreadyExists => {
                return Err(Error::AlreadyRunning(path.to_path_buf()));
            }
            Err(error) => return Err(error.into()),
        }

        info!("Created lock file {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
