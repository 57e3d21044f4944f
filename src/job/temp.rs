//! Per-job temporary artifacts.
//!
//! A run owns one [`StagingArea`] (a private temp directory). Each job allocates a
//! [`TempArtifact`] in it; the artifact's file is removed when the guard drops, on
//! every exit path of the job. Removal failures are logged and otherwise ignored.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

/// Per-run directory holding staged artifacts. Removed with everything left in
/// it when dropped.
#[derive(Debug)]
pub struct StagingArea {
    dir: TempDir,
}

impl StagingArea {
    pub fn new() -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("mjconv-").tempdir()?;
        debug!(dir = %dir.path().display(), "created staging area");
        Ok(Self { dir })
    }

    #[cfg(test)]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Reserves a unique artifact path for a job. Nothing is created on disk.
    pub fn allocate(&self, id: Uuid, stem: &str, extension: &str) -> TempArtifact {
        TempArtifact {
            path: self.dir.path().join(format!("{stem}-{id}.{extension}")),
        }
    }
}

/// Scoped ownership of one staged file; the file is deleted on drop.
#[derive(Debug)]
pub struct TempArtifact {
    path: PathBuf,
}

impl TempArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempArtifact {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "removed temp artifact"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove temp artifact"),
        }
    }
}
