//! Screenshot capture sink
//!
//! File names depend only on the scenario's artifact prefix and the
//! checkpoint name, so a re-run overwrites the previous run's images.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::browser::Page;
use crate::error::{E2eError, E2eResult};
use crate::report::Artifact;
use crate::spec::artifact_file_name;

#[derive(Debug, Clone)]
pub struct CaptureSink {
    dir: PathBuf,
}

impl CaptureSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<prefix>-<checkpoint>.png`, without doubling a prefix the checkpoint already carries
    pub fn artifact_path(&self, prefix: &str, checkpoint: &str) -> PathBuf {
        self.dir.join(artifact_file_name(prefix, checkpoint))
    }

    /// Create the artifact directory. Succeeds if it already exists.
    pub fn ensure_dir(&self) -> E2eResult<()> {
        std::fs::create_dir_all(&self.dir).map_err(|source| E2eError::ArtifactWrite {
            path: self.dir.display().to_string(),
            source,
        })
    }

    /// Take a full-page screenshot and write it for `checkpoint`
    pub async fn capture(
        &self,
        page: &dyn Page,
        prefix: &str,
        checkpoint: &str,
    ) -> E2eResult<Artifact> {
        self.ensure_dir()?;
        let path = self.artifact_path(prefix, checkpoint);

        let png = page.screenshot().await.map_err(|e| E2eError::Capture {
            checkpoint: checkpoint.to_string(),
            reason: e.to_string(),
        })?;

        std::fs::write(&path, &png).map_err(|source| E2eError::ArtifactWrite {
            path: path.display().to_string(),
            source,
        })?;

        let sha256 = hex::encode(Sha256::digest(&png));
        debug!("Wrote {} ({} bytes, sha256 {})", path.display(), png.len(), &sha256[..12]);

        Ok(Artifact {
            checkpoint: checkpoint.to_string(),
            path,
            sha256,
            bytes: png.len() as u64,
        })
    }
}
