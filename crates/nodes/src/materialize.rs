//! Writing the final artifact set to disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pipeline::{
    ArtifactPath, ArtifactStore, ForgeError, MaterializationFailure, ProjectArtifactSet,
};
use tracing::{debug, instrument, warn};

/// [`ArtifactStore`] backed by the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsArtifactStore;

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn write_artifact(
        &self,
        root: &Path,
        path: &ArtifactPath,
        content: &str,
    ) -> std::io::Result<PathBuf> {
        let destination = root.join(path.as_path());
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&destination, content).await?;
        Ok(destination)
    }
}

/// Writes every record of `artifacts` under `root`.
///
/// Writes are attempted for every file even after a failure. If any failed,
/// the error lists each of them; otherwise the written locations are returned
/// in name order.
#[instrument(skip_all, fields(root = %root.display(), files = artifacts.len()))]
pub async fn materialize(
    store: &dyn ArtifactStore,
    root: &Path,
    artifacts: &ProjectArtifactSet,
) -> Result<Vec<PathBuf>, ForgeError> {
    let mut written = Vec::with_capacity(artifacts.len());
    let mut failures = Vec::new();

    for (name, record) in artifacts.iter() {
        match store.write_artifact(root, &record.path, &record.code).await {
            Ok(location) => {
                debug!(file = %name, location = %location.display(), "artifact written");
                written.push(location);
            }
            Err(e) => {
                warn!(file = %name, path = %record.path, error = %e, "artifact write failed");
                failures.push(MaterializationFailure {
                    path: root.join(record.path.as_path()),
                    cause: e.to_string(),
                });
            }
        }
    }

    if failures.is_empty() {
        Ok(written)
    } else {
        Err(ForgeError::Materialization { failures })
    }
}
