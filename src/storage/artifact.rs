//! Output directory layout for produced MP3 files.
//!
//! Every artifact lives directly under one configured output directory. Files
//! are encoded into a request-unique partial file first and renamed into place
//! only after the encoder finished, so concurrent requests for the same title
//! never share a file handle.

use std::path::{Path, PathBuf};

use crate::core::utils::sanitize_title;

/// Extension of every produced artifact
pub const ARTIFACT_EXTENSION: &str = "mp3";

/// A produced file: where it is on disk and where it is served from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub storage_path: PathBuf,
    pub public_path: String,
}

/// Maps titles to paths under the output directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    output_dir: PathBuf,
    public_prefix: String,
}

impl ArtifactStore {
    pub fn new(output_dir: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            output_dir: output_dir.into(),
            public_prefix: public_prefix.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Creates the output directory if needed.
    pub async fn ensure_output_dir(&self) -> std::io::Result<()> {
        fs_err::tokio::create_dir_all(&self.output_dir).await
    }

    /// Final artifact for a title: `<output_dir>/<sanitized>.mp3`.
    pub fn artifact_for(&self, title: &str) -> Artifact {
        let file_name = format!("{}.{}", sanitize_title(title), ARTIFACT_EXTENSION);
        Artifact {
            storage_path: self.output_dir.join(&file_name),
            public_path: format!("{}/{}", self.public_prefix, file_name),
        }
    }

    /// Reserves a request-unique partial file next to the final artifact.
    ///
    /// The name starts with a dot so the static file route never lists it.
    pub fn partial_for(&self, artifact: &Artifact) -> PartialFile {
        let base = artifact
            .storage_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = self
            .output_dir
            .join(format!(".{}.{}.part", base, uuid::Uuid::new_v4().simple()));
        PartialFile {
            path,
            committed: false,
        }
    }
}

/// Partial output owned by one request. Removed on drop unless committed.
#[derive(Debug)]
pub struct PartialFile {
    path: PathBuf,
    committed: bool,
}

impl PartialFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically moves the partial file onto the artifact's final path.
    /// An existing file with the same name is replaced.
    pub async fn commit(mut self, artifact: &Artifact) -> std::io::Result<()> {
        fs_err::tokio::rename(&self.path, &artifact.storage_path).await?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => log::debug!("Removed partial file {}", self.path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to remove partial file {}: {}", self.path.display(), e),
        }
    }
}
