//! Source blob handed to the driver at construction

use std::path::PathBuf;
use std::sync::Arc;

/// Raw, still-encoded audio supplied by the user
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Bytes already in memory (drag and drop, network download, ...)
    Bytes(Arc<[u8]>),
    /// A file on disk, read lazily on `init`
    File(PathBuf),
}

impl AudioSource {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(Arc::from(bytes.into()))
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    /// Read the whole blob into memory
    pub async fn read(&self) -> std::io::Result<Vec<u8>> {
        match self {
            Self::Bytes(bytes) => Ok(bytes.to_vec()),
            Self::File(path) => tokio::fs::read(path).await,
        }
    }

    /// Name to show in the UI
    pub fn label(&self) -> String {
        match self {
            Self::Bytes(_) => "<memory>".to_string(),
            Self::File(path) => path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("Unknown")
                .to_string(),
        }
    }
}
