//! Artifact Store - path-addressable bytes for mockups, labels and uploads
//!
//! Keys are relative, slash-separated paths such as `mockups/order_4.png`.
//! The public reference of an artifact is its key with a leading `/`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::hashing::sha256_hex;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredArtifact {
    pub key: String,
    pub url: String,
    pub size: usize,
    pub sha256: String,
}

impl StoredArtifact {
    pub fn new(key: &str, bytes: &[u8]) -> Self {
        Self {
            key: key.to_string(),
            url: format!("/{}", key),
            size: bytes.len(),
            sha256: sha256_hex(bytes),
        }
    }
}

pub trait ArtifactStore {
    /// Write `bytes` under `key`, replacing any previous artifact.
    fn write(&self, key: &str, bytes: &[u8]) -> io::Result<StoredArtifact>;

    fn read(&self, key: &str) -> io::Result<Vec<u8>>;

    fn exists(&self, key: &str) -> bool;
}

/// Normalize a reference (`/uploads/a.png`, `./uploads/a.png`) into a key.
/// Rejects keys that would escape the store root.
pub fn key_from_reference(reference: &str) -> io::Result<String> {
    let trimmed = reference.trim().trim_start_matches("./").trim_start_matches('/');
    let path = Path::new(trimmed);
    let mut parts = vec![];
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {}
            _ => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("artifact reference escapes store: {}", reference),
                ))
            }
        }
    }
    if parts.is_empty() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty artifact reference"));
    }
    Ok(parts.join("/"))
}

/// Artifact store rooted at a directory on the local filesystem.
pub struct FsArtifactStore {
    root: PathBuf,
}

impl FsArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> io::Result<PathBuf> {
        Ok(self.root.join(key_from_reference(key)?))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn write(&self, key: &str, bytes: &[u8]) -> io::Result<StoredArtifact> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, bytes)?;
        debug!(path = %path.display(), bytes = bytes.len(), "artifact written");
        Ok(StoredArtifact::new(&key_from_reference(key)?, bytes))
    }

    fn read(&self, key: &str) -> io::Result<Vec<u8>> {
        fs::read(self.resolve(key)?)
    }

    fn exists(&self, key: &str) -> bool {
        self.resolve(key).map(|p| p.is_file()).unwrap_or(false)
    }
}
