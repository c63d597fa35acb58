//! Logo uploads

use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::artifacts::{ArtifactStore, StoredArtifact};

pub const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid file type: {0}. Only PNG, JPG, JPEG, GIF allowed")]
    InvalidType(String),

    #[error("Empty upload")]
    Empty,

    #[error("Failed to save upload: {0}")]
    Io(#[from] std::io::Error),
}

pub fn is_valid_image_type(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| ALLOWED_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

pub fn sanitize_filename(filename: &str) -> String {
    filename
        .replace(' ', "_")
        .replace("..", "")
        .replace(['/', '\\'], "")
}

/// Store an uploaded logo as `uploads/logo_{timestamp}_{name}`.
pub fn store_logo(
    artifacts: &dyn ArtifactStore,
    filename: &str,
    bytes: &[u8],
    timestamp: i64,
) -> Result<StoredArtifact, UploadError> {
    if !is_valid_image_type(filename) {
        return Err(UploadError::InvalidType(filename.to_string()));
    }
    if bytes.is_empty() {
        return Err(UploadError::Empty);
    }

    let key = format!("uploads/logo_{}_{}", timestamp, sanitize_filename(filename));
    let artifact = artifacts.write(&key, bytes)?;
    info!(url = %artifact.url, bytes = bytes.len(), "logo uploaded");
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::FsArtifactStore;

    #[test]
    fn test_extension_check() {
        assert!(is_valid_image_type("logo.PNG"));
        assert!(is_valid_image_type("photo.jpeg"));
        assert!(!is_valid_image_type("logo.svg"));
        assert!(!is_valid_image_type("logo"));
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_filename("my logo.png"), "my_logo.png");
        assert_eq!(sanitize_filename("../../etc/x.png"), "etcx.png");
        assert_eq!(sanitize_filename("a\\b.png"), "ab.png");
    }

    #[test]
    fn test_store_logo() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsArtifactStore::new(dir.path());

        let artifact = store_logo(&store, "team logo.png", b"png-bytes", 1700000000).unwrap();
        assert_eq!(artifact.url, "/uploads/logo_1700000000_team_logo.png");
        assert!(store.exists(&artifact.key));

        assert!(matches!(
            store_logo(&store, "logo.exe", b"x", 1),
            Err(UploadError::InvalidType(_))
        ));
    }
}
