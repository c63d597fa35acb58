//! Hashing - SHA-256 digests for stored artifacts
//!
//! Artifact writes are keyed by order id and overwrite on retry; the digest
//! tells two writes to the same path apart.

use sha2::{Digest, Sha256};

/// Compute SHA-256 hash of bytes, return hex string
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

mod hex {
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{:02x}", b)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_digest_distinguishes_rewrites() {
        assert_ne!(sha256_hex(b"first"), sha256_hex(b"second"));
        assert_eq!(sha256_hex(b"").len(), 64);
    }
}
