//! Content digests for stored blobs.

use sha2::{Digest, Sha256};

/// Compute the hex-encoded SHA-256 digest of a byte buffer.
///
/// The digest is used for duplicate and integrity detection on stored
/// revisions, not for security.
pub fn content_digest(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_stable() {
        let a = content_digest(b"hello world");
        let b = content_digest(b"hello world");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_digest_differs_per_content() {
        assert_ne!(content_digest(b"a"), content_digest(b"b"));
    }

    #[test]
    fn test_known_vector() {
        assert_eq!(
            content_digest(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
