//! Blob storage and upload policy configuration.

use serde::{Deserialize, Serialize};

/// Blob storage configuration.
///
/// The upload policy fields (`max_file_size_bytes`, `allowed_mime_types`)
/// are injected into the versioning engine rather than hardcoded, so the
/// accepted file types can vary per deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for all stored blobs.
    #[serde(default = "default_root_path")]
    pub root_path: String,
    /// Maximum accepted file size in bytes (default 10 MiB).
    #[serde(default = "default_max_file_size")]
    pub max_file_size_bytes: u64,
    /// MIME types accepted for upload.
    #[serde(default = "default_allowed_mime_types")]
    pub allowed_mime_types: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root_path: default_root_path(),
            max_file_size_bytes: default_max_file_size(),
            allowed_mime_types: default_allowed_mime_types(),
        }
    }
}

fn default_root_path() -> String {
    "data/blobs".to_string()
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

fn default_allowed_mime_types() -> Vec<String> {
    vec![
        "application/pdf".to_string(),
        "image/jpeg".to_string(),
        "image/jpg".to_string(),
        "image/png".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.max_file_size_bytes, 10 * 1024 * 1024);
        assert!(config.allowed_mime_types.contains(&"application/pdf".to_string()));
    }
}
