use std::path::Path;

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::constants::StorageBackend;

/// Metadata of a stored file version. The binary itself lives outside the
/// registry; `file_path` is the reference the storage layer handed back.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileMetadata {
    pub file_name: String,
    pub original_name: String,
    pub file_path: String,
    pub file_size: i64,
    pub mime_type: String,
    pub file_hash: String,
    #[serde(default = "default_backend")]
    pub storage_backend: StorageBackend,
    #[serde(default)]
    pub uploaded_by: Option<String>,
}

fn default_backend() -> StorageBackend {
    StorageBackend::Local
}

impl FileMetadata {
    /// Derives size, SHA-256 content hash and MIME type from the raw bytes.
    /// The stored name is the last component of `file_path`.
    pub fn from_bytes(
        bytes: &[u8],
        original_name: &str,
        file_path: &str,
        storage_backend: StorageBackend,
        uploaded_by: Option<String>,
    ) -> Self {
        let file_hash = hex::encode(Sha256::digest(bytes));
        let file_name = Path::new(file_path)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| original_name.to_string());
        let mime_type = mime_guess::from_path(original_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Self {
            file_name,
            original_name: original_name.to_string(),
            file_path: file_path.to_string(),
            file_size: bytes.len() as i64,
            mime_type,
            file_hash,
            storage_backend,
            uploaded_by,
        }
    }
}
