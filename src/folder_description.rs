//! The `000_folder-description.json` format: the server's verbatim folder
//! body, and the per-child metadata Restore recovers from it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::TransferError;
use crate::queue::EntryMetadata;

pub const DESCRIPTION_FILENAME: &str = "000_folder-description.json";

/// Per-child metadata as the server describes it. Extra fields the server
/// sends are preserved via `flatten` into `extra` so re-persisting the body
/// verbatim (Backup) never silently drops data, while Restore only reads
/// the handful of named fields it needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChildMetadata {
    #[serde(rename = "ETag", skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(rename = "Content-Type", skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(rename = "Content-Length", skip_serializing_if = "Option::is_none")]
    pub content_length: Option<String>,
    #[serde(rename = "Last-Modified", skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl ChildMetadata {
    /// Flattens the typed fields into the `HashMap<String, String>` shape
    /// the work queue stores on an entry.
    pub fn to_entry_metadata(&self) -> EntryMetadata {
        let mut map = EntryMetadata::new();
        if let Some(v) = &self.etag {
            map.insert("ETag".to_string(), v.clone());
        }
        if let Some(v) = &self.content_type {
            map.insert("Content-Type".to_string(), v.clone());
        }
        if let Some(v) = &self.content_length {
            map.insert("Content-Length".to_string(), v.clone());
        }
        if let Some(v) = &self.last_modified {
            map.insert("Last-Modified".to_string(), v.clone());
        }
        map
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FolderDescription {
    pub items: HashMap<String, ChildMetadata>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl FolderDescription {
    /// Parses a folder GET response body. `path` is only used for error
    /// context.
    pub fn parse(path: &str, body: &[u8]) -> Result<Self, TransferError> {
        serde_json::from_slice(body)
            .map_err(|source| TransferError::malformed_folder_description(path, source))
    }

    /// Loads a previously-saved description from disk. Returns `Ok(None)`
    /// only when the file is absent (the walker's "missing description: warn,
    /// use empty metadata" case). A file that exists but fails to parse as
    /// JSON is a distinct, louder failure - `Err(TransferError::MalformedFolderDescription)`
    /// - so the walker can report it the same way Backup reports a malformed
    /// body on the way in, rather than silently falling back to no metadata.
    pub async fn load(path: &std::path::Path) -> Result<Option<Self>, TransferError> {
        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(TransferError::io(path, err)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| TransferError::malformed_folder_description(path.display().to_string(), source))
    }
}
