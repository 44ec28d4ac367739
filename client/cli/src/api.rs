use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::TransportError;

mod rest;

pub use rest::RestTransport;

// --- File types ---

/// A file record exactly as the API returns it.
///
/// Every field is optional on the wire; the controller decides what a missing
/// value means when it normalizes the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "originalName", default)]
    pub original_name: Option<String>,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub mimetype: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub path: Option<String>,
}

impl FileRecord {
    /// Backend identifier, preferring `_id` over `id`.
    pub fn record_id(&self) -> Option<&str> {
        self.object_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .or_else(|| self.id.as_deref().filter(|id| !id.is_empty()))
    }
}

/// Payloads arrive either wrapped as `{ "data": ... }` or bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(inner) => inner,
        }
    }
}

// --- Transport contract ---

/// Capabilities the file browser needs from a file API.
///
/// `view_url` and `download_url` only build addresses; they never touch the
/// network.
#[async_trait]
pub trait FileTransport: Send + Sync {
    /// Fetch every file the backend knows about.
    async fn list_files(&self) -> Result<Vec<FileRecord>, TransportError>;

    /// Upload `content` under `file_name`. Returns the created record when the
    /// backend echoes one back.
    async fn upload_file(
        &self,
        content: Vec<u8>,
        file_name: &str,
    ) -> Result<Option<FileRecord>, TransportError>;

    /// Delete by id. A missing id fails with [`TransportError::NotFound`].
    async fn delete_file(&self, id: &str) -> Result<(), TransportError>;

    fn view_url(&self, id: &str) -> String;

    fn download_url(&self, id: &str) -> String;
}
