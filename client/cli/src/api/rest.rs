use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, StatusCode, Url};
use tracing::debug;

use super::{Envelope, FileRecord, FileTransport};
use crate::error::TransportError;

/// `FileTransport` over the file API's REST endpoints.
pub struct RestTransport {
    base_url: Url,
    client: reqwest::Client,
}

impl RestTransport {
    pub fn new(base_url: &str, timeout: Option<Duration>) -> anyhow::Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| anyhow::anyhow!("Invalid server url '{}': {}", base_url, e))?;
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Server url '{}' cannot be used as a base", base_url);
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            base_url,
            client: builder.build()?,
        })
    }

    /// Join path segments onto the base url, encoding each one.
    fn endpoint(&self, segments: &[&str]) -> String {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url.to_string()
    }

    /// Check response status; on error, read body for detail message.
    async fn ensure_ok(resp: reqwest::Response) -> Result<reqwest::Response, TransportError> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let body = resp.text().await.unwrap_or_default();
        let message = error_message(status, &body);
        if status == StatusCode::NOT_FOUND {
            Err(TransportError::NotFound(message))
        } else {
            Err(TransportError::Status {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// Fetch the attachment bytes of a file.
    pub async fn download(&self, id: &str) -> Result<Vec<u8>, TransportError> {
        let url = self.download_url(id);
        debug!(%url, "downloading file");
        let resp = self.client.get(&url).send().await?;
        Ok(Self::ensure_ok(resp).await?.bytes().await?.to_vec())
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error"] {
            if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
                return msg.to_string();
            }
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        status.canonical_reason().unwrap_or("request failed").to_string()
    } else {
        trimmed.to_string()
    }
}

#[async_trait]
impl FileTransport for RestTransport {
    async fn list_files(&self) -> Result<Vec<FileRecord>, TransportError> {
        let url = self.endpoint(&["files"]);
        debug!(%url, "listing files");
        let resp = self.client.get(&url).send().await?;
        let list: Envelope<Vec<FileRecord>> = Self::ensure_ok(resp).await?.json().await?;
        Ok(list.into_inner())
    }

    async fn upload_file(
        &self,
        content: Vec<u8>,
        file_name: &str,
    ) -> Result<Option<FileRecord>, TransportError> {
        let url = self.endpoint(&["files", "upload"]);
        let mime = mime_guess::from_path(file_name).first_or_octet_stream();
        debug!(%url, file_name, %mime, bytes = content.len(), "uploading file");

        let part = multipart::Part::bytes(content)
            .file_name(file_name.to_string())
            .mime_str(mime.essence_str())?;
        let form = multipart::Form::new().part("file", part);

        let resp = self.client.post(&url).multipart(form).send().await?;
        let body = Self::ensure_ok(resp).await?.text().await?;

        // The upload landed either way; an unrecognized body only means the
        // backend did not echo the record.
        let record = serde_json::from_str::<Envelope<FileRecord>>(&body)
            .ok()
            .map(Envelope::into_inner)
            .filter(|record| record.record_id().is_some());
        if record.is_none() {
            debug!(file_name, "upload response carried no file record");
        }
        Ok(record)
    }

    async fn delete_file(&self, id: &str) -> Result<(), TransportError> {
        let url = self.endpoint(&["files", id]);
        debug!(%url, "deleting file");
        let resp = self.client.delete(&url).send().await?;
        Self::ensure_ok(resp).await?;
        Ok(())
    }

    fn view_url(&self, id: &str) -> String {
        self.endpoint(&["files", "view", id])
    }

    fn download_url(&self, id: &str) -> String {
        self.endpoint(&["files", "download", id])
    }
}
