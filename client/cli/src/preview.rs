//! Preview strategy selection.
//!
//! A file's declared MIME type decides how it can be shown: straight from the
//! API's view endpoint, through an external document viewer, or not at all
//! (the preview turns into a download).

use std::fmt;

use reqwest::Url;

use crate::api::FileTransport;

const WORD_TYPES: &[&str] = &[
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

const EXCEL_TYPES: &[&str] = &[
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewStrategy {
    /// Rendered directly from the view endpoint.
    Inline,
    /// Rendered by the external viewer from the download endpoint.
    ExternalViewer,
    /// No rendering; previewing forces a download.
    DownloadOnly,
}

impl fmt::Display for PreviewStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreviewStrategy::Inline => write!(f, "inline"),
            PreviewStrategy::ExternalViewer => write!(f, "external viewer"),
            PreviewStrategy::DownloadOnly => write!(f, "download only"),
        }
    }
}

/// Classify a MIME type. Parameters such as `; charset=utf-8` and letter case
/// are ignored.
pub fn classify(mime_type: &str) -> PreviewStrategy {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if essence.starts_with("image/") || essence == "application/pdf" {
        PreviewStrategy::Inline
    } else if WORD_TYPES.contains(&essence.as_str())
        || EXCEL_TYPES.contains(&essence.as_str())
        || essence == "text/plain"
    {
        PreviewStrategy::ExternalViewer
    } else {
        PreviewStrategy::DownloadOnly
    }
}

/// A URL that has been through classification and may be embedded.
///
/// Only [`PreviewResolver`] hands these out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrustedUrl(String);

impl TrustedUrl {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrustedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewReference {
    pub strategy: PreviewStrategy,
    pub url: TrustedUrl,
}

/// Turns a classified file into the URL its preview should load.
#[derive(Debug, Clone)]
pub struct PreviewResolver {
    viewer: Url,
}

impl PreviewResolver {
    /// `viewer_url` is the external viewer endpoint. Query parameters already on
    /// it (e.g. `embedded=true`) are kept; the document goes in `url`.
    pub fn new(viewer_url: &str) -> anyhow::Result<Self> {
        let viewer = Url::parse(viewer_url)
            .map_err(|e| anyhow::anyhow!("Invalid viewer url '{}': {}", viewer_url, e))?;
        Ok(Self { viewer })
    }

    pub fn resolve<T>(&self, transport: &T, id: &str, mime_type: &str) -> PreviewReference
    where
        T: FileTransport + ?Sized,
    {
        let strategy = classify(mime_type);
        let url = match strategy {
            PreviewStrategy::Inline => transport.view_url(id),
            PreviewStrategy::ExternalViewer => self.viewer_for(&transport.download_url(id)),
            PreviewStrategy::DownloadOnly => transport.download_url(id),
        };
        PreviewReference {
            strategy,
            url: TrustedUrl(url),
        }
    }

    fn viewer_for(&self, document_url: &str) -> String {
        let mut url = self.viewer.clone();
        url.query_pairs_mut().append_pair("url", document_url);
        url.to_string()
    }
}
