//! File browser controller.
//!
//! Owns the listing fetched from the API and derives everything the
//! presentation layer shows from it: the search-filtered view, the current
//! page, and the open preview. Mutations go through the transport and are
//! always followed by a full reload of the listing.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::ops::RangeInclusive;
use std::path::Path;

use tracing::{info, warn};

use crate::api::{FileRecord, FileTransport};
use crate::error::{BrowserError, TransportError, ValidationError};
use crate::preview::{classify, PreviewReference, PreviewResolver, PreviewStrategy};

/// Normalized view of one remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub id: String,
    pub display_name: String,
    /// Backend-side file name, diagnostics only.
    pub stored_name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub storage_path: String,
    /// Present only while this entry is being previewed.
    pub preview: Option<PreviewReference>,
}

impl FileEntry {
    /// Returns `None` for records without an identifier.
    pub fn from_record(record: FileRecord) -> Option<Self> {
        let id = record.record_id()?.to_string();
        Some(Self {
            id,
            display_name: record.original_name.unwrap_or_default(),
            stored_name: record.filename.unwrap_or_default(),
            mime_type: record.mimetype.unwrap_or_default(),
            size_bytes: record.size.unwrap_or(0),
            storage_path: record.path.unwrap_or_default(),
            preview: None,
        })
    }

    pub fn preview_strategy(&self) -> PreviewStrategy {
        classify(&self.mime_type)
    }

    /// Whether the file can be shown rather than only downloaded.
    pub fn can_preview(&self) -> bool {
        self.preview_strategy() != PreviewStrategy::DownloadOnly
    }
}

/// A file chosen for upload but not sent yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingUpload {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl PendingUpload {
    pub fn new(file_name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content,
        }
    }

    /// Read a local file; the upload is named after its base name.
    pub fn from_path(path: &Path) -> Result<Self, BrowserError> {
        let content = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, content))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    /// The server no longer had the file.
    AlreadyGone,
    /// The user declined the confirmation.
    Cancelled,
}

pub struct FileBrowser<T> {
    transport: T,
    resolver: PreviewResolver,
    page_size: NonZeroUsize,
    files: Vec<FileEntry>,
    loaded: bool,
    search_text: String,
    current_page: usize,
    previewing: Option<String>,
    pending: Option<PendingUpload>,
}

impl<T: FileTransport> FileBrowser<T> {
    pub fn new(transport: T, resolver: PreviewResolver, page_size: NonZeroUsize) -> Self {
        Self {
            transport,
            resolver,
            page_size,
            files: Vec::new(),
            loaded: false,
            search_text: String::new(),
            current_page: 1,
            previewing: None,
            pending: None,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    // --- Listing ---

    /// Reload the whole listing from the server.
    ///
    /// On failure the previous listing stays in place.
    pub async fn refresh(&mut self) -> Result<(), BrowserError> {
        let records = self.transport.list_files().await?;

        let mut seen = HashSet::new();
        let mut files = Vec::with_capacity(records.len());
        for record in records {
            let Some(entry) = FileEntry::from_record(record) else {
                warn!("Skipping file record without an id");
                continue;
            };
            if !seen.insert(entry.id.clone()) {
                warn!(id = %entry.id, "Skipping duplicate file record");
                continue;
            }
            files.push(entry);
        }

        self.files = files;
        self.loaded = true;
        self.current_page = 1;

        if let Some(id) = self.previewing.take() {
            if self.entry(&id).is_some() {
                self.open_preview(&id)?;
            }
        }

        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn entries(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn entry(&self, id: &str) -> Option<&FileEntry> {
        self.files.iter().find(|f| f.id == id)
    }

    // --- Search & pagination ---

    pub fn search(&mut self, text: &str) {
        self.search_text = text.to_string();
        self.current_page = 1;
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    /// Entries whose display name contains the search text, ignoring case.
    pub fn filtered(&self) -> Vec<&FileEntry> {
        let needle = self.search_text.to_lowercase();
        self.files
            .iter()
            .filter(|f| f.display_name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Never less than one, so an empty result still renders as one page.
    pub fn total_pages(&self) -> usize {
        self.filtered().len().div_ceil(self.page_size.get()).max(1)
    }

    pub fn page_numbers(&self) -> RangeInclusive<usize> {
        1..=self.total_pages()
    }

    pub fn current_page(&self) -> usize {
        self.current_page
    }

    /// Move to `page`. Out-of-range pages are ignored and return `false`.
    pub fn paginate(&mut self, page: usize) -> bool {
        if page < 1 || page > self.total_pages() {
            return false;
        }
        self.current_page = page;
        true
    }

    pub fn page_entries(&self) -> Vec<&FileEntry> {
        let start = (self.current_page - 1) * self.page_size.get();
        self.filtered()
            .into_iter()
            .skip(start)
            .take(self.page_size.get())
            .collect()
    }

    // --- Preview ---

    /// Attach a preview reference to `id`, closing any other preview first.
    pub fn open_preview(&mut self, id: &str) -> Result<&PreviewReference, BrowserError> {
        self.close_preview();

        let index = self
            .files
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| BrowserError::UnknownEntry(id.to_string()))?;

        let entry = &mut self.files[index];
        let reference = self
            .resolver
            .resolve(&self.transport, &entry.id, &entry.mime_type);
        self.previewing = Some(entry.id.clone());
        Ok(entry.preview.insert(reference))
    }

    pub fn close_preview(&mut self) {
        if let Some(id) = self.previewing.take() {
            if let Some(entry) = self.files.iter_mut().find(|f| f.id == id) {
                entry.preview = None;
            }
        }
    }

    pub fn previewing(&self) -> Option<&FileEntry> {
        self.previewing.as_deref().and_then(|id| self.entry(id))
    }

    pub fn preview_dialog_visible(&self) -> bool {
        self.previewing.is_some()
    }

    pub fn download_url(&self, id: &str) -> Result<String, BrowserError> {
        let entry = self
            .entry(id)
            .ok_or_else(|| BrowserError::UnknownEntry(id.to_string()))?;
        Ok(self.transport.download_url(&entry.id))
    }

    // --- Upload ---

    pub fn select_file(&mut self, upload: PendingUpload) {
        self.pending = Some(upload);
    }

    pub fn clear_selection(&mut self) {
        self.pending = None;
    }

    pub fn pending_upload(&self) -> Option<&PendingUpload> {
        self.pending.as_ref()
    }

    /// Send the pending selection, then reload the listing.
    ///
    /// The selection survives a failed upload so it can be retried. Returns the
    /// uploaded entry when the server echoed it back.
    pub async fn upload(&mut self) -> Result<Option<FileEntry>, BrowserError> {
        let pending = self.pending.as_ref().ok_or(ValidationError::NoFileSelected)?;

        let record = self
            .transport
            .upload_file(pending.content.clone(), &pending.file_name)
            .await?;
        info!(file_name = %pending.file_name, "Uploaded file");
        self.pending = None;

        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Reload after upload failed");
        }

        Ok(record.and_then(FileEntry::from_record))
    }

    // --- Delete ---

    /// Delete `id` once `confirm` agrees, then reload the listing.
    ///
    /// `confirm` receives the entry's display name (or the id when the entry is
    /// not in the listing). A file that is already gone on the server counts
    /// as deleted.
    pub async fn delete_entry<F>(&mut self, id: &str, confirm: F) -> Result<DeleteOutcome, BrowserError>
    where
        F: FnOnce(&str) -> bool,
    {
        let label = self
            .entry(id)
            .map(|f| f.display_name.as_str())
            .unwrap_or(id);
        if !confirm(label) {
            return Ok(DeleteOutcome::Cancelled);
        }

        let outcome = match self.transport.delete_file(id).await {
            Ok(()) => {
                info!(id, "Deleted file");
                DeleteOutcome::Deleted
            }
            Err(TransportError::NotFound(message)) => {
                warn!(id, %message, "File already gone on server");
                DeleteOutcome::AlreadyGone
            }
            Err(e) => return Err(e.into()),
        };

        if let Err(e) = self.refresh().await {
            warn!(error = %e, "Reload after delete failed");
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// In-memory stand-in for the file API.
    #[derive(Default)]
    struct MemoryTransport {
        files: Mutex<Vec<FileRecord>>,
        next_id: AtomicUsize,
        fail_list: AtomicBool,
        fail_upload: AtomicBool,
        fail_delete: AtomicBool,
        list_calls: AtomicUsize,
    }

    impl MemoryTransport {
        fn with_names(names: &[&str]) -> Self {
            let transport = Self::default();
            for name in names {
                transport.insert(name, "application/octet-stream");
            }
            transport
        }

        fn insert(&self, name: &str, mime: &str) -> String {
            let id = format!("f{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
            self.files.lock().unwrap().push(FileRecord {
                object_id: Some(id.clone()),
                id: None,
                original_name: Some(name.to_string()),
                filename: Some(format!("stored-{}", name)),
                mimetype: Some(mime.to_string()),
                size: Some(1024),
                path: Some(format!("uploads/stored-{}", name)),
            });
            id
        }
    }

    #[async_trait]
    impl FileTransport for MemoryTransport {
        async fn list_files(&self) -> Result<Vec<FileRecord>, TransportError> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_list.load(Ordering::SeqCst) {
                return Err(TransportError::Network("connection refused".into()));
            }
            Ok(self.files.lock().unwrap().clone())
        }

        async fn upload_file(
            &self,
            content: Vec<u8>,
            file_name: &str,
        ) -> Result<Option<FileRecord>, TransportError> {
            if self.fail_upload.load(Ordering::SeqCst) {
                return Err(TransportError::Status {
                    status: 413,
                    message: "File too large".into(),
                });
            }
            let id = self.insert(file_name, "text/plain");
            let files = self.files.lock().unwrap();
            let mut record = files.iter().find(|f| f.record_id() == Some(id.as_str())).cloned();
            if let Some(record) = record.as_mut() {
                record.size = Some(content.len() as u64);
            }
            Ok(record)
        }

        async fn delete_file(&self, id: &str) -> Result<(), TransportError> {
            if self.fail_delete.load(Ordering::SeqCst) {
                return Err(TransportError::Status {
                    status: 500,
                    message: "boom".into(),
                });
            }
            let mut files = self.files.lock().unwrap();
            let before = files.len();
            files.retain(|f| f.record_id() != Some(id));
            if files.len() == before {
                return Err(TransportError::NotFound("File not found".into()));
            }
            Ok(())
        }

        fn view_url(&self, id: &str) -> String {
            format!("http://files.test/files/view/{}", id)
        }

        fn download_url(&self, id: &str) -> String {
            format!("http://files.test/files/download/{}", id)
        }
    }

    fn new_browser(transport: MemoryTransport, page_size: usize) -> FileBrowser<MemoryTransport> {
        let resolver = PreviewResolver::new("https://viewer.test/embed?embedded=true").unwrap();
        FileBrowser::new(transport, resolver, NonZeroUsize::new(page_size).unwrap())
    }

    fn names(entries: &[&FileEntry]) -> Vec<String> {
        entries.iter().map(|f| f.display_name.clone()).collect()
    }

    #[test]
    fn test_from_record_defaults_missing_fields() {
        let entry = FileEntry::from_record(FileRecord {
            id: Some("abc".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(entry.id, "abc");
        assert_eq!(entry.display_name, "");
        assert_eq!(entry.size_bytes, 0);
        assert_eq!(entry.preview_strategy(), PreviewStrategy::DownloadOnly);
        assert!(!entry.can_preview());

        assert!(FileEntry::from_record(FileRecord::default()).is_none());
    }

    #[test]
    fn test_pending_upload_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("budget.xlsx");
        std::fs::write(&path, b"cells").unwrap();

        let pending = PendingUpload::from_path(&path).unwrap();
        assert_eq!(pending.file_name, "budget.xlsx");
        assert_eq!(pending.content, b"cells");

        assert!(matches!(
            PendingUpload::from_path(&dir.path().join("missing.bin")),
            Err(BrowserError::Io(_))
        ));
    }

    #[tokio::test]
    async fn test_starts_empty_with_one_page() {
        let browser = new_browser(MemoryTransport::default(), 10);
        assert!(!browser.is_loaded());
        assert_eq!(browser.total_pages(), 1);
        assert!(browser.page_entries().is_empty());
    }

    #[tokio::test]
    async fn test_refresh_maps_records() {
        let transport = MemoryTransport::default();
        transport.insert("Report.pdf", "application/pdf");
        let mut browser = new_browser(transport, 10);

        browser.refresh().await.unwrap();
        assert!(browser.is_loaded());

        let entry = &browser.entries()[0];
        assert_eq!(entry.id, "f1");
        assert_eq!(entry.display_name, "Report.pdf");
        assert_eq!(entry.stored_name, "stored-Report.pdf");
        assert_eq!(entry.mime_type, "application/pdf");
        assert_eq!(entry.size_bytes, 1024);
        assert_eq!(entry.storage_path, "uploads/stored-Report.pdf");
        assert!(entry.preview.is_none());
    }

    #[tokio::test]
    async fn test_refresh_drops_records_without_id_and_duplicates() {
        let transport = MemoryTransport::default();
        {
            let mut files = transport.files.lock().unwrap();
            files.push(FileRecord {
                object_id: Some("a".into()),
                original_name: Some("first".into()),
                ..Default::default()
            });
            files.push(FileRecord {
                id: Some("a".into()),
                original_name: Some("second".into()),
                ..Default::default()
            });
            files.push(FileRecord {
                original_name: Some("orphan".into()),
                ..Default::default()
            });
        }
        let mut browser = new_browser(transport, 10);
        browser.refresh().await.unwrap();

        assert_eq!(browser.entries().len(), 1);
        assert_eq!(browser.entries()[0].display_name, "first");
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_previous_listing() {
        let mut browser = new_browser(MemoryTransport::with_names(&["a.txt", "b.txt"]), 10);
        browser.refresh().await.unwrap();

        browser.transport().fail_list.store(true, Ordering::SeqCst);
        let err = browser.refresh().await.unwrap_err();
        assert!(matches!(err, BrowserError::Transport(TransportError::Network(_))));
        assert_eq!(browser.entries().len(), 2);
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_substring() {
        let mut browser = new_browser(
            MemoryTransport::with_names(&["Report.pdf", "receipt.png", "Q1 report.docx"]),
            10,
        );
        browser.refresh().await.unwrap();

        browser.search("report");
        assert_eq!(names(&browser.filtered()), vec!["Report.pdf", "Q1 report.docx"]);

        browser.search("");
        assert_eq!(browser.filtered().len(), 3);

        browser.search("nothing-matches");
        assert!(browser.filtered().is_empty());
        assert_eq!(browser.total_pages(), 1);
        assert!(browser.page_entries().is_empty());
    }

    #[tokio::test]
    async fn test_pagination_over_25_entries() {
        let names_owned: Vec<String> = (1..=25).map(|i| format!("file-{:02}.bin", i)).collect();
        let refs: Vec<&str> = names_owned.iter().map(String::as_str).collect();
        let mut browser = new_browser(MemoryTransport::with_names(&refs), 10);
        browser.refresh().await.unwrap();

        assert_eq!(browser.total_pages(), 3);
        assert_eq!(browser.page_numbers().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(browser.page_entries().len(), 10);

        assert!(browser.paginate(3));
        let page = browser.page_entries();
        assert_eq!(page.len(), 5);
        assert_eq!(page[0].display_name, "file-21.bin");
        assert_eq!(page[4].display_name, "file-25.bin");

        assert!(!browser.paginate(4));
        assert_eq!(browser.current_page(), 3);
        assert!(!browser.paginate(0));
        assert_eq!(browser.current_page(), 3);
    }

    #[tokio::test]
    async fn test_search_and_refresh_reset_page() {
        let names_owned: Vec<String> = (1..=15).map(|i| format!("doc{}.txt", i)).collect();
        let refs: Vec<&str> = names_owned.iter().map(String::as_str).collect();
        let mut browser = new_browser(MemoryTransport::with_names(&refs), 5);
        browser.refresh().await.unwrap();

        assert!(browser.paginate(3));
        browser.search("doc1");
        assert_eq!(browser.current_page(), 1);
        // doc1, doc10..doc15
        assert_eq!(browser.filtered().len(), 7);
        assert_eq!(browser.total_pages(), 2);

        assert!(browser.paginate(2));
        browser.refresh().await.unwrap();
        assert_eq!(browser.current_page(), 1);
        assert_eq!(browser.search_text(), "doc1");
        assert_eq!(browser.filtered().len(), 7);
    }

    #[tokio::test]
    async fn test_open_preview_attaches_reference() {
        let transport = MemoryTransport::default();
        let image = transport.insert("photo.png", "image/png");
        let sheet = transport.insert("budget.xlsx", "application/vnd.ms-excel");
        let mut browser = new_browser(transport, 10);
        browser.refresh().await.unwrap();

        let preview = browser.open_preview(&image).unwrap().clone();
        assert_eq!(preview.strategy, PreviewStrategy::Inline);
        assert_eq!(preview.url.as_str(), "http://files.test/files/view/f1");
        assert!(browser.preview_dialog_visible());
        assert_eq!(browser.previewing().unwrap().id, image);

        let preview = browser.open_preview(&sheet).unwrap().clone();
        assert_eq!(preview.strategy, PreviewStrategy::ExternalViewer);
        assert!(preview.url.as_str().starts_with("https://viewer.test/embed?embedded=true&url="));

        let with_preview: Vec<_> = browser
            .entries()
            .iter()
            .filter(|f| f.preview.is_some())
            .map(|f| f.id.clone())
            .collect();
        assert_eq!(with_preview, vec![sheet]);
    }

    #[tokio::test]
    async fn test_close_preview_is_idempotent() {
        let transport = MemoryTransport::default();
        let id = transport.insert("archive.zip", "application/zip");
        let mut browser = new_browser(transport, 10);
        browser.refresh().await.unwrap();

        browser.close_preview();
        assert!(!browser.preview_dialog_visible());

        let preview = browser.open_preview(&id).unwrap();
        assert_eq!(preview.strategy, PreviewStrategy::DownloadOnly);
        assert_eq!(preview.url.as_str(), "http://files.test/files/download/f1");

        browser.close_preview();
        browser.close_preview();
        assert!(!browser.preview_dialog_visible());
        assert!(browser.entries().iter().all(|f| f.preview.is_none()));
    }

    #[tokio::test]
    async fn test_open_preview_unknown_id() {
        let mut browser = new_browser(MemoryTransport::default(), 10);
        assert!(matches!(
            browser.open_preview("nope"),
            Err(BrowserError::UnknownEntry(_))
        ));
        assert!(!browser.preview_dialog_visible());
    }

    #[tokio::test]
    async fn test_refresh_keeps_surviving_preview() {
        let transport = MemoryTransport::default();
        let id = transport.insert("scan.pdf", "application/pdf");
        let mut browser = new_browser(transport, 10);
        browser.refresh().await.unwrap();
        browser.open_preview(&id).unwrap();

        browser.refresh().await.unwrap();
        assert_eq!(browser.previewing().unwrap().id, id);
        assert!(browser.entry(&id).unwrap().preview.is_some());

        browser.transport().files.lock().unwrap().clear();
        browser.refresh().await.unwrap();
        assert!(!browser.preview_dialog_visible());
        assert!(browser.previewing().is_none());
    }

    #[tokio::test]
    async fn test_upload_requires_selection() {
        let mut browser = new_browser(MemoryTransport::default(), 10);
        let err = browser.upload().await.unwrap_err();
        assert!(matches!(
            err,
            BrowserError::Validation(ValidationError::NoFileSelected)
        ));
        assert_eq!(browser.transport().list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upload_then_refresh_lists_file_once() {
        let mut browser = new_browser(MemoryTransport::with_names(&["existing.bin"]), 10);
        browser.refresh().await.unwrap();

        browser.select_file(PendingUpload::new("minutes.txt", b"hello".to_vec()));
        let uploaded = browser.upload().await.unwrap().unwrap();
        assert_eq!(uploaded.display_name, "minutes.txt");
        assert_eq!(uploaded.size_bytes, 5);

        assert!(browser.pending_upload().is_none());
        let count = browser
            .entries()
            .iter()
            .filter(|f| f.display_name == "minutes.txt")
            .count();
        assert_eq!(count, 1);
        assert_eq!(browser.entries().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_upload_keeps_selection() {
        let mut browser = new_browser(MemoryTransport::default(), 10);
        browser.transport().fail_upload.store(true, Ordering::SeqCst);
        browser.select_file(PendingUpload::new("huge.iso", vec![0; 16]));

        let err = browser.upload().await.unwrap_err();
        assert!(matches!(
            err,
            BrowserError::Transport(TransportError::Status { status: 413, .. })
        ));
        assert_eq!(browser.pending_upload().unwrap().file_name, "huge.iso");

        browser.transport().fail_upload.store(false, Ordering::SeqCst);
        browser.upload().await.unwrap();
        assert!(browser.pending_upload().is_none());
        assert_eq!(browser.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_upload_succeeds_even_if_reload_fails() {
        let mut browser = new_browser(MemoryTransport::default(), 10);
        browser.transport().fail_list.store(true, Ordering::SeqCst);
        browser.select_file(PendingUpload::new("a.txt", b"a".to_vec()));

        assert!(browser.upload().await.is_ok());
        assert!(browser.pending_upload().is_none());
        assert!(browser.entries().is_empty());
    }

    #[tokio::test]
    async fn test_delete_succeeds_even_if_reload_fails() {
        let transport = MemoryTransport::default();
        let id = transport.insert("gone-soon.txt", "text/plain");
        let mut browser = new_browser(transport, 10);
        browser.refresh().await.unwrap();
        browser.transport().fail_list.store(true, Ordering::SeqCst);

        let outcome = browser.delete_entry(&id, |_| true).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert!(browser.transport().files.lock().unwrap().is_empty());
        // The stale listing stays until the next successful reload
        assert_eq!(browser.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let transport = MemoryTransport::default();
        let id = transport.insert("keep.txt", "text/plain");
        let mut browser = new_browser(transport, 10);
        browser.refresh().await.unwrap();

        let mut asked = None;
        let outcome = browser
            .delete_entry(&id, |name| {
                asked = Some(name.to_string());
                false
            })
            .await
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::Cancelled);
        assert_eq!(asked.as_deref(), Some("keep.txt"));
        assert_eq!(browser.entries().len(), 1);
        assert_eq!(browser.transport().list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_after_refresh() {
        let transport = MemoryTransport::default();
        let id = transport.insert("old.txt", "text/plain");
        transport.insert("new.txt", "text/plain");
        let mut browser = new_browser(transport, 10);
        browser.refresh().await.unwrap();

        let outcome = browser.delete_entry(&id, |_| true).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert_eq!(names(&browser.filtered()), vec!["new.txt"]);
    }

    #[tokio::test]
    async fn test_delete_missing_id_is_not_an_error() {
        let mut browser = new_browser(MemoryTransport::with_names(&["a", "b"]), 10);
        browser.refresh().await.unwrap();
        let before = browser.entries().to_vec();

        let outcome = browser.delete_entry("ghost", |_| true).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::AlreadyGone);
        assert_eq!(browser.entries(), before.as_slice());
        assert_eq!(browser.transport().list_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_delete_failure_skips_refresh() {
        let transport = MemoryTransport::default();
        let id = transport.insert("locked.txt", "text/plain");
        let mut browser = new_browser(transport, 10);
        browser.refresh().await.unwrap();
        browser.transport().fail_delete.store(true, Ordering::SeqCst);

        let err = browser.delete_entry(&id, |_| true).await.unwrap_err();
        assert!(matches!(
            err,
            BrowserError::Transport(TransportError::Status { status: 500, .. })
        ));
        assert_eq!(browser.transport().list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(browser.entries().len(), 1);
    }

    #[tokio::test]
    async fn test_download_url_for_listed_entry() {
        let transport = MemoryTransport::default();
        let id = transport.insert("a.zip", "application/zip");
        let mut browser = new_browser(transport, 10);
        browser.refresh().await.unwrap();

        assert_eq!(
            browser.download_url(&id).unwrap(),
            "http://files.test/files/download/f1"
        );
        assert!(browser.download_url("zzz").is_err());
    }
}
