//! In-memory output for the dev server.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Status of the most recent dev compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    NotStarted,
    InProgress { started_at: Instant },
    Success { duration_ms: u64 },
    Failed { error: String },
}

impl BuildStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, BuildStatus::Success { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            BuildStatus::Failed { error } => Some(error),
            _ => None,
        }
    }
}

/// One compiled file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFile {
    pub contents: Vec<u8>,
    pub content_type: &'static str,
    /// Where the file lands when written to disk.
    pub disk_path: PathBuf,
}

/// URL path to compiled file.
#[derive(Debug, Clone, Default)]
pub struct BundleCache {
    files: HashMap<String, CachedFile>,
}

impl BundleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: String, contents: Vec<u8>, disk_path: PathBuf) {
        let content_type = content_type_for(&url);
        self.files.insert(
            url,
            CachedFile {
                contents,
                content_type,
                disk_path,
            },
        );
    }

    pub fn get(&self, url: &str) -> Option<&CachedFile> {
        self.files.get(url)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CachedFile)> {
        self.files.iter().map(|(url, file)| (url.as_str(), file))
    }
}

/// MIME type from a file name.
pub fn content_type_for(file: &str) -> &'static str {
    let extension = Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("js" | "mjs" | "cjs") => "application/javascript",
        Some("map" | "json") => "application/json",
        Some("css") => "text/css",
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("woff") => "font/woff",
        Some("woff2") => "font/woff2",
        Some("ttf") => "font/ttf",
        Some("otf") => "font/otf",
        Some("wasm") => "application/wasm",
        _ => "application/octet-stream",
    }
}
