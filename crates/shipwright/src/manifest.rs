//! Reading and writing the build manifest.
//!
//! The manifest lives at `<output root>/manifest.json`. Only `allFiles` is
//! required; `entries` groups the initial files per entry when the engine
//! knows them.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use shipwright_config::MANIFEST_FILE_NAME;

use crate::error::ManifestError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Public URLs of every emitted file, in emission order.
    #[serde(default)]
    pub all_files: Vec<String>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub entries: IndexMap<String, ManifestEntry>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    #[serde(default)]
    pub initial: EntryFiles,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFiles {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub js: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub css: Vec<String>,
}

/// Asset category, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Script,
    Style,
    Font,
    Image,
    Markup,
    Other,
}

impl AssetKind {
    /// Classify a URL or path. Query strings and fragments are ignored.
    pub fn of(file: &str) -> Self {
        let path = file.split(['?', '#']).next().unwrap_or(file);
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);

        match extension.as_deref() {
            Some("js" | "mjs" | "cjs") => AssetKind::Script,
            Some("css") => AssetKind::Style,
            Some("woff" | "woff2" | "ttf" | "otf" | "eot") => AssetKind::Font,
            Some("png" | "jpg" | "jpeg" | "gif" | "svg" | "webp" | "avif" | "ico") => {
                AssetKind::Image
            }
            Some("html" | "htm") => AssetKind::Markup,
            _ => AssetKind::Other,
        }
    }
}

impl Manifest {
    /// Files of one kind, in manifest order.
    pub fn files_of(&self, kind: AssetKind) -> impl Iterator<Item = &str> {
        self.all_files
            .iter()
            .map(String::as_str)
            .filter(move |file| AssetKind::of(file) == kind)
    }

    pub fn push(&mut self, url: impl Into<String>) {
        self.all_files.push(url.into());
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write `manifest.json` under `output_root`, creating the directory.
    pub fn write_to(&self, output_root: &Path) -> std::io::Result<PathBuf> {
        let path = output_root.join(MANIFEST_FILE_NAME);
        std::fs::create_dir_all(output_root)?;
        std::fs::write(&path, self.to_json()?)?;
        Ok(path)
    }
}

/// Read `<output_root>/manifest.json`.
///
/// Synchronous: it runs on every page render.
pub fn resolve_manifest(output_root: impl AsRef<Path>) -> Result<Manifest, ManifestError> {
    let path = output_root.as_ref().join(MANIFEST_FILE_NAME);
    let contents = match std::fs::read(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(ManifestError::NotFound(path));
        }
        Err(source) => return Err(ManifestError::Io { path, source }),
    };
    serde_json::from_slice(&contents).map_err(|source| ManifestError::Malformed { path, source })
}
