//! HTML tag generation from the build manifest.
//!
//! The manifest is re-read on every call so a rebuild is visible on the next
//! render without restarting the host. Any failure to read it renders as an
//! empty string; templates never error because assets are missing.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::error::ManifestError;
use crate::manifest::{AssetKind, Manifest, resolve_manifest};
use crate::views::ViewLocals;

/// Namespace the accessors are installed under.
pub const VIEW_NAMESPACE: &str = "shipwright";

/// Produces `<script>` and `<link>` tags for the current build output.
#[derive(Debug, Clone)]
pub struct TagGenerator {
    output_root: PathBuf,
    live: Arc<AtomicBool>,
}

impl TagGenerator {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self::with_liveness(output_root, Arc::new(AtomicBool::new(true)))
    }

    /// Generator that goes quiet once `live` is cleared.
    pub(crate) fn with_liveness(output_root: impl Into<PathBuf>, live: Arc<AtomicBool>) -> Self {
        Self {
            output_root: output_root.into(),
            live,
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// One `<script>` tag per script in the manifest.
    pub fn scripts(&self) -> String {
        self.render(AssetKind::Script)
    }

    /// One stylesheet `<link>` per stylesheet in the manifest.
    pub fn styles(&self) -> String {
        self.render(AssetKind::Style)
    }

    /// Register `scripts` and `styles` under [`VIEW_NAMESPACE`].
    pub fn install(&self, views: &ViewLocals) {
        let scripts = self.clone();
        views.insert(VIEW_NAMESPACE, "scripts", move || scripts.scripts());
        let styles = self.clone();
        views.insert(VIEW_NAMESPACE, "styles", move || styles.styles());
    }

    fn render(&self, kind: AssetKind) -> String {
        if !self.live.load(Ordering::Acquire) {
            debug!("tag generator called after shutdown");
            return String::new();
        }
        match resolve_manifest(&self.output_root) {
            Ok(manifest) => render_tags(&manifest, kind),
            Err(ManifestError::NotFound(path)) => {
                debug!(path = %path.display(), "no build manifest yet");
                String::new()
            }
            Err(err) => {
                warn!(error = %err, "unreadable build manifest");
                String::new()
            }
        }
    }
}

/// Tags for every file of `kind` in manifest order, one per line.
///
/// Only scripts and stylesheets have a tag form; other kinds render nothing.
pub fn render_tags(manifest: &Manifest, kind: AssetKind) -> String {
    let tag: fn(&str) -> String = match kind {
        AssetKind::Script => script_tag,
        AssetKind::Style => style_tag,
        AssetKind::Font | AssetKind::Image | AssetKind::Markup | AssetKind::Other => {
            return String::new();
        }
    };

    manifest
        .files_of(kind)
        .map(|file| tag(&escape_attribute(file)))
        .collect::<Vec<_>>()
        .join("\n")
}

fn script_tag(src: &str) -> String {
    format!(r#"<script type="text/javascript" src="{src}"></script>"#)
}

fn style_tag(href: &str) -> String {
    format!(r#"<link rel="stylesheet" href="{href}">"#)
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
