//! Output layout and pass-through copy rules.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::helpers::{
    default_css_dir, default_font_dir, default_html_dir, default_image_dir, default_js_dir,
    default_output_root, default_true,
};
use super::MANIFEST_FILE_NAME;

/// Where and how build output is written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputPolicy {
    /// Root output directory; must live outside the asset source tree
    #[serde(default = "default_output_root")]
    pub root: PathBuf,

    /// Per-asset-type subdirectories relative to `root`
    #[serde(default)]
    pub dist: DistPaths,

    /// Content-hash emitted file names
    #[serde(default = "default_true")]
    pub filename_hash: bool,

    /// Emit `manifest.json` at the output root
    #[serde(default = "default_true")]
    pub manifest: bool,
}

impl Default for OutputPolicy {
    fn default() -> Self {
        Self {
            root: default_output_root(),
            dist: DistPaths::default(),
            filename_hash: true,
            manifest: true,
        }
    }
}

impl OutputPolicy {
    /// Location of the build manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE_NAME)
    }

    /// Absolute directory for a dist sub-path (`"/"` maps to the root).
    pub fn dir_for(&self, sub: &str) -> PathBuf {
        let trimmed = sub.trim_matches('/');
        if trimmed.is_empty() {
            self.root.clone()
        } else {
            self.root.join(trimmed)
        }
    }
}

/// Subdirectories for each asset type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistPaths {
    #[serde(default = "default_css_dir")]
    pub css: String,

    #[serde(default = "default_js_dir")]
    pub js: String,

    #[serde(default = "default_font_dir")]
    pub font: String,

    #[serde(default = "default_image_dir")]
    pub image: String,

    #[serde(default = "default_html_dir")]
    pub html: String,
}

impl Default for DistPaths {
    fn default() -> Self {
        Self {
            css: default_css_dir(),
            js: default_js_dir(),
            font: default_font_dir(),
            image: default_image_dir(),
            html: default_html_dir(),
        }
    }
}

/// A set of files passed through to the output unmodified.
///
/// With a `context`, `from` is a glob relative to it (`**/*.html`);
/// otherwise `from` is a directory copied recursively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyRule {
    pub from: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<PathBuf>,

    pub to: PathBuf,

    /// Skip silently when the source does not exist
    #[serde(default = "default_true")]
    pub no_error_on_missing: bool,
}

impl CopyRule {
    /// Recursive directory copy that tolerates a missing source.
    pub fn dir(from: impl Into<PathBuf>, to: impl Into<PathBuf>) -> Self {
        Self {
            from: from.into(),
            context: None,
            to: to.into(),
            no_error_on_missing: true,
        }
    }

    /// Glob copy rooted at `context` that tolerates missing matches.
    pub fn glob(
        context: impl Into<PathBuf>,
        pattern: impl Into<PathBuf>,
        to: impl Into<PathBuf>,
    ) -> Self {
        Self {
            from: pattern.into(),
            context: Some(context.into()),
            to: to.into(),
            no_error_on_missing: true,
        }
    }

    pub fn is_glob(&self) -> bool {
        self.context.is_some()
    }

    /// Directory whose contents feed this rule.
    pub fn source_root(&self) -> &Path {
        self.context.as_deref().unwrap_or(&self.from)
    }
}
