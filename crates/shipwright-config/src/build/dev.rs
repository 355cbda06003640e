//! Development server settings.

use serde::{Deserialize, Serialize};

use super::helpers::{default_manifest_marker, default_true};

/// Settings handed to the bundler's dev server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevServerOptions {
    /// Port the host listens on. Omitted entirely when the host has none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Fail instead of picking another port when `port` is taken
    #[serde(default = "default_true")]
    pub strict_port: bool,

    /// Print the dev server URLs on startup
    #[serde(default)]
    pub print_urls: bool,
}

impl Default for DevServerOptions {
    fn default() -> Self {
        Self {
            port: None,
            strict_port: true,
            print_urls: false,
        }
    }
}

/// Development-mode build behavior.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DevOptions {
    /// Which emitted files are also persisted to disk while serving from memory
    #[serde(default)]
    pub write_to_disk: WriteToDisk,
}

/// Predicate over emitted file names deciding what reaches the disk in dev mode.
///
/// `true`/`false` write everything/nothing; a list writes files whose name
/// contains any of the given fragments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WriteToDisk {
    Bool(bool),
    Matching(Vec<String>),
}

impl Default for WriteToDisk {
    fn default() -> Self {
        WriteToDisk::Matching(default_manifest_marker())
    }
}

impl WriteToDisk {
    pub fn allows(&self, file: &str) -> bool {
        match self {
            WriteToDisk::Bool(all) => *all,
            WriteToDisk::Matching(fragments) => fragments.iter().any(|f| file.contains(f.as_str())),
        }
    }
}
