//! The composed configuration handed to the bundler engine.

mod dev;
mod helpers;
mod output;
mod types;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};

pub use dev::{DevOptions, DevServerOptions, WriteToDisk};
pub use output::{CopyRule, DistPaths, OutputPolicy};
pub use types::{ChunkSplit, ChunkStrategy};

use crate::error::ConfigError;

/// File name of the build manifest, written at the output root.
pub const MANIFEST_FILE_NAME: &str = "manifest.json";

/// Complete bundler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfiguration {
    #[serde(default)]
    pub source: SourceOptions,

    #[serde(default)]
    pub output: OutputPolicy,

    /// Pass-through copy rules, applied in order
    #[serde(default)]
    pub copy: Vec<CopyRule>,

    #[serde(default)]
    pub chunk_split: ChunkSplit,

    /// Dev server settings (ignored by production builds)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<DevServerOptions>,

    #[serde(default)]
    pub dev: DevOptions,

    /// Let the bundler generate HTML pages; the host renders its own views
    #[serde(default)]
    pub html_plugin: bool,
}

/// Entry points and import aliases.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SourceOptions {
    /// Logical bundle name → source entry file
    #[serde(default)]
    pub entries: IndexMap<String, PathBuf>,

    /// Import prefix → directory (e.g. `"@"` → `assets/js`)
    #[serde(default)]
    pub aliases: IndexMap<String, PathBuf>,
}

impl BuildConfiguration {
    /// Create from serde_json::Value (for hosts that keep settings as JSON)
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            field: "configuration".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Convert to serde_json::Value
    pub fn to_value(&self) -> Result<Value, ConfigError> {
        serde_json::to_value(self).map_err(|e| ConfigError::InvalidValue {
            field: "configuration".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Rewrite every relative path against `base`.
    ///
    /// Glob patterns in copy rules stay relative to their `context`.
    pub fn anchored(mut self, base: &Path) -> Self {
        let anchor = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };

        self.source.entries.values_mut().for_each(anchor);
        self.source.aliases.values_mut().for_each(anchor);
        anchor(&mut self.output.root);
        for rule in &mut self.copy {
            match rule.context.as_mut() {
                Some(context) => anchor(context),
                None => anchor(&mut rule.from),
            }
            anchor(&mut rule.to);
        }
        self
    }
}
