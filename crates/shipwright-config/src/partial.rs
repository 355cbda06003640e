//! Partial configuration trees and the explicit merge used to apply them.
//!
//! Every field is optional. Merging follows one rule set: scalars in the
//! override replace the base, keyed maps are unioned with the override winning
//! on collision, and copy rules are concatenated after the base rules.
//! Mapping an entry or alias to an empty path removes it.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::hash::Hash;
use std::path::PathBuf;

use crate::build::{
    BuildConfiguration, ChunkSplit, CopyRule, DevOptions, DevServerOptions, DistPaths,
    OutputPolicy, SourceOptions, WriteToDisk,
};
use crate::error::ConfigError;

/// Non-destructive merge of a partial tree onto a complete one.
pub trait Merge {
    type Partial;

    /// Return `self` with `partial` applied; neither input is modified.
    fn merged(&self, partial: &Self::Partial) -> Self;
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialBuildConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PartialSource>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PartialOutput>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy: Option<Vec<CopyRule>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_split: Option<ChunkSplit>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<PartialDevServer>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dev: Option<PartialDev>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_plugin: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialSource {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<IndexMap<String, PathBuf>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aliases: Option<IndexMap<String, PathBuf>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub dist: Option<PartialDist>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename_hash: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialDist {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub css: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub js: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialDevServer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub strict_port: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub print_urls: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartialDev {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_to_disk: Option<WriteToDisk>,
}

impl PartialBuildConfiguration {
    /// Create from serde_json::Value (e.g. a host's `shipwright.build` settings)
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            field: "overrides".to_string(),
            hint: Some(e.to_string()),
        })
    }

    /// Convert to serde_json::Value
    pub fn to_value(&self) -> Result<Value, ConfigError> {
        serde_json::to_value(self).map_err(|e| ConfigError::InvalidValue {
            field: "overrides".to_string(),
            hint: Some(e.to_string()),
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Add or replace a single entry point
    pub fn with_entry(mut self, name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.source
            .get_or_insert_with(PartialSource::default)
            .entries
            .get_or_insert_with(IndexMap::new)
            .insert(name.into(), path.into());
        self
    }

    /// Add or replace an import alias
    pub fn with_alias(mut self, alias: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.source
            .get_or_insert_with(PartialSource::default)
            .aliases
            .get_or_insert_with(IndexMap::new)
            .insert(alias.into(), path.into());
        self
    }

    /// Append a copy rule after the defaults
    pub fn with_copy_rule(mut self, rule: CopyRule) -> Self {
        self.copy.get_or_insert_with(Vec::new).push(rule);
        self
    }

    /// Stack another partial on top of this one (later wins).
    pub fn layered(&self, over: &Self) -> Self {
        let mut copy = self.copy.clone();
        if let Some(extra) = &over.copy {
            copy.get_or_insert_with(Vec::new).extend(extra.iter().cloned());
        }

        Self {
            source: layer_with(&self.source, &over.source, |base, over| PartialSource {
                entries: layer_maps(&base.entries, &over.entries),
                aliases: layer_maps(&base.aliases, &over.aliases),
            }),
            output: layer_with(&self.output, &over.output, |base, over| PartialOutput {
                root: over.root.clone().or_else(|| base.root.clone()),
                dist: layer_with(&base.dist, &over.dist, |base, over| PartialDist {
                    css: over.css.clone().or_else(|| base.css.clone()),
                    js: over.js.clone().or_else(|| base.js.clone()),
                    font: over.font.clone().or_else(|| base.font.clone()),
                    image: over.image.clone().or_else(|| base.image.clone()),
                    html: over.html.clone().or_else(|| base.html.clone()),
                }),
                filename_hash: over.filename_hash.or(base.filename_hash),
                manifest: over.manifest.or(base.manifest),
            }),
            copy,
            chunk_split: over.chunk_split.clone().or_else(|| self.chunk_split.clone()),
            server: layer_with(&self.server, &over.server, |base, over| PartialDevServer {
                port: over.port.or(base.port),
                strict_port: over.strict_port.or(base.strict_port),
                print_urls: over.print_urls.or(base.print_urls),
            }),
            dev: layer_with(&self.dev, &over.dev, |base, over| PartialDev {
                write_to_disk: over
                    .write_to_disk
                    .clone()
                    .or_else(|| base.write_to_disk.clone()),
            }),
            html_plugin: over.html_plugin.or(self.html_plugin),
        }
    }
}

impl Merge for BuildConfiguration {
    type Partial = PartialBuildConfiguration;

    fn merged(&self, partial: &PartialBuildConfiguration) -> Self {
        let mut copy = self.copy.clone();
        if let Some(extra) = &partial.copy {
            copy.extend(extra.iter().cloned());
        }

        let server = match (&self.server, &partial.server) {
            (base, None) => base.clone(),
            (Some(base), Some(over)) => Some(base.merged(over)),
            (None, Some(over)) => Some(DevServerOptions::default().merged(over)),
        };

        Self {
            source: merge_opt(&self.source, &partial.source),
            output: merge_opt(&self.output, &partial.output),
            copy,
            chunk_split: partial
                .chunk_split
                .clone()
                .unwrap_or_else(|| self.chunk_split.clone()),
            server,
            dev: merge_opt(&self.dev, &partial.dev),
            html_plugin: partial.html_plugin.unwrap_or(self.html_plugin),
        }
    }
}

impl Merge for SourceOptions {
    type Partial = PartialSource;

    fn merged(&self, partial: &PartialSource) -> Self {
        let mut entries = union(&self.entries, partial.entries.as_ref());
        let mut aliases = union(&self.aliases, partial.aliases.as_ref());
        // An empty path in the override removes the key.
        entries.retain(|_, path| !path.as_os_str().is_empty());
        aliases.retain(|_, path| !path.as_os_str().is_empty());

        Self { entries, aliases }
    }
}

impl Merge for OutputPolicy {
    type Partial = PartialOutput;

    fn merged(&self, partial: &PartialOutput) -> Self {
        Self {
            root: partial.root.clone().unwrap_or_else(|| self.root.clone()),
            dist: merge_opt(&self.dist, &partial.dist),
            filename_hash: partial.filename_hash.unwrap_or(self.filename_hash),
            manifest: partial.manifest.unwrap_or(self.manifest),
        }
    }
}

impl Merge for DistPaths {
    type Partial = PartialDist;

    fn merged(&self, partial: &PartialDist) -> Self {
        Self {
            css: partial.css.clone().unwrap_or_else(|| self.css.clone()),
            js: partial.js.clone().unwrap_or_else(|| self.js.clone()),
            font: partial.font.clone().unwrap_or_else(|| self.font.clone()),
            image: partial.image.clone().unwrap_or_else(|| self.image.clone()),
            html: partial.html.clone().unwrap_or_else(|| self.html.clone()),
        }
    }
}

impl Merge for DevServerOptions {
    type Partial = PartialDevServer;

    fn merged(&self, partial: &PartialDevServer) -> Self {
        Self {
            port: partial.port.or(self.port),
            strict_port: partial.strict_port.unwrap_or(self.strict_port),
            print_urls: partial.print_urls.unwrap_or(self.print_urls),
        }
    }
}

impl Merge for DevOptions {
    type Partial = PartialDev;

    fn merged(&self, partial: &PartialDev) -> Self {
        Self {
            write_to_disk: partial
                .write_to_disk
                .clone()
                .unwrap_or_else(|| self.write_to_disk.clone()),
        }
    }
}

fn merge_opt<T>(base: &T, partial: &Option<T::Partial>) -> T
where
    T: Merge + Clone,
{
    match partial {
        Some(partial) => base.merged(partial),
        None => base.clone(),
    }
}

/// Base keys keep their position; new keys are appended in override order.
fn union<K, V>(base: &IndexMap<K, V>, over: Option<&IndexMap<K, V>>) -> IndexMap<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    let mut merged = base.clone();
    if let Some(over) = over {
        for (key, value) in over {
            merged.insert(key.clone(), value.clone());
        }
    }
    merged
}

fn layer_maps<K, V>(
    base: &Option<IndexMap<K, V>>,
    over: &Option<IndexMap<K, V>>,
) -> Option<IndexMap<K, V>>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    match (base, over) {
        (None, None) => None,
        (Some(base), over) => Some(union(base, over.as_ref())),
        (None, Some(over)) => Some(over.clone()),
    }
}

fn layer_with<T: Clone>(
    base: &Option<T>,
    over: &Option<T>,
    combine: impl FnOnce(&T, &T) -> T,
) -> Option<T> {
    match (base, over) {
        (Some(base), Some(over)) => Some(combine(base, over)),
        (base, None) => base.clone(),
        (None, over) => over.clone(),
    }
}
