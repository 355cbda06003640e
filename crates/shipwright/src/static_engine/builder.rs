//! Compiles a [`BuildConfiguration`] into output files and a manifest.
//!
//! Entries are emitted as-is under their dist directory, optionally
//! content-hashed. Copy rules are expanded into pass-through files; those
//! landing outside the output root have no public URL and are copied to their
//! destination as-is. The same [`Compilation`] feeds both the production
//! writer and the dev cache.

use std::path::{Path, PathBuf};
use std::time::Instant;

use indexmap::IndexMap;
use shipwright_config::{BuildConfiguration, MANIFEST_FILE_NAME, OutputPolicy};
use tracing::{debug, info};

use super::cache::BundleCache;
use crate::copy::{PlannedCopy, execute_plan, plan_copy_rules};
use crate::engine::BuildReport;
use crate::error::{CopyError, EngineError};
use crate::manifest::{AssetKind, Manifest};

/// One output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// Public URL path, e.g. `/js/app.1a2b3c4d.js`.
    pub url: String,
    pub disk_path: PathBuf,
    pub contents: Vec<u8>,
}

/// Everything one compile produced.
#[derive(Debug, Clone, Default)]
pub struct Compilation {
    pub files: Vec<OutputFile>,
    pub manifest: Manifest,
    /// Copies whose destination lies outside the output root.
    pub external: Vec<PlannedCopy>,
}

impl Compilation {
    /// Load into a dev cache, including the manifest when enabled.
    pub fn to_cache(&self, output: &OutputPolicy) -> Result<BundleCache, EngineError> {
        let mut cache = BundleCache::new();
        for file in &self.files {
            cache.insert(file.url.clone(), file.contents.clone(), file.disk_path.clone());
        }
        if output.manifest {
            cache.insert(
                format!("/{MANIFEST_FILE_NAME}"),
                self.manifest.to_json()?.into_bytes(),
                output.manifest_path(),
            );
        }
        Ok(cache)
    }

    /// Copy the files that are not served from the output root.
    pub fn copy_external(&self) -> Result<usize, EngineError> {
        if self.external.is_empty() {
            return Ok(0);
        }
        let written = execute_plan(&self.external)?;
        info!(files = written.len(), "copied assets outside the output root");
        Ok(written.len())
    }
}

/// Compile entries and copy rules.
pub fn compile(config: &BuildConfiguration) -> Result<Compilation, EngineError> {
    let output = &config.output;
    let mut files: IndexMap<String, OutputFile> = IndexMap::new();
    let mut manifest = Manifest::default();
    let mut external = Vec::new();

    for (name, source) in &config.source.entries {
        let contents = std::fs::read(source).map_err(|err| match err.kind() {
            std::io::ErrorKind::NotFound => EngineError::EntryNotFound {
                name: name.clone(),
                path: source.clone(),
            },
            _ => EngineError::Io(err),
        })?;

        let extension = source
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("js")
            .to_string();
        let kind = AssetKind::of(&format!("{name}.{extension}"));
        let sub = if kind == AssetKind::Style {
            &output.dist.css
        } else {
            &output.dist.js
        };

        let file_name = if output.filename_hash {
            format!("{name}.{}.{extension}", content_hash(&contents))
        } else {
            format!("{name}.{extension}")
        };
        let url = url_for(sub, &file_name);

        let initial = &mut manifest.entries.entry(name.clone()).or_default().initial;
        if kind == AssetKind::Style {
            initial.css.push(url.clone());
        } else {
            initial.js.push(url.clone());
        }

        files.insert(
            url.clone(),
            OutputFile {
                url,
                disk_path: output.dir_for(sub).join(&file_name),
                contents,
            },
        );
    }

    for copy in plan_copy_rules(&config.copy)? {
        let Some(url) = public_url(&output.root, &copy.to) else {
            debug!(dest = %copy.to.display(), "copy destination outside output root");
            external.push(copy);
            continue;
        };
        let contents = std::fs::read(&copy.from).map_err(|source| CopyError::Io {
            path: copy.from.clone(),
            source,
        })?;
        files.insert(
            url.clone(),
            OutputFile {
                url,
                disk_path: copy.to,
                contents,
            },
        );
    }

    manifest.all_files = files.keys().cloned().collect();
    Ok(Compilation {
        files: files.into_values().collect(),
        manifest,
        external,
    })
}

/// Compile and write everything to the output root.
pub fn build_to_disk(config: &BuildConfiguration) -> Result<BuildReport, EngineError> {
    let started = Instant::now();
    let compilation = compile(config)?;

    for file in &compilation.files {
        write_file(&file.disk_path, &file.contents)?;
    }
    compilation.copy_external()?;
    if config.output.manifest {
        compilation.manifest.write_to(&config.output.root)?;
    }

    let report = BuildReport {
        files: compilation.manifest.all_files,
        duration: started.elapsed(),
    };
    info!(
        files = report.files.len(),
        output = %config.output.root.display(),
        "wrote build output"
    );
    Ok(report)
}

pub(crate) fn write_file(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)
}

/// First eight hex digits of the blake3 digest.
pub fn content_hash(contents: &[u8]) -> String {
    let hex = blake3::hash(contents).to_hex();
    hex[..8].to_string()
}

fn url_for(sub: &str, file_name: &str) -> String {
    let sub = sub.trim_matches('/');
    if sub.is_empty() {
        format!("/{file_name}")
    } else {
        format!("/{sub}/{file_name}")
    }
}

fn public_url(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy().into_owned())
        .collect();
    if segments.is_empty() {
        return None;
    }
    Some(format!("/{}", segments.join("/")))
}
