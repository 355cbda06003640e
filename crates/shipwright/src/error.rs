//! Error types for the integration layer.
//!
//! [`ShipwrightError`] is what the orchestrator reports. Engines speak
//! [`EngineError`], host adapters speak [`BridgeError`], and the manifest
//! reader and copy executor have their own narrow types that convert upward
//! via `From`.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub use shipwright_config::ConfigError;

/// Convenience alias used throughout the crate.
pub type Result<T, E = ShipwrightError> = std::result::Result<T, E>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum ShipwrightError {
    /// Composing the build configuration failed.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The bundler engine rejected the configuration or failed to start.
    #[error("Bundler creation failed: {0}")]
    Creation(#[source] EngineError),

    /// A production build failed.
    #[error("Build failed: {0}")]
    Build(#[source] EngineError),

    /// The development server could not be created, started or closed.
    #[error("Dev server error: {0}")]
    DevServer(#[source] EngineError),

    /// No manifest exists under the output root.
    #[error("Manifest not found: {}", .0.display())]
    ManifestNotFound(PathBuf),

    /// A manifest exists but could not be read.
    #[error("Manifest error: {0}")]
    Manifest(#[source] ManifestError),

    /// The dev server could not be attached to the host HTTP server.
    #[error("Failed to attach dev server: {0}")]
    BridgeAttach(#[from] BridgeError),

    /// A lifecycle stage exceeded its deadline.
    #[error("{stage} timed out after {}ms", .after.as_millis())]
    Timeout { stage: Stage, after: Duration },

    /// Static asset copying failed.
    #[error("Copy error: {0}")]
    Copy(#[from] CopyError),

    /// The host HTTP server stopped abnormally.
    #[error("Host server error: {0}")]
    Host(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ManifestError> for ShipwrightError {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::NotFound(path) => Self::ManifestNotFound(path),
            other => Self::Manifest(other),
        }
    }
}

/// Lifecycle stage an error or timeout belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Composing,
    Creating,
    Building,
    DevServer,
    AfterListen,
    Closing,
}

impl Stage {
    /// Wrap an engine failure in the variant matching this stage.
    pub fn wrap(self, err: EngineError) -> ShipwrightError {
        match self {
            Stage::Creating | Stage::Composing => ShipwrightError::Creation(err),
            Stage::Building => ShipwrightError::Build(err),
            Stage::DevServer | Stage::AfterListen | Stage::Closing => {
                ShipwrightError::DevServer(err)
            }
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Composing => "configuration composition",
            Stage::Creating => "bundler creation",
            Stage::Building => "production build",
            Stage::DevServer => "dev server creation",
            Stage::AfterListen => "dev server startup",
            Stage::Closing => "dev server close",
        };
        f.write_str(name)
    }
}

/// Errors reported by a bundler engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("entry '{name}' not found at {}", .path.display())]
    EntryNotFound { name: String, path: PathBuf },

    #[error("dev server is closed")]
    Closed,

    #[error(transparent)]
    Copy(#[from] CopyError),

    #[error("file watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

/// Errors raised while wiring a dev server into a host.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The host HTTP object lacks a capability the bridge needs.
    #[error("host HTTP server does not support {0}")]
    Unsupported(&'static str),

    /// The dev server was released before the bridge used it.
    #[error("dev server handle is no longer available")]
    Released,
}

/// Errors reading the build manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("no manifest at {}", .0.display())]
    NotFound(PathBuf),

    #[error("malformed manifest at {}: {source}", .path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to read manifest at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors applying copy rules.
#[derive(Debug, Error)]
pub enum CopyError {
    #[error("copy source not found: {}", .0.display())]
    MissingSource(PathBuf),

    #[error("invalid glob pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    #[error("failed to copy {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk copy source: {0}")]
    Walk(#[from] walkdir::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_not_found_maps_to_dedicated_variant() {
        let err: ShipwrightError =
            ManifestError::NotFound(PathBuf::from("/out/manifest.json")).into();
        assert!(matches!(err, ShipwrightError::ManifestNotFound(_)));
        assert!(err.to_string().contains("/out/manifest.json"));
    }

    #[test]
    fn stage_wraps_into_matching_variant() {
        assert!(matches!(
            Stage::Building.wrap(EngineError::Custom("boom".into())),
            ShipwrightError::Build(_)
        ));
        assert!(matches!(
            Stage::Creating.wrap(EngineError::Custom("boom".into())),
            ShipwrightError::Creation(_)
        ));
        assert!(matches!(
            Stage::Closing.wrap(EngineError::Closed),
            ShipwrightError::DevServer(_)
        ));
    }

    #[test]
    fn timeout_message_names_stage() {
        let err = ShipwrightError::Timeout {
            stage: Stage::Building,
            after: Duration::from_millis(250),
        };
        assert_eq!(err.to_string(), "production build timed out after 250ms");
    }
}
