//! Error types for configuration composition and loading.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no entries specified")]
    NoEntries,

    #[error(
        "output root {} lies inside the asset source tree {}",
        .root.display(),
        .assets.display()
    )]
    OutputInsideSource { root: PathBuf, assets: PathBuf },

    #[error("invalid config value for '{field}'{}", format_hint(.hint))]
    InvalidValue { field: String, hint: Option<String> },

    #[error("failed to load configuration overrides: {0}")]
    Load(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_hint(hint: &Option<String>) -> String {
    match hint {
        Some(hint) => format!(": {hint}"),
        None => String::new(),
    }
}
