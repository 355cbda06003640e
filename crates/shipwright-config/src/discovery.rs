//! Override discovery from the application root and the environment.
//!
//! Sources, later ones winning:
//! 1. `shipwright.toml`, or the `shipwright` field of `package.json`
//! 2. `SHIPWRIGHT_*` environment variables, `__` separating nesting levels
//!    (`SHIPWRIGHT_CHUNK_SPLIT__STRATEGY=all-in-one`)
//!
//! Layers are combined with [`PartialBuildConfiguration::layered`], so copy
//! rules from every source are kept.

use std::fs;
use std::path::{Path, PathBuf};

use figment::Figment;
use figment::providers::{Env, Format, Json, Toml};
use serde_json::Value;

use crate::error::{ConfigError, Result};
use crate::partial::PartialBuildConfiguration;

/// Prefix for override environment variables.
pub const ENV_PREFIX: &str = "SHIPWRIGHT_";

/// Name of the TOML override file in the application root.
pub const CONFIG_FILE_NAME: &str = "shipwright.toml";

/// Keys under [`ENV_PREFIX`] that are not configuration (mode selection).
const RESERVED_ENV_KEYS: &[&str] = &["env"];

/// File-based and environment-based override discovery
///
/// # Example
///
/// ```no_run
/// use shipwright_config::{OverrideDiscovery, compose};
///
/// let overrides = OverrideDiscovery::new("/srv/app").load().unwrap();
/// let config = compose("/srv/app", Some(1337), &overrides).unwrap();
/// ```
pub struct OverrideDiscovery {
    root: PathBuf,
    use_env: bool,
}

impl OverrideDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            use_env: true,
        }
    }

    /// Skip the environment layer.
    pub fn without_env(mut self) -> Self {
        self.use_env = false;
        self
    }

    /// Find an override file in the root directory
    ///
    /// `shipwright.toml` wins over a `package.json` with a `shipwright` field.
    pub fn find(&self) -> Option<PathBuf> {
        let toml_path = self.root.join(CONFIG_FILE_NAME);
        if toml_path.exists() {
            return Some(toml_path);
        }

        let pkg_path = self.root.join("package.json");
        let content = fs::read_to_string(&pkg_path).ok()?;
        let parsed: Value = serde_json::from_str(&content).ok()?;
        match parsed.get("shipwright") {
            Some(field) if !field.is_null() => Some(pkg_path),
            _ => None,
        }
    }

    /// Load every layer. A root without override files yields the
    /// environment layer alone (or an empty partial).
    pub fn load(&self) -> Result<PartialBuildConfiguration> {
        let from_file = match self.find() {
            Some(path) => self.load_file(&path)?,
            None => PartialBuildConfiguration::default(),
        };

        if !self.use_env {
            return Ok(from_file);
        }

        let from_env = Self::load_env()?;
        Ok(from_file.layered(&from_env))
    }

    fn load_file(&self, path: &Path) -> Result<PartialBuildConfiguration> {
        tracing::debug!(path = %path.display(), "loading shipwright overrides");

        let figment = if path.file_name() == Some(std::ffi::OsStr::new("package.json")) {
            Figment::from(Json::file(path)).focus("shipwright")
        } else {
            Figment::from(Toml::file(path))
        };

        figment.extract().map_err(|e| ConfigError::InvalidValue {
            field: path.display().to_string(),
            hint: Some(e.to_string()),
        })
    }

    fn load_env() -> Result<PartialBuildConfiguration> {
        Figment::from(
            Env::prefixed(ENV_PREFIX)
                .split("__")
                .ignore(RESERVED_ENV_KEYS),
        )
        .extract()
        .map_err(|e| ConfigError::Load(e.to_string()))
    }
}
