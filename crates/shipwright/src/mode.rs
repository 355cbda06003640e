use std::fmt;

/// Which lifecycle branch the orchestrator runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BuildMode {
    /// One-shot build to disk.
    Production,
    /// Dev server attached to the host.
    #[default]
    Development,
}

impl BuildMode {
    /// Primary mode variable.
    pub const ENV_VAR: &'static str = "SHIPWRIGHT_ENV";
    /// Consulted when [`Self::ENV_VAR`] is unset.
    pub const FALLBACK_ENV_VAR: &'static str = "NODE_ENV";

    /// Read the mode from the process environment.
    pub fn from_env() -> Self {
        let value = std::env::var(Self::ENV_VAR)
            .or_else(|_| std::env::var(Self::FALLBACK_ENV_VAR))
            .ok();
        Self::from_value(value.as_deref())
    }

    /// Only the exact value `production` selects production; anything else,
    /// including no value, is development.
    pub fn from_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some("production") => BuildMode::Production,
            _ => BuildMode::Development,
        }
    }

    pub fn is_production(self) -> bool {
        matches!(self, BuildMode::Production)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BuildMode::Production => "production",
            BuildMode::Development => "development",
        })
    }
}
