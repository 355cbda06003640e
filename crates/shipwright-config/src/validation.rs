//! Structural checks run before any bundler invocation.

use std::path::Path;

use crate::build::{BuildConfiguration, CopyRule};
use crate::error::{ConfigError, Result};

/// Validate a composed configuration for the application at `app_path`.
///
/// Path checks are lexical; nothing on disk is touched.
pub fn validate(config: &BuildConfiguration, app_path: &Path) -> Result<()> {
    if config.source.entries.is_empty() {
        return Err(ConfigError::NoEntries);
    }

    for (name, path) in &config.source.entries {
        if name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "source.entries".to_string(),
                hint: Some(format!("entry for {} has an empty name", path.display())),
            });
        }
    }

    // Output inside the asset tree would be picked up again on every rebuild.
    let assets = app_path.join("assets");
    if config.output.root.starts_with(&assets) {
        return Err(ConfigError::OutputInsideSource {
            root: config.output.root.clone(),
            assets,
        });
    }

    let dist = &config.output.dist;
    for (field, value) in [
        ("output.dist.css", &dist.css),
        ("output.dist.js", &dist.js),
        ("output.dist.font", &dist.font),
        ("output.dist.image", &dist.image),
    ] {
        if value.trim_matches('/').trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: field.to_string(),
                hint: Some("asset subdirectories must not be empty or '/'".to_string()),
            });
        }
    }

    validate_copy_rules(&config.copy)
}

/// Reject copy rules with an empty `from`, `to` or glob `context`.
///
/// Must see the rules before relative paths are anchored: anchoring turns an
/// empty path into the application root.
pub fn validate_copy_rules(rules: &[CopyRule]) -> Result<()> {
    for rule in rules {
        let empty_context = rule
            .context
            .as_ref()
            .is_some_and(|context| context.as_os_str().is_empty());
        if rule.from.as_os_str().is_empty() || rule.to.as_os_str().is_empty() || empty_context {
            return Err(ConfigError::InvalidValue {
                field: "copy".to_string(),
                hint: Some("copy rules need a non-empty 'from', 'to' and 'context'".to_string()),
            });
        }
    }
    Ok(())
}
