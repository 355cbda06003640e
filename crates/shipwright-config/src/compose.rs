//! Composition of the canonical configuration for an application root.

use indexmap::IndexMap;
use std::path::Path;

use crate::build::{
    BuildConfiguration, ChunkSplit, CopyRule, DevOptions, DevServerOptions, OutputPolicy,
    SourceOptions,
};
use crate::error::Result;
use crate::partial::{Merge, PartialBuildConfiguration};
use crate::validation::{validate, validate_copy_rules};

/// Build the configuration for `app_path`, apply `overrides`, and validate it.
///
/// Pure apart from path construction: nothing on disk is inspected, and
/// neither `overrides` nor any shared default is modified. When `host_port`
/// is `None` the dev server carries no port at all.
///
/// # Example
///
/// ```
/// use shipwright_config::{ChunkStrategy, PartialBuildConfiguration, compose};
/// use serde_json::json;
///
/// let overrides = PartialBuildConfiguration::from_value(json!({
///     "chunk_split": { "strategy": "all-in-one" }
/// }))
/// .unwrap();
///
/// let config = compose("/srv/app", Some(1337), &overrides).unwrap();
/// assert_eq!(config.chunk_split.strategy, ChunkStrategy::AllInOne);
/// assert_eq!(config.server.unwrap().port, Some(1337));
/// ```
pub fn compose(
    app_path: impl AsRef<Path>,
    host_port: Option<u16>,
    overrides: &PartialBuildConfiguration,
) -> Result<BuildConfiguration> {
    let app_path = app_path.as_ref();
    let merged = default_configuration(app_path, host_port).merged(overrides);
    validate_copy_rules(&merged.copy)?;

    let config = merged.anchored(app_path);
    validate(&config, app_path)?;

    tracing::debug!(
        entries = config.source.entries.len(),
        copy_rules = config.copy.len(),
        output = %config.output.root.display(),
        "composed build configuration"
    );

    Ok(config)
}

/// The fixed default policy, before any overrides.
pub fn default_configuration(app_path: &Path, host_port: Option<u16>) -> BuildConfiguration {
    let assets = app_path.join("assets");
    let output = OutputPolicy {
        root: app_path.join(".tmp").join("public"),
        ..OutputPolicy::default()
    };

    let mut entries = IndexMap::new();
    entries.insert("app".to_string(), assets.join("js").join("app.js"));

    let mut aliases = IndexMap::new();
    aliases.insert("@".to_string(), assets.join("js"));
    aliases.insert("~".to_string(), assets.clone());

    let copy = vec![
        CopyRule::dir(assets.join("images"), output.dir_for(&output.dist.image)),
        CopyRule::dir(assets.join("fonts"), output.dir_for(&output.dist.font)),
        CopyRule::dir(assets.join("dependencies"), output.root.join("dependencies")),
        CopyRule::glob(&assets, "**/*.html", output.dir_for(&output.dist.html)),
    ];

    BuildConfiguration {
        source: SourceOptions { entries, aliases },
        output,
        copy,
        chunk_split: ChunkSplit::default(),
        server: Some(DevServerOptions {
            port: host_port,
            strict_port: true,
            print_urls: false,
        }),
        dev: DevOptions::default(),
        html_plugin: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn defaults_point_into_application_tree() {
        let config = default_configuration(Path::new("/app"), Some(1337));

        assert_eq!(
            config.source.entries["app"],
            PathBuf::from("/app/assets/js/app.js")
        );
        assert_eq!(config.source.aliases["@"], PathBuf::from("/app/assets/js"));
        assert_eq!(config.source.aliases["~"], PathBuf::from("/app/assets"));
        assert_eq!(config.output.root, PathBuf::from("/app/.tmp/public"));
        assert!(config.output.manifest);
    }

    #[test]
    fn every_default_copy_rule_tolerates_missing_sources() {
        let config = default_configuration(Path::new("/app"), None);
        assert_eq!(config.copy.len(), 4);
        assert!(config.copy.iter().all(|rule| rule.no_error_on_missing));
        assert_eq!(config.copy[3].from, PathBuf::from("**/*.html"));
        assert_eq!(config.copy[3].to, PathBuf::from("/app/.tmp/public"));
    }

    #[test]
    fn missing_host_port_omits_port_field() {
        let config = compose("/app", None, &PartialBuildConfiguration::default()).unwrap();
        let value = config.to_value().unwrap();
        assert!(value["server"].get("port").is_none());
        assert_eq!(value["server"]["strict_port"], serde_json::json!(true));
    }
}
