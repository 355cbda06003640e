//! Tests for configuration validation.

use serde_json::json;
use shipwright_config::{
    ConfigError, PartialBuildConfiguration, compose, default_configuration, validate,
};
use std::path::Path;

#[test]
fn removing_the_only_entry_fails_fast() {
    let overrides = PartialBuildConfiguration::from_value(json!({
        "source": { "entries": { "app": "" } }
    }))
    .unwrap();

    let err = compose("/app", Some(1337), &overrides).unwrap_err();
    assert!(matches!(err, ConfigError::NoEntries));
}

#[test]
fn replacing_the_default_entry_is_valid() {
    let overrides = PartialBuildConfiguration::default()
        .with_entry("app", "")
        .with_entry("main", "assets/js/main.js");

    let config = compose("/app", None, &overrides).unwrap();
    assert_eq!(config.source.entries.len(), 1);
    assert_eq!(
        config.source.entries["main"],
        Path::new("/app/assets/js/main.js")
    );
}

#[test]
fn output_inside_asset_tree_is_rejected() {
    let overrides = PartialBuildConfiguration::from_value(json!({
        "output": { "root": "assets/build" }
    }))
    .unwrap();

    match compose("/app", None, &overrides).unwrap_err() {
        ConfigError::OutputInsideSource { root, assets } => {
            assert_eq!(root, Path::new("/app/assets/build"));
            assert_eq!(assets, Path::new("/app/assets"));
        }
        other => panic!("expected OutputInsideSource, got {other:?}"),
    }
}

#[test]
fn sibling_of_asset_tree_is_accepted() {
    let overrides = PartialBuildConfiguration::from_value(json!({
        "output": { "root": "assets-build" }
    }))
    .unwrap();

    assert!(compose("/app", None, &overrides).is_ok());
}

#[test]
fn empty_dist_subdirectory_is_rejected() {
    let overrides = PartialBuildConfiguration::from_value(json!({
        "output": { "dist": { "js": "/" } }
    }))
    .unwrap();

    let err = compose("/app", None, &overrides).unwrap_err();
    assert!(err.to_string().contains("output.dist.js"));
}

#[test]
fn defaults_pass_validation() {
    let app = Path::new("/srv/site");
    let config = default_configuration(app, Some(8080));
    validate(&config, app).expect("defaults are valid");
}

#[test]
fn copy_rule_with_empty_destination_is_rejected() {
    let overrides = PartialBuildConfiguration::from_value(json!({
        "copy": [{ "from": "vendor", "to": "" }]
    }))
    .unwrap();

    match compose("/app", None, &overrides).unwrap_err() {
        ConfigError::InvalidValue { field, .. } => assert_eq!(field, "copy"),
        other => panic!("expected InvalidValue, got {other:?}"),
    }
}

#[test]
fn copy_rule_with_empty_source_or_context_is_rejected() {
    for rule in [
        json!({ "from": "", "to": "public/vendor" }),
        json!({ "from": "**/*.txt", "context": "", "to": "public" }),
    ] {
        let overrides =
            PartialBuildConfiguration::from_value(json!({ "copy": [rule.clone()] })).unwrap();
        assert!(
            matches!(
                compose("/app", None, &overrides),
                Err(ConfigError::InvalidValue { .. })
            ),
            "{rule}"
        );
    }
}

#[test]
fn relative_copy_rule_is_anchored_after_validation() {
    let overrides = PartialBuildConfiguration::from_value(json!({
        "copy": [{ "from": "vendor", "to": "public/vendor" }]
    }))
    .unwrap();

    let config = compose("/app", None, &overrides).unwrap();
    let rule = config.copy.last().unwrap();
    assert_eq!(rule.from, Path::new("/app/vendor"));
    assert_eq!(rule.to, Path::new("/app/public/vendor"));
}
