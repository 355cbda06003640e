//! Tests for override file discovery and environment layering.

use serial_test::serial;
use shipwright_config::{ChunkStrategy, ConfigError, OverrideDiscovery, WriteToDisk, compose};
use std::env;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn clear_env() {
    for key in [
        "SHIPWRIGHT_CHUNK_SPLIT__STRATEGY",
        "SHIPWRIGHT_SERVER__PORT",
        "SHIPWRIGHT_ENV",
    ] {
        // SAFETY: tests touching the environment are serialized.
        unsafe { env::remove_var(key) };
    }
}

#[test]
#[serial]
fn discovers_shipwright_toml() {
    clear_env();
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("shipwright.toml"),
        r##"
html_plugin = true

[source.aliases]
"#lib" = "assets/lib"

[chunk_split]
strategy = "split-by-module"

[[copy]]
from = "assets/media"
to = ".tmp/public/media"
"##,
    )
    .unwrap();

    let discovery = OverrideDiscovery::new(dir.path());
    assert_eq!(
        discovery.find().unwrap().file_name().unwrap(),
        "shipwright.toml"
    );

    let partial = discovery.load().unwrap();
    assert_eq!(partial.html_plugin, Some(true));
    assert_eq!(
        partial.chunk_split.as_ref().unwrap().strategy,
        ChunkStrategy::SplitByModule
    );

    let config = compose(dir.path(), None, &partial).unwrap();
    assert_eq!(config.copy.len(), 5);
    assert_eq!(config.copy[4].from, dir.path().join("assets/media"));
    assert_eq!(config.source.aliases["#lib"], dir.path().join("assets/lib"));
}

#[test]
#[serial]
fn discovers_package_json_field() {
    clear_env();
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{
  "name": "site",
  "shipwright": {
    "dev": { "write_to_disk": true },
    "output": { "filename_hash": false }
  }
}"#,
    )
    .unwrap();

    let partial = OverrideDiscovery::new(dir.path()).load().unwrap();
    assert_eq!(
        partial.dev.unwrap().write_to_disk,
        Some(WriteToDisk::Bool(true))
    );
    assert_eq!(partial.output.unwrap().filename_hash, Some(false));
}

#[test]
#[serial]
fn environment_beats_file() {
    clear_env();
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("shipwright.toml"),
        "[chunk_split]\nstrategy = \"split-by-module\"\n",
    )
    .unwrap();

    // SAFETY: tests touching the environment are serialized.
    unsafe {
        env::set_var("SHIPWRIGHT_CHUNK_SPLIT__STRATEGY", "all-in-one");
        env::set_var("SHIPWRIGHT_SERVER__PORT", "4000");
        env::set_var("SHIPWRIGHT_ENV", "production");
    }

    let result = OverrideDiscovery::new(dir.path()).load();
    clear_env();

    let partial = result.unwrap();
    assert_eq!(partial.chunk_split.unwrap().strategy, ChunkStrategy::AllInOne);
    assert_eq!(partial.server.unwrap().port, Some(4000));
}

#[test]
#[serial]
fn malformed_file_reports_path() {
    clear_env();
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("shipwright.toml"),
        "[chunk_split]\nstrategy = \"sometimes\"\n",
    )
    .unwrap();

    let err = OverrideDiscovery::new(dir.path()).load().unwrap_err();
    match err {
        ConfigError::InvalidValue { field, .. } => {
            assert!(PathBuf::from(field).ends_with("shipwright.toml"));
        }
        other => panic!("expected InvalidValue, got {other:?}"),
    }
}
