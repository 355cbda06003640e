//! Bundler configuration for shipwright.
//!
//! [`compose`] builds the canonical [`BuildConfiguration`] for an application
//! root from fixed defaults, then merges caller overrides on top of it.
//! Overrides are [`PartialBuildConfiguration`] trees, either built in code or
//! discovered from `shipwright.toml` / the environment via [`OverrideDiscovery`].

pub mod build;
pub mod compose;
pub mod discovery;
pub mod error;
pub mod partial;
pub mod validation;

pub use build::*;
pub use compose::{compose, default_configuration};
pub use discovery::OverrideDiscovery;
pub use error::*;
pub use partial::*;
pub use validation::{validate, validate_copy_rules};
