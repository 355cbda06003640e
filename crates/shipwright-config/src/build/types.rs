use serde::{Deserialize, Serialize};

/// How the bundler splits output bundles into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkStrategy {
    /// Split vendor code into a few long-lived chunks (default)
    #[default]
    SplitByExperience,
    /// One chunk per npm package
    SplitByModule,
    /// All third-party code in a single vendor chunk
    SingleVendor,
    /// No splitting at all
    AllInOne,
    /// Leave splitting entirely to engine-specific options
    Custom,
}

impl ChunkStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChunkStrategy::SplitByExperience => "split-by-experience",
            ChunkStrategy::SplitByModule => "split-by-module",
            ChunkStrategy::SingleVendor => "single-vendor",
            ChunkStrategy::AllInOne => "all-in-one",
            ChunkStrategy::Custom => "custom",
        }
    }
}

/// Chunk splitting policy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChunkSplit {
    #[serde(default)]
    pub strategy: ChunkStrategy,
}
