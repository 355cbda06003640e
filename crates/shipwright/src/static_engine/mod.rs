//! A dependency-free bundler engine.
//!
//! Entries are emitted without transformation, content-hashed with blake3,
//! and described by a manifest. In development the output is served from
//! memory and browsers reload after each rebuild. Useful on its own for
//! hosts whose assets need no compilation, and as the reference engine in
//! tests.

pub mod builder;
pub mod cache;
pub mod server;
pub mod watcher;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use shipwright_config::BuildConfiguration;
use tracing::debug;

pub use builder::{Compilation, OutputFile, build_to_disk, compile, content_hash};
pub use cache::{BuildStatus, BundleCache, CachedFile};
pub use server::{CLIENT_SCRIPT_PATH, LIVE_RELOAD_PATH, LiveEvent, StaticDevServer};
pub use watcher::{FileChange, FileWatcher};

use crate::engine::{BuildReport, Bundler, BundlerEngine, DevServerHandle};
use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct StaticEngine {
    debounce: Duration,
}

impl Default for StaticEngine {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
        }
    }
}

impl StaticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Quiet period after a source change before rebuilding.
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

#[async_trait]
impl BundlerEngine for StaticEngine {
    fn name(&self) -> &str {
        "static"
    }

    async fn create(&self, config: BuildConfiguration) -> Result<Box<dyn Bundler>, EngineError> {
        if config.source.entries.is_empty() {
            return Err(EngineError::InvalidConfig("no entries to bundle".into()));
        }
        debug!(
            entries = config.source.entries.len(),
            strategy = config.chunk_split.strategy.as_str(),
            "static bundler created"
        );
        Ok(Box::new(StaticBundler {
            config: Arc::new(config),
            debounce: self.debounce,
        }))
    }
}

pub struct StaticBundler {
    config: Arc<BuildConfiguration>,
    debounce: Duration,
}

#[async_trait]
impl Bundler for StaticBundler {
    async fn build(&self) -> Result<BuildReport, EngineError> {
        let config = self.config.clone();
        tokio::task::spawn_blocking(move || build_to_disk(&config))
            .await
            .map_err(|err| EngineError::Custom(format!("build task failed: {err}")))?
    }

    async fn create_dev_server(&self) -> Result<Arc<dyn DevServerHandle>, EngineError> {
        let server = StaticDevServer::start(self.config.clone(), self.debounce).await;
        Ok(Arc::new(server))
    }
}
