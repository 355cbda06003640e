//! Test doubles: an engine that records what the orchestrator asks of it and
//! a dev server that counts the handles it holds.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::IntoResponse;
use parking_lot::Mutex;
use shipwright::config::BuildConfiguration;
use shipwright::{
    BuildReport, Bundler, BundlerEngine, DevServerHandle, EngineError, Intercept,
    RequestInterceptor, UpgradeHandler,
};

pub const FAKE_ASSET_PATH: &str = "/__fake/asset.js";
pub const FAKE_ASSET_BODY: &str = "fake asset";

#[derive(Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn position(&self, event: &str) -> Option<usize> {
        self.0.lock().iter().position(|e| e == event)
    }
}

#[derive(Clone, Default)]
pub struct Behavior {
    pub fail_create: bool,
    pub create_delay: Option<Duration>,
    pub fail_build: bool,
    pub fail_dev_server: bool,
}

pub struct RecordingEngine {
    pub log: EventLog,
    pub behavior: Behavior,
    pub configs: Arc<Mutex<Vec<BuildConfiguration>>>,
    pub server: Arc<FakeDevServer>,
}

impl RecordingEngine {
    pub fn new(behavior: Behavior) -> Self {
        let log = EventLog::default();
        Self {
            server: Arc::new(FakeDevServer::new(log.clone())),
            log,
            behavior,
            configs: Arc::default(),
        }
    }
}

#[async_trait]
impl BundlerEngine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    async fn create(&self, config: BuildConfiguration) -> Result<Box<dyn Bundler>, EngineError> {
        self.log.push("create");
        self.configs.lock().push(config);
        if let Some(delay) = self.behavior.create_delay {
            tokio::time::sleep(delay).await;
        }
        if self.behavior.fail_create {
            return Err(EngineError::InvalidConfig("rejected by test engine".into()));
        }
        Ok(Box::new(RecordingBundler {
            log: self.log.clone(),
            behavior: self.behavior.clone(),
            server: self.server.clone(),
        }))
    }
}

struct RecordingBundler {
    log: EventLog,
    behavior: Behavior,
    server: Arc<FakeDevServer>,
}

#[async_trait]
impl Bundler for RecordingBundler {
    async fn build(&self) -> Result<BuildReport, EngineError> {
        self.log.push("build");
        if self.behavior.fail_build {
            return Err(EngineError::Custom("syntax error in app.js".into()));
        }
        Ok(BuildReport {
            files: vec!["/js/app.js".into()],
            duration: Duration::from_millis(1),
        })
    }

    async fn create_dev_server(&self) -> Result<Arc<dyn DevServerHandle>, EngineError> {
        self.log.push("dev_server");
        if self.behavior.fail_dev_server {
            return Err(EngineError::Custom("port in use".into()));
        }
        Ok(self.server.clone())
    }
}

/// Dev server double. `after_listen` opens one simulated watcher handle;
/// `close` releases everything.
pub struct FakeDevServer {
    log: EventLog,
    open: Arc<AtomicUsize>,
    closes: AtomicUsize,
}

impl FakeDevServer {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            open: Arc::new(AtomicUsize::new(0)),
            closes: AtomicUsize::new(0),
        }
    }

    pub fn open_handles(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    pub fn close_count(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DevServerHandle for FakeDevServer {
    fn middleware(&self) -> Arc<dyn RequestInterceptor> {
        self.log.push("middleware");
        Arc::new(FakeAssets)
    }

    fn upgrade_handler(&self) -> Arc<dyn UpgradeHandler> {
        self.log.push("upgrade_handler");
        Arc::new(ForwardUpgrades)
    }

    async fn after_listen(&self) -> Result<(), EngineError> {
        self.log.push("after_listen");
        self.open.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.log.push("close");
        self.closes.fetch_add(1, Ordering::SeqCst);
        self.open.store(0, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeAssets;

#[async_trait]
impl RequestInterceptor for FakeAssets {
    async fn intercept(&self, request: Request) -> Intercept {
        if request.uri().path() == FAKE_ASSET_PATH {
            Intercept::Respond(FAKE_ASSET_BODY.into_response())
        } else {
            Intercept::Forward(request)
        }
    }
}

struct ForwardUpgrades;

#[async_trait]
impl UpgradeHandler for ForwardUpgrades {
    async fn upgrade(&self, request: Request) -> Intercept {
        Intercept::Forward(request)
    }
}

/// Minimal application tree: `assets/js/app.js` plus an image.
pub fn write_app(root: &Path) {
    let assets = root.join("assets");
    std::fs::create_dir_all(assets.join("js")).unwrap();
    std::fs::create_dir_all(assets.join("images")).unwrap();
    std::fs::write(assets.join("js/app.js"), "console.log('hello from app')").unwrap();
    std::fs::write(assets.join("images/logo.png"), [137, 80, 78, 71]).unwrap();
}
