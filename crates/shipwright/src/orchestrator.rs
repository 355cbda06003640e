//! Lifecycle orchestration.
//!
//! [`Shipwright::initialize`] composes the configuration, creates the
//! bundler, then either builds once (production) or creates a dev server and
//! subscribes the bridge to the host's signals (development). Engine failures
//! and timeouts are logged and recorded on the returned handle; the host
//! keeps running without bundled assets.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use shipwright_config::{BuildConfiguration, compose};
use tower_http::services::ServeDir;
use tracing::{debug, error, info, warn};

use crate::bridge::{self, DevServerBridge};
use crate::engine::{Bundler, BundlerEngine, DevServerHandle};
use crate::error::{EngineError, Result, ShipwrightError, Stage};
use crate::host::{HostContext, HostSignal};
use crate::mode::BuildMode;
use crate::state::{LifecycleState, Phase, SharedState};
use crate::tags::TagGenerator;

/// Deadlines for the asynchronous lifecycle stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleOptions {
    pub creation_timeout: Duration,
    pub build_timeout: Duration,
    /// Applies to dev server creation, startup and close.
    pub dev_server_timeout: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            creation_timeout: Duration::from_secs(60),
            build_timeout: Duration::from_secs(600),
            dev_server_timeout: Duration::from_secs(60),
        }
    }
}

/// Entry point: owns the engine and the stage deadlines.
pub struct Shipwright {
    engine: Arc<dyn BundlerEngine>,
    options: LifecycleOptions,
}

impl Shipwright {
    pub fn new(engine: impl BundlerEngine + 'static) -> Self {
        Self::from_arc(Arc::new(engine))
    }

    pub fn from_arc(engine: Arc<dyn BundlerEngine>) -> Self {
        Self {
            engine,
            options: LifecycleOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LifecycleOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &LifecycleOptions {
        &self.options
    }

    /// Run the lifecycle for one host.
    ///
    /// Only a configuration that fails to compose is returned as an error.
    /// Everything after that degrades: the handle records the failed stage.
    pub async fn initialize(&self, ctx: HostContext) -> Result<LifecycleHandle> {
        info!(
            mode = %ctx.mode,
            engine = self.engine.name(),
            app = %ctx.app_path.display(),
            "initializing asset lifecycle"
        );

        let state: SharedState = Arc::new(RwLock::new(LifecycleState::new(
            ctx.mode,
            ctx.app_path.clone(),
            ctx.port,
        )));
        state.write().set_phase(Phase::Composing);

        let config = match compose(&ctx.app_path, ctx.port, &ctx.overrides) {
            Ok(config) => config,
            Err(err) => {
                error!(error = %err, "invalid build configuration");
                state.write().fail(Stage::Composing, &err);
                return Err(err.into());
            }
        };

        let live = Arc::new(AtomicBool::new(true));
        let handle = LifecycleHandle {
            state,
            tags: TagGenerator::with_liveness(config.output.root.clone(), live.clone()),
            config: Arc::new(config.clone()),
            live,
            close_timeout: self.options.dev_server_timeout,
        };

        if config.output.manifest {
            handle.tags.install(&ctx.views);
        }

        handle.state.write().set_phase(Phase::Creating);
        let bundler = match timed(
            Stage::Creating,
            self.options.creation_timeout,
            self.engine.create(config),
        )
        .await
        {
            Ok(bundler) => bundler,
            Err(err) => {
                handle.record_failure(Stage::Creating, &err);
                return Ok(handle);
            }
        };

        match ctx.mode {
            BuildMode::Production => self.build(bundler.as_ref(), &handle).await,
            BuildMode::Development => self.serve(bundler.as_ref(), &handle, &ctx).await,
        }

        Ok(handle)
    }

    async fn build(&self, bundler: &dyn Bundler, handle: &LifecycleHandle) {
        let started_at = Instant::now();
        handle
            .state
            .write()
            .set_phase(Phase::Building { started_at });

        match timed(Stage::Building, self.options.build_timeout, bundler.build()).await {
            Ok(report) => {
                let duration_ms = started_at.elapsed().as_millis() as u64;
                info!(
                    files = report.files.len(),
                    duration_ms, "production build finished"
                );
                handle.state.write().set_phase(Phase::Built { duration_ms });
            }
            Err(err) => handle.record_failure(Stage::Building, &err),
        }
    }

    async fn serve(&self, bundler: &dyn Bundler, handle: &LifecycleHandle, ctx: &HostContext) {
        let server: Arc<dyn DevServerHandle> = match timed(
            Stage::DevServer,
            self.options.dev_server_timeout,
            bundler.create_dev_server(),
        )
        .await
        {
            Ok(server) => server,
            Err(err) => {
                handle.record_failure(Stage::DevServer, &err);
                return;
            }
        };

        let bridge = DevServerBridge::new(&server);
        {
            let mut state = handle.state.write();
            state.store_dev_server(server);
            state.set_phase(Phase::Serving);
        }

        let http = ctx.http.clone();
        let attach = bridge.clone();
        ctx.hooks.subscribe(HostSignal::HttpLoaded, move || async move {
            attach.attach(http.as_ref())?;
            Ok(())
        });

        let limit = self.options.dev_server_timeout;
        let started = bridge;
        ctx.hooks.subscribe(HostSignal::Lifted, move || async move {
            timed(Stage::AfterListen, limit, started.after_listen()).await?;
            debug!("dev server started");
            Ok(())
        });

        let lowering = handle.clone();
        ctx.hooks.subscribe(HostSignal::Lowering, move || async move {
            lowering.shutdown().await
        });

        debug!("dev server subscribed to host signals");
    }
}

/// What [`Shipwright::initialize`] hands back to the host.
#[derive(Clone)]
pub struct LifecycleHandle {
    state: SharedState,
    tags: TagGenerator,
    config: Arc<BuildConfiguration>,
    live: Arc<AtomicBool>,
    close_timeout: Duration,
}

impl LifecycleHandle {
    pub fn phase(&self) -> Phase {
        self.state.read().phase().clone()
    }

    pub fn mode(&self) -> BuildMode {
        self.state.read().mode
    }

    pub fn state(&self) -> &SharedState {
        &self.state
    }

    pub fn config(&self) -> &BuildConfiguration {
        &self.config
    }

    pub fn tags(&self) -> &TagGenerator {
        &self.tags
    }

    pub fn output_root(&self) -> &Path {
        &self.config.output.root
    }

    pub fn has_dev_server(&self) -> bool {
        self.state.read().has_dev_server()
    }

    /// Static file service over the output root, for production hosts.
    pub fn static_files(&self) -> ServeDir {
        ServeDir::new(self.output_root())
    }

    /// Release the dev server (if any) and silence the tag generator.
    ///
    /// Safe to call more than once; only the first call does anything.
    pub async fn shutdown(&self) -> Result<()> {
        self.live.store(false, Ordering::Release);
        let taken = self.state.write().begin_shutdown();
        let Some(server) = taken else {
            debug!("lifecycle already shut down");
            return Ok(());
        };

        if let Some(server) = server {
            let detach = bridge::detach(server.as_ref());
            let closed = timed(Stage::Closing, self.close_timeout, detach).await;
            if let Err(err) = closed {
                warn!(error = %err, "dev server did not close cleanly");
                return Err(err);
            }
        }
        info!("asset lifecycle shut down");
        Ok(())
    }

    fn record_failure(&self, stage: Stage, err: &ShipwrightError) {
        error!(
            %stage,
            error = %err,
            "asset lifecycle stage failed; continuing without bundled assets"
        );
        self.state.write().fail(stage, err);
    }
}

async fn timed<T, F>(stage: Stage, limit: Duration, future: F) -> Result<T>
where
    F: Future<Output = std::result::Result<T, EngineError>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(stage.wrap(err)),
        Err(_) => Err(ShipwrightError::Timeout { stage, after: limit }),
    }
}
