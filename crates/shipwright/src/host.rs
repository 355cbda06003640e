//! The host side of the lifecycle: signals, hooks and the serving runtime.
//!
//! A host publishes three [`HostSignal`]s in a fixed order. Hooks subscribed
//! through [`LifecycleHooks`] run sequentially when their signal is emitted,
//! exactly once. [`HostServer`] is a ready-made runtime for axum hosts that
//! emits the signals around `axum::serve`.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::Router;
use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use shipwright_config::{OverrideDiscovery, PartialBuildConfiguration};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::error::{Result, ShipwrightError};
use crate::http::{AxumHost, HttpHost};
use crate::mode::BuildMode;
use crate::views::ViewLocals;

/// Host lifecycle signals, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostSignal {
    /// The HTTP layer exists but is not yet accepting connections.
    HttpLoaded,
    /// The host is fully started and serving.
    Lifted,
    /// The host is shutting down; its listener is still open.
    Lowering,
}

pub type HookFuture = BoxFuture<'static, Result<()>>;
type Hook = Box<dyn FnOnce() -> HookFuture + Send>;

/// Subscriptions to [`HostSignal`]s.
#[derive(Default)]
pub struct LifecycleHooks {
    pending: Mutex<HashMap<HostSignal, Vec<Hook>>>,
    fired: Mutex<HashSet<HostSignal>>,
}

impl LifecycleHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` when `signal` is emitted. Hooks for the same signal run in
    /// subscription order.
    pub fn subscribe<F, Fut>(&self, signal: HostSignal, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        if self.has_fired(signal) {
            warn!(?signal, "subscribed after the signal fired; hook will not run");
        }
        self.pending
            .lock()
            .entry(signal)
            .or_default()
            .push(Box::new(move || hook().boxed()));
    }

    pub fn subscriber_count(&self, signal: HostSignal) -> usize {
        self.pending.lock().get(&signal).map_or(0, Vec::len)
    }

    pub fn has_fired(&self, signal: HostSignal) -> bool {
        self.fired.lock().contains(&signal)
    }

    /// Run every hook subscribed to `signal`, awaiting each before the next.
    ///
    /// A failing hook is logged and does not stop the others; the failures
    /// are returned. Emitting a signal a second time is a no-op.
    pub async fn emit(&self, signal: HostSignal) -> Vec<ShipwrightError> {
        if !self.fired.lock().insert(signal) {
            debug!(?signal, "signal already emitted");
            return Vec::new();
        }
        let hooks = self.pending.lock().remove(&signal).unwrap_or_default();
        debug!(?signal, hooks = hooks.len(), "emitting host signal");

        let mut errors = Vec::new();
        for hook in hooks {
            if let Err(err) = hook().await {
                error!(?signal, error = %err, "lifecycle hook failed");
                errors.push(err);
            }
        }
        errors
    }
}

/// Everything the orchestrator needs from the host.
#[derive(Clone)]
pub struct HostContext {
    /// Application root. Default source paths are resolved beneath it.
    pub app_path: PathBuf,
    /// The host's own listening port, if known.
    pub port: Option<u16>,
    pub mode: BuildMode,
    /// Caller overrides merged over the defaults.
    pub overrides: PartialBuildConfiguration,
    pub http: Arc<dyn HttpHost>,
    pub hooks: Arc<LifecycleHooks>,
    pub views: ViewLocals,
}

impl HostContext {
    /// Context with the mode read from the environment and no overrides.
    pub fn new(app_path: impl Into<PathBuf>, http: Arc<dyn HttpHost>) -> Self {
        Self {
            app_path: app_path.into(),
            port: None,
            mode: BuildMode::from_env(),
            overrides: PartialBuildConfiguration::default(),
            http,
            hooks: Arc::new(LifecycleHooks::new()),
            views: ViewLocals::new(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_mode(mut self, mode: BuildMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_overrides(mut self, overrides: PartialBuildConfiguration) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<LifecycleHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_views(mut self, views: ViewLocals) -> Self {
        self.views = views;
        self
    }

    /// Layer overrides found in `shipwright.toml`, `package.json` and
    /// `SHIPWRIGHT_*` variables under the app root over the current ones.
    pub fn discover_overrides(mut self) -> Result<Self> {
        let discovered = OverrideDiscovery::new(&self.app_path).load()?;
        self.overrides = discovered.layered(&self.overrides);
        Ok(self)
    }

    pub fn app_path(&self) -> &Path {
        &self.app_path
    }
}

/// Serving runtime for axum hosts.
///
/// Emits `HttpLoaded` before the first connection is accepted, `Lifted` once
/// the accept loop runs, and `Lowering` before the listener closes.
pub struct HostServer {
    app: Router,
    http: AxumHost,
    hooks: Arc<LifecycleHooks>,
}

impl HostServer {
    pub fn new(app: Router, http: AxumHost, hooks: Arc<LifecycleHooks>) -> Self {
        Self { app, http, hooks }
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<S>(self, listener: TcpListener, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()> + Send,
    {
        self.hooks.emit(HostSignal::HttpLoaded).await;

        let addr = listener.local_addr()?;
        let router = self.http.wrap(self.app);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    let _ = stop_rx.await;
                })
                .await
        });
        info!(%addr, "host listening");

        self.hooks.emit(HostSignal::Lifted).await;

        shutdown.await;
        info!("host lowering");
        self.hooks.emit(HostSignal::Lowering).await;

        let _ = stop_tx.send(());
        server
            .await
            .map_err(|err| ShipwrightError::Host(err.to_string()))??;
        debug!("host listener closed");
        Ok(())
    }
}

/// Resolves on Ctrl-C.
pub async fn ctrl_c() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for Ctrl-C");
        futures::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn hooks_run_sequentially_in_subscription_order() {
        let hooks = LifecycleHooks::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second"] {
            let log = log.clone();
            hooks.subscribe(HostSignal::Lifted, move || async move {
                tokio::task::yield_now().await;
                log.lock().push(label);
                Ok(())
            });
        }

        assert!(hooks.emit(HostSignal::Lifted).await.is_empty());
        assert_eq!(*log.lock(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn signals_fire_once() {
        let hooks = LifecycleHooks::new();
        let count = Arc::new(AtomicUsize::new(0));
        let counter = count.clone();
        hooks.subscribe(HostSignal::Lowering, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        hooks.emit(HostSignal::Lowering).await;
        hooks.emit(HostSignal::Lowering).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(hooks.has_fired(HostSignal::Lowering));
    }

    #[tokio::test]
    async fn failing_hook_does_not_stop_the_rest() {
        let hooks = LifecycleHooks::new();
        let ran = Arc::new(AtomicUsize::new(0));

        hooks.subscribe(HostSignal::HttpLoaded, || async {
            Err(ShipwrightError::Host("nope".into()))
        });
        let counter = ran.clone();
        hooks.subscribe(HostSignal::HttpLoaded, move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let errors = hooks.emit(HostSignal::HttpLoaded).await;
        assert_eq!(errors.len(), 1);
        assert_eq!(ran.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn subscriber_count_tracks_pending_hooks() {
        let hooks = LifecycleHooks::new();
        assert_eq!(hooks.subscriber_count(HostSignal::Lifted), 0);
        hooks.subscribe(HostSignal::Lifted, || async { Ok(()) });
        assert_eq!(hooks.subscriber_count(HostSignal::Lifted), 1);
    }
}
