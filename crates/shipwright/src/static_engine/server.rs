//! Dev server for the static engine.
//!
//! Compiled output lives in a [`BundleCache`] and is served by an interceptor
//! sitting in front of the host's routes. Browsers connect to
//! [`LIVE_RELOAD_PATH`] over a WebSocket and receive a `reload` event after
//! every successful rebuild triggered by the source watcher.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Body;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRequestParts, Request};
use axum::http::Method;
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use shipwright_config::BuildConfiguration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::builder::{compile, write_file};
use super::cache::{BuildStatus, BundleCache, CachedFile};
use super::watcher::{FileChange, FileWatcher};
use crate::engine::{DevServerHandle, Intercept, RequestInterceptor, UpgradeHandler};
use crate::error::EngineError;

pub const LIVE_RELOAD_PATH: &str = "/__shipwright/ws";
pub const CLIENT_SCRIPT_PATH: &str = "/__shipwright/client.js";

const CLIENT_SCRIPT: &str = r#"(() => {
  const proto = location.protocol === "https:" ? "wss:" : "ws:";
  const connect = () => {
    const socket = new WebSocket(`${proto}//${location.host}/__shipwright/ws`);
    socket.addEventListener("message", (event) => {
      const data = JSON.parse(event.data);
      if (data.type === "reload") location.reload();
      if (data.type === "build-failed") console.error("[shipwright]", data.error);
    });
    socket.addEventListener("close", () => setTimeout(connect, 1000));
  };
  connect();
})();
"#;

/// Messages pushed to live-reload clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LiveEvent {
    Connected,
    Reload,
    BuildFailed { error: String },
}

impl LiveEvent {
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

struct WatchSession {
    _watcher: FileWatcher,
    task: JoinHandle<()>,
}

struct DevState {
    config: Arc<BuildConfiguration>,
    debounce: Duration,
    status: RwLock<BuildStatus>,
    cache: RwLock<BundleCache>,
    clients: RwLock<HashMap<usize, mpsc::Sender<String>>>,
    next_client_id: AtomicUsize,
    closed: AtomicBool,
    session: Mutex<Option<WatchSession>>,
}

impl DevState {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Compile into a fresh cache and persist what the write filter admits.
    fn recompile(&self) -> Result<u64, EngineError> {
        let started_at = Instant::now();
        *self.status.write() = BuildStatus::InProgress { started_at };

        match self.compile_cache() {
            Ok(cache) => {
                let files = cache.len();
                *self.cache.write() = cache;
                let duration_ms = started_at.elapsed().as_millis() as u64;
                *self.status.write() = BuildStatus::Success { duration_ms };
                debug!(files, duration_ms, "dev compile finished");
                Ok(duration_ms)
            }
            Err(err) => {
                *self.status.write() = BuildStatus::Failed {
                    error: err.to_string(),
                };
                Err(err)
            }
        }
    }

    fn compile_cache(&self) -> Result<BundleCache, EngineError> {
        let mut compilation = compile(&self.config)?;
        compilation.manifest.push(CLIENT_SCRIPT_PATH);

        let cache = compilation.to_cache(&self.config.output)?;
        compilation.copy_external()?;
        let filter = &self.config.dev.write_to_disk;
        for (_, file) in cache.iter() {
            if filter.allows(&file.disk_path.to_string_lossy()) {
                write_file(&file.disk_path, &file.contents)?;
            }
        }
        Ok(cache)
    }

    fn cached(&self, url: &str) -> Option<CachedFile> {
        self.cache.read().get(url).cloned()
    }

    fn register_client(&self) -> Option<(usize, mpsc::Receiver<String>)> {
        if self.is_closed() {
            return None;
        }
        let id = self.next_client_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(100);
        self.clients.write().insert(id, tx);
        Some((id, rx))
    }

    fn unregister_client(&self, id: usize) {
        self.clients.write().remove(&id);
    }

    async fn broadcast(&self, event: &LiveEvent) {
        let json = event.to_json();
        let clients = self.clients.read().clone();

        let mut failed = Vec::new();
        for (id, tx) in clients {
            if tx.send(json.clone()).await.is_err() {
                failed.push(id);
            }
        }
        for id in failed {
            self.unregister_client(id);
        }
    }
}

/// Handle to the static engine's dev server.
#[derive(Clone)]
pub struct StaticDevServer {
    state: Arc<DevState>,
}

impl StaticDevServer {
    /// Create the server and run the first compile.
    ///
    /// A failing first compile is logged and recorded in [`Self::status`];
    /// the watcher retries after the next source change.
    pub async fn start(config: Arc<BuildConfiguration>, debounce: Duration) -> Self {
        let server = Self {
            state: Arc::new(DevState {
                config,
                debounce,
                status: RwLock::new(BuildStatus::NotStarted),
                cache: RwLock::new(BundleCache::new()),
                clients: RwLock::new(HashMap::new()),
                next_client_id: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
                session: Mutex::new(None),
            }),
        };
        if let Err(err) = server.recompile().await {
            warn!(error = %err, "initial dev compile failed");
        }
        server
    }

    pub fn status(&self) -> BuildStatus {
        self.state.status.read().clone()
    }

    pub fn cached(&self, url: &str) -> Option<CachedFile> {
        self.state.cached(url)
    }

    pub fn client_count(&self) -> usize {
        self.state.clients.read().len()
    }

    pub fn is_watching(&self) -> bool {
        self.state.session.lock().is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_closed()
    }

    /// Watchers and sockets still held. Zero after [`DevServerHandle::close`].
    pub fn open_handles(&self) -> usize {
        usize::from(self.is_watching()) + self.client_count()
    }

    /// Recompile on the blocking pool.
    pub async fn recompile(&self) -> Result<u64, EngineError> {
        let state = self.state.clone();
        tokio::task::spawn_blocking(move || state.recompile())
            .await
            .map_err(|err| EngineError::Custom(format!("compile task failed: {err}")))?
    }

    pub async fn broadcast(&self, event: &LiveEvent) {
        self.state.broadcast(event).await;
    }

    async fn watch(self, mut changes: mpsc::Receiver<FileChange>) {
        while let Some(change) = changes.recv().await {
            tokio::time::sleep(self.state.debounce).await;
            let mut batched = 1;
            while changes.try_recv().is_ok() {
                batched += 1;
            }
            if self.is_closed() {
                break;
            }
            info!(path = %change.path().display(), batched, "sources changed, rebuilding");

            match self.recompile().await {
                Ok(_) => self.broadcast(&LiveEvent::Reload).await,
                Err(err) => {
                    error!(error = %err, "rebuild failed");
                    self.broadcast(&LiveEvent::BuildFailed {
                        error: err.to_string(),
                    })
                    .await;
                }
            }
        }
        debug!("watch loop stopped");
    }
}

#[async_trait]
impl DevServerHandle for StaticDevServer {
    fn middleware(&self) -> Arc<dyn RequestInterceptor> {
        Arc::new(AssetInterceptor {
            state: self.state.clone(),
        })
    }

    fn upgrade_handler(&self) -> Arc<dyn UpgradeHandler> {
        Arc::new(LiveReload {
            state: self.state.clone(),
        })
    }

    async fn after_listen(&self) -> Result<(), EngineError> {
        if self.is_closed() {
            return Err(EngineError::Closed);
        }
        let mut session = self.state.session.lock();
        if session.is_some() {
            return Ok(());
        }

        let config = &self.state.config;
        let mut roots: Vec<_> = config
            .source
            .entries
            .values()
            .filter_map(|entry| entry.parent().map(|dir| dir.to_path_buf()))
            .collect();
        roots.extend(config.copy.iter().map(|rule| rule.source_root().to_path_buf()));
        roots.sort();
        roots.dedup();

        let (watcher, changes) = FileWatcher::new(
            roots,
            vec![config.output.root.clone()],
            self.state.debounce,
        )?;
        let task = tokio::spawn(self.clone().watch(changes));
        *session = Some(WatchSession {
            _watcher: watcher,
            task,
        });

        if let Some(server) = config.server.as_ref().filter(|server| server.print_urls) {
            match server.port {
                Some(port) => info!("dev assets served at http://localhost:{port}/"),
                None => info!("dev assets served through the host"),
            }
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), EngineError> {
        if self.state.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(session) = self.state.session.lock().take() {
            session.task.abort();
        }
        self.state.clients.write().clear();
        info!("static dev server closed");
        Ok(())
    }
}

struct AssetInterceptor {
    state: Arc<DevState>,
}

#[async_trait]
impl RequestInterceptor for AssetInterceptor {
    async fn intercept(&self, request: Request) -> Intercept {
        let method = request.method().clone();
        if self.state.is_closed() || (method != Method::GET && method != Method::HEAD) {
            return Intercept::Forward(request);
        }
        let head = method == Method::HEAD;
        let path = request.uri().path();

        if path == CLIENT_SCRIPT_PATH {
            let body = if head { Body::empty() } else { Body::from(CLIENT_SCRIPT) };
            return Intercept::Respond(no_cache("application/javascript", body));
        }

        match self.state.cached(path) {
            Some(file) => {
                let body = if head {
                    Body::empty()
                } else {
                    Body::from(file.contents)
                };
                Intercept::Respond(no_cache(file.content_type, body))
            }
            None => Intercept::Forward(request),
        }
    }
}

fn no_cache(content_type: &'static str, body: Body) -> Response {
    ([(CONTENT_TYPE, content_type), (CACHE_CONTROL, "no-cache")], body).into_response()
}

struct LiveReload {
    state: Arc<DevState>,
}

#[async_trait]
impl UpgradeHandler for LiveReload {
    async fn upgrade(&self, request: Request) -> Intercept {
        if self.state.is_closed() || request.uri().path() != LIVE_RELOAD_PATH {
            return Intercept::Forward(request);
        }

        let (mut parts, _body) = request.into_parts();
        match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
            Ok(ws) => {
                let state = self.state.clone();
                Intercept::Respond(ws.on_upgrade(move |socket| serve_socket(socket, state)))
            }
            Err(rejection) => Intercept::Respond(rejection.into_response()),
        }
    }
}

async fn serve_socket(mut socket: WebSocket, state: Arc<DevState>) {
    let Some((id, mut events)) = state.register_client() else {
        let _ = socket.send(Message::Close(None)).await;
        return;
    };
    debug!(client = id, "live-reload client connected");

    if socket
        .send(Message::Text(LiveEvent::Connected.to_json().into()))
        .await
        .is_ok()
    {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(json) => {
                        if socket.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                incoming = socket.recv() => match incoming {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                },
            }
        }
    }

    state.unregister_client(id);
    let _ = socket.send(Message::Close(None)).await;
    debug!(client = id, "live-reload client disconnected");
}
