//! Lifecycle-managed bundler integration for axum hosts.
//!
//! shipwright sits between a host web application and a frontend bundler:
//!
//! - composes the bundler configuration from fixed defaults plus overrides
//!   ([`shipwright_config`])
//! - builds once in production, or runs a dev server attached in front of
//!   the host's routes in development ([`Shipwright`])
//! - renders `<script>`/`<link>` tags from the build manifest for templates
//!   ([`TagGenerator`], [`ViewLocals`])
//!
//! Bundler failures never take the host down; they are logged and the host
//! keeps serving without bundled assets.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use axum::{Router, routing::get};
//! use shipwright::{AxumHost, HostContext, HostServer, Shipwright, StaticEngine};
//!
//! # async fn run() -> shipwright::Result<()> {
//! let http = AxumHost::new();
//! let ctx = HostContext::new("/srv/app", Arc::new(http.clone())).with_port(3000);
//! let hooks = ctx.hooks.clone();
//!
//! let lifecycle = Shipwright::new(StaticEngine::new()).initialize(ctx).await?;
//! let app = Router::new()
//!     .route("/", get(|| async { "hello" }))
//!     .fallback_service(lifecycle.static_files());
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//! HostServer::new(app, http, hooks)
//!     .run(listener, shipwright::host::ctrl_c())
//!     .await
//! # }
//! ```

pub mod bridge;
pub mod copy;
pub mod engine;
pub mod error;
pub mod host;
pub mod http;
pub mod logger;
pub mod manifest;
pub mod mode;
pub mod orchestrator;
pub mod state;
pub mod static_engine;
pub mod tags;
pub mod views;

pub use bridge::DevServerBridge;
pub use engine::{
    BuildReport, Bundler, BundlerEngine, DevServerHandle, Intercept, RequestInterceptor,
    UpgradeHandler,
};
pub use error::{
    BridgeError, CopyError, EngineError, ManifestError, Result, ShipwrightError, Stage,
};
pub use host::{HostContext, HostServer, HostSignal, LifecycleHooks};
pub use http::{AxumHost, HttpHost};
pub use manifest::{AssetKind, Manifest, resolve_manifest};
pub use mode::BuildMode;
pub use orchestrator::{LifecycleHandle, LifecycleOptions, Shipwright};
pub use state::{LifecycleState, Phase};
pub use static_engine::StaticEngine;
pub use tags::TagGenerator;
pub use views::ViewLocals;

pub use shipwright_config as config;
