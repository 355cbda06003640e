//! The seam between the orchestrator and a concrete bundler.
//!
//! An engine turns a composed [`BuildConfiguration`] into a [`Bundler`]. A
//! bundler either builds once to disk or starts a development server whose
//! request interceptor and upgrade handler get attached to the host.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::Request;
use axum::response::Response;
use shipwright_config::BuildConfiguration;

use crate::error::EngineError;

/// Outcome of a request offered to an interceptor or upgrade handler.
pub enum Intercept {
    /// The request was handled; the host sends this response.
    Respond(Response),
    /// Not ours; the request continues down the host's chain.
    Forward(Request),
}

impl std::fmt::Debug for Intercept {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Intercept::Respond(response) => f
                .debug_tuple("Respond")
                .field(&response.status())
                .finish(),
            Intercept::Forward(request) => f.debug_tuple("Forward").field(request.uri()).finish(),
        }
    }
}

/// Request-interception function registered ahead of the host's routes.
#[async_trait]
pub trait RequestInterceptor: Send + Sync {
    async fn intercept(&self, request: Request) -> Intercept;
}

/// Protocol-upgrade handler (live reload sockets).
#[async_trait]
pub trait UpgradeHandler: Send + Sync {
    async fn upgrade(&self, request: Request) -> Intercept;
}

/// A running development server.
#[async_trait]
pub trait DevServerHandle: Send + Sync {
    fn middleware(&self) -> Arc<dyn RequestInterceptor>;

    fn upgrade_handler(&self) -> Arc<dyn UpgradeHandler>;

    /// Completes startup once the host is accepting connections.
    async fn after_listen(&self) -> Result<(), EngineError>;

    /// Releases watchers, sockets and timers. Calling it twice is harmless.
    async fn close(&self) -> Result<(), EngineError>;
}

/// Summary of a finished production build.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// Public URLs of every emitted file.
    pub files: Vec<String>,
    pub duration: Duration,
}

/// A configured bundler instance.
#[async_trait]
pub trait Bundler: Send + Sync {
    async fn build(&self) -> Result<BuildReport, EngineError>;

    async fn create_dev_server(&self) -> Result<Arc<dyn DevServerHandle>, EngineError>;
}

/// Factory for [`Bundler`]s.
#[async_trait]
pub trait BundlerEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn create(&self, config: BuildConfiguration) -> Result<Box<dyn Bundler>, EngineError>;
}
