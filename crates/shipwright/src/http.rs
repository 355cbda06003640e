//! Host HTTP server capabilities the bridge relies on.
//!
//! [`HttpHost`] is the minimum a host must offer: a way to put an interceptor
//! in front of its own routes and a way to receive protocol upgrades. Both
//! have refusing defaults so hosts without those capabilities surface a
//! [`BridgeError::Unsupported`] instead of silently dropping assets.
//!
//! [`AxumHost`] is the stock implementation for axum routers.

use std::sync::Arc;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::header::{CONNECTION, UPGRADE};
use axum::middleware::{self, Next};
use axum::response::Response;
use parking_lot::RwLock;

use crate::engine::{Intercept, RequestInterceptor, UpgradeHandler};
use crate::error::BridgeError;

pub trait HttpHost: Send + Sync {
    /// Register `middleware` so it sees requests before every previously
    /// registered interceptor and before the host's routes.
    fn prepend_middleware(
        &self,
        middleware: Arc<dyn RequestInterceptor>,
    ) -> Result<(), BridgeError> {
        let _ = middleware;
        Err(BridgeError::Unsupported("middleware registration"))
    }

    /// Register a handler for protocol-upgrade requests.
    fn on_upgrade(&self, handler: Arc<dyn UpgradeHandler>) -> Result<(), BridgeError> {
        let _ = handler;
        Err(BridgeError::Unsupported("protocol upgrades"))
    }
}

#[derive(Default)]
struct Chains {
    middleware: Vec<Arc<dyn RequestInterceptor>>,
    upgrades: Vec<Arc<dyn UpgradeHandler>>,
}

/// Interceptor registry that wraps an axum [`Router`].
///
/// Registration may happen after [`AxumHost::wrap`]; the chains are read per
/// request.
#[derive(Clone, Default)]
pub struct AxumHost {
    chains: Arc<RwLock<Chains>>,
}

impl AxumHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put the interceptor chain in front of `app`.
    pub fn wrap(&self, app: Router) -> Router {
        Router::new()
            .fallback_service(app)
            .layer(middleware::from_fn_with_state(self.clone(), dispatch))
    }

    pub fn middleware_count(&self) -> usize {
        self.chains.read().middleware.len()
    }

    pub fn upgrade_handler_count(&self) -> usize {
        self.chains.read().upgrades.len()
    }
}

impl HttpHost for AxumHost {
    fn prepend_middleware(
        &self,
        middleware: Arc<dyn RequestInterceptor>,
    ) -> Result<(), BridgeError> {
        self.chains.write().middleware.insert(0, middleware);
        Ok(())
    }

    fn on_upgrade(&self, handler: Arc<dyn UpgradeHandler>) -> Result<(), BridgeError> {
        self.chains.write().upgrades.push(handler);
        Ok(())
    }
}

async fn dispatch(State(host): State<AxumHost>, request: Request, next: Next) -> Response {
    let (middleware, upgrades) = {
        let chains = host.chains.read();
        (chains.middleware.clone(), chains.upgrades.clone())
    };

    let mut request = request;
    if is_upgrade_request(&request) {
        for handler in &upgrades {
            match handler.upgrade(request).await {
                Intercept::Respond(response) => return response,
                Intercept::Forward(forwarded) => request = forwarded,
            }
        }
    }

    for interceptor in &middleware {
        match interceptor.intercept(request).await {
            Intercept::Respond(response) => return response,
            Intercept::Forward(forwarded) => request = forwarded,
        }
    }

    next.run(request).await
}

/// `Connection: upgrade` plus an `Upgrade` header.
pub fn is_upgrade_request(request: &Request) -> bool {
    let headers = request.headers();
    let connection_upgrade = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|token| token.trim().eq_ignore_ascii_case("upgrade"));
    connection_upgrade && headers.contains_key(UPGRADE)
}
