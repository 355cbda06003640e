//! Attaching a dev server to the host's HTTP server and detaching it again.

use std::sync::{Arc, Weak};

use tracing::{debug, info};

use crate::engine::DevServerHandle;
use crate::error::{BridgeError, EngineError};
use crate::http::HttpHost;

/// Register the dev server's interceptor ahead of the host's own routes, then
/// its upgrade handler.
///
/// Must run before the host accepts connections so no early request misses
/// the interceptor.
pub fn attach(handle: &dyn DevServerHandle, http: &dyn HttpHost) -> Result<(), BridgeError> {
    http.prepend_middleware(handle.middleware())?;
    http.on_upgrade(handle.upgrade_handler())?;
    info!("dev server attached to host");
    Ok(())
}

/// Close the dev server. Must complete before the host's listener closes.
pub async fn detach(handle: &dyn DevServerHandle) -> Result<(), EngineError> {
    handle.close().await?;
    info!("dev server detached");
    Ok(())
}

/// Non-owning view of a dev server for lifecycle hooks.
///
/// The lifecycle state owns the handle; once it releases it every call here
/// reports [`BridgeError::Released`] instead of touching a dead server.
#[derive(Clone)]
pub struct DevServerBridge {
    handle: Weak<dyn DevServerHandle>,
}

impl DevServerBridge {
    pub fn new(handle: &Arc<dyn DevServerHandle>) -> Self {
        Self {
            handle: Arc::downgrade(handle),
        }
    }

    pub fn is_available(&self) -> bool {
        self.handle.strong_count() > 0
    }

    pub fn attach(&self, http: &dyn HttpHost) -> Result<(), BridgeError> {
        let handle = self.handle.upgrade().ok_or(BridgeError::Released)?;
        attach(handle.as_ref(), http)
    }

    pub async fn after_listen(&self) -> Result<(), EngineError> {
        match self.handle.upgrade() {
            Some(handle) => handle.after_listen().await,
            None => {
                debug!("dev server released before the host lifted");
                Ok(())
            }
        }
    }
}
