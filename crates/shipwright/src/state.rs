//! Lifecycle state shared between the orchestrator and its hooks.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;

use crate::engine::DevServerHandle;
use crate::error::Stage;
use crate::mode::BuildMode;

/// Where the lifecycle currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Nothing has run yet.
    Start,
    Composing,
    Creating,
    Building { started_at: Instant },
    /// Dev server created and waiting for (or attached to) the host.
    Serving,
    /// Production build finished.
    Built { duration_ms: u64 },
    /// A stage failed; the host keeps running without bundled assets.
    Failed { stage: Stage, error: String },
    ShutDown,
}

impl Phase {
    pub fn is_failed(&self) -> bool {
        matches!(self, Phase::Failed { .. })
    }

    pub fn is_shut_down(&self) -> bool {
        matches!(self, Phase::ShutDown)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Phase::Failed { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Per-initialization state. Owns the dev server handle, if any.
pub struct LifecycleState {
    pub mode: BuildMode,
    pub app_path: PathBuf,
    pub port: Option<u16>,
    phase: Phase,
    dev_server: Option<Arc<dyn DevServerHandle>>,
}

impl LifecycleState {
    pub fn new(mode: BuildMode, app_path: PathBuf, port: Option<u16>) -> Self {
        Self {
            mode,
            app_path,
            port,
            phase: Phase::Start,
            dev_server: None,
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
    }

    pub fn fail(&mut self, stage: Stage, error: impl ToString) {
        self.phase = Phase::Failed {
            stage,
            error: error.to_string(),
        };
    }

    pub fn has_dev_server(&self) -> bool {
        self.dev_server.is_some()
    }

    pub(crate) fn store_dev_server(&mut self, handle: Arc<dyn DevServerHandle>) {
        self.dev_server = Some(handle);
    }

    /// Mark the lifecycle shut down and hand back the dev server, once.
    pub(crate) fn begin_shutdown(&mut self) -> Option<Option<Arc<dyn DevServerHandle>>> {
        if self.phase.is_shut_down() {
            return None;
        }
        self.phase = Phase::ShutDown;
        Some(self.dev_server.take())
    }
}

pub type SharedState = Arc<RwLock<LifecycleState>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_records_stage_and_message() {
        let mut state = LifecycleState::new(BuildMode::Production, PathBuf::from("/app"), None);
        assert_eq!(state.phase(), &Phase::Start);

        state.fail(Stage::Building, "entry missing");
        assert!(state.phase().is_failed());
        assert_eq!(state.phase().error(), Some("entry missing"));
    }

    #[test]
    fn shutdown_happens_once() {
        let mut state =
            LifecycleState::new(BuildMode::Development, PathBuf::from("/app"), Some(3000));
        assert!(matches!(state.begin_shutdown(), Some(None)));
        assert!(state.begin_shutdown().is_none());
        assert!(state.phase().is_shut_down());
    }
}
