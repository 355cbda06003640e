//! Source watcher with per-path debouncing.
//!
//! Watches every source root recursively and reports relevant changes on a
//! channel. Hidden paths and anything under an excluded directory (the build
//! output) are dropped so the engine never reacts to its own writes.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Modified(PathBuf),
    Created(PathBuf),
    Removed(PathBuf),
}

impl FileChange {
    pub fn path(&self) -> &Path {
        match self {
            FileChange::Modified(p) | FileChange::Created(p) | FileChange::Removed(p) => p,
        }
    }
}

/// Keeps the underlying notify watcher alive; dropping it stops watching.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    roots: Vec<PathBuf>,
}

impl FileWatcher {
    /// Watch the existing directories among `roots`.
    pub fn new(
        roots: Vec<PathBuf>,
        excluded: Vec<PathBuf>,
        debounce: Duration,
    ) -> Result<(Self, mpsc::Receiver<FileChange>), EngineError> {
        let roots: Vec<PathBuf> = roots
            .into_iter()
            .filter(|root| root.is_dir())
            .map(|root| root.canonicalize().unwrap_or(root))
            .collect();
        let excluded: Vec<PathBuf> = excluded
            .into_iter()
            .map(|dir| dir.canonicalize().unwrap_or(dir))
            .collect();

        let (tx, rx) = mpsc::channel(100);
        let mut last_event: Option<(PathBuf, Instant)> = None;
        let watched = roots.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let Ok(event) = res else { return };
            for path in &event.paths {
                if Self::should_ignore(path, &watched, &excluded) {
                    continue;
                }

                let now = Instant::now();
                if let Some((last_path, last_time)) = &last_event {
                    if last_path == path && now.duration_since(*last_time) < debounce {
                        continue;
                    }
                }
                last_event = Some((path.clone(), now));

                let change = match event.kind {
                    EventKind::Create(_) => FileChange::Created(path.clone()),
                    EventKind::Modify(_) => FileChange::Modified(path.clone()),
                    EventKind::Remove(_) => FileChange::Removed(path.clone()),
                    _ => continue,
                };
                trace!(path = %path.display(), "source change");
                // A full channel already guarantees a pending rebuild.
                let _ = tx.try_send(change);
            }
        })?;

        for root in &roots {
            watcher.watch(root, RecursiveMode::Recursive)?;
        }
        debug!(roots = roots.len(), "watching sources");

        Ok((
            Self {
                _watcher: watcher,
                roots,
            },
            rx,
        ))
    }

    fn should_ignore(path: &Path, roots: &[PathBuf], excluded: &[PathBuf]) -> bool {
        if excluded.iter().any(|dir| path.starts_with(dir)) {
            return true;
        }
        let Some(root) = roots.iter().find(|root| path.starts_with(root)) else {
            return true;
        };
        let Ok(relative) = path.strip_prefix(root) else {
            return true;
        };

        relative.components().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| name.starts_with('.') && name != "." && name != "..")
        })
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }
}
