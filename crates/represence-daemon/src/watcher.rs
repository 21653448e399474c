//! File watchers for the reference host: the settings file and the
//! workspace directory whose most recently touched file plays the role of
//! the active editor.

use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, error, info};

use crate::error::{DaemonError, Result};

const CONFIG_DEBOUNCE_DURATION: Duration = Duration::from_millis(500);

/// Directory names never reported as workspace changes
const IGNORED_DIRS: &[&str] = &["target", "node_modules"];

/// Keeps a watcher alive; dropping it stops the notifications.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher").finish_non_exhaustive()
    }
}

/// A file in the watched workspace changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceChange {
    /// Created or written
    Modified(PathBuf),
    Removed(PathBuf),
}

impl WorkspaceChange {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            WorkspaceChange::Modified(path) | WorkspaceChange::Removed(path) => path,
        }
    }
}

/// Notify `tx` whenever `config_path` is created or modified.
///
/// Watches the parent directory so that editors which replace the file
/// instead of writing it in place are still seen. Bursts of events within
/// the debounce window collapse into one notification.
///
/// # Errors
///
/// Returns an error if the path has no parent or the watcher cannot be set up.
pub fn watch_config(config_path: &Path, tx: UnboundedSender<()>) -> Result<FileWatcher> {
    let parent = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| {
            DaemonError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Invalid config path",
            ))
        })?;

    let file_name = config_path.file_name().map(ToOwned::to_owned);
    let debounce = Mutex::new(None::<Instant>);

    let mut watcher =
        notify::recommended_watcher(move |result: notify::Result<notify::Event>| match result {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    return;
                }
                if !event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == file_name.as_deref())
                {
                    return;
                }

                let Ok(mut last_event) = debounce.lock() else {
                    error!("[config_watcher] Debounce mutex poisoned, skipping event");
                    return;
                };
                let now = Instant::now();
                if last_event.is_some_and(|last| now.duration_since(last) <= CONFIG_DEBOUNCE_DURATION)
                {
                    return;
                }
                *last_event = Some(now);

                debug!("Config file changed, sending reload notification");
                let _ = tx.send(());
            }
            Err(e) => error!("Watcher error: {}", e),
        })?;

    watcher.watch(parent, RecursiveMode::NonRecursive)?;
    info!("Watching config directory: {:?}", parent);

    Ok(FileWatcher { _watcher: watcher })
}

/// Report file changes under `dir` to `tx`, skipping hidden entries and
/// build output directories.
///
/// # Errors
///
/// Returns an error if the directory cannot be watched.
pub fn watch_workspace(dir: &Path, tx: UnboundedSender<WorkspaceChange>) -> Result<FileWatcher> {
    let root = dir.to_path_buf();

    let mut watcher =
        notify::recommended_watcher(move |result: notify::Result<notify::Event>| match result {
            Ok(event) => {
                for path in event.paths {
                    if is_ignored(&root, &path) {
                        continue;
                    }
                    let change = match event.kind {
                        EventKind::Create(_) | EventKind::Modify(_) => {
                            WorkspaceChange::Modified(path)
                        }
                        EventKind::Remove(_) => WorkspaceChange::Removed(path),
                        _ => continue,
                    };
                    if tx.send(change).is_err() {
                        return;
                    }
                }
            }
            Err(e) => error!("Watcher error: {}", e),
        })?;

    watcher.watch(dir, RecursiveMode::Recursive)?;
    info!("Watching workspace directory: {:?}", dir);

    Ok(FileWatcher { _watcher: watcher })
}

fn is_ignored(root: &Path, path: &Path) -> bool {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.components().any(|component| match component {
        Component::Normal(name) => {
            let name = name.to_string_lossy();
            name.starts_with('.') || IGNORED_DIRS.contains(&name.as_ref())
        }
        _ => false,
    })
}
