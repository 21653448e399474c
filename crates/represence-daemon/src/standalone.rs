//! Terminal reference host.
//!
//! Plays the editor's role for the `represence-daemon` binary: the most
//! recently written file in the watched workspace is the active document,
//! settings come from a JSON file, and notifications go to the terminal.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use represence_core::config::Settings;
use represence_core::{Document, TextDocument};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::event::EventSink;
use crate::host::{Command, ConfigurationChange, Host, HostEvent, Subscription, Topic};
use crate::watcher::WorkspaceChange;

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    entries: HashMap<u64, (Topic, EventSink)>,
}

pub struct StandaloneHost {
    config_path: PathBuf,
    port_override: Option<u16>,
    settings: RwLock<Settings>,
    active: RwLock<Option<Arc<TextDocument>>>,
    subscribers: Arc<Mutex<Subscribers>>,
    pending_prompt: Mutex<Option<oneshot::Sender<bool>>>,
    reload_tx: mpsc::UnboundedSender<()>,
}

impl StandaloneHost {
    /// Create a host and the receiver signalled on every reload request.
    ///
    /// `port_override` replaces the port from the settings file for the
    /// whole session.
    #[must_use]
    pub fn new(
        config_path: PathBuf,
        settings: Settings,
        port_override: Option<u16>,
    ) -> (Self, mpsc::UnboundedReceiver<()>) {
        let (reload_tx, reload_rx) = mpsc::unbounded_channel();
        let host = Self {
            config_path,
            port_override,
            settings: RwLock::new(settings),
            active: RwLock::new(None),
            subscribers: Arc::new(Mutex::new(Subscribers::default())),
            pending_prompt: Mutex::new(None),
            reload_tx,
        };
        (host, reload_rx)
    }

    /// Number of live subscriptions
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    #[must_use]
    pub fn active_path(&self) -> Option<PathBuf> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|doc| doc.path().to_path_buf())
    }

    /// Replace the active document and report the editor switch.
    pub fn set_active_document(&self, document: Option<TextDocument>) {
        *self.active.write().unwrap_or_else(PoisonError::into_inner) = document.map(Arc::new);
        self.emit(Topic::ActiveEditor, &HostEvent::ActiveEditorChanged);
    }

    /// Fold a workspace file change into the active document.
    ///
    /// A write to the active file is a content change; a write to any other
    /// file makes it the active one. Removing the active file leaves no
    /// document open.
    pub fn apply_workspace_change(&self, change: &WorkspaceChange) {
        let is_active = self.active_path().as_deref() == Some(change.path());

        match change {
            WorkspaceChange::Modified(path) => {
                if !path.is_file() {
                    return;
                }
                let document = match TextDocument::from_path(path.clone()) {
                    Ok(document) => document,
                    Err(e) => {
                        warn!("Failed to read {}: {}", path.display(), e);
                        return;
                    }
                };

                *self.active.write().unwrap_or_else(PoisonError::into_inner) =
                    Some(Arc::new(document));
                if is_active {
                    self.emit(Topic::DocumentContent, &HostEvent::DocumentChanged);
                } else {
                    debug!("Active document: {}", path.display());
                    self.emit(Topic::ActiveEditor, &HostEvent::ActiveEditorChanged);
                }
            }
            WorkspaceChange::Removed(_) if is_active => self.set_active_document(None),
            WorkspaceChange::Removed(_) => {}
        }
    }

    /// Store new settings from the config file and report the keys that
    /// changed. Returns the number of changed keys.
    pub fn update_settings(&self, settings: Settings) -> usize {
        let before = self.settings();
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
        let after = self.settings();

        let keys = before.changed_keys(&after);
        if keys.is_empty() {
            return 0;
        }

        let count = keys.len();
        self.emit(
            Topic::Configuration,
            &HostEvent::ConfigurationChanged(ConfigurationChange::new(keys)),
        );
        count
    }

    /// Run a user command, as if picked from a command palette.
    pub fn invoke(&self, command: Command) {
        self.emit(Topic::Command(command), &HostEvent::Command(command));
    }

    /// Answer the outstanding prompt. Returns `false` if none was showing.
    pub fn answer_prompt(&self, accepted: bool) -> bool {
        let pending = self
            .pending_prompt
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        pending.is_some_and(|tx| tx.send(accepted).is_ok())
    }

    fn emit(&self, topic: Topic, event: &HostEvent) {
        let subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        for (subscribed, sink) in subscribers.entries.values() {
            if *subscribed == topic {
                sink.emit(event.clone());
            }
        }
    }
}

impl Host for StandaloneHost {
    fn active_document(&self) -> Option<Arc<dyn Document>> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .map(|doc| doc as Arc<dyn Document>)
    }

    fn settings(&self) -> Settings {
        let mut settings = *self.settings.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(port) = self.port_override {
            settings.websocket_port = port;
        }
        settings
    }

    fn subscribe(&self, topic: Topic, sink: EventSink) -> Subscription {
        let id = {
            let mut subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
            let id = subscribers.next_id;
            subscribers.next_id += 1;
            subscribers.entries.insert(id, (topic, sink));
            id
        };

        let subscribers = Arc::clone(&self.subscribers);
        Subscription::new(move || {
            subscribers
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .entries
                .remove(&id);
        })
    }

    fn show_info(&self, message: &str) {
        println!("{message}");
    }

    fn show_error(&self, message: &str) {
        eprintln!("error: {message}");
    }

    fn show_prompt(&self, message: &str, action: &str) -> oneshot::Receiver<bool> {
        let (tx, rx) = oneshot::channel();
        // A newer prompt supersedes an unanswered one
        *self
            .pending_prompt
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(tx);
        println!("{message} [{action}? y/n]");
        rx
    }

    fn open_settings(&self, section: &str) {
        println!(
            "Settings ({section}) are read from {}",
            self.config_path.display()
        );
    }

    fn reload(&self) {
        let _ = self.reload_tx.send(());
    }
}
