//! Interface to the embedding host application.
//!
//! The host owns the editor, the settings store and the notification UI.
//! Represence only reads from it and asks it to show things; everything the
//! host reports back arrives as a [`HostEvent`] through an [`EventSink`]
//! handed out by [`Host::subscribe`].

use std::sync::Arc;

use represence_core::Document;
use represence_core::config::Settings;
use tokio::sync::oneshot;

use crate::event::EventSink;

/// Label of the action offered when the port setting changes
pub const RELOAD_ACTION: &str = "Reload Now";

/// User-invocable actions registered on activation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Show a summary of the current snapshot
    ShowFileInfo,
    /// Open the host's settings UI at the `fileInfo` section
    OpenSettings,
}

impl Command {
    pub const ALL: [Command; 2] = [Command::ShowFileInfo, Command::OpenSettings];

    /// Identifier under which the host registers the command
    #[must_use]
    pub fn id(self) -> &'static str {
        match self {
            Command::ShowFileInfo => "represence.showFileInfo",
            Command::OpenSettings => "represence.openSettings",
        }
    }

    /// Look up a command by its [`Command::id`]
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|command| command.id() == id)
    }
}

/// Event sources the bridge subscribes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    ActiveEditor,
    DocumentContent,
    Configuration,
    Command(Command),
}

impl Topic {
    /// Every topic subscribed on activation
    pub const ALL: [Topic; 5] = [
        Topic::ActiveEditor,
        Topic::DocumentContent,
        Topic::Configuration,
        Topic::Command(Command::ShowFileInfo),
        Topic::Command(Command::OpenSettings),
    ];
}

/// Set of configuration keys touched by a settings change
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationChange {
    keys: Vec<String>,
}

impl ConfigurationChange {
    #[must_use]
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `key` or one of its parent sections changed, e.g. a change of
    /// `fileInfo.websocketPort` affects both that key and `fileInfo`.
    #[must_use]
    pub fn affects(&self, key: &str) -> bool {
        self.keys.iter().any(|changed| {
            changed == key
                || changed
                    .strip_prefix(key)
                    .is_some_and(|rest| rest.starts_with('.'))
                || key
                    .strip_prefix(changed.as_str())
                    .is_some_and(|rest| rest.starts_with('.'))
        })
    }

    #[must_use]
    pub fn keys(&self) -> &[String] {
        &self.keys
    }
}

/// Events reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    ActiveEditorChanged,
    DocumentChanged,
    ConfigurationChanged(ConfigurationChange),
    Command(Command),
}

/// Handle for a host event subscription. Dropping it releases the
/// subscription.
#[must_use = "dropping a Subscription releases it immediately"]
pub struct Subscription {
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            release: Some(Box::new(release)),
        }
    }

    pub fn release(mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.release.is_some())
            .finish()
    }
}

/// The embedding application.
///
/// Implementations must not block: every method is called from the event
/// bridge task.
pub trait Host: Send + Sync + 'static {
    /// Document in the active editor, if any
    fn active_document(&self) -> Option<Arc<dyn Document>>;

    /// Current values of the `fileInfo` settings section
    fn settings(&self) -> Settings;

    /// Deliver events for `topic` to `sink` until the returned handle is dropped
    fn subscribe(&self, topic: Topic, sink: EventSink) -> Subscription;

    fn show_info(&self, message: &str);

    fn show_error(&self, message: &str);

    /// Show an informational message with a single action button. The
    /// receiver resolves to `true` if the user picked the action.
    fn show_prompt(&self, message: &str, action: &str) -> oneshot::Receiver<bool>;

    /// Open the settings UI filtered to `section`
    fn open_settings(&self, section: &str);

    /// Reload the host session so settings that need a restart take effect
    fn reload(&self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_change_affects_exact_key() {
        let change = ConfigurationChange::new(["fileInfo.websocketPort"]);
        assert!(change.affects("fileInfo.websocketPort"));
        assert!(!change.affects("fileInfo.enableLogging"));
    }

    #[test]
    fn test_change_affects_parent_section() {
        let change = ConfigurationChange::new(["fileInfo.websocketPort"]);
        assert!(change.affects("fileInfo"));
        assert!(!change.affects("file"));
    }

    #[test]
    fn test_section_change_affects_children() {
        let change = ConfigurationChange::new(["fileInfo"]);
        assert!(change.affects("fileInfo.websocketPort"));
        assert!(!change.affects("fileInfoExtra.websocketPort"));
    }

    #[test]
    fn test_empty_change_affects_nothing() {
        let change = ConfigurationChange::default();
        assert!(!change.affects("fileInfo"));
        assert!(change.keys().is_empty());
    }

    #[test]
    fn test_command_ids() {
        assert_eq!(Command::ShowFileInfo.id(), "represence.showFileInfo");
        assert_eq!(Command::OpenSettings.id(), "represence.openSettings");
    }

    #[test]
    fn test_command_from_id() {
        for command in Command::ALL {
            assert_eq!(Command::from_id(command.id()), Some(command));
        }
        assert_eq!(Command::from_id("represence.unknown"), None);
        assert_eq!(Command::from_id("showFileInfo"), None);
    }

    #[test]
    fn test_topics_cover_all_commands() {
        for command in Command::ALL {
            assert!(Topic::ALL.contains(&Topic::Command(command)));
        }
    }

    #[test]
    fn test_subscription_released_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);

        let subscription = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        drop(subscription);

        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_released_once() {
        let released = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&released);

        let subscription = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        subscription.release();

        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
