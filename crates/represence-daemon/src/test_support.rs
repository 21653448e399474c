//! Host double that records everything the bridge asks of it.

use std::sync::{Arc, Mutex};

use represence_core::config::Settings;
use represence_core::{Document, TextDocument};
use tokio::sync::oneshot;

use crate::event::EventSink;
use crate::host::{Host, Subscription, Topic};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Error(String),
    Prompt { message: String, action: String },
    OpenSettings(String),
    Reload,
}

#[derive(Default)]
pub struct RecordingHost {
    pub document: Mutex<Option<Arc<TextDocument>>>,
    pub settings: Mutex<Settings>,
    pub notices: Mutex<Vec<Notice>>,
    pub subscriptions: Arc<Mutex<Vec<Topic>>>,
    pub prompt_reply: Mutex<Option<bool>>,
}

impl RecordingHost {
    pub fn with_port(port: u16) -> Self {
        let host = Self::default();
        host.settings.lock().unwrap().websocket_port = port;
        host
    }

    pub fn open(&self, path: &str, language_id: &str, text: &str) {
        *self.document.lock().unwrap() =
            Some(Arc::new(TextDocument::new(path, language_id, text.to_string())));
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    fn record(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

impl Host for RecordingHost {
    fn active_document(&self) -> Option<Arc<dyn Document>> {
        self.document
            .lock()
            .unwrap()
            .clone()
            .map(|doc| doc as Arc<dyn Document>)
    }

    fn settings(&self) -> Settings {
        *self.settings.lock().unwrap()
    }

    fn subscribe(&self, topic: Topic, _sink: EventSink) -> Subscription {
        self.subscriptions.lock().unwrap().push(topic);
        let subscriptions = Arc::clone(&self.subscriptions);
        Subscription::new(move || {
            let mut subscriptions = subscriptions.lock().unwrap();
            if let Some(pos) = subscriptions.iter().position(|t| *t == topic) {
                subscriptions.remove(pos);
            }
        })
    }

    fn show_info(&self, message: &str) {
        self.record(Notice::Info(message.to_string()));
    }

    fn show_error(&self, message: &str) {
        self.record(Notice::Error(message.to_string()));
    }

    fn show_prompt(&self, message: &str, action: &str) -> oneshot::Receiver<bool> {
        self.record(Notice::Prompt {
            message: message.to_string(),
            action: action.to_string(),
        });
        let (tx, rx) = oneshot::channel();
        if let Some(reply) = *self.prompt_reply.lock().unwrap() {
            let _ = tx.send(reply);
        }
        rx
    }

    fn open_settings(&self, section: &str) {
        self.record(Notice::OpenSettings(section.to_string()));
    }

    fn reload(&self) {
        self.record(Notice::Reload);
    }
}
