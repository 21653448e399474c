//! Activation and deactivation of the broadcast service inside a host.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::bridge::Bridge;
use crate::event::{Event, EventSink, LifecycleEvent};
use crate::host::{Host, Subscription, Topic};
use crate::logging::LogControl;

/// A running activation. Owns the bridge task and every host subscription.
///
/// Dropping a session without [`Session::deactivate`] still stops the server
/// and releases the subscriptions, but does not wait for the bridge to exit.
#[derive(Debug)]
pub struct Session {
    events: EventSink,
    subscriptions: Vec<Subscription>,
    bridge: Option<JoinHandle<()>>,
}

/// Wire the service into `host` and start the server.
///
/// Subscribes to editor, document, configuration and command events, then
/// spawns the event bridge. The server start is queued ahead of any host
/// event. Must be called from within a Tokio runtime.
pub fn activate(host: Arc<dyn Host>, log_control: Option<LogControl>) -> Session {
    if let Some(log_control) = &log_control {
        log_control.set_enabled(host.settings().enable_logging);
    }
    info!("Represence activated");

    let (events, rx) = EventSink::channel();
    events.send(Event::Lifecycle(LifecycleEvent::Start));

    let subscriptions = Topic::ALL
        .into_iter()
        .map(|topic| host.subscribe(topic, events.clone()))
        .collect();

    let bridge = Bridge::new(host, events.clone(), log_control);
    let handle = tokio::spawn(bridge.run(rx));

    Session {
        events,
        subscriptions,
        bridge: Some(handle),
    }
}

impl Session {
    /// Sink for reporting events into this session
    #[must_use]
    pub fn events(&self) -> &EventSink {
        &self.events
    }

    /// Stop the listener and start it again with the current settings.
    pub fn restart(&self) {
        self.events.send(Event::Lifecycle(LifecycleEvent::Restart));
    }

    /// Stop the server, wait for the bridge to finish, then release every
    /// host subscription.
    pub async fn deactivate(mut self) {
        self.events.send(Event::Lifecycle(LifecycleEvent::Shutdown));
        if let Some(bridge) = self.bridge.take()
            && let Err(e) = bridge.await
        {
            warn!("Event bridge task failed: {}", e);
        }

        for subscription in self.subscriptions.drain(..) {
            subscription.release();
        }
        info!("Represence deactivated");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.bridge.take().is_some() {
            debug!("Session dropped without deactivate, shutting down");
            self.events.send(Event::Lifecycle(LifecycleEvent::Shutdown));
        }
    }
}
