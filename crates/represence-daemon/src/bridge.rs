//! Event bridge.
//!
//! The single consumer of host, transport and lifecycle events. It owns the
//! broadcast server, so each event is handled to completion before the next
//! one is looked at and no lock guards the server state.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use represence_core::config::{ENABLE_LOGGING_KEY, SECTION, WEBSOCKET_PORT_KEY};
use represence_core::snapshot;
use represence_types::FileInfo;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::event::{Event, EventSink, LifecycleEvent, TransportEvent};
use crate::host::{Command, ConfigurationChange, Host, HostEvent, RELOAD_ACTION};
use crate::logging::LogControl;
use crate::server::{BroadcastServer, StartOutcome};

/// Pause between stopping and starting again on restart, so the old
/// listener can release its port
pub const RESTART_SETTLE_DELAY: Duration = Duration::from_millis(100);

pub struct Bridge {
    host: Arc<dyn Host>,
    server: BroadcastServer,
    events: EventSink,
    log_control: Option<LogControl>,
}

impl Bridge {
    /// `events` must feed the receiver later passed to [`Bridge::run`].
    pub fn new(host: Arc<dyn Host>, events: EventSink, log_control: Option<LogControl>) -> Self {
        Self {
            host,
            server: BroadcastServer::new(events.clone()),
            events,
            log_control,
        }
    }

    #[must_use]
    pub fn server(&self) -> &BroadcastServer {
        &self.server
    }

    /// Drain events until shutdown, then stop the server.
    pub async fn run(mut self, mut events: mpsc::UnboundedReceiver<Event>) {
        while let Some(event) = events.recv().await {
            if self.handle(event).is_break() {
                break;
            }
        }
        self.server.stop();
        debug!("Event bridge stopped");
    }

    /// Handle one event. Breaks on shutdown.
    pub fn handle(&mut self, event: Event) -> ControlFlow<()> {
        match event {
            Event::Host(event) => self.on_host_event(event),
            Event::Transport(event) => self.on_transport_event(event),
            Event::Lifecycle(LifecycleEvent::Start) => self.start(),
            Event::Lifecycle(LifecycleEvent::Stop) => {
                self.server.stop();
            }
            Event::Lifecycle(LifecycleEvent::Restart) => self.restart(),
            Event::Lifecycle(LifecycleEvent::Shutdown) => {
                self.server.stop();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn snapshot(&self) -> FileInfo {
        let document = self.host.active_document();
        snapshot::build(document.as_deref())
    }

    fn broadcast_now(&self) {
        if self.server.is_running() {
            self.server.broadcast(&self.snapshot());
        }
    }

    fn start(&mut self) {
        let port = self.host.settings().websocket_port;
        match self.server.start(port) {
            Ok(StartOutcome::Started(addr)) => {
                self.host.show_info(&format!(
                    "Represence WebSocket server started on port {}",
                    addr.port()
                ));
            }
            Ok(StartOutcome::AlreadyRunning(_)) => {}
            Err(e) => {
                error!("{}", e);
                self.host.show_error(&format!(
                    "Failed to start WebSocket server on port {port}. Port might be in use."
                ));
            }
        }
    }

    fn restart(&mut self) {
        self.server.stop();
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(RESTART_SETTLE_DELAY).await;
            events.send(Event::Lifecycle(LifecycleEvent::Start));
        });
    }

    fn on_host_event(&self, event: HostEvent) {
        match event {
            HostEvent::ActiveEditorChanged | HostEvent::DocumentChanged => self.broadcast_now(),
            HostEvent::ConfigurationChanged(change) => self.on_configuration_changed(&change),
            HostEvent::Command(command) => self.run_command(command),
        }
    }

    fn on_configuration_changed(&self, change: &ConfigurationChange) {
        debug!("Configuration changed: {:?}", change.keys());
        let settings = self.host.settings();

        if change.affects(WEBSOCKET_PORT_KEY) {
            let port = settings.websocket_port;
            info!("WebSocket port changed to {}", port);

            let reply = self.host.show_prompt(
                &format!("WebSocket port changed to {port}. Please reload to apply the change."),
                RELOAD_ACTION,
            );
            let host = Arc::clone(&self.host);
            tokio::spawn(async move {
                if reply.await.unwrap_or(false) {
                    host.reload();
                }
            });
        }

        if change.affects(ENABLE_LOGGING_KEY)
            && let Some(log_control) = &self.log_control
        {
            log_control.set_enabled(settings.enable_logging);
        }
    }

    fn run_command(&self, command: Command) {
        debug!("Running command {}", command.id());
        match command {
            Command::ShowFileInfo => self.host.show_info(&self.snapshot().summary()),
            Command::OpenSettings => self.host.open_settings(SECTION),
        }
    }

    fn on_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected { generation, client } => {
                if self.server.is_current(generation) {
                    let snapshot = self.snapshot();
                    self.server.on_connection(client, &snapshot);
                } else {
                    debug!("[{}] Dropping client of stale listener", client.id());
                    client.close();
                }
            }
            TransportEvent::Closed { generation, id } => {
                if self.server.is_current(generation) {
                    self.server.on_close(&id);
                }
            }
            TransportEvent::ClientError { id, error, .. } => {
                warn!("[{}] WebSocket client error: {}", id, error);
            }
            TransportEvent::HandshakeFailed { peer, error, .. } => {
                warn!("WebSocket handshake with {} failed: {}", peer, error);
            }
            TransportEvent::ServerFault { generation, error } => {
                if self.server.is_current(generation) && self.server.on_server_fault(&error) {
                    self.host.show_error(&format!("WebSocket server error: {error}"));
                }
            }
        }
    }
}
