//! Events consumed by the event bridge.

use std::net::SocketAddr;

use tokio::sync::mpsc;

use crate::error::ServerError;
use crate::host::HostEvent;
use crate::session::{ClientHandle, ClientId};

/// Everything the bridge reacts to, in arrival order
#[derive(Debug)]
pub enum Event {
    Host(HostEvent),
    Transport(TransportEvent),
    Lifecycle(LifecycleEvent),
}

/// Server lifecycle requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Start,
    Stop,
    /// Stop, then start again after a short settle delay
    Restart,
    /// Stop and end the bridge loop
    Shutdown,
}

/// Reports from the listener and connection tasks. `generation` identifies
/// the listener instance that produced the event.
#[derive(Debug)]
pub enum TransportEvent {
    Connected {
        generation: u64,
        client: ClientHandle,
    },
    Closed {
        generation: u64,
        id: ClientId,
    },
    ClientError {
        generation: u64,
        id: ClientId,
        error: ServerError,
    },
    HandshakeFailed {
        generation: u64,
        peer: SocketAddr,
        error: ServerError,
    },
    ServerFault {
        generation: u64,
        error: ServerError,
    },
}

/// Sending half of the bridge's event channel
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<Event>,
}

impl EventSink {
    /// Create a sink and the receiver the bridge drains
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Event>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Report a host event. Returns `false` once the bridge has stopped.
    pub fn emit(&self, event: HostEvent) -> bool {
        self.send(Event::Host(event))
    }

    pub fn send(&self, event: Event) -> bool {
        self.tx.send(event).is_ok()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
