//! Client handles for connected WebSocket peers.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    #[must_use]
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Lifecycle of a single connection: `Open -> Closed` or
/// `Open -> Errored -> Closed`. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Open = 0,
    Errored = 1,
    Closed = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Open,
            1 => Self::Errored,
            _ => Self::Closed,
        }
    }
}

/// Connection state shared between a client handle and its connection task.
#[derive(Debug, Clone)]
pub(crate) struct StateCell(Arc<AtomicU8>);

impl StateCell {
    fn new() -> Self {
        Self(Arc::new(AtomicU8::new(ConnectionState::Open as u8)))
    }

    pub(crate) fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Only an open connection can become errored.
    pub(crate) fn mark_errored(&self) -> bool {
        self.0
            .compare_exchange(
                ConnectionState::Open as u8,
                ConnectionState::Errored as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    pub(crate) fn mark_closed(&self) {
        self.0.store(ConnectionState::Closed as u8, Ordering::Release);
    }
}

/// Server-side handle to a connected client.
///
/// Frames pushed through [`ClientHandle::send`] are queued on an unbounded
/// channel drained by the client's connection task, so sending never blocks.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    id: ClientId,
    peer: SocketAddr,
    tx: mpsc::UnboundedSender<String>,
    state: StateCell,
}

impl ClientHandle {
    /// Create a handle and the receiving end of its outgoing frame queue.
    #[must_use]
    pub fn channel(peer: SocketAddr) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = Self {
            id: ClientId::new(),
            peer,
            tx,
            state: StateCell::new(),
        };
        (handle, rx)
    }

    #[must_use]
    pub fn id(&self) -> &ClientId {
        &self.id
    }

    #[must_use]
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open && !self.tx.is_closed()
    }

    /// Queue a text frame. Returns `false` without queueing when the
    /// connection is no longer open.
    pub fn send(&self, payload: String) -> bool {
        if !self.is_open() {
            return false;
        }
        self.tx.send(payload).is_ok()
    }

    /// Mark the connection closed; later sends are skipped.
    pub fn close(&self) {
        self.state.mark_closed();
    }

    pub(crate) fn state_cell(&self) -> StateCell {
        self.state.clone()
    }
}
