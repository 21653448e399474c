//! WebSocket broadcast server.
//!
//! Owns zero or one listening socket and the set of connected clients. All
//! methods are synchronous and never wait on the network: binding uses a
//! non-blocking std listener handed to tokio, and stopping only signals the
//! listener and connection tasks to wind down.
//!
//! Must be used from within a Tokio runtime.

use std::collections::HashMap;
use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use represence_core::config::DEFAULT_PORT;
use represence_types::FileInfo;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::connection;
use crate::error::ServerError;
use crate::event::{Event, EventSink, TransportEvent};
use crate::session::{ClientHandle, ClientId};

/// Result of a start request that did not fail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new listener was bound at this address
    Started(SocketAddr),
    /// A listener was already running at this address; nothing changed
    AlreadyRunning(SocketAddr),
}

/// The configured port and the live clients.
/// `running` is derived from whether a listener instance is held.
#[derive(Debug)]
struct ServerState {
    port: u16,
    clients: HashMap<ClientId, ClientHandle>,
}

impl Default for ServerState {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            clients: HashMap::new(),
        }
    }
}

#[derive(Debug)]
struct Instance {
    generation: u64,
    local_addr: SocketAddr,
    cancel: CancellationToken,
}

#[derive(Debug)]
pub struct BroadcastServer {
    state: ServerState,
    instance: Option<Instance>,
    last_generation: u64,
    events: EventSink,
}

impl BroadcastServer {
    /// Create a stopped server that reports transport events to `events`.
    #[must_use]
    pub fn new(events: EventSink) -> Self {
        Self {
            state: ServerState::default(),
            instance: None,
            last_generation: 0,
            events,
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.instance.is_some()
    }

    /// Port resolved at the most recent start attempt
    #[must_use]
    pub fn port(&self) -> u16 {
        self.state.port
    }

    /// Address actually bound, while running
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.instance.as_ref().map(|i| i.local_addr)
    }

    /// Generation of the running listener
    #[must_use]
    pub fn generation(&self) -> Option<u64> {
        self.instance.as_ref().map(|i| i.generation)
    }

    #[must_use]
    pub fn client_count(&self) -> usize {
        self.state.clients.len()
    }

    /// Whether `generation` belongs to the running listener.
    #[must_use]
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == Some(generation)
    }

    /// Bind `127.0.0.1:port` and start accepting connections.
    ///
    /// A second call while running is a no-op that reports
    /// [`StartOutcome::AlreadyRunning`]; it never binds a second socket.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the port cannot be bound. The server
    /// stays stopped and nothing is retried.
    pub fn start(&mut self, port: u16) -> Result<StartOutcome, ServerError> {
        if let Some(instance) = &self.instance {
            debug!("WebSocket server is already running");
            return Ok(StartOutcome::AlreadyRunning(instance.local_addr));
        }

        self.state.port = port;
        let (listener, local_addr) =
            bind(port).map_err(|source| ServerError::Bind { port, source })?;

        self.last_generation += 1;
        let generation = self.last_generation;
        let cancel = CancellationToken::new();

        tokio::spawn(accept_loop(
            listener,
            generation,
            self.events.clone(),
            cancel.clone(),
        ));

        info!("WebSocket server started on {} (generation {})", local_addr, generation);
        self.instance = Some(Instance {
            generation,
            local_addr,
            cancel,
        });
        Ok(StartOutcome::Started(local_addr))
    }

    /// Stop accepting connections and disconnect every client.
    ///
    /// Returns immediately; the socket is released once the listener task
    /// observes the cancellation. Returns `false` if nothing was running.
    pub fn stop(&mut self) -> bool {
        let Some(instance) = self.instance.take() else {
            return false;
        };

        instance.cancel.cancel();
        for client in self.state.clients.values() {
            client.close();
        }
        self.state.clients.clear();
        info!("WebSocket server stopped (generation {})", instance.generation);
        true
    }

    /// Register a newly connected client and send it `snapshot`.
    pub fn on_connection(&mut self, client: ClientHandle, snapshot: &FileInfo) {
        let id = client.id().clone();
        match snapshot.to_json() {
            Ok(json) => {
                if !client.send(json) {
                    debug!("[{}] Client closed before initial snapshot", id);
                }
            }
            Err(e) => error!("Failed to encode snapshot: {}", e),
        }
        debug!("[{}] Registered client at {}", id, client.peer());
        self.state.clients.insert(id, client);
        debug!("Clients connected: {}", self.state.clients.len());
    }

    /// Forget a client whose connection ended.
    pub fn on_close(&mut self, id: &ClientId) {
        if let Some(client) = self.state.clients.remove(id) {
            client.close();
            debug!("[{}] Client removed, {} remaining", id, self.state.clients.len());
        }
    }

    /// Drop the listener after a post-bind failure. Returns `true` if a
    /// running listener was lost.
    pub fn on_server_fault(&mut self, error: &ServerError) -> bool {
        error!("WebSocket server error: {}", error);
        self.stop()
    }

    /// Send `snapshot` to every open client. Non-open clients are skipped
    /// silently. Returns the number of clients the frame was queued for.
    pub fn broadcast(&self, snapshot: &FileInfo) -> usize {
        if !self.is_running() {
            return 0;
        }

        let json = match snapshot.to_json() {
            Ok(json) => json,
            Err(e) => {
                error!("Failed to encode snapshot: {}", e);
                return 0;
            }
        };

        let sent = self
            .state
            .clients
            .values()
            .filter(|client| client.send(json.clone()))
            .count();
        trace!("Broadcast {} to {} client(s)", snapshot.file_name, sent);
        sent
    }
}

fn bind(port: u16) -> io::Result<(TcpListener, SocketAddr)> {
    let listener = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, port))?;
    listener.set_nonblocking(true)?;
    let local_addr = listener.local_addr()?;
    Ok((TcpListener::from_std(listener)?, local_addr))
}

// Errors tied to a single pending connection; the listener itself is fine.
fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}

async fn accept_loop(
    listener: TcpListener,
    generation: u64,
    events: EventSink,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,

            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    trace!("Accepted TCP connection from {}", peer);
                    tokio::spawn(connection::serve(
                        stream,
                        peer,
                        generation,
                        events.clone(),
                        cancel.clone(),
                    ));
                }
                Err(e) if is_transient(&e) => {
                    warn!("Accept error: {}", e);
                }
                Err(e) => {
                    events.send(Event::Transport(TransportEvent::ServerFault {
                        generation,
                        error: ServerError::Fault(e),
                    }));
                    break;
                }
            },
        }
    }

    debug!("Listener closed (generation {})", generation);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn snapshot(name: &str) -> FileInfo {
        FileInfo {
            file_name: name.to_string(),
            extension: ".rs".to_string(),
            full_path: format!("/work/{name}"),
            language_id: "rust".to_string(),
            line_count: 1,
            word_count: 2,
            timestamp: 1,
        }
    }

    fn server() -> BroadcastServer {
        let (sink, _rx) = EventSink::channel();
        BroadcastServer::new(sink)
    }

    #[tokio::test]
    async fn test_new_server_is_stopped() {
        let server = server();
        assert!(!server.is_running());
        assert_eq!(server.port(), DEFAULT_PORT);
        assert!(server.local_addr().is_none());
        assert_eq!(server.client_count(), 0);
    }

    #[tokio::test]
    async fn test_start_binds_loopback() {
        let mut server = server();
        let outcome = server.start(0).unwrap();

        let StartOutcome::Started(addr) = outcome else {
            panic!("Expected Started, got {outcome:?}");
        };
        assert!(addr.ip().is_loopback());
        assert_ne!(addr.port(), 0);
        assert!(server.is_running());
        assert_eq!(server.local_addr(), Some(addr));
        assert_eq!(server.generation(), Some(1));
    }

    #[tokio::test]
    async fn test_second_start_is_noop() {
        let mut server = server();
        let StartOutcome::Started(addr) = server.start(0).unwrap() else {
            panic!("Expected Started");
        };

        let outcome = server.start(0).unwrap();
        assert_eq!(outcome, StartOutcome::AlreadyRunning(addr));
        assert!(server.is_running());
        assert_eq!(server.generation(), Some(1));
    }

    #[tokio::test]
    async fn test_bind_conflict_reports_error() {
        let holder = std::net::TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
        let port = holder.local_addr().unwrap().port();

        let mut server = server();
        let err = server.start(port).unwrap_err();

        assert!(matches!(err, ServerError::Bind { port: p, .. } if p == port));
        assert!(!server.is_running());
        assert_eq!(server.port(), port);
    }

    #[tokio::test]
    async fn test_stop_when_not_running_is_noop() {
        let mut server = server();
        assert!(!server.stop());
        assert!(!server.is_running());
    }

    #[tokio::test]
    async fn test_stop_clears_clients() {
        let mut server = server();
        server.start(0).unwrap();
        let (client, _rx) = ClientHandle::channel(peer());
        let handle = client.clone();
        server.on_connection(client, &snapshot("a.rs"));

        assert!(server.stop());
        assert!(!server.is_running());
        assert_eq!(server.client_count(), 0);
        assert!(!handle.is_open());
    }

    #[tokio::test]
    async fn test_restart_uses_new_generation() {
        let mut server = server();
        server.start(0).unwrap();
        server.stop();
        server.start(0).unwrap();

        assert_eq!(server.generation(), Some(2));
        assert!(!server.is_current(1));
        assert!(server.is_current(2));
    }

    #[tokio::test]
    async fn test_connection_receives_exactly_one_snapshot() {
        let mut server = server();
        server.start(0).unwrap();

        let (client, mut rx) = ClientHandle::channel(peer());
        server.on_connection(client, &snapshot("first.rs"));

        let frame = rx.try_recv().unwrap();
        let parsed: FileInfo = serde_json::from_str(&frame).unwrap();
        assert_eq!(parsed.file_name, "first.rs");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_every_open_client() {
        let mut server = server();
        server.start(0).unwrap();

        let mut receivers = Vec::new();
        for _ in 0..3 {
            let (client, mut rx) = ClientHandle::channel(peer());
            server.on_connection(client, &snapshot("initial.rs"));
            rx.try_recv().unwrap();
            receivers.push(rx);
        }

        assert_eq!(server.broadcast(&snapshot("next.rs")), 3);
        for rx in &mut receivers {
            let parsed: FileInfo = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
            assert_eq!(parsed.file_name, "next.rs");
            assert!(rx.try_recv().is_err());
        }
    }

    #[tokio::test]
    async fn test_broadcast_skips_closed_clients() {
        let mut server = server();
        server.start(0).unwrap();

        let (open, mut open_rx) = ClientHandle::channel(peer());
        let (closing, mut closing_rx) = ClientHandle::channel(peer());
        let closing_handle = closing.clone();
        server.on_connection(open, &snapshot("a.rs"));
        server.on_connection(closing, &snapshot("a.rs"));
        open_rx.try_recv().unwrap();
        closing_rx.try_recv().unwrap();

        closing_handle.close();

        assert_eq!(server.broadcast(&snapshot("b.rs")), 1);
        assert!(open_rx.try_recv().is_ok());
        assert!(closing_rx.try_recv().is_err());
        assert_eq!(server.client_count(), 2, "Membership changes only on close events");
    }

    #[tokio::test]
    async fn test_broadcast_when_stopped_sends_nothing() {
        let server = server();
        assert_eq!(server.broadcast(&snapshot("a.rs")), 0);
    }

    #[tokio::test]
    async fn test_on_close_removes_client() {
        let mut server = server();
        server.start(0).unwrap();

        let (client, _rx) = ClientHandle::channel(peer());
        let id = client.id().clone();
        server.on_connection(client, &snapshot("a.rs"));
        assert_eq!(server.client_count(), 1);

        server.on_close(&id);
        assert_eq!(server.client_count(), 0);

        // Unknown ids are ignored
        server.on_close(&id);
        assert_eq!(server.client_count(), 0);
    }

    #[tokio::test]
    async fn test_server_fault_stops_server() {
        let mut server = server();
        server.start(0).unwrap();

        let fault = ServerError::Fault(io::Error::other("lost"));
        assert!(server.on_server_fault(&fault));
        assert!(!server.is_running());
        assert!(!server.on_server_fault(&fault));
    }

    #[test]
    fn test_transient_accept_errors() {
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionAborted)));
        assert!(is_transient(&io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(!is_transient(&io::Error::from(io::ErrorKind::PermissionDenied)));
        assert!(!is_transient(&io::Error::other("fd limit")));
    }
}
