//! Per-client WebSocket connection task.
//!
//! Performs the handshake, registers the client with the bridge, then pumps
//! queued snapshot frames out until the peer goes away, a transport error
//! occurs, or the listener is stopped. Frames sent by the client are read
//! (so close frames and pings are processed) but otherwise ignored.

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::{WebSocketStream, accept_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::ServerError;
use crate::event::{Event, EventSink, TransportEvent};
use crate::session::{ClientHandle, ClientId, StateCell};

/// Upper bound on the closing handshake with a peer that stopped reading
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

pub(crate) async fn serve(
    stream: TcpStream,
    peer: SocketAddr,
    generation: u64,
    events: EventSink,
    cancel: CancellationToken,
) {
    let ws = tokio::select! {
        () = cancel.cancelled() => return,
        handshake = accept_async(stream) => match handshake {
            Ok(ws) => ws,
            Err(e) => {
                events.send(Event::Transport(TransportEvent::HandshakeFailed {
                    generation,
                    peer,
                    error: e.into(),
                }));
                return;
            }
        },
    };

    let (client, outgoing) = ClientHandle::channel(peer);
    let id = client.id().clone();
    let state = client.state_cell();
    debug!("[{}] Client connected from {}", id, peer);

    if !events.send(Event::Transport(TransportEvent::Connected { generation, client })) {
        debug!("[{}] Bridge gone, dropping connection", id);
        return;
    }

    let mut conn = Connection {
        ws,
        outgoing,
        state,
        id,
        generation,
        events,
    };
    conn.run(&cancel).await;
}

struct Connection<S> {
    ws: WebSocketStream<S>,
    outgoing: mpsc::UnboundedReceiver<String>,
    state: StateCell,
    id: ClientId,
    generation: u64,
    events: EventSink,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn run(&mut self, cancel: &CancellationToken) {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    trace!("[{}] Listener stopped, closing", self.id);
                    self.close().await;
                    break;
                }

                frame = self.outgoing.recv() => {
                    let Some(text) = frame else {
                        // Handle dropped by the server
                        self.close().await;
                        break;
                    };
                    // A peer that stops reading must not outlive the listener
                    tokio::select! {
                        () = cancel.cancelled() => {
                            trace!("[{}] Listener stopped during send, dropping", self.id);
                            break;
                        }
                        sent = self.ws.send(Message::Text(text)) => {
                            if let Err(e) = sent {
                                self.fail(e.into());
                                break;
                            }
                        }
                    }
                }

                msg = self.ws.next() => match msg {
                    Some(Ok(Message::Close(_))) => {
                        debug!("[{}] Client disconnected", self.id);
                        // Flushes the queued close reply
                        self.close().await;
                        break;
                    }
                    None => {
                        debug!("[{}] Client disconnected", self.id);
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        self.fail(e.into());
                        break;
                    }
                },
            }
        }

        self.state.mark_closed();
        self.events.send(Event::Transport(TransportEvent::Closed {
            generation: self.generation,
            id: self.id.clone(),
        }));
    }

    async fn close(&mut self) {
        if tokio::time::timeout(CLOSE_TIMEOUT, self.ws.close(None))
            .await
            .is_err()
        {
            debug!("[{}] Close handshake timed out", self.id);
        }
    }

    fn fail(&self, error: ServerError) {
        warn!("[{}] Connection error: {}", self.id, error);
        self.state.mark_errored();
        self.events.send(Event::Transport(TransportEvent::ClientError {
            generation: self.generation,
            id: self.id.clone(),
            error,
        }));
    }
}
