//! Represence broadcast service.
//!
//! Runs inside a host application and pushes a JSON snapshot of the active
//! document to every WebSocket client on `127.0.0.1`. The host plugs in
//! through the [`Host`] trait; [`activate`] wires everything up and returns
//! the [`Session`] that tears it down again.

pub mod bridge;
pub(crate) mod connection;
pub mod error;
pub mod event;
pub mod host;
pub mod lifecycle;
pub mod logging;
pub mod server;
pub mod session;
pub mod standalone;
pub mod watcher;

#[cfg(test)]
pub(crate) mod test_support;

pub use bridge::{Bridge, RESTART_SETTLE_DELAY};
pub use error::{DaemonError, Result, ServerError};
pub use event::{Event, EventSink, LifecycleEvent, TransportEvent};
pub use host::{Command, ConfigurationChange, Host, HostEvent, RELOAD_ACTION, Subscription, Topic};
pub use lifecycle::{Session, activate};
pub use logging::LogControl;
pub use server::{BroadcastServer, StartOutcome};
pub use session::{ClientHandle, ClientId, ConnectionState};
pub use standalone::StandaloneHost;
pub use watcher::{FileWatcher, WorkspaceChange};
