//! Device connection lifecycle, exposed as an observable value.
//!
//! The harness never infers transitions: every change is an explicit call,
//! normally issued by a state action running inside a transaction so that
//! state changes stay ordered with the transport operations around them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Connection phase of a device session.
///
/// Happy path is `Unknown → Connecting → Initializing → Initialized`, with
/// the authentication pair as a side branch for handlers that exchange a
/// pairing secret. `Disconnected` is terminal and reachable from anywhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    #[default]
    Unknown,
    Connecting,
    Initializing,
    Initialized,
    Authenticating,
    Authenticated,
    WaitingForReconnect,
    Disconnected,
}

impl ConnectionState {
    /// True once the session is usable for capability commands.
    pub fn is_initialized(self) -> bool {
        matches!(
            self,
            ConnectionState::Initialized | ConnectionState::Authenticated
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionState::Unknown => "unknown",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Initializing => "initializing",
            ConnectionState::Initialized => "initialized",
            ConnectionState::Authenticating => "authenticating",
            ConnectionState::Authenticated => "authenticated",
            ConnectionState::WaitingForReconnect => "waiting for reconnect",
            ConnectionState::Disconnected => "disconnected",
        };
        f.write_str(s)
    }
}

/// Connection phase plus the orthogonal busy flag. A device can be
/// `Initialized` and busy at the same time, e.g. while transferring
/// recorded history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceState {
    pub connection: ConnectionState,
    pub busy: bool,
}

/// Write side of a device's observable state.
///
/// Written only from the device's own execution context (queue worker or
/// handle teardown); readable from any thread with the last committed value.
#[derive(Clone)]
pub struct StateHandle {
    tx: Arc<watch::Sender<DeviceState>>,
}

impl StateHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(DeviceState::default());
        Self { tx: Arc::new(tx) }
    }

    /// Most recently committed state.
    pub fn get(&self) -> DeviceState {
        *self.tx.borrow()
    }

    /// Subscribe for change notifications. Observers always see the latest
    /// committed value first.
    pub fn subscribe(&self) -> watch::Receiver<DeviceState> {
        self.tx.subscribe()
    }

    pub fn set_connection(&self, connection: ConnectionState) {
        self.tx.send_if_modified(|state| {
            if state.connection == connection {
                return false;
            }
            debug!("device state: {} -> {}", state.connection, connection);
            state.connection = connection;
            true
        });
    }

    pub fn set_busy(&self, busy: bool) {
        self.tx.send_if_modified(|state| {
            if state.busy == busy {
                return false;
            }
            debug!("device busy: {}", busy);
            state.busy = busy;
            true
        });
    }
}

impl Default for StateHandle {
    fn default() -> Self {
        Self::new()
    }
}
