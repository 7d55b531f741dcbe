//! Bluetooth collaborator interfaces.
//!
//! The harness does not talk to an OS Bluetooth stack directly. The host
//! application supplies a [`BluetoothBinding`] that answers the radio
//! availability query and opens Classic or Low Energy transports for a
//! hardware address; the factory consumes it when dispatching Bluetooth
//! device families.

use crate::infrastructure::transport::{Transport, TransportError};

/// Which Bluetooth flavour a handler requires for its device family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BluetoothFlavor {
    Classic,
    LowEnergy,
}

/// OS-level Bluetooth access, provided by the embedding application.
///
/// Opening returns an unconnected transport: the actual connect happens
/// inside the handler's initialization transaction, on the device's own
/// queue worker.
pub trait BluetoothBinding: Send + Sync {
    /// Whether the host has a Bluetooth radio at all.
    fn is_present(&self) -> bool;

    /// Whether the radio is currently enabled.
    fn is_enabled(&self) -> bool;

    fn open_classic(&self, address: &str) -> Result<Box<dyn Transport>, TransportError>;

    fn open_low_energy(&self, address: &str) -> Result<Box<dyn Transport>, TransportError>;
}

/// Binding for hosts without any Bluetooth radio. Socket and named device
/// families still work with this installed.
pub struct NoRadio;

impl BluetoothBinding for NoRadio {
    fn is_present(&self) -> bool {
        false
    }

    fn is_enabled(&self) -> bool {
        false
    }

    fn open_classic(&self, _address: &str) -> Result<Box<dyn Transport>, TransportError> {
        Err(TransportError::ConnectionFailed(
            "no bluetooth radio".to_string(),
        ))
    }

    fn open_low_energy(&self, _address: &str) -> Result<Box<dyn Transport>, TransportError> {
        Err(TransportError::ConnectionFailed(
            "no bluetooth radio".to_string(),
        ))
    }
}
