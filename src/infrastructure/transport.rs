//! Transport abstraction.
//!
//! A transport is the byte channel between the harness and one device:
//! Bluetooth Classic, Bluetooth Low Energy or a raw socket. Exactly one
//! execution context (the device's queue worker) performs I/O on a
//! transport, so implementations do not need internal locking.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("not connected")]
    NotConnected,
    #[error("negative acknowledgement from device")]
    Nak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    BluetoothClassic,
    BluetoothLe,
    Socket,
    Loopback,
}

/// Byte-level channel to one device. Borrowed by actions for the duration
/// of their execution only; owned by the device's queue worker.
#[async_trait]
pub trait Transport: Send {
    fn kind(&self) -> TransportKind;

    fn is_open(&self) -> bool;

    /// Establish the underlying connection. Called from an action inside
    /// the initialization transaction, never from the submitting thread.
    async fn open(&mut self) -> Result<(), TransportError>;

    /// Write one command frame to the device's command endpoint.
    async fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Read available bytes from the device. Blocks the owning worker
    /// until data arrives; the queue bounds this with its action timeout.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    async fn close(&mut self) -> Result<(), TransportError>;
}
