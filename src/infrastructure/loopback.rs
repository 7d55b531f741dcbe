//! In-memory transport, used by the named development handlers and by
//! tests that need to observe exactly what a handler puts on the wire.

use crate::infrastructure::transport::{Transport, TransportError, TransportKind};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

#[derive(Default)]
struct Shared {
    open: bool,
    fail_writes: bool,
    sent: Vec<Vec<u8>>,
    inbound: VecDeque<Vec<u8>>,
}

/// Far end of a [`LoopbackTransport`]: lets a test script device responses
/// and inspect everything the handler wrote.
#[derive(Clone)]
pub struct LoopbackPeer {
    shared: Arc<Mutex<Shared>>,
    notify: Arc<Notify>,
}

impl LoopbackPeer {
    /// Frames written by the handler so far, in order.
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.shared.lock().unwrap().sent.clone()
    }

    /// Queue bytes for the next transport read.
    pub fn push_inbound(&self, bytes: Vec<u8>) {
        self.shared.lock().unwrap().inbound.push_back(bytes);
        self.notify.notify_one();
    }

    /// Make every subsequent write fail with a NAK.
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.lock().unwrap().fail_writes = fail;
    }

    pub fn is_open(&self) -> bool {
        self.shared.lock().unwrap().open
    }
}

pub struct LoopbackTransport {
    shared: Arc<Mutex<Shared>>,
    notify: Arc<Notify>,
}

impl LoopbackTransport {
    pub fn new() -> (Self, LoopbackPeer) {
        let shared = Arc::new(Mutex::new(Shared::default()));
        let notify = Arc::new(Notify::new());
        let peer = LoopbackPeer {
            shared: shared.clone(),
            notify: notify.clone(),
        };
        (Self { shared, notify }, peer)
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Loopback
    }

    fn is_open(&self) -> bool {
        self.shared.lock().unwrap().open
    }

    async fn open(&mut self) -> Result<(), TransportError> {
        self.shared.lock().unwrap().open = true;
        Ok(())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut shared = self.shared.lock().unwrap();
        if !shared.open {
            return Err(TransportError::NotConnected);
        }
        if shared.fail_writes {
            return Err(TransportError::Nak);
        }
        shared.sent.push(bytes.to_vec());
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        loop {
            {
                let mut shared = self.shared.lock().unwrap();
                if !shared.open {
                    return Err(TransportError::NotConnected);
                }
                if let Some(chunk) = shared.inbound.pop_front() {
                    let n = chunk.len().min(buf.len());
                    buf[..n].copy_from_slice(&chunk[..n]);
                    return Ok(n);
                }
            }
            self.notify.notified().await;
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.shared.lock().unwrap().open = false;
        self.notify.notify_waiters();
        Ok(())
    }
}
