//! Actions: the smallest schedulable unit of transport work.

use crate::domain::state::{ConnectionState, StateHandle};
use crate::infrastructure::transport::{Transport, TransportError};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("action failed: {0}")]
    Failed(String),
}

/// Execution environment handed to an action: the device's transport and
/// state handle, borrowed only for the duration of the action.
pub struct ActionContext<'a> {
    pub transport: &'a mut dyn Transport,
    pub state: &'a StateHandle,
}

/// A single operation against one device. Stateless beyond its own
/// parameters; exactly one action runs against a device at any instant.
#[async_trait]
pub trait Action: Send {
    fn name(&self) -> &str;

    async fn run(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError>;
}

/// Opens the transport. Always the first real step of an initialization
/// transaction, so connecting happens on the device's own worker.
pub struct OpenTransportAction;

#[async_trait]
impl Action for OpenTransportAction {
    fn name(&self) -> &str {
        "open transport"
    }

    async fn run(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        ctx.transport.open().await?;
        Ok(())
    }
}

/// Writes one frame to the device.
pub struct WriteAction {
    bytes: Vec<u8>,
}

impl WriteAction {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}

#[async_trait]
impl Action for WriteAction {
    fn name(&self) -> &str {
        "write"
    }

    async fn run(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        debug!("writing {} bytes", self.bytes.len());
        ctx.transport.write(&self.bytes).await?;
        Ok(())
    }
}

/// Mutates the connection state machine as an ordered step of a
/// transaction, so state changes stay consistent with the transport
/// operations around them.
pub struct SetDeviceStateAction {
    state: ConnectionState,
}

impl SetDeviceStateAction {
    pub fn new(state: ConnectionState) -> Self {
        Self { state }
    }
}

#[async_trait]
impl Action for SetDeviceStateAction {
    fn name(&self) -> &str {
        "set device state"
    }

    async fn run(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        ctx.state.set_connection(self.state);
        Ok(())
    }
}

/// Raises or clears the orthogonal busy flag around bulk work.
pub struct SetBusyAction {
    busy: bool,
}

impl SetBusyAction {
    pub fn new(busy: bool) -> Self {
        Self { busy }
    }
}

#[async_trait]
impl Action for SetBusyAction {
    fn name(&self) -> &str {
        "set busy"
    }

    async fn run(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        ctx.state.set_busy(self.busy);
        Ok(())
    }
}

/// Delays the worker between writes. Some devices drop frames that arrive
/// back to back during initialization.
pub struct WaitAction {
    duration: Duration,
}

impl WaitAction {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

#[async_trait]
impl Action for WaitAction {
    fn name(&self) -> &str {
        "wait"
    }

    async fn run(&mut self, _ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        tokio::time::sleep(self.duration).await;
        Ok(())
    }
}

/// Closes the transport as the final step of a teardown transaction.
pub struct CloseTransportAction;

#[async_trait]
impl Action for CloseTransportAction {
    fn name(&self) -> &str {
        "close transport"
    }

    async fn run(&mut self, ctx: &mut ActionContext<'_>) -> Result<(), ActionError> {
        ctx.transport.close().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::loopback::LoopbackTransport;

    #[tokio::test]
    async fn state_actions_update_the_handle() {
        let (mut transport, _peer) = LoopbackTransport::new();
        let state = StateHandle::new();
        let mut ctx = ActionContext {
            transport: &mut transport,
            state: &state,
        };

        SetDeviceStateAction::new(ConnectionState::Connecting)
            .run(&mut ctx)
            .await
            .unwrap();
        SetBusyAction::new(true).run(&mut ctx).await.unwrap();

        assert_eq!(state.get().connection, ConnectionState::Connecting);
        assert!(state.get().busy);
    }

    #[tokio::test]
    async fn write_action_reaches_the_transport() {
        let (mut transport, peer) = LoopbackTransport::new();
        let state = StateHandle::new();
        let mut ctx = ActionContext {
            transport: &mut transport,
            state: &state,
        };

        OpenTransportAction.run(&mut ctx).await.unwrap();
        WriteAction::new(vec![1, 2, 3]).run(&mut ctx).await.unwrap();
        assert_eq!(peer.sent(), vec![vec![1, 2, 3]]);
    }
}
