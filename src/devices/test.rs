//! Development handler, reachable through the factory's named registry
//! rather than a transport-specific address. Writes readable tagged
//! frames so exercising the harness needs no real device.

use crate::domain::command::{CommandKind, DeviceCommand};
use crate::domain::device::DeviceIdentity;
use crate::domain::state::ConnectionState;
use crate::service::queue::SubmitError;
use crate::service::support::{DeviceSupport, SupportContext};
use crate::service::transaction::TransactionBuilder;
use std::sync::Arc;
use tracing::debug;

/// Registry key under which this handler ships by default.
pub const HANDLER_NAME: &str = "wearbridge.devices.TestSupport";

pub struct TestSupport {
    context: SupportContext,
}

impl TestSupport {
    pub fn create(context: SupportContext) -> anyhow::Result<Arc<dyn DeviceSupport>> {
        Ok(Arc::new(Self { context }))
    }
}

impl DeviceSupport for TestSupport {
    fn device(&self) -> &DeviceIdentity {
        &self.context.device
    }

    fn supported_commands(&self) -> &'static [CommandKind] {
        &[
            CommandKind::Notification,
            CommandKind::SetTime,
            CommandKind::FindDevice,
        ]
    }

    fn connect(&self) -> Result<(), SubmitError> {
        self.context.queue.submit(
            TransactionBuilder::new("test initialize")
                .initializing()
                .set_state(ConnectionState::Connecting)
                .open()
                .set_state(ConnectionState::Initializing)
                .write(b"INIT".to_vec())
                .set_state(ConnectionState::Initialized)
                .build(),
        )
    }

    fn on_command(&self, command: DeviceCommand) {
        let bytes = match command {
            DeviceCommand::Notification(spec) => format!("NOTIFY {}", spec.title).into_bytes(),
            DeviceCommand::SetTime => b"SETTIME".to_vec(),
            DeviceCommand::FindDevice(start) => format!("FIND {}", start).into_bytes(),
            other => {
                debug!("Test handler got undispatched command {}", other.kind());
                return;
            }
        };
        if let Err(e) = self
            .context
            .queue
            .submit(TransactionBuilder::new("test command").write(bytes).build())
        {
            debug!("Test command dropped: {}", e);
        }
    }
}
