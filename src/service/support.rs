//! The device support capability contract.

use crate::domain::command::{CommandKind, DeviceCommand};
use crate::domain::device::DeviceIdentity;
use crate::domain::state::StateHandle;
use crate::service::queue::{SubmitError, TransactionQueue};
use std::sync::Arc;

/// Everything a handler needs to drive its device: the identity it is
/// bound to, the queue it feeds and the state machine it owns.
#[derive(Clone)]
pub struct SupportContext {
    pub device: DeviceIdentity,
    pub queue: Arc<TransactionQueue>,
    pub state: StateHandle,
}

/// Protocol-specific implementation of the capability contract for one
/// device family.
///
/// Every method is fire-and-forget: implementations translate calls into
/// transactions and return promptly, leaving the transport work to the
/// device's queue worker. Handlers declare the command variants they
/// support; the dispatch layer silently drops everything else, so callers
/// never probe capabilities first.
pub trait DeviceSupport: Send + Sync {
    fn device(&self) -> &DeviceIdentity;

    /// Command variants this handler turns into transactions.
    fn supported_commands(&self) -> &'static [CommandKind];

    /// Whether the transport should reconnect on its own after the device
    /// drops the link.
    fn use_auto_connect(&self) -> bool {
        false
    }

    /// Build and submit the initialization transaction that takes the
    /// session from `Connecting` to `Initialized`.
    fn connect(&self) -> Result<(), SubmitError>;

    /// Translate one capability invocation into transactions. Called only
    /// for variants listed in [`supported_commands`](Self::supported_commands).
    fn on_command(&self, command: DeviceCommand);

    /// Release handler-owned resources. The owning handle guarantees this
    /// runs at most once; it must not block.
    fn dispose(&self) {}
}
