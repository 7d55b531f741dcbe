//! The live, constructed handler for one device.
//!
//! A handle owns everything with the session's lifetime: the boxed
//! handler, the transaction queue, the observable state and the typed
//! command-injection channel. At most one handle exists per connected
//! device; dispose tears all of it down exactly once.

use crate::domain::command::DeviceCommand;
use crate::domain::device::DeviceIdentity;
use crate::domain::state::{DeviceState, StateHandle};
use crate::service::queue::{SubmitError, TransactionQueue};
use crate::service::support::{DeviceSupport, SupportContext};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

/// Asynchronous command-injection endpoint for one handler. External
/// actors hold clones of this and push capability invocations without
/// touching the handle itself.
#[derive(Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<DeviceCommand>,
}

impl CommandSender {
    /// Returns false once the handler is gone.
    pub fn send(&self, command: DeviceCommand) -> bool {
        self.tx.send(command).is_ok()
    }
}

struct HandleShared {
    support: Arc<dyn DeviceSupport>,
    state: StateHandle,
    busy_checking: bool,
    disposed: AtomicBool,
}

impl HandleShared {
    fn dispatch(&self, command: DeviceCommand) {
        let kind = command.kind();
        if self.disposed.load(Ordering::SeqCst) {
            debug!(
                "Dropping {} for disposed handler {}",
                kind,
                self.support.device()
            );
            return;
        }
        if self.busy_checking && self.state.get().busy {
            info!(
                "Ignoring {} because {} is busy",
                kind,
                self.support.device()
            );
            return;
        }
        if !self.support.supported_commands().contains(&kind) {
            trace!("{} not supported by {}, no-op", kind, self.support.device());
            return;
        }
        self.support.on_command(command);
    }
}

pub struct DeviceSupportHandle {
    device: DeviceIdentity,
    queue: Arc<TransactionQueue>,
    shared: Arc<HandleShared>,
    commands: mpsc::UnboundedSender<DeviceCommand>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl DeviceSupportHandle {
    pub(crate) fn new(
        support: Arc<dyn DeviceSupport>,
        context: SupportContext,
        busy_checking: bool,
    ) -> Self {
        let shared = Arc::new(HandleShared {
            support,
            state: context.state,
            busy_checking,
            disposed: AtomicBool::new(false),
        });

        let (commands, mut command_rx) = mpsc::unbounded_channel();
        let forwarder_shared = shared.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                forwarder_shared.dispatch(command);
            }
        });

        Self {
            device: context.device,
            queue: context.queue,
            shared,
            commands,
            forwarder: Mutex::new(Some(forwarder)),
        }
    }

    pub fn device(&self) -> &DeviceIdentity {
        &self.device
    }

    /// Most recently committed device state.
    pub fn state(&self) -> DeviceState {
        self.shared.state.get()
    }

    pub fn subscribe(&self) -> watch::Receiver<DeviceState> {
        self.shared.state.subscribe()
    }

    pub fn use_auto_connect(&self) -> bool {
        self.shared.support.use_auto_connect()
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.disposed.load(Ordering::SeqCst)
    }

    /// Kick off the initialization transaction for this session.
    pub fn connect(&self) -> Result<(), SubmitError> {
        self.shared.support.connect()
    }

    /// Invoke one capability directly. Fire-and-forget; unsupported
    /// variants and busy devices (with busy-checking on) are dropped.
    pub fn dispatch(&self, command: DeviceCommand) {
        self.shared.dispatch(command);
    }

    /// Endpoint for the asynchronous command-injection channel. Lives as
    /// long as the handle; sends after dispose are dropped.
    pub fn command_sender(&self) -> CommandSender {
        CommandSender {
            tx: self.commands.clone(),
        }
    }

    pub(crate) fn queue(&self) -> &Arc<TransactionQueue> {
        &self.queue
    }

    /// Scoped teardown: stop the command channel and stop the queue.
    /// Queued transactions are discarded, the in-flight action finishes or
    /// times out, and the queue worker commits `Disconnected` on its way
    /// out. Safe to call repeatedly; only the first call does anything.
    /// Never blocks.
    pub fn dispose(&self) {
        if self.shared.disposed.swap(true, Ordering::SeqCst) {
            debug!("dispose() called again for {}, ignoring", self.device);
            return;
        }
        info!("Disposing handler for {}", self.device);
        self.shared.support.dispose();
        if let Some(forwarder) = self.forwarder.lock().unwrap().take() {
            forwarder.abort();
        }
        self.queue.shutdown();
    }
}

impl std::fmt::Debug for DeviceSupportHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSupportHandle")
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl Drop for DeviceSupportHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::command::CommandKind;
    use crate::domain::device::DeviceType;
    use crate::domain::state::ConnectionState;
    use crate::infrastructure::loopback::LoopbackTransport;
    use crate::service::queue::QueueConfig;
    use crate::service::transaction::TransactionBuilder;

    struct RecordingSupport {
        context: SupportContext,
        received: Mutex<Vec<CommandKind>>,
        disposed: AtomicBool,
    }

    impl DeviceSupport for RecordingSupport {
        fn device(&self) -> &DeviceIdentity {
            &self.context.device
        }

        fn supported_commands(&self) -> &'static [CommandKind] {
            &[CommandKind::FindDevice, CommandKind::SetTime]
        }

        fn connect(&self) -> Result<(), SubmitError> {
            self.context.queue.submit(
                TransactionBuilder::new("initialize")
                    .initializing()
                    .open()
                    .set_state(ConnectionState::Initialized)
                    .build(),
            )
        }

        fn on_command(&self, command: DeviceCommand) {
            self.received.lock().unwrap().push(command.kind());
        }

        fn dispose(&self) {
            self.disposed.store(true, Ordering::SeqCst);
        }
    }

    fn make_handle(busy_checking: bool) -> (DeviceSupportHandle, Arc<RecordingSupport>) {
        let device = DeviceIdentity::new("AA:BB:CC:DD:EE:FF", DeviceType::Test);
        let (transport, _peer) = LoopbackTransport::new();
        let state = StateHandle::new();
        let queue = TransactionQueue::spawn(
            device.clone(),
            Box::new(transport),
            state.clone(),
            QueueConfig::default(),
        );
        let context = SupportContext {
            device,
            queue,
            state,
        };
        let support = Arc::new(RecordingSupport {
            context: context.clone(),
            received: Mutex::new(Vec::new()),
            disposed: AtomicBool::new(false),
        });
        (
            DeviceSupportHandle::new(support.clone(), context, busy_checking),
            support,
        )
    }

    #[tokio::test]
    async fn unsupported_commands_are_noops() {
        let (handle, support) = make_handle(false);
        handle.dispatch(DeviceCommand::FindDevice(true));
        handle.dispatch(DeviceCommand::RequestScreenshot);
        handle.dispatch(DeviceCommand::SetTime);
        let received = support.received.lock().unwrap().clone();
        assert_eq!(received, vec![CommandKind::FindDevice, CommandKind::SetTime]);
    }

    #[tokio::test]
    async fn busy_checking_drops_commands_while_busy() {
        let (handle, support) = make_handle(true);
        support.context.state.set_busy(true);
        handle.dispatch(DeviceCommand::FindDevice(true));
        assert!(support.received.lock().unwrap().is_empty());

        support.context.state.set_busy(false);
        handle.dispatch(DeviceCommand::FindDevice(true));
        assert_eq!(
            support.received.lock().unwrap().clone(),
            vec![CommandKind::FindDevice]
        );
    }

    #[tokio::test]
    async fn command_channel_feeds_the_handler() {
        let (handle, support) = make_handle(false);
        let sender = handle.command_sender();
        assert!(sender.send(DeviceCommand::SetTime));

        // The forwarder runs on its own task.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(
            support.received.lock().unwrap().clone(),
            vec![CommandKind::SetTime]
        );
    }

    #[tokio::test]
    async fn dispose_is_idempotent_and_stops_everything() {
        let (handle, support) = make_handle(false);
        handle.connect().unwrap();

        handle.dispose();
        assert!(handle.is_disposed());
        assert!(support.disposed.load(Ordering::SeqCst));

        // Once the worker has wound down, the state settles at Disconnected.
        handle.queue().join().await;
        assert_eq!(handle.state().connection, ConnectionState::Disconnected);

        // Second dispose is a no-op.
        handle.dispose();

        // No command reaches the handler afterwards.
        handle.dispatch(DeviceCommand::SetTime);
        assert!(support
            .received
            .lock()
            .unwrap()
            .iter()
            .all(|k| *k != CommandKind::SetTime));

        // And the queue refuses further work.
        assert!(handle
            .queue()
            .submit(TransactionBuilder::new("late").build())
            .is_err());
    }
}
