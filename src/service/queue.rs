//! Per-device transaction queue.
//!
//! One queue exists per connected device. Producers on any thread submit
//! transactions; a single worker task owns the transport and executes the
//! queued transactions strictly in submission order, one action at a time.
//! Devices make progress independently: no lock spans two queues.

use crate::domain::device::DeviceIdentity;
use crate::domain::settings::QueueSettings;
use crate::domain::state::{ConnectionState, StateHandle};
use crate::infrastructure::transport::Transport;
use crate::service::action::ActionContext;
use crate::service::transaction::{Transaction, TransactionKind, TransactionOutcome};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What happens to the remaining actions of a transaction once one of them
/// fails. Explicit and queue-level; call sites never decide this.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Skip the rest of the failed transaction.
    #[default]
    AbortTransaction,
    /// Run the remaining actions anyway.
    Continue,
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Bounded timeout applied to every action; an action that exceeds it
    /// resolves as failed instead of hanging the queue.
    pub action_timeout: Duration,
    pub failure_policy: FailurePolicy,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            action_timeout: Duration::from_secs(10),
            failure_policy: FailurePolicy::AbortTransaction,
        }
    }
}

impl From<&QueueSettings> for QueueConfig {
    fn from(settings: &QueueSettings) -> Self {
        let failure_policy = match settings.failure_policy.to_lowercase().as_str() {
            "continue" => FailurePolicy::Continue,
            _ => FailurePolicy::AbortTransaction,
        };
        Self {
            action_timeout: Duration::from_millis(settings.action_timeout_ms),
            failure_policy,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("transaction queue is closed")]
    QueueClosed,
}

/// Submission side of a device's queue. Cheap to share; `submit` never
/// blocks on transport I/O.
pub struct TransactionQueue {
    device: DeviceIdentity,
    submit_tx: mpsc::UnboundedSender<Transaction>,
    shutdown: Arc<watch::Sender<bool>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl TransactionQueue {
    /// Start the queue worker for one device. The worker takes ownership
    /// of the transport; it is the only context that touches it.
    pub fn spawn(
        device: DeviceIdentity,
        transport: Box<dyn Transport>,
        state: StateHandle,
        config: QueueConfig,
    ) -> Arc<Self> {
        let (submit_tx, submit_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shutdown = Arc::new(shutdown_tx);

        let worker = Worker {
            device: device.clone(),
            transport,
            state,
            config,
            shutdown: shutdown.clone(),
        };
        let handle = tokio::spawn(worker.run(submit_rx, shutdown_rx));

        Arc::new(Self {
            device,
            submit_tx,
            shutdown,
            worker: Mutex::new(Some(handle)),
        })
    }

    /// Enqueue a transaction. Returns an error once the queue has shut
    /// down; the transaction is then discarded, not executed.
    pub fn submit(&self, transaction: Transaction) -> Result<(), SubmitError> {
        if *self.shutdown.borrow() {
            transaction.complete(TransactionOutcome::Discarded);
            return Err(SubmitError::QueueClosed);
        }
        debug!(
            "Queueing transaction '{}' for {}",
            transaction.label(),
            self.device
        );
        self.submit_tx.send(transaction).map_err(|err| {
            let mpsc::error::SendError(transaction) = err;
            transaction.complete(TransactionOutcome::Discarded);
            SubmitError::QueueClosed
        })
    }

    pub fn is_closed(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Stop accepting submissions and discard everything still queued. The
    /// action currently executing finishes or times out; it is never
    /// interrupted mid-flight. Non-blocking.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(true);
    }

    /// Wait for the worker to finish. Used by orderly teardown and tests.
    pub async fn join(&self) {
        let handle = self.worker.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

struct Worker {
    device: DeviceIdentity,
    transport: Box<dyn Transport>,
    state: StateHandle,
    config: QueueConfig,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Worker {
    async fn run(
        mut self,
        mut submit_rx: mpsc::UnboundedReceiver<Transaction>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        debug!("Queue worker for {} started", self.device);
        loop {
            tokio::select! {
                biased;
                // Drop the non-Send `watch::Ref` inside the arm so the
                // select's output stays `Send` across the await below.
                _ = async { let _ = shutdown_rx.wait_for(|closed| *closed).await; } => break,
                maybe = submit_rx.recv() => match maybe {
                    Some(transaction) => {
                        if *self.shutdown.borrow() {
                            transaction.complete(TransactionOutcome::Discarded);
                            continue;
                        }
                        if self.execute(transaction).await {
                            // initialization failed, session is over
                            let _ = self.shutdown.send(true);
                            break;
                        }
                    }
                    None => break,
                },
            }
        }

        // Discard whatever was still queued, then release the transport.
        submit_rx.close();
        while let Ok(transaction) = submit_rx.try_recv() {
            debug!(
                "Discarding queued transaction '{}' for {}",
                transaction.label(),
                self.device
            );
            transaction.complete(TransactionOutcome::Discarded);
        }
        let _ = self.transport.close().await;
        // The session is over either way; commit the terminal state from
        // the worker so it stays ordered after the last executed action.
        self.state.set_connection(ConnectionState::Disconnected);
        debug!("Queue worker for {} stopped", self.device);
    }

    /// Execute one transaction. Returns true if the session must end
    /// (initialization failure).
    async fn execute(&mut self, transaction: Transaction) -> bool {
        let Transaction {
            label,
            kind,
            actions,
            completion,
        } = transaction;
        info!("Executing transaction '{}' ({} actions)", label, actions.len());

        let mut failure: Option<String> = None;
        for mut action in actions {
            if failure.is_some() && self.config.failure_policy == FailurePolicy::AbortTransaction {
                break;
            }
            let mut ctx = ActionContext {
                transport: self.transport.as_mut(),
                state: &self.state,
            };
            match tokio::time::timeout(self.config.action_timeout, action.run(&mut ctx)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!("Action '{}' in '{}' failed: {}", action.name(), label, e);
                    failure.get_or_insert_with(|| action.name().to_string());
                }
                Err(_) => {
                    warn!(
                        "Action '{}' in '{}' timed out after {:?}",
                        action.name(),
                        label,
                        self.config.action_timeout
                    );
                    failure.get_or_insert_with(|| action.name().to_string());
                }
            }
        }

        match failure {
            None => {
                Transaction::finish(completion, TransactionOutcome::Completed);
                false
            }
            Some(action) => {
                let terminal = kind == TransactionKind::Initializing;
                if terminal {
                    warn!(
                        "Initialization of {} failed, marking disconnected",
                        self.device
                    );
                    self.state.set_connection(ConnectionState::Disconnected);
                }
                Transaction::finish(completion, TransactionOutcome::Failed { action });
                terminal
            }
        }
    }
}
