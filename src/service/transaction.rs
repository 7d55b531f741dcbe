//! Transactions: ordered, named batches of actions submitted as one unit.

use crate::domain::state::ConnectionState;
use crate::service::action::{
    Action, CloseTransportAction, OpenTransportAction, SetBusyAction, SetDeviceStateAction,
    WaitAction, WriteAction,
};
use std::time::Duration;
use tokio::sync::oneshot;

/// Initialization transactions get special failure handling: a failure
/// there is terminal for the session and forces `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Normal,
    Initializing,
}

/// How a submitted transaction ended, delivered through the optional
/// completion channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionOutcome {
    Completed,
    /// Name of the first action that failed or timed out.
    Failed { action: String },
    /// Discarded without executing (queue shut down first).
    Discarded,
}

/// An immutable unit of work for one device. Built by the handler through
/// [`TransactionBuilder`]; no further actions may be appended once built.
pub struct Transaction {
    pub(crate) label: String,
    pub(crate) kind: TransactionKind,
    pub(crate) actions: Vec<Box<dyn Action>>,
    pub(crate) completion: Option<oneshot::Sender<TransactionOutcome>>,
}

impl Transaction {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> TransactionKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub(crate) fn complete(self, outcome: TransactionOutcome) {
        if let Some(tx) = self.completion {
            let _ = tx.send(outcome);
        }
    }

    /// Notify completion after the actions were consumed by the worker.
    pub(crate) fn finish(
        completion: Option<oneshot::Sender<TransactionOutcome>>,
        outcome: TransactionOutcome,
    ) {
        if let Some(tx) = completion {
            let _ = tx.send(outcome);
        }
    }
}

pub struct TransactionBuilder {
    label: String,
    kind: TransactionKind,
    actions: Vec<Box<dyn Action>>,
    completion: Option<oneshot::Sender<TransactionOutcome>>,
}

impl TransactionBuilder {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: TransactionKind::Normal,
            actions: Vec::new(),
            completion: None,
        }
    }

    /// Mark this as the session's initialization transaction.
    pub fn initializing(mut self) -> Self {
        self.kind = TransactionKind::Initializing;
        self
    }

    pub fn add(mut self, action: impl Action + 'static) -> Self {
        self.actions.push(Box::new(action));
        self
    }

    pub fn open(self) -> Self {
        self.add(OpenTransportAction)
    }

    pub fn write(self, bytes: Vec<u8>) -> Self {
        self.add(WriteAction::new(bytes))
    }

    pub fn set_state(self, state: ConnectionState) -> Self {
        self.add(SetDeviceStateAction::new(state))
    }

    pub fn set_busy(self, busy: bool) -> Self {
        self.add(SetBusyAction::new(busy))
    }

    pub fn wait(self, duration: Duration) -> Self {
        self.add(WaitAction::new(duration))
    }

    pub fn close(self) -> Self {
        self.add(CloseTransportAction)
    }

    /// Attach a completion channel; the receiver resolves once the queue
    /// has executed or discarded the transaction.
    pub fn with_completion(mut self) -> (Self, oneshot::Receiver<TransactionOutcome>) {
        let (tx, rx) = oneshot::channel();
        self.completion = Some(tx);
        (self, rx)
    }

    pub fn build(self) -> Transaction {
        Transaction {
            label: self.label,
            kind: self.kind,
            actions: self.actions,
            completion: self.completion,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_preserves_action_order_and_kind() {
        let txn = TransactionBuilder::new("init")
            .initializing()
            .open()
            .set_state(ConnectionState::Initializing)
            .write(vec![0x01])
            .set_state(ConnectionState::Initialized)
            .build();

        assert_eq!(txn.label(), "init");
        assert_eq!(txn.kind(), TransactionKind::Initializing);
        assert_eq!(txn.len(), 4);
    }

    #[tokio::test]
    async fn discarded_transaction_resolves_completion() {
        let (builder, rx) = TransactionBuilder::new("never runs").with_completion();
        let txn = builder.write(vec![1]).build();
        txn.complete(TransactionOutcome::Discarded);
        assert_eq!(rx.await.unwrap(), TransactionOutcome::Discarded);
    }
}
