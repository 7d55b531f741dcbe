//! Host-side harness for heterogeneous wearable devices.
//!
//! The crate bridges an embedding application and many dissimilar
//! wearables behind one surface: a factory resolves a device identity to
//! a protocol handler bound to a transport, every handler speaks the same
//! fire-and-forget capability contract, and all transport work for a
//! device flows through that device's own transaction queue, one action
//! at a time, in submission order. Connection progress is an observable
//! state machine per device.
//!
//! The embedding application supplies the OS pieces: a
//! [`BluetoothBinding`](infrastructure::bluetooth::BluetoothBinding) for
//! radio access and optionally a
//! [`DeviceRegistry`](service::manager::DeviceRegistry) of remembered
//! devices.

pub mod devices;
pub mod domain;
pub mod infrastructure;
pub mod service;

pub use domain::command::{CommandKind, DeviceCommand};
pub use domain::device::{AddressKind, DeviceIdentity, DeviceType};
pub use domain::settings::{Settings, SettingsService};
pub use domain::state::{ConnectionState, DeviceState, StateHandle};
pub use infrastructure::logging::{init_logger, LoggingGuard};
pub use service::factory::{DeviceSupportFactory, FactoryError};
pub use service::handle::{CommandSender, DeviceSupportHandle};
pub use service::manager::{DeviceManager, DeviceRegistry, LogWarningSink, WarningSink};
pub use service::queue::{FailurePolicy, SubmitError, TransactionQueue};
pub use service::support::{DeviceSupport, SupportContext};
pub use service::transaction::{TransactionBuilder, TransactionOutcome};
