//! Resolves a device identity to a constructed, transport-bound handler.

use crate::devices::pebble::PebbleSupport;
use crate::devices::pinetime::PineTimeSupport;
use crate::devices::test::TestSupport;
use crate::domain::device::{AddressKind, DeviceIdentity, DeviceType};
use crate::domain::settings::QueueSettings;
use crate::domain::state::StateHandle;
use crate::infrastructure::bluetooth::{BluetoothBinding, BluetoothFlavor};
use crate::infrastructure::loopback::LoopbackTransport;
use crate::infrastructure::socket::SocketTransport;
use crate::infrastructure::transport::Transport;
use crate::service::handle::DeviceSupportHandle;
use crate::service::manager::WarningSink;
use crate::service::queue::{QueueConfig, TransactionQueue};
use crate::service::support::{DeviceSupport, SupportContext};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum FactoryError {
    /// Handler construction itself failed. Distinct from "no handler
    /// found", which is a normal negative result, not an error.
    #[error("error constructing device support for {name}")]
    ConstructionFailure {
        name: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Constructor for one device family in the closed Bluetooth table.
type SupportConstructor = fn(SupportContext) -> anyhow::Result<Arc<dyn DeviceSupport>>;

/// Constructor registered under a string key for dynamic/dev handlers.
type NamedConstructor =
    Arc<dyn Fn(SupportContext) -> anyhow::Result<Arc<dyn DeviceSupport>> + Send + Sync>;

struct BluetoothEntry {
    flavor: BluetoothFlavor,
    construct: SupportConstructor,
}

/// Closed lookup table mapping Bluetooth device types to handlers. Types
/// without an entry yield "no handler", which is not a failure.
fn bluetooth_entry(device_type: DeviceType) -> Option<BluetoothEntry> {
    match device_type {
        DeviceType::Pebble => Some(BluetoothEntry {
            flavor: BluetoothFlavor::Classic,
            construct: PebbleSupport::create,
        }),
        DeviceType::PineTimeJF => Some(BluetoothEntry {
            flavor: BluetoothFlavor::LowEnergy,
            construct: PineTimeSupport::create,
        }),
        _ => None,
    }
}

pub struct DeviceSupportFactory {
    bluetooth: Arc<dyn BluetoothBinding>,
    warnings: Arc<dyn WarningSink>,
    queue_config: QueueConfig,
    connect_timeout: Duration,
    named: Mutex<HashMap<String, NamedConstructor>>,
    // One entry per identity ever constructed; serializes construction for
    // the same device while different devices proceed concurrently.
    building: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl DeviceSupportFactory {
    pub fn new(
        bluetooth: Arc<dyn BluetoothBinding>,
        warnings: Arc<dyn WarningSink>,
        settings: &QueueSettings,
    ) -> Self {
        let factory = Self {
            bluetooth,
            warnings,
            queue_config: QueueConfig::from(settings),
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
            named: Mutex::new(HashMap::new()),
            building: Mutex::new(HashMap::new()),
        };
        factory.register_named(crate::devices::test::HANDLER_NAME, TestSupport::create);
        factory
    }

    /// Register a handler constructor under a string key, the explicit
    /// replacement for resolving handler class names at runtime.
    pub fn register_named<F>(&self, name: impl Into<String>, construct: F)
    where
        F: Fn(SupportContext) -> anyhow::Result<Arc<dyn DeviceSupport>> + Send + Sync + 'static,
    {
        self.named
            .lock()
            .unwrap()
            .insert(name.into(), Arc::new(construct));
    }

    /// Resolve and construct the handler for one device.
    ///
    /// `Ok(None)` means no handler matched the identity — the caller may
    /// fall through to availability diagnostics or other address formats.
    pub async fn create(
        &self,
        device: &DeviceIdentity,
    ) -> Result<Option<DeviceSupportHandle>, FactoryError> {
        let identity_lock = self.identity_lock(device.address());
        let _guard = identity_lock.lock().await;

        let created = match device.address_kind() {
            AddressKind::Socket => Some(self.create_socket_support(device)?),
            AddressKind::Bluetooth => self.create_bluetooth_support(device)?,
            AddressKind::HandlerName => self.create_named_support(device)?,
        };

        if created.is_none() {
            // No handler found; tell the user if the radio is the reason.
            self.check_bluetooth_availability();
        }
        Ok(created)
    }

    fn identity_lock(&self, address: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.building
            .lock()
            .unwrap()
            .entry(address.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// `host:port` addresses talk to the Pebble emulator; busy-checking is
    /// enabled on this path.
    fn create_socket_support(
        &self,
        device: &DeviceIdentity,
    ) -> Result<DeviceSupportHandle, FactoryError> {
        info!("Creating socket device support for {}", device);
        let transport = Box::new(SocketTransport::new(device.address(), self.connect_timeout));
        self.assemble(device, transport, PebbleSupport::create, true)
    }

    fn create_bluetooth_support(
        &self,
        device: &DeviceIdentity,
    ) -> Result<Option<DeviceSupportHandle>, FactoryError> {
        if !self.bluetooth.is_present() || !self.bluetooth.is_enabled() {
            return Ok(None);
        }
        let Some(entry) = bluetooth_entry(device.device_type()) else {
            debug!("No handler registered for device type {}", device.device_type());
            return Ok(None);
        };
        info!("Creating Bluetooth device support for {}", device);
        let transport = match entry.flavor {
            BluetoothFlavor::Classic => self.bluetooth.open_classic(device.address()),
            BluetoothFlavor::LowEnergy => self.bluetooth.open_low_energy(device.address()),
        }
        .map_err(|e| FactoryError::ConstructionFailure {
            name: device.address().to_string(),
            source: e.into(),
        })?;
        self.assemble(device, transport, entry.construct, false)
            .map(Some)
    }

    /// Zero-colon addresses are handler names. An unknown name is not an
    /// error: the address may legitimately be a format checked elsewhere.
    fn create_named_support(
        &self,
        device: &DeviceIdentity,
    ) -> Result<Option<DeviceSupportHandle>, FactoryError> {
        let construct = match self.named.lock().unwrap().get(device.address()) {
            Some(construct) => construct.clone(),
            None => {
                debug!("'{}' is not a registered handler name", device.address());
                return Ok(None);
            }
        };
        info!("Creating named device support '{}'", device.address());
        let (transport, _peer) = LoopbackTransport::new();
        let state = StateHandle::new();
        let queue = TransactionQueue::spawn(
            device.clone(),
            Box::new(transport),
            state.clone(),
            self.queue_config.clone(),
        );
        let context = SupportContext {
            device: device.clone(),
            queue: queue.clone(),
            state,
        };
        match construct(context.clone()) {
            Ok(support) => Ok(Some(DeviceSupportHandle::new(support, context, false))),
            Err(source) => {
                queue.shutdown();
                Err(FactoryError::ConstructionFailure {
                    name: device.address().to_string(),
                    source,
                })
            }
        }
    }

    fn assemble(
        &self,
        device: &DeviceIdentity,
        transport: Box<dyn Transport>,
        construct: SupportConstructor,
        busy_checking: bool,
    ) -> Result<DeviceSupportHandle, FactoryError> {
        let state = StateHandle::new();
        let queue = TransactionQueue::spawn(
            device.clone(),
            transport,
            state.clone(),
            self.queue_config.clone(),
        );
        let context = SupportContext {
            device: device.clone(),
            queue: queue.clone(),
            state,
        };
        match construct(context.clone()) {
            Ok(support) => Ok(DeviceSupportHandle::new(support, context, busy_checking)),
            Err(source) => {
                queue.shutdown();
                Err(FactoryError::ConstructionFailure {
                    name: device.address().to_string(),
                    source,
                })
            }
        }
    }

    fn check_bluetooth_availability(&self) {
        if !self.bluetooth.is_present() {
            self.warnings.warn("Bluetooth is not supported on this host");
        } else if !self.bluetooth.is_enabled() {
            self.warnings.warn("Bluetooth is disabled");
        }
    }
}
