//! Owner of all live device handles.
//!
//! The manager is the single place that maps device addresses to their
//! constructed handles, replacing any notion of process-global handler
//! state. One handle per device, created on demand, disposed exactly once.

use crate::domain::device::DeviceIdentity;
use crate::service::factory::{DeviceSupportFactory, FactoryError};
use crate::service::handle::DeviceSupportHandle;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Sink for user-facing diagnostics such as "Bluetooth is disabled".
/// Injected so the harness never talks to a UI layer directly.
pub trait WarningSink: Send + Sync {
    fn warn(&self, message: &str);
}

/// Default sink: forward warnings to the log.
pub struct LogWarningSink;

impl WarningSink for LogWarningSink {
    fn warn(&self, message: &str) {
        warn!("{}", message);
    }
}

/// Source of the devices the host considers paired or remembered.
pub trait DeviceRegistry: Send + Sync {
    fn active_devices(&self) -> Vec<DeviceIdentity>;
}

pub struct DeviceManager {
    factory: DeviceSupportFactory,
    registry: Option<Arc<dyn DeviceRegistry>>,
    handles: Mutex<HashMap<String, Arc<DeviceSupportHandle>>>,
}

impl DeviceManager {
    pub fn new(factory: DeviceSupportFactory) -> Self {
        Self {
            factory,
            registry: None,
            handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_registry(mut self, registry: Arc<dyn DeviceRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Construct (or reuse) the handle for one device and kick off its
    /// initialization transaction. `Ok(None)` means no handler matched.
    pub async fn connect(
        &self,
        device: &DeviceIdentity,
    ) -> Result<Option<Arc<DeviceSupportHandle>>, FactoryError> {
        if let Some(existing) = self.get(device.address()) {
            if !existing.is_disposed() {
                info!("Reusing existing handler for {}", device);
                return Ok(Some(existing));
            }
            // Stale entry from an earlier session; drop it and rebuild.
            self.handles.lock().unwrap().remove(device.address());
        }

        let Some(handle) = self.factory.create(device).await? else {
            return Ok(None);
        };
        let handle = Arc::new(handle);

        // The factory call is async; someone may have connected the same
        // device meanwhile. The map stays authoritative: keep the first
        // live handle, dispose the one we just built.
        {
            let mut handles = self.handles.lock().unwrap();
            if let Some(existing) = handles.get(device.address()) {
                if !existing.is_disposed() {
                    handle.dispose();
                    return Ok(Some(existing.clone()));
                }
            }
            handles.insert(device.address().to_string(), handle.clone());
        }

        if let Err(e) = handle.connect() {
            self.handles.lock().unwrap().remove(device.address());
            handle.dispose();
            return Err(FactoryError::ConstructionFailure {
                name: device.address().to_string(),
                source: e.into(),
            });
        }
        Ok(Some(handle))
    }

    pub fn get(&self, address: &str) -> Option<Arc<DeviceSupportHandle>> {
        self.handles.lock().unwrap().get(address).cloned()
    }

    /// Tear down one device's session, if it has one.
    pub fn disconnect(&self, address: &str) {
        if let Some(handle) = self.handles.lock().unwrap().remove(address) {
            handle.dispose();
        }
    }

    /// Tear down every live session.
    pub fn dispose_all(&self) {
        let handles: Vec<_> = self.handles.lock().unwrap().drain().collect();
        for (_, handle) in handles {
            handle.dispose();
        }
    }

    /// Connect everything the registry remembers. Individual failures are
    /// reported and skipped so one bad device never blocks the rest.
    pub async fn connect_known(&self) {
        let Some(registry) = self.registry.clone() else {
            return;
        };
        for device in registry.active_devices() {
            match self.connect(&device).await {
                Ok(Some(_)) => {}
                Ok(None) => info!("No handler for known device {}", device),
                Err(e) => warn!("Connecting known device {} failed: {:#}", device, e),
            }
        }
    }
}
