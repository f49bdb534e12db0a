//! Attach/detach lifecycle
//!
//! Library side of the host-registration contract: the platform glue that
//! discovers peripherals calls [`DeviceRegistry::attach`] with a bus handle
//! and a config, and [`DeviceRegistry::detach`] when the peripheral goes
//! away. Each attached peripheral maps to exactly one device for its whole
//! attach lifetime; nothing here survives a detach/attach cycle.

use crate::bus::HostBus;
use crate::config::DeviceConfig;
use crate::device::Device;
use protocol::{DeviceError, DeviceId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, warn};

pub struct DeviceRegistry<B: HostBus> {
    devices: HashMap<DeviceId, Arc<Device<B>>>,
    next_id: u32,
}

impl<B: HostBus> Default for DeviceRegistry<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: HostBus> DeviceRegistry<B> {
    pub fn new() -> Self {
        Self {
            devices: HashMap::new(),
            next_id: 1,
        }
    }

    /// Bind a freshly discovered peripheral.
    ///
    /// Validates the config and allocates the device (both staging buffers,
    /// session state). On failure nothing is recorded, and the caller is
    /// expected to unwind its partially created registration resources in
    /// reverse creation order before reporting upward.
    pub fn attach(&mut self, bus: B, config: &DeviceConfig) -> Result<Arc<Device<B>>, DeviceError> {
        let id = DeviceId(self.next_id);
        let device = Arc::new(Device::new(id, bus, config)?);
        self.next_id += 1;
        self.devices.insert(id, device.clone());
        info!(
            "attached {} (capacity {} bytes, clock {} Hz)",
            id, config.capacity, config.clock_hz
        );
        Ok(device)
    }

    /// Drop a peripheral that went away.
    ///
    /// Returns the device so node glue can finish tearing down around it;
    /// in-flight calls on other threads complete against their own
    /// reference.
    pub fn detach(&mut self, id: DeviceId) -> Option<Arc<Device<B>>> {
        let device = self.devices.remove(&id);
        match &device {
            Some(_) => info!("detached {}", id),
            None => warn!("detach for unknown device {}", id),
        }
        device
    }

    pub fn get(&self, id: DeviceId) -> Option<Arc<Device<B>>> {
        self.devices.get(&id).cloned()
    }

    /// Attached device ids, in attach order.
    pub fn list(&self) -> Vec<DeviceId> {
        let mut ids: Vec<_> = self.devices.keys().copied().collect();
        ids.sort_by_key(|id| id.0);
        ids
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
