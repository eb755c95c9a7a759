use crate::{DeviceConfig, Error, ErrorKind, TunDevice};
use log::debug;
use netbuf::BufferService;
use std::{collections::HashMap, sync::Arc};
use tunfd::Opener;

/// Owns every tunnel device of a host, keyed by interface name.
///
/// All devices share the registry's buffer service; each one gets its own transport opener.
pub struct DeviceRegistry {
    buffers: Arc<dyn BufferService>,
    devices: HashMap<String, TunDevice>,
}

impl DeviceRegistry {
    pub fn new(buffers: Arc<dyn BufferService>) -> Self {
        DeviceRegistry {
            buffers,
            devices: HashMap::new(),
        }
    }

    /// Initializes a device and registers it. Fails with `InvalidArgument` if a device of that
    /// name already exists or the configuration is rejected.
    pub fn create(
        &mut self,
        config: DeviceConfig,
        opener: Arc<dyn Opener>,
    ) -> Result<&mut TunDevice, Error> {
        if self.devices.contains_key(config.name()) {
            Err(ErrorKind::InvalidArgument)?
        }
        let device = TunDevice::initialize(config, self.buffers.clone(), opener)?;
        let name = device.name().to_owned();
        debug!("registered {}", name);
        Ok(self.devices.entry(name).or_insert(device))
    }

    pub fn get(&self, name: &str) -> Option<&TunDevice> {
        self.devices.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TunDevice> {
        self.devices.get_mut(name)
    }

    /// Unregisters the device and tears it down. Returns whether a device was found.
    pub fn remove(&mut self, name: &str) -> bool {
        match self.devices.remove(name) {
            Some(device) => {
                device.teardown();
                true
            }
            None => false,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

impl Drop for DeviceRegistry {
    fn drop(&mut self) {
        for (_, device) in self.devices.drain() {
            device.teardown();
        }
    }
}
