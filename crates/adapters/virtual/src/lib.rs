//! # rfhub-adapter-virtual
//!
//! In-memory device library. Behaves like the hardware backend where it
//! matters to callers: ids are allocated by the library, unknown ids read as
//! zero values, and a device refuses actions it has no capability for.
//!
//! ## Demo devices
//!
//! | Id | Name | On/off | Dim | Learn |
//! |----|------|--------|-----|-------|
//! | 1 | Desk Lamp | yes | no | no |
//! | 2 | Hall Dimmer | yes | yes | no |
//! | 3 | Porch Light | yes | yes | yes |
//!
//! ## Dependency rule
//!
//! Depends on `rfhub-app` (port traits) and `rfhub-domain` only.

mod device;

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rfhub_app::ports::DeviceLibrary;
use rfhub_domain::device::{Capability, DimLevel, Parameters, check_parameter};
use rfhub_domain::error::{EnumerationError, NotFoundError, RfHubError, UnsupportedError};
use rfhub_domain::id::DeviceId;

pub use device::VirtualDevice;

/// Simulated device library.
#[derive(Debug, Default)]
pub struct VirtualLibrary {
    devices: Mutex<BTreeMap<DeviceId, VirtualDevice>>,
}

impl VirtualLibrary {
    /// An empty library.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A library seeded with the demo devices.
    #[must_use]
    pub fn with_demo_devices() -> Self {
        let library = Self::new();
        library.insert(DeviceId::new(1), VirtualDevice::switch("Desk Lamp"));
        library.insert(DeviceId::new(2), VirtualDevice::dimmer("Hall Dimmer"));
        library.insert(DeviceId::new(3), VirtualDevice::learning_dimmer("Porch Light"));
        library
    }

    /// Put a device under a specific id, replacing any previous one.
    pub fn insert(&self, id: DeviceId, device: VirtualDevice) {
        self.lock().insert(id, device);
    }

    /// Snapshot of a device.
    pub fn device(&self, id: DeviceId) -> Option<VirtualDevice> {
        self.lock().get(&id).cloned()
    }

    /// Change what a device can do.
    ///
    /// # Errors
    ///
    /// Returns [`RfHubError::NotFound`] for an unknown id.
    pub fn set_capabilities(
        &self,
        id: DeviceId,
        on_off: bool,
        dim: bool,
        learn: bool,
    ) -> Result<(), RfHubError> {
        self.update(id, |device| {
            device.supports_on_off = on_off;
            device.supports_dim = dim;
            device.supports_learn = learn;
        })
    }

    /// How many times a device was asked to learn, 0 for an unknown id.
    pub fn learn_count(&self, id: DeviceId) -> u32 {
        self.read(id, |device| device.learn_count)
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<DeviceId, VirtualDevice>> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<T: Default>(&self, id: DeviceId, f: impl FnOnce(&VirtualDevice) -> T) -> T {
        self.lock().get(&id).map(f).unwrap_or_default()
    }

    fn update(&self, id: DeviceId, f: impl FnOnce(&mut VirtualDevice)) -> Result<(), RfHubError> {
        let mut devices = self.lock();
        let device = devices.get_mut(&id).ok_or_else(|| not_found(id))?;
        f(device);
        Ok(())
    }

    fn command(
        &self,
        id: DeviceId,
        capability: Capability,
        f: impl FnOnce(&mut VirtualDevice),
    ) -> Result<(), RfHubError> {
        let mut devices = self.lock();
        let device = devices.get_mut(&id).ok_or_else(|| not_found(id))?;
        if !device.supports(capability) {
            return Err(UnsupportedError {
                id: id.to_string(),
                capability,
            }
            .into());
        }
        f(device);
        tracing::debug!(%id, %capability, "virtual device commanded");
        Ok(())
    }
}

fn not_found(id: DeviceId) -> RfHubError {
    NotFoundError {
        entity: "Device",
        id: id.to_string(),
    }
    .into()
}

impl DeviceLibrary for VirtualLibrary {
    fn device_ids(&self) -> Result<Vec<DeviceId>, EnumerationError> {
        Ok(self.lock().keys().copied().collect())
    }

    fn name(&self, id: DeviceId) -> String {
        self.read(id, |device| device.name.clone())
    }

    fn set_name(&self, id: DeviceId, name: &str) -> Result<(), RfHubError> {
        self.update(id, |device| device.name = name.to_string())
    }

    fn protocol(&self, id: DeviceId) -> String {
        self.read(id, |device| device.protocol.clone())
    }

    fn set_protocol(&self, id: DeviceId, protocol: &str) -> Result<(), RfHubError> {
        self.update(id, |device| device.protocol = protocol.to_string())
    }

    fn model(&self, id: DeviceId) -> String {
        self.read(id, |device| device.model.clone())
    }

    fn set_model(&self, id: DeviceId, model: &str) -> Result<(), RfHubError> {
        self.update(id, |device| device.model = model.to_string())
    }

    fn parameters(&self, id: DeviceId) -> Parameters {
        self.read(id, |device| device.parameters.clone())
    }

    fn set_parameters(&self, id: DeviceId, parameters: &Parameters) -> Result<(), RfHubError> {
        let mut devices = self.lock();
        let device = devices.get_mut(&id).ok_or_else(|| not_found(id))?;
        for (key, value) in parameters {
            check_parameter(key)?;
            if value.is_empty() {
                device.parameters.remove(key);
            } else {
                device.parameters.insert(key.clone(), value.clone());
            }
        }
        Ok(())
    }

    fn supports_on_off(&self, id: DeviceId) -> bool {
        self.read(id, |device| device.supports_on_off)
    }

    fn supports_dim(&self, id: DeviceId) -> bool {
        self.read(id, |device| device.supports_dim)
    }

    fn supports_learn(&self, id: DeviceId) -> bool {
        self.read(id, |device| device.supports_learn)
    }

    fn new_device(&self) -> Result<DeviceId, RfHubError> {
        let mut devices = self.lock();
        let mut next = 1;
        while devices.contains_key(&DeviceId::new(next)) {
            next += 1;
        }
        let id = DeviceId::new(next);
        devices.insert(id, VirtualDevice::default());
        Ok(id)
    }

    fn remove_device(&self, id: DeviceId) -> Result<(), RfHubError> {
        self.lock().remove(&id).map(|_| ()).ok_or_else(|| not_found(id))
    }

    fn turn_on(&self, id: DeviceId) -> Result<(), RfHubError> {
        self.command(id, Capability::OnOff, |device| device.is_on = true)
    }

    fn turn_off(&self, id: DeviceId) -> Result<(), RfHubError> {
        self.command(id, Capability::OnOff, |device| device.is_on = false)
    }

    fn dim(&self, id: DeviceId, level: DimLevel) -> Result<(), RfHubError> {
        self.command(id, Capability::Dim, |device| device.dim_level = level)
    }

    fn learn(&self, id: DeviceId) -> Result<(), RfHubError> {
        self.command(id, Capability::Learn, |device| device.learn_count += 1)
    }

    fn last_cmd_was_on(&self, id: DeviceId) -> bool {
        self.read(id, |device| device.is_on)
    }

    fn last_dim_value(&self, id: DeviceId) -> DimLevel {
        self.read(id, |device| device.dim_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfhub_domain::error::ValidationError;

    fn params(pairs: &[(&str, &str)]) -> Parameters {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn should_seed_three_demo_devices() {
        let library = VirtualLibrary::with_demo_devices();
        let ids = library.device_ids().unwrap();
        assert_eq!(ids, vec![DeviceId::new(1), DeviceId::new(2), DeviceId::new(3)]);
        assert!(library.supports_learn(DeviceId::new(3)));
        assert!(!library.supports_dim(DeviceId::new(1)));
    }

    #[test]
    fn should_allocate_lowest_free_id() {
        let library = VirtualLibrary::new();
        assert_eq!(library.new_device().unwrap(), DeviceId::new(1));
        assert_eq!(library.new_device().unwrap(), DeviceId::new(2));
        library.remove_device(DeviceId::new(1)).unwrap();
        assert_eq!(library.new_device().unwrap(), DeviceId::new(1));
        assert_eq!(library.new_device().unwrap(), DeviceId::new(3));
    }

    #[test]
    fn should_return_zero_values_when_id_unknown() {
        let library = VirtualLibrary::new();
        let id = DeviceId::new(9);
        assert_eq!(library.name(id), "");
        assert!(library.parameters(id).is_empty());
        assert!(!library.supports_on_off(id));
        assert!(!library.last_cmd_was_on(id));
        assert_eq!(library.last_dim_value(id), DimLevel::MIN);
        assert_eq!(library.learn_count(id), 0);
    }

    #[test]
    fn should_fail_setters_and_actions_when_id_unknown() {
        let library = VirtualLibrary::new();
        let id = DeviceId::new(9);
        assert!(matches!(library.set_name(id, "x"), Err(RfHubError::NotFound(_))));
        assert!(matches!(library.turn_on(id), Err(RfHubError::NotFound(_))));
        assert!(matches!(library.remove_device(id), Err(RfHubError::NotFound(_))));
    }

    #[test]
    fn should_refuse_action_when_capability_missing() {
        let library = VirtualLibrary::with_demo_devices();
        let result = library.dim(DeviceId::new(1), DimLevel::MAX);
        assert!(matches!(result, Err(RfHubError::Unsupported(_))));
        assert_eq!(library.last_dim_value(DeviceId::new(1)), DimLevel::MIN);
    }

    #[test]
    fn should_record_commands() {
        let library = VirtualLibrary::with_demo_devices();
        let porch = DeviceId::new(3);
        library.turn_on(porch).unwrap();
        library.dim(porch, DimLevel::new(200)).unwrap();
        library.learn(porch).unwrap();
        library.learn(porch).unwrap();

        assert!(library.last_cmd_was_on(porch));
        assert_eq!(library.last_dim_value(porch), DimLevel::new(200));
        assert_eq!(library.learn_count(porch), 2);
    }

    #[test]
    fn should_reject_unknown_key_before_writing_later_keys() {
        let library = VirtualLibrary::new();
        let id = library.new_device().unwrap();

        let result = library.set_parameters(id, &params(&[("house", "1"), ("bogus", "x")]));

        assert!(matches!(
            result,
            Err(RfHubError::Validation(ValidationError::UnknownParameter(_)))
        ));
        assert!(library.parameters(id).is_empty());
    }

    #[test]
    fn should_unset_parameter_written_empty() {
        let library = VirtualLibrary::new();
        let id = library.new_device().unwrap();
        library
            .set_parameters(id, &params(&[("house", "1"), ("unit", "2")]))
            .unwrap();

        library.set_parameters(id, &params(&[("house", "")])).unwrap();

        assert_eq!(library.parameters(id), params(&[("unit", "2")]));
    }

    #[test]
    fn should_keep_earlier_keys_when_later_key_unknown() {
        let library = VirtualLibrary::new();
        let id = library.new_device().unwrap();

        let result = library.set_parameters(id, &params(&[("house", "1"), ("zzz", "x")]));

        assert!(result.is_err());
        assert_eq!(library.parameters(id), params(&[("house", "1")]));
    }

    #[test]
    fn should_change_capabilities() {
        let library = VirtualLibrary::with_demo_devices();
        let lamp = DeviceId::new(1);
        library.set_capabilities(lamp, true, true, false).unwrap();
        library.dim(lamp, DimLevel::new(10)).unwrap();
        assert_eq!(library.device(lamp).unwrap().dim_level, DimLevel::new(10));
    }
}
