//! In-memory [`DeviceLibrary`] used by the service tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use rfhub_domain::device::{DimLevel, Parameters, check_parameter};
use rfhub_domain::error::{BackendError, EnumerationError, NotFoundError, RfHubError};
use rfhub_domain::id::DeviceId;

use crate::ports::DeviceLibrary;

#[derive(Default, Clone)]
pub struct FakeDevice {
    pub name: String,
    pub protocol: String,
    pub model: String,
    pub parameters: Parameters,
    pub on_off: bool,
    pub dim: bool,
    pub learn: bool,
    pub is_on: bool,
    pub level: DimLevel,
}

#[derive(Default)]
struct State {
    devices: BTreeMap<DeviceId, FakeDevice>,
    fail_set_name: bool,
    fail_enumeration_at: Option<usize>,
    action_calls: usize,
}

#[derive(Default)]
pub struct FakeLibrary {
    state: Mutex<State>,
}

impl FakeLibrary {
    pub fn add(&self, on_off: bool, dim: bool, learn: bool) -> DeviceId {
        let id = self.new_device().unwrap();
        let mut state = self.state.lock().unwrap();
        let device = state.devices.get_mut(&id).unwrap();
        device.on_off = on_off;
        device.dim = dim;
        device.learn = learn;
        id
    }

    pub fn device(&self, id: DeviceId) -> Option<FakeDevice> {
        self.state.lock().unwrap().devices.get(&id).cloned()
    }

    pub fn fail_set_name(&self, fail: bool) {
        self.state.lock().unwrap().fail_set_name = fail;
    }

    pub fn fail_enumeration_at(&self, index: Option<usize>) {
        self.state.lock().unwrap().fail_enumeration_at = index;
    }

    pub fn action_calls(&self) -> usize {
        self.state.lock().unwrap().action_calls
    }

    fn read<T: Default>(&self, id: DeviceId, f: impl FnOnce(&FakeDevice) -> T) -> T {
        self.state
            .lock()
            .unwrap()
            .devices
            .get(&id)
            .map(f)
            .unwrap_or_default()
    }

    fn write(&self, id: DeviceId, f: impl FnOnce(&mut FakeDevice)) -> Result<(), RfHubError> {
        let mut state = self.state.lock().unwrap();
        let device = state.devices.get_mut(&id).ok_or_else(|| not_found(id))?;
        f(device);
        Ok(())
    }

    fn act(&self, id: DeviceId, f: impl FnOnce(&mut FakeDevice)) -> Result<(), RfHubError> {
        self.state.lock().unwrap().action_calls += 1;
        self.write(id, f)
    }
}

fn not_found(id: DeviceId) -> RfHubError {
    NotFoundError {
        entity: "Device",
        id: id.to_string(),
    }
    .into()
}

impl DeviceLibrary for FakeLibrary {
    fn device_ids(&self) -> Result<Vec<DeviceId>, EnumerationError> {
        let state = self.state.lock().unwrap();
        let ids: Vec<DeviceId> = state.devices.keys().copied().collect();
        match state.fail_enumeration_at {
            Some(index) if index < ids.len() => Err(EnumerationError {
                found: ids[..index].to_vec(),
                index,
                reason: "broken pipe".into(),
            }),
            _ => Ok(ids),
        }
    }

    fn name(&self, id: DeviceId) -> String {
        self.read(id, |d| d.name.clone())
    }

    fn set_name(&self, id: DeviceId, name: &str) -> Result<(), RfHubError> {
        if self.state.lock().unwrap().fail_set_name {
            return Err(BackendError::new("permission denied").into());
        }
        self.write(id, |d| d.name = name.to_string())
    }

    fn protocol(&self, id: DeviceId) -> String {
        self.read(id, |d| d.protocol.clone())
    }

    fn set_protocol(&self, id: DeviceId, protocol: &str) -> Result<(), RfHubError> {
        self.write(id, |d| d.protocol = protocol.to_string())
    }

    fn model(&self, id: DeviceId) -> String {
        self.read(id, |d| d.model.clone())
    }

    fn set_model(&self, id: DeviceId, model: &str) -> Result<(), RfHubError> {
        self.write(id, |d| d.model = model.to_string())
    }

    fn parameters(&self, id: DeviceId) -> Parameters {
        self.read(id, |d| d.parameters.clone())
    }

    fn set_parameters(&self, id: DeviceId, parameters: &Parameters) -> Result<(), RfHubError> {
        for (key, value) in parameters {
            check_parameter(key)?;
            self.write(id, |d| {
                if value.is_empty() {
                    d.parameters.remove(key);
                } else {
                    d.parameters.insert(key.clone(), value.clone());
                }
            })?;
        }
        Ok(())
    }

    fn supports_on_off(&self, id: DeviceId) -> bool {
        self.read(id, |d| d.on_off)
    }

    fn supports_dim(&self, id: DeviceId) -> bool {
        self.read(id, |d| d.dim)
    }

    fn supports_learn(&self, id: DeviceId) -> bool {
        self.read(id, |d| d.learn)
    }

    fn new_device(&self) -> Result<DeviceId, RfHubError> {
        let mut state = self.state.lock().unwrap();
        let next = state.devices.keys().last().map_or(1, |id| id.get() + 1);
        let id = DeviceId::new(next);
        state.devices.insert(id, FakeDevice::default());
        Ok(id)
    }

    fn remove_device(&self, id: DeviceId) -> Result<(), RfHubError> {
        self.state
            .lock()
            .unwrap()
            .devices
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| not_found(id))
    }

    fn turn_on(&self, id: DeviceId) -> Result<(), RfHubError> {
        self.act(id, |d| d.is_on = true)
    }

    fn turn_off(&self, id: DeviceId) -> Result<(), RfHubError> {
        self.act(id, |d| d.is_on = false)
    }

    fn dim(&self, id: DeviceId, level: DimLevel) -> Result<(), RfHubError> {
        self.act(id, |d| d.level = level)
    }

    fn learn(&self, id: DeviceId) -> Result<(), RfHubError> {
        self.act(id, |_| {})
    }

    fn last_cmd_was_on(&self, id: DeviceId) -> bool {
        self.read(id, |d| d.is_on)
    }

    fn last_dim_value(&self, id: DeviceId) -> DimLevel {
        self.read(id, |d| d.level)
    }
}
