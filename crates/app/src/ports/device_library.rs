//! Device capability port: the uniform interface over appliance backends.
//!
//! A backend bridges one way of reaching hardware (the vendor's native
//! library, an in-memory simulation) into the hub. Callers never learn
//! which one they are talking to.
//!
//! ## Contract
//!
//! - **Queries** (`name`, `protocol`, `model`, `parameters`, `supports_*`,
//!   `last_*`) never fail. For an unknown id they return the zero value
//!   (empty string, empty map, `false`, level 0) so that list endpoints are not
//!   derailed by a single stale id.
//! - **Setters and actions** fail with an error identifying the missing id.
//! - Capability flags are queried live on every call; a device's protocol or
//!   model can change after creation, so implementations must not cache them.

use rfhub_domain::device::{Capability, DimLevel, Parameters};
use rfhub_domain::error::{EnumerationError, RfHubError};
use rfhub_domain::id::DeviceId;

/// Device Capability Interface implemented by every backend.
///
/// Implementations are shared across concurrent requests and must serialise
/// their own mutations.
pub trait DeviceLibrary: Send + Sync {
    /// Enumerate the ids of all known devices.
    ///
    /// # Errors
    ///
    /// Returns an [`EnumerationError`] carrying the ids read so far when the
    /// backend fails part-way through.
    fn device_ids(&self) -> Result<Vec<DeviceId>, EnumerationError>;

    fn name(&self, id: DeviceId) -> String;

    /// # Errors
    ///
    /// Fails when the device does not exist or the backend rejects the value.
    fn set_name(&self, id: DeviceId, name: &str) -> Result<(), RfHubError>;

    fn protocol(&self, id: DeviceId) -> String;

    /// # Errors
    ///
    /// Fails when the device does not exist or the backend rejects the value.
    fn set_protocol(&self, id: DeviceId, protocol: &str) -> Result<(), RfHubError>;

    fn model(&self, id: DeviceId) -> String;

    /// # Errors
    ///
    /// Fails when the device does not exist or the backend rejects the value.
    fn set_model(&self, id: DeviceId, model: &str) -> Result<(), RfHubError>;

    fn parameters(&self, id: DeviceId) -> Parameters;

    /// Write parameters in map order.
    ///
    /// Stops at the first unknown key. Keys written before it stay written;
    /// there is no rollback. An empty value resets the key to unset, which
    /// reads back as `""` or as an absent key.
    ///
    /// # Errors
    ///
    /// Returns a validation error for an unknown key, or the backend's failure.
    fn set_parameters(&self, id: DeviceId, parameters: &Parameters) -> Result<(), RfHubError>;

    fn supports_on_off(&self, id: DeviceId) -> bool;

    fn supports_dim(&self, id: DeviceId) -> bool;

    fn supports_learn(&self, id: DeviceId) -> bool;

    /// Allocate a new, unconfigured device.
    ///
    /// # Errors
    ///
    /// Fails when the backend cannot allocate another device.
    fn new_device(&self) -> Result<DeviceId, RfHubError>;

    /// # Errors
    ///
    /// Fails when the device does not exist or cannot be removed.
    fn remove_device(&self, id: DeviceId) -> Result<(), RfHubError>;

    /// # Errors
    ///
    /// Fails when the device does not exist or the command cannot be sent.
    fn turn_on(&self, id: DeviceId) -> Result<(), RfHubError>;

    /// # Errors
    ///
    /// Fails when the device does not exist or the command cannot be sent.
    fn turn_off(&self, id: DeviceId) -> Result<(), RfHubError>;

    /// # Errors
    ///
    /// Fails when the device does not exist or the command cannot be sent.
    fn dim(&self, id: DeviceId, level: DimLevel) -> Result<(), RfHubError>;

    /// # Errors
    ///
    /// Fails when the device does not exist or the command cannot be sent.
    fn learn(&self, id: DeviceId) -> Result<(), RfHubError>;

    /// Whether the last command sent to the device was "on".
    fn last_cmd_was_on(&self, id: DeviceId) -> bool;

    fn last_dim_value(&self, id: DeviceId) -> DimLevel;

    /// Dimming is always expressed on a 0–255 scale, whatever the hardware.
    fn min_dim_level(&self) -> DimLevel {
        DimLevel::MIN
    }

    fn max_dim_level(&self) -> DimLevel {
        DimLevel::MAX
    }

    /// Dispatch a live capability query.
    fn supports(&self, id: DeviceId, capability: Capability) -> bool {
        match capability {
            Capability::OnOff => self.supports_on_off(id),
            Capability::Dim => self.supports_dim(id),
            Capability::Learn => self.supports_learn(id),
        }
    }
}
