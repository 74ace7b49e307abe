//! # rfhub-adapter-telldus
//!
//! Device library backed by Telldus `telldus-core`, loaded at runtime through
//! the [`bridge`].
//!
//! ## Dependency rule
//!
//! Depends on `rfhub-app` (port traits) and `rfhub-domain` only.

pub mod bridge;

use std::sync::{Mutex, MutexGuard, PoisonError};

use rfhub_app::ports::DeviceLibrary;
use rfhub_domain::device::{DimLevel, PARAMETER_KEYS, Parameters, check_parameter};
use rfhub_domain::error::{BackendError, EnumerationError, RfHubError, ValidationError};
use rfhub_domain::id::DeviceId;

use bridge::{BridgeError, NativeLibrary};

/// Method bits understood by `tdMethods` and `tdLastSentCommand`.
pub mod method {
    pub const TURN_ON: i32 = 1;
    pub const TURN_OFF: i32 = 2;
    pub const DIM: i32 = 16;
    pub const LEARN: i32 = 32;
}

/// Decode a telldus result code. `None` means success.
pub fn decode_status(code: i32) -> Option<String> {
    let reason = match code {
        0 => return None,
        -1 => "not found",
        -2 => "permission denied",
        -3 => "device not found",
        -4 => "method not supported",
        -5 => "communication error",
        -6 => "connecting service error",
        -7 => "unknown response",
        -8 => "syntax error",
        -9 => "broken pipe",
        -10 => "communicating service error",
        -99 => "unknown error",
        other => return Some(format!("unknown response code {other}")),
    };
    Some(reason.to_string())
}

/// A method is supported only when the library echoes back exactly its bit.
pub fn method_supported(response: i32, method: i32) -> bool {
    response == method
}

/// Parse the text returned by `tdLastSentValue` into a dim level.
///
/// Non-numeric text reads as 0; numbers are clamped into 0..=255.
pub fn parse_last_value(text: &str) -> DimLevel {
    let value = text.trim().parse::<i64>().unwrap_or(0);
    let clamped = value.clamp(i64::from(DimLevel::MIN.get()), i64::from(DimLevel::MAX.get()));
    DimLevel::new(u8::try_from(clamped).unwrap_or_default())
}

fn check_status(code: i32) -> Result<(), RfHubError> {
    match decode_status(code) {
        None => Ok(()),
        Some(reason) => Err(BackendError::new(reason).into()),
    }
}

fn bridge_error(err: BridgeError) -> RfHubError {
    match err {
        BridgeError::InteriorNul(value) => ValidationError::InvalidString(value).into(),
        other => BackendError::new(other.to_string()).into(),
    }
}

/// [`DeviceLibrary`] implemented over telldus-core.
#[derive(Debug)]
pub struct TelldusLibrary {
    native: &'static NativeLibrary,
    // serialises a native call with the error string read after it
    lock: Mutex<()>,
}

impl TelldusLibrary {
    /// Open telldus-core, from `path` or the platform default, and
    /// initialise it.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Unavailable`] when the library cannot be
    /// loaded.
    pub fn open(path: Option<&str>) -> Result<Self, BridgeError> {
        let native = bridge::telldus_at(path);
        native.availability()?;
        native.rv("tdInit");
        tracing::info!(path = native.path(), "telldus-core initialised");
        Ok(Self {
            native,
            lock: Mutex::new(()),
        })
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn error_string(&self) -> String {
        self.native.rs("tdGetErrorString")
    }

    fn supports_method(&self, id: DeviceId, method: i32) -> bool {
        method_supported(self.native.ri_pii("tdMethods", id.get(), method), method)
    }

    fn set_text(
        &self,
        symbol: &str,
        field: &str,
        id: DeviceId,
        value: &str,
    ) -> Result<(), RfHubError> {
        let _guard = self.guard();
        if self.native.rb_pis(symbol, id.get(), value).map_err(bridge_error)? {
            return Ok(());
        }
        Err(BackendError::new(format!(
            "unable to set {field} of device {id} to '{value}': {}",
            self.error_string()
        ))
        .into())
    }

    fn action(&self, symbol: &str, id: DeviceId) -> Result<(), RfHubError> {
        check_status(self.native.ri_pi(symbol, id.get()))
    }
}

impl DeviceLibrary for TelldusLibrary {
    fn device_ids(&self) -> Result<Vec<DeviceId>, EnumerationError> {
        let _guard = self.guard();
        let count = self.native.ri("tdGetNumberOfDevices");
        let mut found = Vec::with_capacity(usize::try_from(count).unwrap_or_default());
        for index in 0..count.max(0) {
            let id = self.native.ri_pi("tdGetDeviceId", index);
            if id == -1 {
                return Err(EnumerationError {
                    found,
                    index: usize::try_from(index).unwrap_or_default(),
                    reason: self.error_string(),
                });
            }
            found.push(DeviceId::new(id));
        }
        Ok(found)
    }

    fn name(&self, id: DeviceId) -> String {
        self.native.rs_pi("tdGetName", id.get())
    }

    fn set_name(&self, id: DeviceId, name: &str) -> Result<(), RfHubError> {
        self.set_text("tdSetName", "name", id, name)
    }

    fn protocol(&self, id: DeviceId) -> String {
        self.native.rs_pi("tdGetProtocol", id.get())
    }

    fn set_protocol(&self, id: DeviceId, protocol: &str) -> Result<(), RfHubError> {
        self.set_text("tdSetProtocol", "protocol", id, protocol)
    }

    fn model(&self, id: DeviceId) -> String {
        self.native.rs_pi("tdGetModel", id.get())
    }

    fn set_model(&self, id: DeviceId, model: &str) -> Result<(), RfHubError> {
        self.set_text("tdSetModel", "model", id, model)
    }

    fn parameters(&self, id: DeviceId) -> Parameters {
        PARAMETER_KEYS
            .iter()
            .map(|key| {
                let value = self
                    .native
                    .rs_piss("tdGetDeviceParameter", id.get(), key, "")
                    .unwrap_or_default();
                ((*key).to_string(), value)
            })
            .collect()
    }

    fn set_parameters(&self, id: DeviceId, parameters: &Parameters) -> Result<(), RfHubError> {
        let _guard = self.guard();
        for (key, value) in parameters {
            check_parameter(key)?;
            let written = self
                .native
                .rb_piss("tdSetDeviceParameter", id.get(), key, value)
                .map_err(bridge_error)?;
            if !written {
                return Err(BackendError::new(format!(
                    "unable to set parameter '{key}' to '{value}': {}",
                    self.error_string()
                ))
                .into());
            }
        }
        Ok(())
    }

    fn supports_on_off(&self, id: DeviceId) -> bool {
        self.supports_method(id, method::TURN_ON)
    }

    fn supports_dim(&self, id: DeviceId) -> bool {
        self.supports_method(id, method::DIM)
    }

    fn supports_learn(&self, id: DeviceId) -> bool {
        self.supports_method(id, method::LEARN)
    }

    fn new_device(&self) -> Result<DeviceId, RfHubError> {
        let _guard = self.guard();
        let id = self.native.ri("tdAddDevice");
        if id < 0 {
            return Err(BackendError::new(format!(
                "unable to add device: {}",
                self.error_string()
            ))
            .into());
        }
        Ok(DeviceId::new(id))
    }

    fn remove_device(&self, id: DeviceId) -> Result<(), RfHubError> {
        let _guard = self.guard();
        if self.native.rb_pi("tdRemoveDevice", id.get()) {
            return Ok(());
        }
        Err(BackendError::new(format!(
            "unable to remove device {id}: {}",
            self.error_string()
        ))
        .into())
    }

    fn turn_on(&self, id: DeviceId) -> Result<(), RfHubError> {
        self.action("tdTurnOn", id)
    }

    fn turn_off(&self, id: DeviceId) -> Result<(), RfHubError> {
        self.action("tdTurnOff", id)
    }

    fn dim(&self, id: DeviceId, level: DimLevel) -> Result<(), RfHubError> {
        check_status(self.native.ri_pii("tdDim", id.get(), i32::from(level.get())))
    }

    fn learn(&self, id: DeviceId) -> Result<(), RfHubError> {
        self.action("tdLearn", id)
    }

    fn last_cmd_was_on(&self, id: DeviceId) -> bool {
        method_supported(
            self.native.ri_pii("tdLastSentCommand", id.get(), method::TURN_ON),
            method::TURN_ON,
        )
    }

    fn last_dim_value(&self, id: DeviceId) -> DimLevel {
        parse_last_value(&self.native.rs_pi("tdLastSentValue", id.get()))
    }
}
