//! Device: a single controllable appliance endpoint.
//!
//! Devices are owned by a backend (the native library or the in-memory
//! mock); the domain only describes what can be read from or written to them.
//! JSON field names are PascalCase to match the public REST surface.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::DeviceId;

/// The only parameter keys a device accepts.
pub const PARAMETER_KEYS: [&str; 7] =
    ["devices", "house", "unit", "code", "system", "units", "fade"];

/// Named device parameters. Ordered so that iteration (and therefore the
/// order in which a backend applies them) is deterministic.
pub type Parameters = BTreeMap<String, String>;

/// Whether `key` is one of [`PARAMETER_KEYS`].
#[must_use]
pub fn is_known_parameter(key: &str) -> bool {
    PARAMETER_KEYS.contains(&key)
}

/// Reject any key outside [`PARAMETER_KEYS`].
///
/// # Errors
///
/// Returns [`ValidationError::UnknownParameter`] for an unrecognised key.
pub fn check_parameter(key: &str) -> Result<(), ValidationError> {
    if is_known_parameter(key) {
        Ok(())
    } else {
        Err(ValidationError::UnknownParameter(key.to_string()))
    }
}

/// An action family a device may support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    OnOff,
    Dim,
    Learn,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnOff => f.write_str("on/off"),
            Self::Dim => f.write_str("dim"),
            Self::Learn => f.write_str("learn"),
        }
    }
}

/// A dim level on the fixed 0–255 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DimLevel(u8);

impl DimLevel {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(u8::MAX);

    #[must_use]
    pub const fn new(level: u8) -> Self {
        Self(level)
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl From<u8> for DimLevel {
    fn from(level: u8) -> Self {
        Self(level)
    }
}

impl fmt::Display for DimLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for DimLevel {
    type Err = ValidationError;

    /// Accepts decimal integers in `0..=255`; anything else (including `-1`,
    /// `256` and non-numeric text) is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .parse()
            .map_err(|_| ValidationError::InvalidDimLevel(s.to_string()))?;
        u8::try_from(value)
            .map(Self)
            .map_err(|_| ValidationError::InvalidDimLevel(s.to_string()))
    }
}

/// The writable part of a device configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct DeviceSettings {
    pub name: String,
    pub protocol: String,
    pub model: String,
    pub parameters: Parameters,
}

/// A device's full configuration as read back from its backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceConfig {
    #[serde(rename = "ID")]
    pub id: DeviceId,
    #[serde(flatten)]
    pub settings: DeviceSettings,
}

/// Live status summary of a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeviceStatus {
    #[serde(rename = "ID")]
    pub id: DeviceId,
    pub name: String,
    pub supports_on_off: bool,
    pub supports_dim: bool,
    pub supports_learn: bool,
    pub last_cmd_was_on: bool,
    pub dim_level_min: DimLevel,
    pub dim_level_max: DimLevel,
    pub dim_level_last: DimLevel,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accept_dim_level_bounds() {
        assert_eq!("0".parse::<DimLevel>().unwrap(), DimLevel::MIN);
        assert_eq!("255".parse::<DimLevel>().unwrap(), DimLevel::MAX);
        assert_eq!("128".parse::<DimLevel>().unwrap().get(), 128);
    }

    #[test]
    fn should_reject_out_of_range_dim_level() {
        assert!(matches!(
            "-1".parse::<DimLevel>(),
            Err(ValidationError::InvalidDimLevel(_))
        ));
        assert!(matches!(
            "256".parse::<DimLevel>(),
            Err(ValidationError::InvalidDimLevel(_))
        ));
    }

    #[test]
    fn should_reject_non_numeric_dim_level() {
        assert!("abc".parse::<DimLevel>().is_err());
        assert!("".parse::<DimLevel>().is_err());
        assert!("1.5".parse::<DimLevel>().is_err());
    }

    #[test]
    fn should_know_exactly_seven_parameters() {
        for key in PARAMETER_KEYS {
            assert!(is_known_parameter(key));
        }
        assert!(!is_known_parameter("bogus"));
        assert!(!is_known_parameter("House"));
    }

    #[test]
    fn should_report_unknown_parameter_key() {
        let err = check_parameter("bogus").unwrap_err();
        assert_eq!(err.to_string(), "unknown parameter 'bogus'");
    }

    #[test]
    fn should_serialize_config_with_pascal_case_keys() {
        let config = DeviceConfig {
            id: DeviceId::new(2),
            settings: DeviceSettings {
                name: "Lamp".into(),
                protocol: "arctech".into(),
                model: "selflearning-switch".into(),
                parameters: Parameters::from([("house".into(), "A".into())]),
            },
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["ID"], 2);
        assert_eq!(json["Name"], "Lamp");
        assert_eq!(json["Protocol"], "arctech");
        assert_eq!(json["Model"], "selflearning-switch");
        assert_eq!(json["Parameters"]["house"], "A");
    }

    #[test]
    fn should_default_missing_settings_fields() {
        let settings: DeviceSettings = serde_json::from_str(r#"{"Name":"A"}"#).unwrap();
        assert_eq!(settings.name, "A");
        assert!(settings.protocol.is_empty());
        assert!(settings.parameters.is_empty());
    }

    #[test]
    fn should_serialize_status_dim_fields() {
        let status = DeviceStatus {
            id: DeviceId::new(3),
            name: "Dimmer".into(),
            supports_on_off: true,
            supports_dim: true,
            supports_learn: false,
            last_cmd_was_on: false,
            dim_level_min: DimLevel::MIN,
            dim_level_max: DimLevel::MAX,
            dim_level_last: DimLevel::new(17),
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["SupportsOnOff"], true);
        assert_eq!(json["LastCmdWasOn"], false);
        assert_eq!(json["DimLevelMin"], 0);
        assert_eq!(json["DimLevelMax"], 255);
        assert_eq!(json["DimLevelLast"], 17);
    }
}
