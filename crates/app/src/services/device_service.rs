//! Device service: use-cases for reading, configuring and commanding devices.

use std::sync::Arc;

use rfhub_domain::device::{
    Capability, DeviceConfig, DeviceSettings, DeviceStatus, DimLevel, PARAMETER_KEYS,
    Parameters, check_parameter,
};
use rfhub_domain::error::{RfHubError, UnsupportedError};
use rfhub_domain::id::DeviceId;

use crate::ports::DeviceLibrary;

/// Application service for single-device operations.
pub struct DeviceService<L> {
    library: Arc<L>,
}

impl<L: DeviceLibrary> DeviceService<L> {
    /// Create a new service backed by the given device library.
    pub fn new(library: Arc<L>) -> Self {
        Self { library }
    }

    /// The backend this service delegates to.
    pub fn library(&self) -> &Arc<L> {
        &self.library
    }

    /// List all device ids.
    ///
    /// # Errors
    ///
    /// Returns a backend error when enumeration fails part-way.
    pub fn list_ids(&self) -> Result<Vec<DeviceId>, RfHubError> {
        Ok(self.library.device_ids()?)
    }

    /// Whether a device with `id` exists.
    ///
    /// A failed enumeration still answers from the ids read before the
    /// failure.
    pub fn exists(&self, id: DeviceId) -> bool {
        match self.library.device_ids() {
            Ok(ids) => ids.contains(&id),
            Err(err) => {
                tracing::warn!(error = %err, "device enumeration incomplete");
                err.found.contains(&id)
            }
        }
    }

    /// Live status summary of one device.
    ///
    /// Dim bounds are reported as `0..0` for a device that cannot dim.
    pub fn status(&self, id: DeviceId) -> DeviceStatus {
        let supports_dim = self.library.supports_dim(id);
        let (dim_level_min, dim_level_max) = if supports_dim {
            (self.library.min_dim_level(), self.library.max_dim_level())
        } else {
            (DimLevel::MIN, DimLevel::MIN)
        };
        DeviceStatus {
            id,
            name: self.library.name(id),
            supports_on_off: self.library.supports_on_off(id),
            supports_dim,
            supports_learn: self.library.supports_learn(id),
            last_cmd_was_on: self.library.last_cmd_was_on(id),
            dim_level_min,
            dim_level_max,
            dim_level_last: self.library.last_dim_value(id),
        }
    }

    /// Status summaries of every device.
    ///
    /// # Errors
    ///
    /// Returns a backend error when enumeration fails.
    pub fn statuses(&self) -> Result<Vec<DeviceStatus>, RfHubError> {
        Ok(self
            .list_ids()?
            .into_iter()
            .map(|id| self.status(id))
            .collect())
    }

    /// Full configuration of one device.
    pub fn config(&self, id: DeviceId) -> DeviceConfig {
        DeviceConfig {
            id,
            settings: DeviceSettings {
                name: self.library.name(id),
                protocol: self.library.protocol(id),
                model: self.library.model(id),
                parameters: self.library.parameters(id),
            },
        }
    }

    /// Configurations of every device.
    ///
    /// # Errors
    ///
    /// Returns a backend error when enumeration fails.
    pub fn configs(&self) -> Result<Vec<DeviceConfig>, RfHubError> {
        Ok(self
            .list_ids()?
            .into_iter()
            .map(|id| self.config(id))
            .collect())
    }

    /// Allocate a new device and apply `settings` to it.
    ///
    /// Parameter keys are validated before the device is allocated. If
    /// applying the settings fails, the half-configured device is removed
    /// again.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown parameter keys, or the
    /// backend's failure.
    #[tracing::instrument(skip(self, settings), fields(device_name = %settings.name))]
    pub fn create(&self, settings: &DeviceSettings) -> Result<DeviceConfig, RfHubError> {
        validate_parameters(settings)?;
        let id = self.library.new_device()?;
        if let Err(err) = self.apply(id, settings) {
            if let Err(cleanup) = self.library.remove_device(id) {
                tracing::warn!(%id, error = %cleanup, "failed to remove half-created device");
            }
            return Err(err);
        }
        tracing::info!(%id, "device created");
        Ok(self.config(id))
    }

    /// Replace the configuration of an existing device.
    ///
    /// Every field is overwritten: a missing name, protocol or model becomes
    /// empty, and every parameter key not in `settings` is unset.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown parameter keys, or the
    /// backend's failure.
    #[tracing::instrument(skip(self, settings))]
    pub fn update(
        &self,
        id: DeviceId,
        settings: &DeviceSettings,
    ) -> Result<DeviceConfig, RfHubError> {
        validate_parameters(settings)?;
        let mut parameters: Parameters = PARAMETER_KEYS
            .iter()
            .map(|key| ((*key).to_string(), String::new()))
            .collect();
        parameters.extend(settings.parameters.clone());
        let replacement = DeviceSettings {
            parameters,
            ..settings.clone()
        };
        self.apply(id, &replacement)?;
        Ok(self.config(id))
    }

    /// Remove a device.
    ///
    /// # Errors
    ///
    /// Returns the backend's failure.
    #[tracing::instrument(skip(self))]
    pub fn remove(&self, id: DeviceId) -> Result<(), RfHubError> {
        self.library.remove_device(id)
    }

    /// # Errors
    ///
    /// Returns [`RfHubError::Unsupported`] without contacting the backend
    /// when the device cannot switch, otherwise the backend's failure.
    #[tracing::instrument(skip(self))]
    pub fn turn_on(&self, id: DeviceId) -> Result<(), RfHubError> {
        self.ensure_supported(id, Capability::OnOff)?;
        self.library.turn_on(id)
    }

    /// # Errors
    ///
    /// See [`turn_on`](Self::turn_on).
    #[tracing::instrument(skip(self))]
    pub fn turn_off(&self, id: DeviceId) -> Result<(), RfHubError> {
        self.ensure_supported(id, Capability::OnOff)?;
        self.library.turn_off(id)
    }

    /// # Errors
    ///
    /// Returns [`RfHubError::Unsupported`] when the device cannot dim.
    #[tracing::instrument(skip(self))]
    pub fn dim(&self, id: DeviceId, level: DimLevel) -> Result<(), RfHubError> {
        self.ensure_supported(id, Capability::Dim)?;
        self.library.dim(id, level)
    }

    /// # Errors
    ///
    /// Returns [`RfHubError::Unsupported`] when the device cannot learn.
    #[tracing::instrument(skip(self))]
    pub fn learn(&self, id: DeviceId) -> Result<(), RfHubError> {
        self.ensure_supported(id, Capability::Learn)?;
        self.library.learn(id)
    }

    fn ensure_supported(&self, id: DeviceId, capability: Capability) -> Result<(), RfHubError> {
        if self.library.supports(id, capability) {
            Ok(())
        } else {
            Err(UnsupportedError {
                id: id.to_string(),
                capability,
            }
            .into())
        }
    }

    fn apply(&self, id: DeviceId, settings: &DeviceSettings) -> Result<(), RfHubError> {
        self.library.set_name(id, &settings.name)?;
        self.library.set_protocol(id, &settings.protocol)?;
        self.library.set_model(id, &settings.model)?;
        self.library.set_parameters(id, &settings.parameters)
    }
}

fn validate_parameters(settings: &DeviceSettings) -> Result<(), RfHubError> {
    for key in settings.parameters.keys() {
        check_parameter(key)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::FakeLibrary;
    use rfhub_domain::error::ValidationError;

    fn make_service() -> (Arc<FakeLibrary>, DeviceService<FakeLibrary>) {
        let library = Arc::new(FakeLibrary::default());
        (Arc::clone(&library), DeviceService::new(library))
    }

    fn settings(name: &str) -> DeviceSettings {
        DeviceSettings {
            name: name.to_string(),
            protocol: "arctech".to_string(),
            model: "selflearning-dimmer".to_string(),
            parameters: Parameters::from([
                ("house".to_string(), "1".to_string()),
                ("unit".to_string(), "2".to_string()),
            ]),
        }
    }

    #[test]
    fn should_create_device_with_settings() {
        let (_, service) = make_service();
        let created = service.create(&settings("Lamp")).unwrap();
        assert_eq!(created.settings, settings("Lamp"));
        assert!(service.exists(created.id));
    }

    #[test]
    fn should_not_allocate_device_when_parameter_key_is_unknown() {
        let (library, service) = make_service();
        let mut bad = settings("Lamp");
        bad.parameters.insert("bogus".into(), "x".into());

        let result = service.create(&bad);

        assert!(matches!(
            result,
            Err(RfHubError::Validation(ValidationError::UnknownParameter(_)))
        ));
        assert!(library.device_ids().unwrap().is_empty());
    }

    #[test]
    fn should_remove_half_created_device_when_apply_fails() {
        let (library, service) = make_service();
        library.fail_set_name(true);

        assert!(service.create(&settings("Lamp")).is_err());
        assert!(library.device_ids().unwrap().is_empty());
    }

    #[test]
    fn should_update_existing_device() {
        let (_, service) = make_service();
        let id = service.create(&settings("Old")).unwrap().id;

        let updated = service.update(id, &settings("New")).unwrap();

        assert_eq!(updated.settings.name, "New");
        assert_eq!(service.config(id).settings.name, "New");
    }

    #[test]
    fn should_replace_whole_configuration_on_update() {
        let (_, service) = make_service();
        let id = service.create(&settings("Old")).unwrap().id;
        let replacement = DeviceSettings {
            name: "New".to_string(),
            parameters: Parameters::from([("code".to_string(), "5".to_string())]),
            ..DeviceSettings::default()
        };

        let updated = service.update(id, &replacement).unwrap();

        assert_eq!(updated.settings, replacement);
        assert_eq!(service.config(id).settings, replacement);
    }

    #[test]
    fn should_report_zero_dim_bounds_when_device_cannot_dim() {
        let (library, service) = make_service();
        let id = library.add(true, false, false);

        let status = service.status(id);

        assert!(status.supports_on_off);
        assert_eq!(status.dim_level_min, DimLevel::MIN);
        assert_eq!(status.dim_level_max, DimLevel::MIN);
    }

    #[test]
    fn should_report_full_dim_bounds_when_device_can_dim() {
        let (library, service) = make_service();
        let id = library.add(true, true, false);

        service.dim(id, DimLevel::MAX).unwrap();
        let status = service.status(id);

        assert_eq!(status.dim_level_min, DimLevel::MIN);
        assert_eq!(status.dim_level_max, DimLevel::MAX);
        assert_eq!(status.dim_level_last, DimLevel::MAX);
    }

    #[test]
    fn should_refuse_unsupported_action_without_calling_backend() {
        let (library, service) = make_service();
        let id = library.add(false, false, false);

        let result = service.turn_on(id);

        assert!(matches!(result, Err(RfHubError::Unsupported(_))));
        assert_eq!(library.action_calls(), 0);
    }

    #[test]
    fn should_answer_exists_from_partial_enumeration() {
        let (library, service) = make_service();
        let first = library.add(true, false, false);
        let second = library.add(true, false, false);
        library.fail_enumeration_at(Some(1));

        assert!(service.exists(first));
        assert!(!service.exists(second));
        assert!(service.list_ids().is_err());
    }

    #[test]
    fn should_list_status_of_every_device() {
        let (library, service) = make_service();
        library.add(true, false, false);
        library.add(true, true, true);

        let statuses = service.statuses().unwrap();

        assert_eq!(statuses.len(), 2);
        assert!(statuses[1].supports_learn);
    }

    #[test]
    fn should_return_zero_values_for_unknown_device() {
        let (_, service) = make_service();
        let config = service.config(DeviceId::new(404));
        assert!(config.settings.name.is_empty());
        assert!(config.settings.parameters.is_empty());
        let status = service.status(DeviceId::new(404));
        assert!(!status.supports_on_off && !status.supports_dim && !status.supports_learn);
    }
}
