//! Simulated device record.

use rfhub_domain::device::{Capability, DimLevel, Parameters};

/// One simulated device: its configuration, capabilities and the state left
/// behind by the last commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VirtualDevice {
    pub name: String,
    pub protocol: String,
    pub model: String,
    pub parameters: Parameters,
    pub supports_on_off: bool,
    pub supports_dim: bool,
    pub supports_learn: bool,
    pub is_on: bool,
    pub dim_level: DimLevel,
    pub learn_count: u32,
}

impl VirtualDevice {
    /// A device with the given name and capabilities.
    #[must_use]
    pub fn new(name: &str, on_off: bool, dim: bool, learn: bool) -> Self {
        Self {
            name: name.to_string(),
            supports_on_off: on_off,
            supports_dim: dim,
            supports_learn: learn,
            ..Self::default()
        }
    }

    /// Plain on/off switch.
    #[must_use]
    pub fn switch(name: &str) -> Self {
        Self {
            protocol: "arctech".to_string(),
            model: "selflearning-switch".to_string(),
            ..Self::new(name, true, false, false)
        }
    }

    /// Dimmer that cannot be taught a code.
    #[must_use]
    pub fn dimmer(name: &str) -> Self {
        Self {
            protocol: "arctech".to_string(),
            model: "codeswitch".to_string(),
            ..Self::new(name, true, true, false)
        }
    }

    /// Self-learning dimmer.
    #[must_use]
    pub fn learning_dimmer(name: &str) -> Self {
        Self {
            protocol: "arctech".to_string(),
            model: "selflearning-dimmer".to_string(),
            ..Self::new(name, true, true, true)
        }
    }

    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::OnOff => self.supports_on_off,
            Capability::Dim => self.supports_dim,
            Capability::Learn => self.supports_learn,
        }
    }
}
