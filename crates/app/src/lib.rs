//! # rfhub-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define the **Device Capability Interface** ([`ports::DeviceLibrary`]) that
//!   every backend implements (native library, in-memory mock)
//! - Provide **use-case services** driven by the HTTP adapter and by any
//!   future scheduler:
//!   - `DeviceService`: status, configuration and actions for one device
//!   - `GroupService`: group table and fan-out of on/off/dim to members
//!
//! ## Dependency rule
//! Depends on `rfhub-domain` only.
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod ports;
pub mod services;
