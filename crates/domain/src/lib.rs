//! # rfhub-domain
//!
//! Pure domain model for the rfhub radio appliance hub.
//!
//! ## Responsibilities
//! - Foundational types: typed integer identifiers, error conventions
//! - Define **device configuration** (name, protocol, model, parameters)
//! - Define **device status** (capability flags, last command, dim bounds)
//! - Define **capabilities** and the **dim level** value object
//! - Define **groups** and their human-editable `GROUP` line format
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;

pub mod device;
pub mod group;
