//! Application services: use-case implementations.
//!
//! Each service holds its backend behind an `Arc` of a generic
//! [`DeviceLibrary`](crate::ports::DeviceLibrary), so the same backend
//! instance is shared by devices and groups without dynamic dispatch.

pub mod device_service;
pub mod group_service;

#[cfg(test)]
mod testing;
