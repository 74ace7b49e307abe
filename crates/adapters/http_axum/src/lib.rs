//! # rfhub-adapter-http-axum
//!
//! HTTP adapter built on [axum](https://docs.rs/axum).
//!
//! ## Responsibilities
//! - Serve the JSON REST API over devices (`/devices`) and groups (`/groups`)
//! - Route by consuming the cleaned request path one segment at a time from
//!   a single fallback handler, instead of a route table
//! - Map domain errors onto status codes with a JSON `{"error": ...}` body
//! - Run the listener and stop it cooperatively on `POST /shutdown`
//!
//! ## Dependency rule
//! Depends on `rfhub-app` (for port traits and services) and `rfhub-domain`
//! (for domain types used in request/response mapping). Never leaks axum types
//! into the domain.

pub mod api;
pub mod error;
pub mod path;
pub mod router;
pub mod server;
pub mod state;
