//! JSON REST handlers, one module per resource.

pub mod devices;
pub mod groups;

use std::str::FromStr;

use serde::de::DeserializeOwned;

use rfhub_domain::error::ValidationError;

/// Decode a JSON request body.
fn parse_body<T: DeserializeOwned>(body: &[u8]) -> Result<T, ValidationError> {
    serde_json::from_slice(body).map_err(|err| ValidationError::InvalidBody(err.to_string()))
}

/// Parse a numeric id path segment.
fn parse_id<T: FromStr>(segment: &str) -> Result<T, ValidationError> {
    segment
        .parse()
        .map_err(|_| ValidationError::InvalidId(segment.to_string()))
}
