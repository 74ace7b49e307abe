//! Common error types used across the workspace.
//!
//! Each failure class of the hub has its own typed error; [`RfHubError`]
//! aggregates them via `#[from]` so every layer can propagate with `?`.
//! Adapters map the variants onto their own surface (HTTP status codes, log
//! levels) without inspecting message text.

use crate::device::Capability;
use crate::group::GroupParseError;
use crate::id::DeviceId;

/// Top-level error type shared by the application and adapter layers.
#[derive(Debug, thiserror::Error)]
pub enum RfHubError {
    /// Input rejected before reaching a backend.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A mutating operation referenced a device or group that does not exist.
    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    /// The device exists but lacks the capability for the requested action.
    #[error(transparent)]
    Unsupported(#[from] UnsupportedError),

    /// The id is already taken.
    #[error(transparent)]
    Conflict(#[from] ConflictError),

    /// The backend (native library) reported a failure.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// Input that fails domain validation.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("unknown parameter '{0}'")]
    UnknownParameter(String),

    #[error("invalid dim level '{0}', expected an integer between 0 and 255")]
    InvalidDimLevel(String),

    #[error("invalid id '{0}'")]
    InvalidId(String),

    #[error("invalid group configuration: {0}")]
    InvalidGroup(#[from] GroupParseError),

    #[error("invalid group configuration on line {line}: {source}")]
    InvalidGroupLine {
        line: usize,
        #[source]
        source: GroupParseError,
    },

    #[error("invalid request body: {0}")]
    InvalidBody(String),

    #[error("string value contains an interior NUL byte: {0:?}")]
    InvalidString(String),
}

/// A referenced entity does not exist.
#[derive(Debug, thiserror::Error)]
#[error("{entity} with id {id} does not exist")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// A device was asked to perform an action it cannot do.
#[derive(Debug, thiserror::Error)]
#[error("device with id {id} does not support {capability}")]
pub struct UnsupportedError {
    pub id: String,
    pub capability: Capability,
}

/// An entity with the same id already exists.
#[derive(Debug, thiserror::Error)]
#[error("{entity} with id {id} already exists")]
pub struct ConflictError {
    pub entity: &'static str,
    pub id: String,
}

/// Failure reported by a device backend, carrying the backend's own reason.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct BackendError(pub String);

impl BackendError {
    /// Build a backend error from any displayable reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

/// Device enumeration stopped part-way.
///
/// `found` holds the ids read before the failing index, so callers that only
/// need a best-effort list can still use them.
#[derive(Debug, thiserror::Error)]
#[error("unable to get device id for index {index}: {reason}")]
pub struct EnumerationError {
    pub found: Vec<DeviceId>,
    pub index: usize,
    pub reason: String,
}

impl From<EnumerationError> for RfHubError {
    fn from(err: EnumerationError) -> Self {
        Self::Backend(BackendError(err.to_string()))
    }
}
