//! HTTP error response mapping.

use axum::Json;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use rfhub_domain::error::RfHubError;

/// JSON error body returned by every endpoint.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Everything a request can fail with.
#[derive(Debug)]
pub enum ApiError {
    /// No resource lives at the path.
    NoRoute { method: Method, path: String },
    /// The resource exists but not for this method.
    MethodNotAllowed { method: Method, path: String },
    /// A service or backend failure.
    Hub(RfHubError),
}

impl ApiError {
    pub fn no_route(method: &Method, path: &str) -> Self {
        Self::NoRoute {
            method: method.clone(),
            path: path.to_string(),
        }
    }

    pub fn method_not_allowed(method: &Method, path: &str) -> Self {
        Self::MethodNotAllowed {
            method: method.clone(),
            path: path.to_string(),
        }
    }
}

impl<E: Into<RfHubError>> From<E> for ApiError {
    fn from(err: E) -> Self {
        Self::Hub(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NoRoute { method, path } => (
                StatusCode::NOT_FOUND,
                format!("no resource at {path} (method {method})"),
            ),
            Self::MethodNotAllowed { method, path } => (
                StatusCode::METHOD_NOT_ALLOWED,
                format!("method {method} not allowed for {path}"),
            ),
            Self::Hub(RfHubError::Validation(err)) => (StatusCode::BAD_REQUEST, err.to_string()),
            Self::Hub(RfHubError::NotFound(err)) => (StatusCode::NOT_FOUND, err.to_string()),
            Self::Hub(RfHubError::Unsupported(err)) => {
                (StatusCode::METHOD_NOT_ALLOWED, err.to_string())
            }
            Self::Hub(RfHubError::Conflict(err)) => (StatusCode::CONFLICT, err.to_string()),
            Self::Hub(RfHubError::Backend(err)) => {
                tracing::error!(error = %err, "backend error");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}
