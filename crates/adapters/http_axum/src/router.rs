//! Axum router assembly.
//!
//! There is no route table: a single fallback handler cleans the path and
//! hands it to the resource dispatchers, which consume it one segment at a
//! time.

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use tower_http::trace::TraceLayer;

use rfhub_app::ports::DeviceLibrary;

use crate::api;
use crate::error::ApiError;
use crate::path::{PathCursor, clean_path};
use crate::state::AppState;

/// Build the top-level axum [`Router`].
///
/// Includes a [`TraceLayer`] that logs each HTTP request/response at the
/// `DEBUG` level using the `tracing` ecosystem.
pub fn build<L: DeviceLibrary + 'static>(state: AppState<L>) -> Router {
    Router::new()
        .fallback(dispatch::<L>)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn dispatch<L: DeviceLibrary + 'static>(
    State(state): State<AppState<L>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let path = clean_path(uri.path());
    let mut cursor = PathCursor::new(&path);
    let result = match cursor.shift() {
        Some("health") if cursor.is_empty() => health(&method, &path),
        Some("shutdown") if cursor.is_empty() => shutdown(&state, &method, &path),
        Some("devices") => api::devices::dispatch(&state, &method, &path, cursor, &body),
        Some("groups") => api::groups::dispatch(&state, &method, &path, cursor, &body),
        _ => Err(ApiError::no_route(&method, &path)),
    };
    result.unwrap_or_else(IntoResponse::into_response)
}

fn health(method: &Method, path: &str) -> Result<Response, ApiError> {
    if method != Method::GET {
        return Err(ApiError::method_not_allowed(method, path));
    }
    Ok("OK".into_response())
}

fn shutdown<L>(state: &AppState<L>, method: &Method, path: &str) -> Result<Response, ApiError> {
    if method != Method::POST {
        return Err(ApiError::method_not_allowed(method, path));
    }
    tracing::info!("shutdown requested over HTTP");
    state.shutdown.trigger();
    Ok((StatusCode::OK, "shutting down").into_response())
}
