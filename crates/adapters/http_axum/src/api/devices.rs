//! `/devices` resource.
//!
//! | Method | Path | Result |
//! |--------|------|--------|
//! | GET | `/devices` | status of every device |
//! | GET, POST | `/devices/config` | every configuration / create (201) |
//! | GET | `/devices/{id}` | status |
//! | GET, PUT, DELETE | `/devices/{id}/config` | configuration / replace / remove (204) |
//! | POST | `/devices/{id}/on`, `/off`, `/learn`, `/dim/{level}` | action, then status |

use axum::Json;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use serde::de::IgnoredAny;

use rfhub_app::ports::DeviceLibrary;
use rfhub_domain::device::{DeviceSettings, DimLevel, Parameters};
use rfhub_domain::error::NotFoundError;
use rfhub_domain::id::DeviceId;

use super::{parse_body, parse_id};
use crate::error::ApiError;
use crate::path::PathCursor;
use crate::state::AppState;

/// Body of a device create or replace.
///
/// Keys are accepted in PascalCase or lowercase. `ID` may be present and is
/// ignored; any other key is rejected.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct SettingsBody {
    #[serde(rename = "ID", alias = "Id", alias = "id", default)]
    _id: Option<IgnoredAny>,
    #[serde(alias = "name", default)]
    name: String,
    #[serde(alias = "protocol", default)]
    protocol: String,
    #[serde(alias = "model", default)]
    model: String,
    #[serde(alias = "parameters", default)]
    parameters: Parameters,
}

impl From<SettingsBody> for DeviceSettings {
    fn from(body: SettingsBody) -> Self {
        Self {
            name: body.name,
            protocol: body.protocol,
            model: body.model,
            parameters: body.parameters,
        }
    }
}

fn parse_settings(body: &[u8]) -> Result<DeviceSettings, ApiError> {
    let body: SettingsBody = parse_body(body)?;
    Ok(body.into())
}

/// What follows `/devices/{id}`.
enum DeviceRoute<'a> {
    Status,
    Config,
    On,
    Off,
    Learn,
    Dim(&'a str),
}

impl<'a> DeviceRoute<'a> {
    fn resolve(mut cursor: PathCursor<'a>) -> Option<Self> {
        let route = match cursor.shift() {
            None => Self::Status,
            Some("config") => Self::Config,
            Some("on") => Self::On,
            Some("off") => Self::Off,
            Some("learn") => Self::Learn,
            Some("dim") => Self::Dim(cursor.shift()?),
            Some(_) => return None,
        };
        cursor.is_empty().then_some(route)
    }

    fn allows(&self, method: &Method) -> bool {
        match self {
            Self::Status => method == Method::GET,
            Self::Config => [Method::GET, Method::PUT, Method::DELETE].contains(method),
            Self::On | Self::Off | Self::Learn | Self::Dim(_) => method == Method::POST,
        }
    }
}

/// Route a request under `/devices`; `cursor` is positioned after `devices`.
///
/// # Errors
///
/// Returns an [`ApiError`] for unmatched paths, wrong methods, invalid input
/// and service failures.
pub fn dispatch<L: DeviceLibrary>(
    state: &AppState<L>,
    method: &Method,
    path: &str,
    mut cursor: PathCursor<'_>,
    body: &[u8],
) -> Result<Response, ApiError> {
    let service = &state.device_service;

    let Some(segment) = cursor.shift() else {
        return match *method {
            Method::GET => Ok(Json(service.statuses()?).into_response()),
            _ => Err(ApiError::method_not_allowed(method, path)),
        };
    };

    if segment == "config" {
        if !cursor.is_empty() {
            return Err(ApiError::no_route(method, path));
        }
        return match *method {
            Method::GET => Ok(Json(service.configs()?).into_response()),
            Method::POST => {
                let settings = parse_settings(body)?;
                let created = service.create(&settings)?;
                Ok((StatusCode::CREATED, Json(created)).into_response())
            }
            _ => Err(ApiError::method_not_allowed(method, path)),
        };
    }

    let route = DeviceRoute::resolve(cursor).ok_or_else(|| ApiError::no_route(method, path))?;
    if !route.allows(method) {
        return Err(ApiError::method_not_allowed(method, path));
    }
    let id: DeviceId = parse_id(segment)?;
    if !service.exists(id) {
        return Err(NotFoundError {
            entity: "Device",
            id: id.to_string(),
        }
        .into());
    }

    match route {
        DeviceRoute::Status => Ok(Json(service.status(id)).into_response()),
        DeviceRoute::Config => match *method {
            Method::PUT => {
                let settings = parse_settings(body)?;
                Ok(Json(service.update(id, &settings)?).into_response())
            }
            Method::DELETE => {
                service.remove(id)?;
                Ok(StatusCode::NO_CONTENT.into_response())
            }
            _ => Ok(Json(service.config(id)).into_response()),
        },
        DeviceRoute::On => {
            service.turn_on(id)?;
            Ok(Json(service.status(id)).into_response())
        }
        DeviceRoute::Off => {
            service.turn_off(id)?;
            Ok(Json(service.status(id)).into_response())
        }
        DeviceRoute::Learn => {
            service.learn(id)?;
            Ok(Json(service.status(id)).into_response())
        }
        DeviceRoute::Dim(level) => {
            let level: DimLevel = level.parse()?;
            service.dim(id, level)?;
            Ok(Json(service.status(id)).into_response())
        }
    }
}
