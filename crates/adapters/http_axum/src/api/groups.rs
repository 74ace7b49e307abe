//! `/groups` resource.
//!
//! | Method | Path | Result |
//! |--------|------|--------|
//! | GET, POST | `/groups` | every group / create (201) |
//! | GET, DELETE | `/groups/{id}` | group / remove (204) |
//! | POST | `/groups/{id}/on`, `/off`, `/dim/{level}` | fan-out, members that acted |

use axum::Json;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use rfhub_app::ports::DeviceLibrary;
use rfhub_domain::device::DimLevel;
use rfhub_domain::error::NotFoundError;
use rfhub_domain::group::Group;
use rfhub_domain::id::{DeviceId, GroupId};

use super::{parse_body, parse_id};
use crate::error::ApiError;
use crate::path::PathCursor;
use crate::state::AppState;

/// Response body of a group action.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GroupActionResponse {
    pub acted: Vec<DeviceId>,
}

/// What follows `/groups/{id}`.
enum GroupRoute<'a> {
    Item,
    On,
    Off,
    Dim(&'a str),
}

impl<'a> GroupRoute<'a> {
    fn resolve(mut cursor: PathCursor<'a>) -> Option<Self> {
        let route = match cursor.shift() {
            None => Self::Item,
            Some("on") => Self::On,
            Some("off") => Self::Off,
            Some("dim") => Self::Dim(cursor.shift()?),
            Some(_) => return None,
        };
        cursor.is_empty().then_some(route)
    }

    fn allows(&self, method: &Method) -> bool {
        match self {
            Self::Item => method == Method::GET || method == Method::DELETE,
            Self::On | Self::Off | Self::Dim(_) => method == Method::POST,
        }
    }
}

/// Route a request under `/groups`; `cursor` is positioned after `groups`.
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
    let service = &state.group_service;

    let Some(segment) = cursor.shift() else {
        return match *method {
            Method::GET => Ok(Json(service.list()).into_response()),
            Method::POST => {
                let group: Group = parse_body(body)?;
                service.add(group.clone())?;
                Ok((StatusCode::CREATED, Json(group)).into_response())
            }
            _ => Err(ApiError::method_not_allowed(method, path)),
        };
    };

    let route = GroupRoute::resolve(cursor).ok_or_else(|| ApiError::no_route(method, path))?;
    if !route.allows(method) {
        return Err(ApiError::method_not_allowed(method, path));
    }
    let id: GroupId = parse_id(segment)?;

    let acted = match route {
        GroupRoute::Item if *method == Method::DELETE => {
            service.remove(id)?;
            return Ok(StatusCode::NO_CONTENT.into_response());
        }
        GroupRoute::Item => {
            let group = service.get(id).ok_or_else(|| NotFoundError {
                entity: "Group",
                id: id.to_string(),
            })?;
            return Ok(Json(group).into_response());
        }
        GroupRoute::On => service.turn_on(id)?,
        GroupRoute::Off => service.turn_off(id)?,
        GroupRoute::Dim(level) => {
            let level: DimLevel = level.parse()?;
            service.dim(id, level)?
        }
    };
    Ok(Json(GroupActionResponse { acted }).into_response())
}
