use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::de::DeserializeOwned;
use serde_json::json;

use boda_core::{ActorId, RiderId};
use boda_infra::ServiceError;
use boda_riders::RiderStatus;

use crate::context::PrincipalContext;

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        ServiceError::InvalidTransition(msg) => {
            json_error(StatusCode::CONFLICT, "invalid_transition", msg)
        }
        ServiceError::Authentication(msg) => {
            json_error(StatusCode::UNAUTHORIZED, "unauthenticated", msg)
        }
        ServiceError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        ServiceError::Forbidden(msg) => json_error(StatusCode::FORBIDDEN, "forbidden", msg),
        ServiceError::Store(msg) => {
            tracing::error!(error = %msg, "rider store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", msg)
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn parse_rider_id(raw: &str) -> Result<RiderId, axum::response::Response> {
    raw.parse::<RiderId>()
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

/// `me` names the caller; anything else must be an enumerator id.
pub fn parse_assignee(raw: &str, principal: &PrincipalContext) -> Result<ActorId, axum::response::Response> {
    if raw == "me" {
        return Ok(principal.principal().principal_id.as_actor());
    }
    raw.parse::<ActorId>()
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, "invalid_id", e.to_string()))
}

pub fn parse_status(raw: &str) -> Result<RiderStatus, axum::response::Response> {
    raw.parse::<RiderStatus>().map_err(|_| {
        json_error(
            StatusCode::BAD_REQUEST,
            "invalid_status",
            "status must be one of: registered, pending_approval, approved, rejected, suspended",
        )
    })
}

/// Decode a JSON body; an empty body decodes as `T::default()`.
pub fn parse_json_body<T: DeserializeOwned + Default>(body: &[u8]) -> Result<T, axum::response::Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| json_error(StatusCode::BAD_REQUEST, "validation_error", format!("invalid JSON body: {e}")))
}
