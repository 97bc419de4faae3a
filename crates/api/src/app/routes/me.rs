//! Self-service endpoints for the authenticated rider.
//!
//! The rider is always resolved from the bearer token; no endpoint here takes
//! a rider id from the client.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use boda_auth::Permission;

use crate::app::routes::common::rider_guard;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_me))
        .route("/push-token", put(update_push_token))
        .route("/onboarding", post(submit_onboarding))
}

/// Polling fallback: the caller's last committed snapshot.
pub async fn get_me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = rider_guard(&principal, Permission::SELF_READ) {
        return resp;
    }

    match services.riders.get_self(principal.principal()).await {
        Ok(rider) => (StatusCode::OK, Json(dto::rider_to_json(&rider))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_push_token(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Bytes,
) -> axum::response::Response {
    if let Err(resp) = rider_guard(&principal, Permission::SELF_PUSH_TOKEN) {
        return resp;
    }
    let body: dto::UpdatePushTokenRequest = match errors::parse_json_body(&body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    let token = body.token.unwrap_or_default();
    match services
        .riders
        .update_push_token(principal.principal(), &token)
        .await
    {
        Ok(rider) => (StatusCode::OK, Json(dto::rider_to_json(&rider))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn submit_onboarding(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(resp) = rider_guard(&principal, Permission::SELF_ONBOARDING) {
        return resp;
    }

    match services.riders.submit_onboarding(principal.principal()).await {
        Ok(rider) => (StatusCode::OK, Json(dto::rider_to_json(&rider))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
