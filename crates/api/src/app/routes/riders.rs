use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use boda_auth::Permission;
use boda_infra::{RiderFilter, ServiceError, TransitionOutcome};
use boda_riders::NewRider;

use crate::app::routes::common::guard;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_rider).get(list_riders))
        .route("/:id", get(get_rider))
        .route("/:id/approve", post(approve_rider))
        .route("/:id/reject", post(reject_rider))
}

pub async fn register_rider(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Bytes,
) -> axum::response::Response {
    if let Err(resp) = guard(&principal, Permission::RIDERS_REGISTER) {
        return resp;
    }
    let body: dto::RegisterRiderRequest = match errors::parse_json_body(&body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    match services.riders.register(principal.principal(), NewRider::from(body)).await {
        Ok(rider) => (StatusCode::CREATED, Json(dto::rider_to_json(&rider))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

/// `?status=` narrows by lifecycle status, `?assigned=me|<enumerator id>` to
/// one enumerator's riders.
pub async fn list_riders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::ListRidersQuery>,
) -> axum::response::Response {
    if let Err(resp) = guard(&principal, Permission::RIDERS_READ) {
        return resp;
    }
    let status = match query.status.as_deref().map(errors::parse_status).transpose() {
        Ok(s) => s,
        Err(resp) => return resp,
    };
    let assigned_enumerator = match query
        .assigned
        .as_deref()
        .map(|raw| errors::parse_assignee(raw, &principal))
        .transpose()
    {
        Ok(a) => a,
        Err(resp) => return resp,
    };

    let filter = RiderFilter {
        status,
        assigned_enumerator,
    };
    match services.riders.list(filter).await {
        Ok(riders) => {
            let items = riders.iter().map(dto::rider_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn get_rider(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(resp) = guard(&principal, Permission::RIDERS_READ) {
        return resp;
    }
    let id = match errors::parse_rider_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };

    match services.riders.get(id).await {
        Ok(rider) => (StatusCode::OK, Json(dto::rider_to_json(&rider))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn approve_rider(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Bytes,
) -> axum::response::Response {
    if let Err(resp) = guard(&principal, Permission::RIDERS_APPROVE) {
        return resp;
    }
    let id = match errors::parse_rider_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let body: dto::ApproveRiderRequest = match errors::parse_json_body(&body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    transition_response(services.riders.approve(principal.principal(), id, body.notes).await)
}

pub async fn reject_rider(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Bytes,
) -> axum::response::Response {
    if let Err(resp) = guard(&principal, Permission::RIDERS_REJECT) {
        return resp;
    }
    let id = match errors::parse_rider_id(&id) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let body: dto::RejectRiderRequest = match errors::parse_json_body(&body) {
        Ok(b) => b,
        Err(resp) => return resp,
    };

    transition_response(services.riders.reject(principal.principal(), id, body.reason).await)
}

fn transition_response(result: Result<TransitionOutcome, ServiceError>) -> axum::response::Response {
    match result {
        Ok(outcome) => (StatusCode::OK, Json(dto::transition_to_json(&outcome))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn dashboard_stats(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Query(query): Query<dto::StatsQuery>,
) -> axum::response::Response {
    if let Err(resp) = guard(&principal, Permission::RIDERS_READ) {
        return resp;
    }
    let assigned = match query
        .assigned
        .as_deref()
        .map(|raw| errors::parse_assignee(raw, &principal))
        .transpose()
    {
        Ok(a) => a,
        Err(resp) => return resp,
    };

    match services.riders.stats(assigned).await {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
