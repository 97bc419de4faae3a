use serde::Deserialize;

use boda_core::ActorId;
use boda_infra::TransitionOutcome;
use boda_riders::{NewRider, Rider};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRiderRequest {
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub assigned_enumerator: Option<ActorId>,
}

impl From<RegisterRiderRequest> for NewRider {
    fn from(value: RegisterRiderRequest) -> Self {
        NewRider {
            phone_number: value.phone_number,
            first_name: value.first_name,
            last_name: value.last_name,
            assigned_enumerator: value.assigned_enumerator,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveRiderRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectRiderRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePushTokenRequest {
    pub token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListRidersQuery {
    pub status: Option<String>,
    pub assigned: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub assigned: Option<String>,
}

// -------------------------
// Response mapping
// -------------------------

/// Rider snapshot as returned to reviewers and to the polling rider.
///
/// The device token itself never leaves the server.
pub fn rider_to_json(rider: &Rider) -> serde_json::Value {
    serde_json::json!({
        "id": rider.id.to_string(),
        "phone_number": rider.phone_number.as_str(),
        "first_name": rider.first_name,
        "last_name": rider.last_name,
        "full_name": rider.full_name(),
        "status": rider.status.as_str(),
        "assigned_enumerator": rider.assigned_enumerator.map(|a| a.to_string()),
        "profile_id": rider.profile_id.as_ref().map(|p| p.as_str()),
        "reviewed_by": rider.reviewed_by.map(|a| a.to_string()),
        "approved_at": rider.approved_at.map(|t| t.to_rfc3339()),
        "rejected_at": rider.rejected_at.map(|t| t.to_rfc3339()),
        "rejection_reason": rider.rejection_reason,
        "review_notes": rider.review_notes,
        "submitted_at": rider.submitted_at.map(|t| t.to_rfc3339()),
        "has_push_token": rider.has_push_token(),
        "created_at": rider.created_at.to_rfc3339(),
        "updated_at": rider.updated_at.to_rfc3339(),
    })
}

pub fn transition_to_json(outcome: &TransitionOutcome) -> serde_json::Value {
    serde_json::json!({
        "rider": rider_to_json(&outcome.rider),
        "notification_sent": outcome.notification_sent(),
        "delivery": outcome.delivery,
    })
}
