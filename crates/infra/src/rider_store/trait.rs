use chrono::{DateTime, Utc};
use thiserror::Error;

use boda_core::{ActorId, Entity, RiderId};
use boda_riders::{PhoneNumber, Rider, RiderStatus, StatusCounts};

/// Rider store operation error.
///
/// These are storage outcomes. Deterministic business failures are
/// `boda_core::DomainError` and never originate here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RiderStoreError {
    #[error("rider {0} not found")]
    NotFound(RiderId),

    /// The conditional write lost: the row is no longer in the expected status.
    #[error("status mismatch: expected {expected}, found {actual}")]
    StatusMismatch {
        expected: RiderStatus,
        actual: RiderStatus,
    },

    #[error("phone number {0} is already registered")]
    DuplicatePhone(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Listing criteria; `None` fields match every rider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiderFilter {
    pub status: Option<RiderStatus>,
    pub assigned_enumerator: Option<ActorId>,
}

impl RiderFilter {
    pub fn matches(&self, rider: &Rider) -> bool {
        self.status.is_none_or(|s| rider.status == s)
            && self
                .assigned_enumerator
                .is_none_or(|e| rider.is_assigned_to(e))
    }
}

/// Rider record store.
///
/// Implementations must serialize writes per rider id: two concurrent
/// `update_if_status` calls with the same `expected` status can never both
/// succeed.
#[async_trait::async_trait]
pub trait RiderStore: Send + Sync {
    /// Insert a freshly registered rider. Fails with `DuplicatePhone` when the
    /// phone number is taken.
    async fn insert(&self, rider: Rider) -> Result<Rider, RiderStoreError>;

    /// Single-row read reflecting the last committed write.
    async fn get(&self, id: RiderId) -> Result<Rider, RiderStoreError>;

    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Rider>, RiderStoreError>;

    /// Conditionally commit lifecycle columns from `next`.
    ///
    /// Writes `status`, review metadata, the profile id, decision timestamps
    /// and `submitted_at` only if the stored status equals `expected`. The push
    /// token is left as stored so a concurrent token update is never lost.
    /// Returns the committed row.
    async fn update_if_status(
        &self,
        expected: RiderStatus,
        next: Rider,
    ) -> Result<Rider, RiderStoreError>;

    /// Unconditionally overwrite the rider's push token.
    async fn set_push_token(
        &self,
        id: RiderId,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Rider, RiderStoreError>;

    /// Riders matching `filter`, newest first.
    async fn list(&self, filter: RiderFilter) -> Result<Vec<Rider>, RiderStoreError>;

    /// Per-status counts, optionally limited to one enumerator's riders.
    async fn status_counts(&self, assigned: Option<ActorId>) -> Result<StatusCounts, RiderStoreError>;

    /// Riders still pending review that were submitted at or after `since`.
    async fn count_recent_submissions(
        &self,
        assigned: Option<ActorId>,
        since: DateTime<Utc>,
    ) -> Result<u64, RiderStoreError>;

    /// Atomically allocate the next profile sequence number for `year`,
    /// starting at 1. Numbers are never handed out twice.
    async fn next_profile_sequence(&self, year: i32) -> Result<u32, RiderStoreError>;
}

/// Copy the lifecycle columns of `next` onto `stored`, bumping the revision.
pub(crate) fn apply_lifecycle(stored: &Rider, next: &Rider) -> Rider {
    let mut committed = stored.clone();
    committed.status = next.status;
    committed.profile_id = next.profile_id.clone();
    committed.reviewed_by = next.reviewed_by;
    committed.approved_at = next.approved_at;
    committed.rejected_at = next.rejected_at;
    committed.rejection_reason = next.rejection_reason.clone();
    committed.review_notes = next.review_notes.clone();
    committed.submitted_at = next.submitted_at;
    committed.updated_at = next.updated_at;
    committed.revision = stored.revision() + 1;
    committed
}
