use std::collections::HashMap;
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};

use boda_core::{ActorId, Entity, RiderId};
use boda_riders::{PhoneNumber, Rider, RiderStatus, StatusCounts};

use super::r#trait::{apply_lifecycle, RiderFilter, RiderStore, RiderStoreError};

/// In-memory rider store.
///
/// Intended for tests/dev. A single `RwLock` over the map gives the
/// single-writer discipline: the status check and the write happen under the
/// same write guard.
#[derive(Debug, Default)]
pub struct InMemoryRiderStore {
    riders: RwLock<HashMap<RiderId, Rider>>,
    /// Last profile sequence handed out, per year.
    profile_sequences: Mutex<HashMap<i32, u32>>,
}

impl InMemoryRiderStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> RiderStoreError {
        RiderStoreError::Backend("lock poisoned".to_string())
    }
}

#[async_trait::async_trait]
impl RiderStore for InMemoryRiderStore {
    async fn insert(&self, rider: Rider) -> Result<Rider, RiderStoreError> {
        let mut riders = self.riders.write().map_err(|_| Self::poisoned())?;

        if riders.values().any(|r| r.phone_number == rider.phone_number) {
            return Err(RiderStoreError::DuplicatePhone(
                rider.phone_number.to_string(),
            ));
        }
        let id = *rider.id();
        if riders.contains_key(&id) {
            return Err(RiderStoreError::Backend(format!(
                "rider id {id} already exists"
            )));
        }

        riders.insert(id, rider.clone());
        Ok(rider)
    }

    async fn get(&self, id: RiderId) -> Result<Rider, RiderStoreError> {
        let riders = self.riders.read().map_err(|_| Self::poisoned())?;
        riders.get(&id).cloned().ok_or(RiderStoreError::NotFound(id))
    }

    async fn find_by_phone(&self, phone: &PhoneNumber) -> Result<Option<Rider>, RiderStoreError> {
        let riders = self.riders.read().map_err(|_| Self::poisoned())?;
        Ok(riders.values().find(|r| &r.phone_number == phone).cloned())
    }

    async fn update_if_status(
        &self,
        expected: RiderStatus,
        next: Rider,
    ) -> Result<Rider, RiderStoreError> {
        let mut riders = self.riders.write().map_err(|_| Self::poisoned())?;
        let stored = riders
            .get(&next.id)
            .ok_or(RiderStoreError::NotFound(next.id))?;

        if stored.status != expected {
            return Err(RiderStoreError::StatusMismatch {
                expected,
                actual: stored.status,
            });
        }

        let committed = apply_lifecycle(stored, &next);
        riders.insert(committed.id, committed.clone());
        Ok(committed)
    }

    async fn set_push_token(
        &self,
        id: RiderId,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Rider, RiderStoreError> {
        let mut riders = self.riders.write().map_err(|_| Self::poisoned())?;
        let rider = riders.get_mut(&id).ok_or(RiderStoreError::NotFound(id))?;

        rider.push_token = Some(token.to_string());
        rider.updated_at = now;
        rider.revision += 1;
        Ok(rider.clone())
    }

    async fn list(&self, filter: RiderFilter) -> Result<Vec<Rider>, RiderStoreError> {
        let riders = self.riders.read().map_err(|_| Self::poisoned())?;
        let mut out: Vec<Rider> = riders
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.as_uuid().cmp(a.id.as_uuid())));
        Ok(out)
    }

    async fn status_counts(&self, assigned: Option<ActorId>) -> Result<StatusCounts, RiderStoreError> {
        let filter = RiderFilter {
            assigned_enumerator: assigned,
            ..Default::default()
        };
        let riders = self.riders.read().map_err(|_| Self::poisoned())?;
        Ok(riders
            .values()
            .filter(|r| filter.matches(r))
            .map(|r| r.status)
            .collect())
    }

    async fn count_recent_submissions(
        &self,
        assigned: Option<ActorId>,
        since: DateTime<Utc>,
    ) -> Result<u64, RiderStoreError> {
        let filter = RiderFilter {
            status: Some(RiderStatus::PendingApproval),
            assigned_enumerator: assigned,
        };
        let riders = self.riders.read().map_err(|_| Self::poisoned())?;
        Ok(riders
            .values()
            .filter(|r| filter.matches(r))
            .filter(|r| r.submitted_at.is_some_and(|t| t >= since))
            .count() as u64)
    }

    async fn next_profile_sequence(&self, year: i32) -> Result<u32, RiderStoreError> {
        let mut sequences = self.profile_sequences.lock().map_err(|_| Self::poisoned())?;
        let last = sequences.entry(year).or_insert(0);
        *last += 1;
        Ok(*last)
    }
}
