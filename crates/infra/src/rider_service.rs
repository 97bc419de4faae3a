//! Rider lifecycle orchestration.
//!
//! ```text
//! decision
//!   ↓
//! 1. Validate input (reason present for reject)
//!   ↓
//! 2. Load rider (single-row read, scoped to the reviewer's assignments)
//!   ↓
//! 3. Decide next snapshot (pure, boda-riders; approvals carry a fresh profile id)
//!   ↓
//! 4. Conditional write (status must still be PENDING_APPROVAL)
//!   ↓
//! 5. Dispatch notification (best-effort, bounded, after commit)
//! ```
//!
//! Step 5 only starts once step 4 has committed, so a client that receives the
//! push and immediately polls never observes the prior status. Its outcome is
//! returned next to the rider and never turns a committed transition into an
//! error.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use tracing::{info, instrument};

use boda_auth::{AuthzError, Principal};
use boda_core::{ActorId, DomainError, RiderId};
use boda_riders::{DashboardStats, Decision, NewRider, ProfileId, Rider, RiderStatus, StatusNotification};

use crate::notification_dispatcher::{DeliveryOutcome, NotificationDispatcher};
use crate::rider_store::{RiderFilter, RiderStore, RiderStoreError};

const RECENT_SUBMISSION_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// Unknown rider.
    NotFound(String),
    /// The rider's current status does not allow the requested move.
    InvalidTransition(String),
    /// The caller's credential does not resolve to the acting rider.
    Authentication(String),
    /// Bad input (missing reason, malformed phone, duplicate phone, ...).
    Validation(String),
    /// Authenticated but not allowed.
    Forbidden(String),
    /// Storage failure.
    Store(String),
}

impl core::fmt::Display for ServiceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ServiceError::NotFound(m) => write!(f, "not found: {m}"),
            ServiceError::InvalidTransition(m) => write!(f, "invalid transition: {m}"),
            ServiceError::Authentication(m) => write!(f, "authentication failed: {m}"),
            ServiceError::Validation(m) => write!(f, "validation failed: {m}"),
            ServiceError::Forbidden(m) => write!(f, "forbidden: {m}"),
            ServiceError::Store(m) => write!(f, "store error: {m}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<AuthzError> for ServiceError {
    fn from(value: AuthzError) -> Self {
        ServiceError::Forbidden(value.to_string())
    }
}

impl From<DomainError> for ServiceError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => ServiceError::Validation(msg),
            DomainError::InvalidId(msg) => ServiceError::Validation(msg),
            DomainError::InvalidTransition { .. } => ServiceError::InvalidTransition(value.to_string()),
            DomainError::Unauthenticated => {
                ServiceError::Authentication("credential does not resolve to a rider".to_string())
            }
        }
    }
}

impl From<RiderStoreError> for ServiceError {
    fn from(value: RiderStoreError) -> Self {
        match value {
            RiderStoreError::NotFound(id) => ServiceError::NotFound(format!("rider {id} not found")),
            // The conditional write lost the race: report it as the loser's
            // illegal transition from the now-committed status.
            RiderStoreError::StatusMismatch { actual, .. } => ServiceError::InvalidTransition(format!(
                "rider is {actual}; status was changed concurrently"
            )),
            RiderStoreError::DuplicatePhone(_) => {
                ServiceError::Validation("phone number already registered".to_string())
            }
            RiderStoreError::Backend(msg) => ServiceError::Store(msg),
        }
    }
}

/// Result of a committed transition plus its notification outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionOutcome {
    pub rider: Rider,
    pub delivery: DeliveryOutcome,
}

impl TransitionOutcome {
    pub fn notification_sent(&self) -> bool {
        self.delivery.is_sent()
    }
}

/// Rider use cases over a store and a notification dispatcher.
///
/// `S` may be unsized so the API can hold `RiderService<dyn RiderStore>`.
pub struct RiderService<S: RiderStore + ?Sized> {
    store: Arc<S>,
    dispatcher: NotificationDispatcher,
}

impl<S: RiderStore + ?Sized> Clone for RiderService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<S: RiderStore + ?Sized> RiderService<S> {
    pub fn new(store: Arc<S>, dispatcher: NotificationDispatcher) -> Self {
        Self { store, dispatcher }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Register a new rider at REGISTERED.
    ///
    /// Enumerators always register riders to themselves; unscoped reviewers
    /// may name any enumerator or none.
    #[instrument(skip(self, input), fields(actor = %actor.principal_id), err(Display))]
    pub async fn register(&self, actor: &Principal, mut input: NewRider) -> Result<Rider, ServiceError> {
        if let Some(me) = actor.assignment_scope() {
            if input.assigned_enumerator.is_some_and(|other| other != me) {
                return Err(ServiceError::Forbidden(
                    "enumerators can only register riders to themselves".to_string(),
                ));
            }
            input.assigned_enumerator = Some(me);
        }
        let rider = Rider::register(RiderId::new(), input, Utc::now())?;

        if self.store.find_by_phone(&rider.phone_number).await?.is_some() {
            return Err(ServiceError::Validation(
                "phone number already registered".to_string(),
            ));
        }

        let rider = self.store.insert(rider).await?;
        info!(
            rider_id = %rider.id,
            assigned_enumerator = ?rider.assigned_enumerator,
            "rider registered"
        );
        Ok(rider)
    }

    pub async fn get(&self, id: RiderId) -> Result<Rider, ServiceError> {
        Ok(self.store.get(id).await?)
    }

    /// Polling read for the authenticated rider: the last committed snapshot.
    pub async fn get_self(&self, caller: &Principal) -> Result<Rider, ServiceError> {
        let id = resolve_rider(caller)?;
        self.store.get(id).await.map_err(authentication_if_missing)
    }

    pub async fn list(&self, filter: RiderFilter) -> Result<Vec<Rider>, ServiceError> {
        Ok(self.store.list(filter).await?)
    }

    /// Dashboard figures, over every rider or one enumerator's riders.
    pub async fn stats(&self, assigned: Option<ActorId>) -> Result<DashboardStats, ServiceError> {
        let counts = self.store.status_counts(assigned).await?;
        let since = Utc::now() - Duration::days(RECENT_SUBMISSION_WINDOW_DAYS);
        let recent = self.store.count_recent_submissions(assigned, since).await?;
        Ok(DashboardStats::from_counts(&counts, recent))
    }

    /// REGISTERED → PENDING_APPROVAL for the calling rider.
    #[instrument(skip(self, caller), fields(rider_id = %caller.principal_id), err(Display))]
    pub async fn submit_onboarding(&self, caller: &Principal) -> Result<Rider, ServiceError> {
        let id = resolve_rider(caller)?;
        let current = self.store.get(id).await.map_err(authentication_if_missing)?;
        let next = current.submit_for_approval(Utc::now())?;

        let committed = self.store.update_if_status(current.status, next).await?;
        info!(rider_id = %committed.id, "onboarding submitted for approval");
        Ok(committed)
    }

    /// PENDING_APPROVAL → APPROVED, issuing the rider's profile id.
    ///
    /// The sequence number is only allocated once the transition is known to
    /// be legal; a concurrent loser leaves a gap in the sequence.
    #[instrument(skip(self, reviewer, notes), fields(rider_id = %id), err(Display))]
    pub async fn approve(
        &self,
        reviewer: &Principal,
        id: RiderId,
        notes: Option<String>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let current = self.load_for_review(reviewer, id).await?;
        current.status.ensure_transition(RiderStatus::Approved)?;

        let now = Utc::now();
        let sequence = self.store.next_profile_sequence(now.year()).await?;
        let decision = Decision::approve(notes, ProfileId::issue(now.year(), sequence));
        self.commit_decision(reviewer, current, decision, now).await
    }

    /// PENDING_APPROVAL → REJECTED. The reason is validated before the rider
    /// is loaded.
    #[instrument(skip(self, reviewer, reason), fields(rider_id = %id), err(Display))]
    pub async fn reject(
        &self,
        reviewer: &Principal,
        id: RiderId,
        reason: Option<String>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let decision = Decision::reject(reason)?;
        let current = self.load_for_review(reviewer, id).await?;
        self.commit_decision(reviewer, current, decision, Utc::now()).await
    }

    /// Riders outside a scoped reviewer's assignments read as missing.
    async fn load_for_review(&self, reviewer: &Principal, id: RiderId) -> Result<Rider, ServiceError> {
        let rider = self.store.get(id).await?;
        match reviewer.assignment_scope() {
            Some(me) if !rider.is_assigned_to(me) => Err(ServiceError::NotFound(format!(
                "rider {id} not found or not assigned to you"
            ))),
            _ => Ok(rider),
        }
    }

    /// Commit a reviewer decision, then notify the rider.
    async fn commit_decision(
        &self,
        reviewer: &Principal,
        current: Rider,
        decision: Decision,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let next = current.decide(&decision, reviewer.principal_id.as_actor(), now)?;

        let committed = self.store.update_if_status(current.status, next).await?;
        info!(
            rider_id = %committed.id,
            status = %committed.status,
            profile_id = ?committed.profile_id,
            reviewed_by = %reviewer.principal_id,
            "rider status committed"
        );

        let notification = StatusNotification::for_rider(&committed);
        let delivery = self
            .dispatcher
            .dispatch(committed.push_token.as_deref(), &notification)
            .await;

        Ok(TransitionOutcome {
            rider: committed,
            delivery,
        })
    }

    /// Overwrite the calling rider's device token.
    ///
    /// The rider is resolved from the credential only. Re-submitting the
    /// stored token performs no write.
    #[instrument(skip(self, caller, token), fields(rider_id = %caller.principal_id), err(Display))]
    pub async fn update_push_token(&self, caller: &Principal, token: &str) -> Result<Rider, ServiceError> {
        let id = resolve_rider(caller)?;
        let current = self.store.get(id).await.map_err(authentication_if_missing)?;

        if current.push_token_matches(token) {
            return Ok(current);
        }

        let now = Utc::now();
        let next = current.with_push_token(token, now)?;
        let token = next.push_token.as_deref().unwrap_or_default();

        let committed = self.store.set_push_token(id, token, now).await?;
        info!(rider_id = %committed.id, "push token updated");
        Ok(committed)
    }
}

fn resolve_rider(caller: &Principal) -> Result<RiderId, ServiceError> {
    if caller.is_rider() {
        Ok(caller.principal_id.as_rider())
    } else {
        Err(DomainError::Unauthenticated.into())
    }
}

fn authentication_if_missing(err: RiderStoreError) -> ServiceError {
    match err {
        RiderStoreError::NotFound(_) => DomainError::Unauthenticated.into(),
        other => other.into(),
    }
}
