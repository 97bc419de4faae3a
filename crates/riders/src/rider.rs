//! Rider entity and its decision logic.
//!
//! Every state-changing method takes `&self` and returns the next snapshot;
//! persisting that snapshot (conditionally on the prior status) is the store's
//! job. This keeps decisions deterministic and lets the store serialize
//! concurrent writers without knowing the rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use boda_core::{ActorId, DomainError, DomainResult, Entity, RiderId};

use crate::profile::ProfileId;
use crate::status::RiderStatus;

const MAX_NAME_LEN: usize = 50;
const MAX_PUSH_TOKEN_LEN: usize = 4096;

// ─────────────────────────────────────────────────────────────────────────────
// Phone number
// ─────────────────────────────────────────────────────────────────────────────

/// Normalized phone number: optional leading `+` followed by 9 to 15 digits.
///
/// Spaces, dashes and parentheses are stripped before validation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(raw: &str) -> DomainResult<Self> {
        let cleaned: String = raw
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
            .collect();

        let digits = cleaned.strip_prefix('+').unwrap_or(&cleaned);
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(DomainError::validation("phone number must contain only digits"));
        }
        if !(9..=15).contains(&digits.len()) {
            return Err(DomainError::validation(
                "phone number must have between 9 and 15 digits",
            ));
        }

        Ok(Self(cleaned))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Inputs
// ─────────────────────────────────────────────────────────────────────────────

/// Registration input, as captured by an enumerator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewRider {
    pub phone_number: String,
    pub first_name: String,
    pub last_name: String,
    /// Enumerator responsible for reviewing this rider.
    #[serde(default)]
    pub assigned_enumerator: Option<ActorId>,
}

/// A reviewer's decision on a pending rider.
///
/// An approval carries the profile id it issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Approve {
        notes: Option<String>,
        profile_id: ProfileId,
    },
    Reject {
        reason: String,
    },
}

impl Decision {
    pub fn approve(notes: Option<String>, profile_id: ProfileId) -> Self {
        Decision::Approve {
            notes: notes.and_then(non_blank),
            profile_id,
        }
    }

    /// Build a rejection. A missing, empty or whitespace-only reason is invalid.
    pub fn reject(reason: Option<String>) -> DomainResult<Self> {
        match reason.and_then(non_blank) {
            Some(reason) => Ok(Decision::Reject { reason }),
            None => Err(DomainError::validation("rejection reason is required")),
        }
    }

    pub fn target_status(&self) -> RiderStatus {
        match self {
            Decision::Approve { .. } => RiderStatus::Approved,
            Decision::Reject { .. } => RiderStatus::Rejected,
        }
    }
}

fn non_blank(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Rider
// ─────────────────────────────────────────────────────────────────────────────

/// A rider and its approval lifecycle.
///
/// # Invariants
/// - `approved_at` is set if and only if `status == APPROVED`.
/// - `rejected_at` is set and `rejection_reason` is non-empty if and only if
///   `status == REJECTED`.
/// - `profile_id` is set if and only if `status == APPROVED`.
/// - `revision` increases by exactly one per committed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rider {
    pub id: RiderId,
    pub phone_number: PhoneNumber,
    pub first_name: String,
    pub last_name: String,
    pub status: RiderStatus,
    pub assigned_enumerator: Option<ActorId>,
    pub profile_id: Option<ProfileId>,
    pub reviewed_by: Option<ActorId>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub review_notes: Option<String>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub push_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub revision: u64,
}

impl Rider {
    /// Create a freshly registered rider.
    pub fn register(id: RiderId, input: NewRider, now: DateTime<Utc>) -> DomainResult<Self> {
        let phone_number = PhoneNumber::parse(&input.phone_number)?;
        let first_name = validate_name("first name", &input.first_name)?;
        let last_name = validate_name("last name", &input.last_name)?;

        Ok(Self {
            id,
            phone_number,
            first_name,
            last_name,
            status: RiderStatus::Registered,
            assigned_enumerator: input.assigned_enumerator,
            profile_id: None,
            reviewed_by: None,
            approved_at: None,
            rejected_at: None,
            rejection_reason: None,
            review_notes: None,
            submitted_at: None,
            push_token: None,
            created_at: now,
            updated_at: now,
            revision: 1,
        })
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn has_push_token(&self) -> bool {
        self.push_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn is_assigned_to(&self, enumerator: ActorId) -> bool {
        self.assigned_enumerator == Some(enumerator)
    }

    /// Rider finished onboarding and asks for review.
    pub fn submit_for_approval(&self, now: DateTime<Utc>) -> DomainResult<Self> {
        self.status.ensure_transition(RiderStatus::PendingApproval)?;

        let mut next = self.next_revision(now);
        next.status = RiderStatus::PendingApproval;
        next.submitted_at = Some(now);
        Ok(next)
    }

    /// Apply a reviewer decision. Only legal from `PENDING_APPROVAL`.
    pub fn decide(&self, decision: &Decision, actor: ActorId, now: DateTime<Utc>) -> DomainResult<Self> {
        self.status.ensure_transition(decision.target_status())?;

        let mut next = self.next_revision(now);
        next.status = decision.target_status();
        next.reviewed_by = Some(actor);
        match decision {
            Decision::Approve { notes, profile_id } => {
                next.profile_id = Some(profile_id.clone());
                next.approved_at = Some(now);
                next.rejected_at = None;
                next.rejection_reason = None;
                next.review_notes = notes.clone();
            }
            Decision::Reject { reason } => {
                next.profile_id = None;
                next.approved_at = None;
                next.rejected_at = Some(now);
                next.rejection_reason = Some(reason.clone());
                next.review_notes = Some(reason.clone());
            }
        }
        next.check_invariants()?;
        Ok(next)
    }

    /// Whether storing `token` would change nothing.
    pub fn push_token_matches(&self, token: &str) -> bool {
        self.push_token.as_deref() == Some(token.trim())
    }

    /// Replace the device push token. No history is kept.
    pub fn with_push_token(&self, token: &str, now: DateTime<Utc>) -> DomainResult<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(DomainError::validation("push token is required"));
        }
        if token.len() > MAX_PUSH_TOKEN_LEN {
            return Err(DomainError::validation("push token is too long"));
        }

        let mut next = self.next_revision(now);
        next.push_token = Some(token.to_string());
        Ok(next)
    }

    /// Verify the status/metadata coupling. Stores call this before writing.
    pub fn check_invariants(&self) -> DomainResult<()> {
        let approved = self.status == RiderStatus::Approved;
        if self.approved_at.is_some() != approved || self.profile_id.is_some() != approved {
            return Err(DomainError::validation(format!(
                "approval metadata must be set only when APPROVED (status {})",
                self.status
            )));
        }

        let rejected = self.status == RiderStatus::Rejected;
        let has_reason = self
            .rejection_reason
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty());
        if has_reason != rejected || self.rejected_at.is_some() != rejected {
            return Err(DomainError::validation(format!(
                "rejection metadata must be set only when REJECTED (status {})",
                self.status
            )));
        }

        Ok(())
    }

    fn next_revision(&self, now: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.updated_at = now;
        next.revision = self.revision + 1;
        next
    }
}

impl Entity for Rider {
    type Id = RiderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}

fn validate_name(field: &str, raw: &str) -> DomainResult<String> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(DomainError::validation(format!("{field} is required")));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::validation(format!(
            "{field} must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}
