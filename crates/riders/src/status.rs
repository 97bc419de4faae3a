//! Rider lifecycle status and its transition table.

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use boda_core::DomainError;

/// Lifecycle status of a rider.
///
/// ```text
/// REGISTERED ──submit──▶ PENDING_APPROVAL ──approve──▶ APPROVED
///                                        └──reject───▶ REJECTED
/// ```
///
/// `SUSPENDED` exists in the data model but no operation in this crate moves a
/// rider into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiderStatus {
    Registered,
    PendingApproval,
    Approved,
    Rejected,
    Suspended,
}

impl RiderStatus {
    pub const ALL: [RiderStatus; 5] = [
        RiderStatus::Registered,
        RiderStatus::PendingApproval,
        RiderStatus::Approved,
        RiderStatus::Rejected,
        RiderStatus::Suspended,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RiderStatus::Registered => "REGISTERED",
            RiderStatus::PendingApproval => "PENDING_APPROVAL",
            RiderStatus::Approved => "APPROVED",
            RiderStatus::Rejected => "REJECTED",
            RiderStatus::Suspended => "SUSPENDED",
        }
    }

    /// Statuses reachable from `self` in one step.
    pub fn allowed_targets(self) -> &'static [RiderStatus] {
        match self {
            RiderStatus::Registered => &[RiderStatus::PendingApproval],
            RiderStatus::PendingApproval => &[RiderStatus::Approved, RiderStatus::Rejected],
            RiderStatus::Approved | RiderStatus::Rejected | RiderStatus::Suspended => &[],
        }
    }

    pub fn can_transition_to(self, next: RiderStatus) -> bool {
        self.allowed_targets().contains(&next)
    }

    /// Check a move against the table, producing the domain error on failure.
    pub fn ensure_transition(self, next: RiderStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            Ok(())
        } else {
            Err(DomainError::invalid_transition(self, next))
        }
    }
}

impl core::fmt::Display for RiderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiderStatus {
    type Err = DomainError;

    /// Accepts the canonical upper-case form as well as lower-case query values
    /// (`pending_approval`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        RiderStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == upper)
            .ok_or_else(|| DomainError::validation(format!("unknown rider status '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn pending_approval_resolves_to_exactly_two_decisions() {
        let from = RiderStatus::PendingApproval;
        assert!(from.can_transition_to(RiderStatus::Approved));
        assert!(from.can_transition_to(RiderStatus::Rejected));
        assert!(!from.can_transition_to(RiderStatus::Suspended));
        assert!(!from.can_transition_to(RiderStatus::PendingApproval));
    }

    #[test]
    fn decisions_are_one_shot() {
        for terminal in [RiderStatus::Approved, RiderStatus::Rejected] {
            for next in RiderStatus::ALL {
                assert!(!terminal.can_transition_to(next), "{terminal} -> {next}");
            }
        }
    }

    #[test]
    fn ensure_transition_reports_both_ends() {
        let err = RiderStatus::Approved
            .ensure_transition(RiderStatus::Rejected)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: "APPROVED".to_string(),
                to: "REJECTED".to_string(),
            }
        );
    }

    #[test]
    fn parse_accepts_lower_case_query_values() {
        assert_eq!(
            "pending_approval".parse::<RiderStatus>().unwrap(),
            RiderStatus::PendingApproval
        );
        assert!("approvedish".parse::<RiderStatus>().is_err());
    }

    #[test]
    fn serde_uses_screaming_snake_case() {
        let json = serde_json::to_string(&RiderStatus::PendingApproval).unwrap();
        assert_eq!(json, "\"PENDING_APPROVAL\"");
        let back: RiderStatus = serde_json::from_str("\"REJECTED\"").unwrap();
        assert_eq!(back, RiderStatus::Rejected);
    }

    fn any_status() -> impl Strategy<Value = RiderStatus> {
        prop::sample::select(RiderStatus::ALL.to_vec())
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// No status can move to itself, and every legal target is reachable
        /// only from a single predecessor.
        #[test]
        fn table_has_no_self_loops_and_unique_predecessors(from in any_status(), to in any_status()) {
            if from == to {
                prop_assert!(!from.can_transition_to(to));
            }
            if from.can_transition_to(to) {
                let predecessors = RiderStatus::ALL
                    .into_iter()
                    .filter(|p| p.can_transition_to(to))
                    .count();
                prop_assert_eq!(predecessors, 1);
            }
        }
    }
}
