//! Status-change notification text.
//!
//! Title and body are selected deterministically from the new status; the
//! string `data` map travels alongside so the mobile client can route the tap
//! without parsing text.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::rider::Rider;
use crate::status::RiderStatus;

pub const NOTIFICATION_TYPE_STATUS_CHANGE: &str = "status_change";

/// A composed push notification, independent of any gateway wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusNotification {
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

impl StatusNotification {
    pub fn for_rider(rider: &Rider) -> Self {
        Self::compose(
            rider.status,
            &rider.full_name(),
            rider.rejection_reason.as_deref(),
        )
    }

    pub fn compose(status: RiderStatus, rider_name: &str, rejection_reason: Option<&str>) -> Self {
        let reason = rejection_reason.map(str::trim).filter(|r| !r.is_empty());

        let (title, body) = match status {
            RiderStatus::Approved => (
                "🎉 Application Approved!".to_string(),
                format!(
                    "Congratulations {rider_name}! Your application has been approved. Welcome to DigitalBoda!"
                ),
            ),
            RiderStatus::Rejected => {
                let mut body = format!("Hi {rider_name}, your application was not approved.");
                if let Some(reason) = reason {
                    body.push_str(&format!(" Reason: {reason}"));
                }
                body.push_str(" Please contact your enumerator for more information.");
                ("❌ Application Status Update".to_string(), body)
            }
            other => (
                "📋 Application Status Update".to_string(),
                format!("Hi {rider_name}, your application status has been updated to: {other}"),
            ),
        };

        let mut data = BTreeMap::new();
        data.insert("type".to_string(), NOTIFICATION_TYPE_STATUS_CHANGE.to_string());
        data.insert("status".to_string(), status.as_str().to_string());
        data.insert("rider_name".to_string(), rider_name.to_string());
        data.insert(
            "rejection_reason".to_string(),
            reason.unwrap_or_default().to_string(),
        );

        Self { title, body, data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn approved_message_congratulates_by_name() {
        let n = StatusNotification::compose(RiderStatus::Approved, "Sarah Nakato", None);
        assert_eq!(n.title, "🎉 Application Approved!");
        assert!(n.body.starts_with("Congratulations Sarah Nakato!"));
        assert_eq!(n.data["status"], "APPROVED");
        assert_eq!(n.data["type"], "status_change");
    }

    #[test]
    fn rejected_message_includes_reason_when_present() {
        let n = StatusNotification::compose(
            RiderStatus::Rejected,
            "John Okello",
            Some("Missing required documents"),
        );
        assert!(n.body.contains("Reason: Missing required documents"));
        assert!(n.body.ends_with("Please contact your enumerator for more information."));
        assert_eq!(n.data["rejection_reason"], "Missing required documents");
    }

    #[test]
    fn rejected_message_falls_back_to_enumerator_guidance() {
        let n = StatusNotification::compose(RiderStatus::Rejected, "John Okello", Some("  "));
        assert!(!n.body.contains("Reason:"));
        assert!(n.body.contains("contact your enumerator"));
        assert_eq!(n.data["rejection_reason"], "");
    }

    #[test]
    fn other_statuses_get_generic_update() {
        let n = StatusNotification::compose(RiderStatus::PendingApproval, "Amina", None);
        assert_eq!(n.title, "📋 Application Status Update");
        assert!(n.body.ends_with("updated to: PENDING_APPROVAL"));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Composition is a pure function of its inputs and always names the rider.
        #[test]
        fn composition_is_deterministic(
            name in "[A-Za-z]{1,12} [A-Za-z]{1,12}",
            reason in proptest::option::of("[a-z ]{0,30}"),
            idx in 0usize..5,
        ) {
            let status = RiderStatus::ALL[idx];
            let a = StatusNotification::compose(status, &name, reason.as_deref());
            let b = StatusNotification::compose(status, &name, reason.as_deref());
            prop_assert_eq!(&a, &b);
            prop_assert!(a.body.contains(&name));
            prop_assert_eq!(a.data.get("status").map(String::as_str), Some(status.as_str()));
        }
    }
}
