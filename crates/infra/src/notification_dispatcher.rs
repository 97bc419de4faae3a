//! Best-effort, bounded-time notification delivery.
//!
//! The dispatcher never fails: every outcome, including a hung or erroring
//! gateway, is reported as a [`DeliveryOutcome`] value. There is no retry;
//! clients reconcile missed deliveries by polling.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, warn};

use boda_riders::StatusNotification;

use crate::push::{GatewayError, PushGateway, PushMessage};

pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryFailureKind {
    /// Network or service error.
    Gateway,
    /// The gateway did not answer within the configured bound.
    Timeout,
    /// The gateway refused the message (bad or stale token).
    Rejected,
}

/// Non-fatal delivery failure, reported alongside a successful transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryFailure {
    pub kind: DeliveryFailureKind,
    pub message: String,
}

impl From<GatewayError> for DeliveryFailure {
    fn from(value: GatewayError) -> Self {
        let kind = match value {
            GatewayError::Rejected { .. } => DeliveryFailureKind::Rejected,
            GatewayError::Unavailable(_) => DeliveryFailureKind::Gateway,
        };
        Self {
            kind,
            message: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Sent { message_id: String },
    /// No device token registered; expected, not an error.
    NotSent,
    Failed { failure: DeliveryFailure },
}

impl DeliveryOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent { .. })
    }
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    gateway: Arc<dyn PushGateway>,
    timeout: Duration,
}

impl NotificationDispatcher {
    pub fn new(gateway: Arc<dyn PushGateway>, timeout: Duration) -> Self {
        Self { gateway, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Attempt one delivery of `notification` to `token`.
    pub async fn dispatch(
        &self,
        token: Option<&str>,
        notification: &StatusNotification,
    ) -> DeliveryOutcome {
        let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) else {
            let status = notification.data.get("status").map(String::as_str).unwrap_or("");
            info!(status, "no device token registered; notification not sent");
            return DeliveryOutcome::NotSent;
        };

        let message = PushMessage::new(token, notification);
        match tokio::time::timeout(self.timeout, self.gateway.send(&message)).await {
            Ok(Ok(message_id)) => {
                info!(message_id = %message_id, "notification delivered");
                DeliveryOutcome::Sent { message_id }
            }
            Ok(Err(err)) => {
                warn!(error = %err, "notification delivery failed");
                DeliveryOutcome::Failed {
                    failure: err.into(),
                }
            }
            Err(_) => {
                warn!(timeout_ms = self.timeout.as_millis() as u64, "notification delivery timed out");
                DeliveryOutcome::Failed {
                    failure: DeliveryFailure {
                        kind: DeliveryFailureKind::Timeout,
                        message: format!(
                            "push gateway did not respond within {} ms",
                            self.timeout.as_millis()
                        ),
                    },
                }
            }
        }
    }
}
