//! Push gateway boundary.
//!
//! The gateway is a black box that accepts a device token plus title, body
//! and string data, and reports success or failure. It is treated as
//! unreliable and unordered.

pub mod fcm;
pub mod simulated;

use std::collections::BTreeMap;

use thiserror::Error;

use boda_riders::StatusNotification;

pub use fcm::FcmGateway;
pub use simulated::SimulatedGateway;

/// A notification addressed to one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

impl PushMessage {
    pub fn new(token: impl Into<String>, notification: &StatusNotification) -> Self {
        Self {
            token: token.into(),
            title: notification.title.clone(),
            body: notification.body.clone(),
            data: notification.data.clone(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The gateway refused the message (e.g. unregistered or invalid token).
    #[error("push rejected by gateway ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Network failure or an unexpected gateway response.
    #[error("push gateway unavailable: {0}")]
    Unavailable(String),
}

/// External push delivery service.
#[async_trait::async_trait]
pub trait PushGateway: Send + Sync {
    /// Deliver one message. Returns the gateway's message id.
    async fn send(&self, message: &PushMessage) -> Result<String, GatewayError>;
}
