use tracing::info;
use uuid::Uuid;

use super::{GatewayError, PushGateway, PushMessage};

/// Development gateway used when FCM is not configured.
///
/// Logs the message and reports success so the rest of the pipeline behaves
/// as in production.
#[derive(Debug, Default, Clone)]
pub struct SimulatedGateway;

impl SimulatedGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl PushGateway for SimulatedGateway {
    async fn send(&self, message: &PushMessage) -> Result<String, GatewayError> {
        let message_id = format!("simulated-{}", Uuid::now_v7());
        info!(
            message_id = %message_id,
            title = %message.title,
            status = message.data.get("status").map(String::as_str).unwrap_or(""),
            "push gateway not configured; simulating delivery"
        );
        Ok(message_id)
    }
}
