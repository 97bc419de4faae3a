//! Firebase Cloud Messaging (HTTP v1) gateway.

use serde_json::{json, Value};
use tracing::debug;

use super::{GatewayError, PushGateway, PushMessage};

const ANDROID_CHANNEL_ID: &str = "status_updates";
const ANDROID_COLOR: &str = "#4CA1AF";
const ANDROID_ICON: &str = "ic_stat_notification";

/// FCM HTTP v1 client.
///
/// Holds one `reqwest::Client` for connection reuse. The OAuth access token is
/// supplied by configuration; minting it is outside this service.
pub struct FcmGateway {
    endpoint: String,
    project_id: String,
    access_token: String,
    client: reqwest::Client,
}

impl FcmGateway {
    pub fn new(
        endpoint: impl Into<String>,
        project_id: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
            access_token: access_token.into(),
            client: reqwest::Client::new(),
        }
    }

    fn send_url(&self) -> String {
        format!(
            "{}/v1/projects/{}/messages:send",
            self.endpoint, self.project_id
        )
    }

    /// Build the HTTP v1 request body with Android and APNs blocks.
    pub fn payload(message: &PushMessage) -> Value {
        json!({
            "message": {
                "token": message.token,
                "notification": {
                    "title": message.title,
                    "body": message.body,
                },
                "data": message.data,
                "android": {
                    "priority": "high",
                    "notification": {
                        "channel_id": ANDROID_CHANNEL_ID,
                        "color": ANDROID_COLOR,
                        "sound": "default",
                        "icon": ANDROID_ICON,
                    },
                },
                "apns": {
                    "headers": { "apns-priority": "10" },
                    "payload": {
                        "aps": {
                            "sound": "default",
                            "badge": 1,
                        },
                    },
                },
            }
        })
    }
}

#[async_trait::async_trait]
impl PushGateway for FcmGateway {
    async fn send(&self, message: &PushMessage) -> Result<String, GatewayError> {
        let resp = self
            .client
            .post(self.send_url())
            .bearer_auth(&self.access_token)
            .json(&Self::payload(message))
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            let body: Value = resp
                .json()
                .await
                .map_err(|e| GatewayError::Unavailable(format!("unreadable FCM response: {e}")))?;
            let name = body
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            debug!(message_id = %name, "FCM accepted message");
            return Ok(name);
        }

        let text = resp.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(GatewayError::Rejected {
                status: status.as_u16(),
                message: text,
            })
        } else {
            Err(GatewayError::Unavailable(format!("FCM returned {status}: {text}")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boda_riders::{RiderStatus, StatusNotification};

    #[test]
    fn payload_carries_platform_blocks_and_string_data() {
        let n = StatusNotification::compose(RiderStatus::Rejected, "Amina Nakato", Some("Blurry ID"));
        let msg = PushMessage::new("device-token", &n);
        let body = FcmGateway::payload(&msg);

        let m = &body["message"];
        assert_eq!(m["token"], "device-token");
        assert_eq!(m["notification"]["title"], "❌ Application Status Update");
        assert_eq!(m["data"]["type"], "status_change");
        assert_eq!(m["data"]["status"], "REJECTED");
        assert_eq!(m["data"]["rejection_reason"], "Blurry ID");
        assert_eq!(m["android"]["priority"], "high");
        assert_eq!(m["android"]["notification"]["channel_id"], "status_updates");
        assert_eq!(m["apns"]["headers"]["apns-priority"], "10");
        assert_eq!(m["apns"]["payload"]["aps"]["badge"], 1);
    }

    #[test]
    fn send_url_ignores_trailing_slash() {
        let gw = FcmGateway::new("https://fcm.example.test/", "boda-prod", "t");
        assert_eq!(
            gw.send_url(),
            "https://fcm.example.test/v1/projects/boda-prod/messages:send"
        );
    }
}
