use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use boda_api::app::services::AppServices;
use boda_auth::{JwtClaims, PrincipalId, Role};
use boda_infra::{GatewayError, PushGateway, PushMessage};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::StatusCode;
use serde_json::{json, Value};

const JWT_SECRET: &str = "test-secret";

#[derive(Default)]
struct RecordingGateway {
    sent: Mutex<Vec<PushMessage>>,
    fail: bool,
}

#[async_trait::async_trait]
impl PushGateway for RecordingGateway {
    async fn send(&self, message: &PushMessage) -> Result<String, GatewayError> {
        self.sent.lock().unwrap().push(message.clone());
        if self.fail {
            Err(GatewayError::Unavailable("connection reset".to_string()))
        } else {
            Ok("projects/boda/messages/1".to_string())
        }
    }
}

struct TestServer {
    base_url: String,
    gateway: Arc<RecordingGateway>,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        Self::spawn_with(RecordingGateway::default()).await
    }

    async fn spawn_with(gateway: RecordingGateway) -> Self {
        // Same router as prod, in-memory store, fake gateway, ephemeral port.
        let gateway = Arc::new(gateway);
        let services = AppServices::in_memory(gateway.clone(), Duration::from_secs(2));
        let app = boda_api::app::build_app_with(JWT_SECRET.to_string(), services);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            gateway,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn register(&self, token: &str, phone: &str) -> Value {
        let res = self
            .client
            .post(self.url("/riders"))
            .bearer_auth(token)
            .json(&json!({ "phone_number": phone, "first_name": "Sarah", "last_name": "Nakato" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        res.json().await.unwrap()
    }

    /// Register a rider, optionally store a device token, and submit onboarding.
    /// Returns (rider id, rider bearer token).
    async fn pending_rider(&self, reviewer: &str, phone: &str, device: Option<&str>) -> (String, String) {
        let rider = self.register(reviewer, phone).await;
        let id = rider["id"].as_str().unwrap().to_string();
        let rider_token = mint_jwt(id.parse().unwrap(), vec![Role::RIDER]);

        if let Some(device) = device {
            let res = self
                .client
                .put(self.url("/me/push-token"))
                .bearer_auth(&rider_token)
                .json(&json!({ "token": device }))
                .send()
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::OK);
        }

        let res = self
            .client
            .post(self.url("/me/onboarding"))
            .bearer_auth(&rider_token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["status"], "PENDING_APPROVAL");

        (id, rider_token)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(sub: PrincipalId, roles: Vec<Role>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub,
        roles,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

fn enumerator() -> String {
    mint_jwt(PrincipalId::new(), vec![Role::ENUMERATOR])
}

#[tokio::test]
async fn auth_required_for_protected_endpoints() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "unauthenticated");

    let res = srv
        .client
        .get(srv.url("/riders"))
        .bearer_auth("garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn principal_is_derived_from_token() {
    let srv = TestServer::spawn().await;
    let id = PrincipalId::new();
    let token = mint_jwt(id, vec![Role::ADMIN]);

    let res = srv.client.get(srv.url("/whoami")).bearer_auth(token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["principal_id"].as_str().unwrap(), id.to_string());
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "admin"));
}

#[tokio::test]
async fn approval_flow_notifies_and_polling_sees_commit() {
    let srv = TestServer::spawn().await;
    let reviewer = enumerator();
    let (id, rider_token) = srv.pending_rider(&reviewer, "+256700300001", Some("device-1")).await;

    let res = srv
        .client
        .post(srv.url(&format!("/riders/{id}/approve")))
        .bearer_auth(&reviewer)
        .json(&json!({ "notes": "Documents verified" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["rider"]["status"], "APPROVED");
    assert!(body["rider"]["approved_at"].is_string());
    assert!(body["rider"]["rejection_reason"].is_null());
    assert_eq!(body["rider"]["review_notes"], "Documents verified");
    assert_eq!(body["notification_sent"], true);
    assert_eq!(body["delivery"]["outcome"], "sent");

    {
        let sent = srv.gateway.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].token, "device-1");
        assert_eq!(sent[0].data["status"], "APPROVED");
    }

    let res = srv.client.get(srv.url("/me")).bearer_auth(&rider_token).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let me: Value = res.json().await.unwrap();
    assert_eq!(me["status"], "APPROVED");
    assert_eq!(me["has_push_token"], true);
    assert!(me.get("push_token").is_none());
}

#[tokio::test]
async fn second_decision_conflicts_and_unknown_rider_is_404() {
    let srv = TestServer::spawn().await;
    let reviewer = enumerator();
    let (id, _) = srv.pending_rider(&reviewer, "+256700300002", None).await;

    let res = srv
        .client
        .post(srv.url(&format!("/riders/{id}/reject")))
        .bearer_auth(&reviewer)
        .json(&json!({ "reason": "Missing required documents" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["rider"]["status"], "REJECTED");
    assert_eq!(body["rider"]["rejection_reason"], "Missing required documents");
    assert!(body["rider"]["profile_id"].is_null());
    assert_eq!(body["notification_sent"], false);
    assert_eq!(body["delivery"]["outcome"], "not_sent");

    let res = srv
        .client
        .post(srv.url(&format!("/riders/{id}/approve")))
        .bearer_auth(&reviewer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_transition");

    let res = srv
        .client
        .post(srv.url(&format!("/riders/{}/approve", uuid::Uuid::now_v7())))
        .bearer_auth(&reviewer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn reject_without_reason_is_a_validation_error() {
    let srv = TestServer::spawn().await;
    let reviewer = enumerator();
    let (id, _) = srv.pending_rider(&reviewer, "+256700300003", None).await;

    for body in [json!({}), json!({ "reason": "" }), json!({ "reason": "   " })] {
        let res = srv
            .client
            .post(srv.url(&format!("/riders/{id}/reject")))
            .bearer_auth(&reviewer)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let err: Value = res.json().await.unwrap();
        assert_eq!(err["error"], "validation_error");
    }
}

#[tokio::test]
async fn gateway_failure_is_reported_not_raised() {
    let srv = TestServer::spawn_with(RecordingGateway {
        fail: true,
        ..Default::default()
    })
    .await;
    let reviewer = enumerator();
    let (id, rider_token) = srv.pending_rider(&reviewer, "+256700300004", Some("device-4")).await;

    let res = srv
        .client
        .post(srv.url(&format!("/riders/{id}/approve")))
        .bearer_auth(&reviewer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["notification_sent"], false);
    assert_eq!(body["delivery"]["outcome"], "failed");
    assert_eq!(body["delivery"]["failure"]["kind"], "gateway");

    let me: Value = srv
        .client
        .get(srv.url("/me"))
        .bearer_auth(&rider_token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(me["status"], "APPROVED");
}

#[tokio::test]
async fn riders_cannot_review_even_with_malformed_bodies() {
    let srv = TestServer::spawn().await;
    let reviewer = enumerator();
    let (id, rider_token) = srv.pending_rider(&reviewer, "+256700300005", None).await;

    let res = srv
        .client
        .post(srv.url(&format!("/riders/{id}/approve")))
        .bearer_auth(&rider_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    for action in ["approve", "reject"] {
        let res = srv
            .client
            .post(srv.url(&format!("/riders/{id}/{action}")))
            .bearer_auth(&rider_token)
            .header("content-type", "application/json")
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::FORBIDDEN, "{action}");
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "forbidden");
    }

    let res = srv
        .client
        .post(srv.url("/riders"))
        .bearer_auth(&rider_token)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn non_rider_credentials_are_unauthenticated_on_self_endpoints() {
    let srv = TestServer::spawn().await;
    let admin = mint_jwt(PrincipalId::new(), vec![Role::ADMIN]);

    for token in [enumerator(), admin] {
        let res = srv
            .client
            .put(srv.url("/me/push-token"))
            .bearer_auth(&token)
            .json(&json!({ "token": "device" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        let body: Value = res.json().await.unwrap();
        assert_eq!(body["error"], "unauthenticated");

        let res = srv.client.get(srv.url("/me")).bearer_auth(&token).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

        let res = srv
            .client
            .post(srv.url("/me/onboarding"))
            .bearer_auth(&token)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn enumerators_review_only_their_assigned_riders() {
    let srv = TestServer::spawn().await;
    let owner = enumerator();
    let stranger = enumerator();
    let (id, _) = srv.pending_rider(&owner, "+256700300012", None).await;
    srv.register(&stranger, "+256700300013").await;

    let res = srv
        .client
        .post(srv.url(&format!("/riders/{id}/approve")))
        .bearer_auth(&stranger)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "not_found");

    let mine: Value = srv
        .client
        .get(srv.url("/riders?assigned=me"))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<&str> = mine["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![id.as_str()]);

    let stats: Value = srv
        .client
        .get(srv.url("/stats?assigned=me"))
        .bearer_auth(&stranger)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_riders"], 1);
    assert_eq!(stats["registered"], 1);

    let res = srv
        .client
        .get(srv.url("/riders?assigned=someone"))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .post(srv.url(&format!("/riders/{id}/approve")))
        .bearer_auth(&owner)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    let profile_id = body["rider"]["profile_id"].as_str().unwrap();
    assert_eq!(profile_id, format!("DB-{}-0001", Utc::now().format("%Y")));
}

#[tokio::test]
async fn push_token_update_is_scoped_to_caller() {
    let srv = TestServer::spawn().await;
    let reviewer = enumerator();
    let (id_a, token_a) = srv.pending_rider(&reviewer, "+256700300006", Some("device-a")).await;
    let (id_b, _) = srv.pending_rider(&reviewer, "+256700300007", None).await;

    // Same token twice: identical observable result.
    let mut snapshots = Vec::new();
    for _ in 0..2 {
        let res = srv
            .client
            .put(srv.url("/me/push-token"))
            .bearer_auth(&token_a)
            .json(&json!({ "token": "device-a2" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        snapshots.push(res.json::<Value>().await.unwrap());
    }
    assert_eq!(snapshots[0], snapshots[1]);
    assert_eq!(snapshots[0]["id"], id_a);

    let b: Value = srv
        .client
        .get(srv.url(&format!("/riders/{id_b}")))
        .bearer_auth(&reviewer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(b["has_push_token"], false);

    // A rider token whose subject was never registered.
    let ghost = mint_jwt(PrincipalId::new(), vec![Role::RIDER]);
    let res = srv
        .client
        .put(srv.url("/me/push-token"))
        .bearer_auth(&ghost)
        .json(&json!({ "token": "device-x" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn listing_filters_by_status_and_stats_add_up() {
    let srv = TestServer::spawn().await;
    let reviewer = enumerator();
    let (approved, _) = srv.pending_rider(&reviewer, "+256700300008", None).await;
    let (pending, _) = srv.pending_rider(&reviewer, "+256700300009", None).await;
    srv.register(&reviewer, "+256700300010").await;

    let res = srv
        .client
        .post(srv.url(&format!("/riders/{approved}/approve")))
        .bearer_auth(&reviewer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let list: Value = srv
        .client
        .get(srv.url("/riders?status=pending_approval"))
        .bearer_auth(&reviewer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<&str> = list["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec![pending.as_str()]);

    let res = srv
        .client
        .get(srv.url("/riders?status=bogus"))
        .bearer_auth(&reviewer)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let stats: Value = srv
        .client
        .get(srv.url("/stats"))
        .bearer_auth(&reviewer)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_riders"], 3);
    assert_eq!(stats["registered"], 1);
    assert_eq!(stats["pending_approval"], 1);
    assert_eq!(stats["approved"], 1);
    assert_eq!(stats["recent_submissions"], 1);
    assert_eq!(stats["approval_rate"], 33.33);
}

#[tokio::test]
async fn registration_validates_phone_and_uniqueness() {
    let srv = TestServer::spawn().await;
    let reviewer = enumerator();
    srv.register(&reviewer, "+256700300011").await;

    for phone in ["+256 700 300 011", "12ab", "123"] {
        let res = srv
            .client
            .post(srv.url("/riders"))
            .bearer_auth(&reviewer)
            .json(&json!({ "phone_number": phone, "first_name": "A", "last_name": "B" }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "phone {phone}");
    }
}
