//! Process configuration loaded from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
pub const DEFAULT_JWT_SECRET: &str = "dev-secret";
pub const DEFAULT_FCM_ENDPOINT: &str = "https://fcm.googleapis.com";
pub const DEFAULT_PUSH_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },

    #[error("{0} is required")]
    Missing(&'static str),
}

/// Which push gateway to use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushConfig {
    Fcm {
        endpoint: String,
        project_id: String,
        access_token: String,
    },
    /// No FCM credentials: deliveries are logged and reported as sent.
    Simulated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// `Some` when `USE_PERSISTENT_STORES` is enabled.
    pub database_url: Option<String>,
    pub push: PushConfig,
    pub push_timeout: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                name: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let jwt_secret = get("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set; using insecure dev default");
            DEFAULT_JWT_SECRET.to_string()
        });

        let persistent = match get("USE_PERSISTENT_STORES") {
            None => false,
            Some(v) => parse_bool("USE_PERSISTENT_STORES", &v)?,
        };
        let database_url = if persistent {
            Some(get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?)
        } else {
            None
        };

        let push = match (get("FCM_PROJECT_ID"), get("FCM_ACCESS_TOKEN")) {
            (Some(project_id), Some(access_token)) => PushConfig::Fcm {
                endpoint: get("FCM_ENDPOINT").unwrap_or_else(|| DEFAULT_FCM_ENDPOINT.to_string()),
                project_id,
                access_token,
            },
            _ => PushConfig::Simulated,
        };

        let push_timeout_ms = match get("PUSH_TIMEOUT_MS") {
            None => DEFAULT_PUSH_TIMEOUT_MS,
            Some(v) => match v.parse::<u64>() {
                Ok(ms) if ms > 0 => ms,
                _ => {
                    return Err(ConfigError::Invalid {
                        name: "PUSH_TIMEOUT_MS",
                        reason: format!("expected a positive integer, got '{v}'"),
                    });
                }
            },
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            database_url,
            push,
            push_timeout: Duration::from_millis(push_timeout_ms),
        })
    }
}

fn parse_bool(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            reason: format!("expected a boolean, got '{raw}'"),
        }),
    }
}
