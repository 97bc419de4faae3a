use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::info;

use boda_infra::{
    AppConfig, FcmGateway, InMemoryRiderStore, NotificationDispatcher, PostgresRiderStore, PushConfig,
    PushGateway, RiderService, RiderStore, SimulatedGateway,
};

/// Shared application services, handed to handlers as an `Extension`.
#[derive(Clone)]
pub struct AppServices {
    pub riders: RiderService<dyn RiderStore>,
}

impl AppServices {
    pub fn new(store: Arc<dyn RiderStore>, gateway: Arc<dyn PushGateway>, push_timeout: Duration) -> Self {
        let dispatcher = NotificationDispatcher::new(gateway, push_timeout);
        Self {
            riders: RiderService::new(store, dispatcher),
        }
    }

    /// In-memory store with the given gateway (dev and tests).
    pub fn in_memory(gateway: Arc<dyn PushGateway>, push_timeout: Duration) -> Self {
        Self::new(Arc::new(InMemoryRiderStore::new()), gateway, push_timeout)
    }
}

/// Wire store and gateway from configuration.
pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let gateway = build_gateway(&config.push);

    let store: Arc<dyn RiderStore> = match &config.database_url {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(url)
                .await
                .context("failed to connect to DATABASE_URL")?;
            let store = PostgresRiderStore::new(pool);
            store
                .ensure_schema()
                .await
                .context("failed to prepare riders schema")?;
            info!("using Postgres rider store");
            Arc::new(store)
        }
        None => {
            info!("using in-memory rider store");
            Arc::new(InMemoryRiderStore::new())
        }
    };

    Ok(AppServices::new(store, gateway, config.push_timeout))
}

fn build_gateway(push: &PushConfig) -> Arc<dyn PushGateway> {
    match push {
        PushConfig::Fcm {
            endpoint,
            project_id,
            access_token,
        } => {
            info!(project_id = %project_id, "using FCM push gateway");
            Arc::new(FcmGateway::new(endpoint.clone(), project_id.clone(), access_token.clone()))
        }
        PushConfig::Simulated => {
            info!("FCM not configured; push deliveries are simulated");
            Arc::new(SimulatedGateway::new())
        }
    }
}
