//! Infrastructure layer: rider storage, push delivery, orchestration, config.

pub mod config;
pub mod notification_dispatcher;
pub mod push;
pub mod rider_service;
pub mod rider_store;


pub use config::{AppConfig, ConfigError, PushConfig};
pub use notification_dispatcher::{DeliveryFailure, DeliveryFailureKind, DeliveryOutcome, NotificationDispatcher};
pub use push::{FcmGateway, GatewayError, PushGateway, PushMessage, SimulatedGateway};
pub use rider_service::{RiderService, ServiceError, TransitionOutcome};
pub use rider_store::{InMemoryRiderStore, PostgresRiderStore, RiderFilter, RiderStore, RiderStoreError};
