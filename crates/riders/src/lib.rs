//! `boda-riders`: rider registration and approval domain.
//!
//! Pure state and decision logic: the `Rider` entity, its closed status
//! lifecycle, push-notification text selection and dashboard statistics.
//! Persistence and delivery live in `boda-infra`.

pub mod notification;
pub mod profile;
pub mod rider;
pub mod stats;
pub mod status;

pub use notification::StatusNotification;
pub use profile::ProfileId;
pub use rider::{Decision, NewRider, PhoneNumber, Rider};
pub use stats::{DashboardStats, StatusCounts};
pub use status::RiderStatus;
