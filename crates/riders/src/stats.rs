//! Review dashboard statistics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::status::RiderStatus;

/// Number of riders per status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusCounts(BTreeMap<RiderStatus, u64>);

impl StatusCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, status: RiderStatus, count: u64) {
        self.0.insert(status, count);
    }

    pub fn increment(&mut self, status: RiderStatus) {
        *self.0.entry(status).or_insert(0) += 1;
    }

    pub fn get(&self, status: RiderStatus) -> u64 {
        self.0.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }
}

impl FromIterator<RiderStatus> for StatusCounts {
    fn from_iter<I: IntoIterator<Item = RiderStatus>>(iter: I) -> Self {
        let mut counts = StatusCounts::new();
        for status in iter {
            counts.increment(status);
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_riders: u64,
    pub registered: u64,
    pub pending_approval: u64,
    pub approved: u64,
    pub rejected: u64,
    pub suspended: u64,
    /// Riders that entered review during the last seven days and are still pending.
    pub recent_submissions: u64,
    /// Approved share of all riders, in percent, two decimals.
    pub approval_rate: f64,
}

impl DashboardStats {
    pub fn from_counts(counts: &StatusCounts, recent_submissions: u64) -> Self {
        let total = counts.total();
        let approved = counts.get(RiderStatus::Approved);

        let approval_rate = if total == 0 {
            0.0
        } else {
            ((approved as f64 / total as f64) * 100.0 * 100.0).round() / 100.0
        };

        Self {
            total_riders: total,
            registered: counts.get(RiderStatus::Registered),
            pending_approval: counts.get(RiderStatus::PendingApproval),
            approved,
            rejected: counts.get(RiderStatus::Rejected),
            suspended: counts.get(RiderStatus::Suspended),
            recent_submissions,
            approval_rate,
        }
    }
}
