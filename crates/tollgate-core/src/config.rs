// ── Runtime service configuration ──
//
// These values describe *policy*: how long a subscription runs, how
// eagerly the reconciliation loop warns, how many strikes before
// removal. The binary builds a `ServiceConfig` from file/env and hands
// it in -- core never touches disk.

use std::time::Duration;

use crate::model::AdminId;

/// Tuning for the whole service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Length of one paid subscription period, in days.
    pub subscription_days: i64,
    /// Validity window of a minted invite credential.
    ///
    /// Default 24h. Legacy deployments ran 1h and 72h -- always a
    /// configuration value, never a constant.
    pub invite_ttl: Duration,
    /// Reminder window: grants expiring within this many days are
    /// flagged as "soon expiring".
    pub remind_days: i64,
    /// Minimum gap between two warnings for the same
    /// (subscriber, destination, reason) key.
    pub warning_cooldown: Duration,
    /// Admin grants expiring within this many days get a warning.
    pub admin_warn_days: i64,
    /// Minimum gap between two expiry warnings for the same admin.
    pub admin_warn_interval: Duration,
    /// How often the reconciliation loop runs.
    pub reconcile_interval: Duration,
    /// Delay before the first reconciliation cycle after startup.
    pub reconcile_initial_delay: Duration,
    /// Bound on concurrent outbound transport calls per cycle.
    pub max_outbound_in_flight: usize,
    /// "Not paid" strikes before removal is attempted.
    pub not_paid_threshold: u32,
    /// Static super-admin allow-list, configured out-of-band.
    pub super_admins: Vec<AdminId>,
}

impl ServiceConfig {
    /// Subscription period in seconds.
    pub fn subscription_period(&self) -> i64 {
        self.subscription_days * 86_400
    }

    /// Reminder window in seconds.
    pub fn remind_window(&self) -> i64 {
        self.remind_days * 86_400
    }

    /// Admin warning horizon in seconds.
    pub fn admin_warn_horizon(&self) -> i64 {
        self.admin_warn_days * 86_400
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            subscription_days: 30,
            invite_ttl: Duration::from_secs(24 * 3600),
            remind_days: 3,
            warning_cooldown: Duration::from_secs(3600),
            admin_warn_days: 2,
            admin_warn_interval: Duration::from_secs(24 * 3600),
            reconcile_interval: Duration::from_secs(60),
            reconcile_initial_delay: Duration::from_secs(5),
            max_outbound_in_flight: 8,
            not_paid_threshold: 3,
            super_admins: Vec::new(),
        }
    }
}
