//! Ledger configuration
//!
//! Every knob the admission pipeline and the retention sweeper read lives in
//! an explicit config object passed in at construction. There is no ambient
//! global state, so tests can run several difficulty levels side by side.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default proof-of-work difficulty (leading zero hex characters)
pub const DEFAULT_DIFFICULTY: u32 = 3;

/// Default retention window in days
pub const DEFAULT_RETENTION_DAYS: i64 = 365;

/// Default interval between retention sweeps, in seconds (24 hours)
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60 * 60 * 24;

/// Core ledger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Proof-of-work difficulty enforced at admission
    pub difficulty: u32,

    /// How identity lookups resolve their argument
    pub identity_scheme: IdentityScheme,

    /// Retention pruning policy
    pub retention: RetentionPolicy,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: DEFAULT_DIFFICULTY,
            identity_scheme: IdentityScheme::AddressWithPublicKeyFallback,
            retention: RetentionPolicy::default(),
        }
    }
}

impl LedgerConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the proof-of-work difficulty
    pub fn with_difficulty(mut self, difficulty: u32) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Set the identity lookup scheme
    pub fn with_identity_scheme(mut self, scheme: IdentityScheme) -> Self {
        self.identity_scheme = scheme;
        self
    }

    /// Set the retention policy
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }
}

/// How `list_by_identity` resolves its identity argument.
///
/// Older deployments keyed identity queries on the raw public key; newer ones
/// use the derived address. The fallback variant keeps both generations of
/// clients working and is the default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityScheme {
    /// Match on the derived address only
    AddressOnly,
    /// Match on the derived address; when nothing matches, retry on the
    /// raw public key
    AddressWithPublicKeyFallback,
}

/// Which server-assigned timestamp retention pruning compares against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RetentionField {
    /// Prune on admission time
    CreatedAt,
    /// Prune on last-update time (equal to admission time for this ledger,
    /// kept for deployments that sweep on it)
    UpdatedAt,
}

/// Age-based retention pruning policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    /// Records older than this many days are pruned
    pub window_days: i64,

    /// Timestamp the window is measured against
    pub field: RetentionField,

    /// Seconds between sweeps
    pub sweep_interval_secs: u64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_RETENTION_DAYS,
            field: RetentionField::CreatedAt,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl RetentionPolicy {
    /// Policy with a given window in days, pruning on `createdAt`
    pub fn days(window_days: i64) -> Self {
        Self {
            window_days,
            ..Self::default()
        }
    }

    /// Set the timestamp field the window is measured against
    pub fn on(mut self, field: RetentionField) -> Self {
        self.field = field;
        self
    }

    /// The cutoff instant for a sweep starting at `now`
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::days(self.window_days)
    }

    /// Interval between sweeps
    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sweep_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = LedgerConfig::default();
        assert_eq!(config.difficulty, DEFAULT_DIFFICULTY);
        assert_eq!(
            config.identity_scheme,
            IdentityScheme::AddressWithPublicKeyFallback
        );
        assert_eq!(config.retention.window_days, DEFAULT_RETENTION_DAYS);
        assert_eq!(config.retention.field, RetentionField::CreatedAt);
    }

    #[test]
    fn config_builder() {
        let config = LedgerConfig::new()
            .with_difficulty(5)
            .with_identity_scheme(IdentityScheme::AddressOnly)
            .with_retention(RetentionPolicy::days(90));

        assert_eq!(config.difficulty, 5);
        assert_eq!(config.identity_scheme, IdentityScheme::AddressOnly);
        assert_eq!(config.retention.window_days, 90);
    }

    #[test]
    fn config_serialization() {
        let config = LedgerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: LedgerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, parsed);
    }

    #[test]
    fn retention_cutoff_is_window_days_back() {
        let policy = RetentionPolicy::days(90);
        let now = Utc::now();
        assert_eq!(policy.cutoff(now), now - Duration::days(90));
    }
}
