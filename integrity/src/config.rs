//! Tunables for scanning, check-in and fraud screening.
//!
//! Loads configuration from environment variables with the production
//! defaults; `Default` gives the same values for tests.

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

/// Complete integrity configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityConfig {
    /// Gate scanner timing
    pub scan: ScanConfig,
    /// Check-in policy defaults
    pub check_in: CheckInConfig,
    /// Fraud screening thresholds
    pub fraud: FraudConfig,
}

impl IntegrityConfig {
    /// Load configuration from environment variables.
    ///
    /// Unset or unparsable variables fall back to their defaults.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            scan: ScanConfig::from_env(),
            check_in: CheckInConfig::from_env(),
            fraud: FraudConfig::from_env(),
        }
    }
}

/// Gate scanner timing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Repeat reads of the same code within this window are ignored (default: 3000)
    pub duplicate_window_ms: u64,
    /// How long a result stays on screen before scanning resumes (default: 1200)
    pub cooldown_ms: u64,
}

impl ScanConfig {
    /// Load from `SCAN_DUPLICATE_WINDOW_MS` and `SCAN_COOLDOWN_MS`
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            duplicate_window_ms: env::var("SCAN_DUPLICATE_WINDOW_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.duplicate_window_ms),
            cooldown_ms: env::var("SCAN_COOLDOWN_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.cooldown_ms),
        }
    }

    /// Duplicate-read window
    #[must_use]
    pub const fn duplicate_window(&self) -> Duration {
        Duration::from_millis(self.duplicate_window_ms)
    }

    /// Result display cooldown
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            duplicate_window_ms: 3000,
            cooldown_ms: 1200,
        }
    }
}

/// Check-in policy defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CheckInConfig {
    /// Re-entry flag reported when the event policy cannot be read (default: false)
    pub default_allow_reentry: bool,
}

impl CheckInConfig {
    /// Load from `CHECKIN_DEFAULT_ALLOW_REENTRY`
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            default_allow_reentry: env::var("CHECKIN_DEFAULT_ALLOW_REENTRY")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(false),
        }
    }
}

/// Lowest fingerprint fan-out threshold; the current address always counts as one.
pub const MIN_FINGERPRINT_IP_THRESHOLD: usize = 2;

/// Fraud screening thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudConfig {
    /// Rate limit window in seconds (default: 300)
    pub rate_limit_window_secs: u64,
    /// Attempts per user within the window before denial (default: 10)
    pub max_attempts_per_user: u32,
    /// Attempts per IP within the window before denial (default: 20)
    pub max_attempts_per_ip: u32,
    /// Attempts per event and IP within the window before denial (default: 5)
    pub max_attempts_per_event_ip: u32,
    /// Per-user ticket cap when the event sets none (default: 10)
    pub default_max_tickets_per_user: u32,
    /// Lookback for bot signals in seconds (default: 3600)
    pub bot_window_secs: u64,
    /// Distinct IPs per fingerprint that flag automation (default: 5, at
    /// least [`MIN_FINGERPRINT_IP_THRESHOLD`])
    pub fingerprint_ip_threshold: usize,
    /// Prior attempts sampled for the interval check (default: 5)
    pub interval_sample_size: usize,
    /// Mean gap between sampled attempts below which automation is flagged (default: 2000)
    pub min_mean_interval_ms: i64,
}

impl FraudConfig {
    /// Load from `FRAUD_*` environment variables
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            rate_limit_window_secs: env::var("FRAUD_RATE_LIMIT_WINDOW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.rate_limit_window_secs),
            max_attempts_per_user: env::var("FRAUD_RATE_LIMIT_USER")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_attempts_per_user),
            max_attempts_per_ip: env::var("FRAUD_RATE_LIMIT_IP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_attempts_per_ip),
            max_attempts_per_event_ip: env::var("FRAUD_RATE_LIMIT_EVENT_IP")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_attempts_per_event_ip),
            default_max_tickets_per_user: env::var("FRAUD_DEFAULT_MAX_TICKETS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.default_max_tickets_per_user),
            bot_window_secs: env::var("FRAUD_BOT_WINDOW_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.bot_window_secs),
            fingerprint_ip_threshold: env::var("FRAUD_FINGERPRINT_IPS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.fingerprint_ip_threshold)
                .max(MIN_FINGERPRINT_IP_THRESHOLD),
            interval_sample_size: env::var("FRAUD_INTERVAL_SAMPLE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.interval_sample_size),
            min_mean_interval_ms: env::var("FRAUD_MIN_MEAN_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_mean_interval_ms),
        }
    }

    /// Rate limit window
    #[must_use]
    pub fn rate_limit_window(&self) -> chrono::Duration {
        chrono::Duration::from_std(Duration::from_secs(self.rate_limit_window_secs))
            .unwrap_or(chrono::Duration::MAX)
    }

    /// Bot signal lookback
    #[must_use]
    pub fn bot_window(&self) -> chrono::Duration {
        chrono::Duration::from_std(Duration::from_secs(self.bot_window_secs))
            .unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            rate_limit_window_secs: 300,
            max_attempts_per_user: 10,
            max_attempts_per_ip: 20,
            max_attempts_per_event_ip: 5,
            default_max_tickets_per_user: 10,
            bot_window_secs: 3600,
            fingerprint_ip_threshold: 5,
            interval_sample_size: 5,
            min_mean_interval_ms: 2000,
        }
    }
}
