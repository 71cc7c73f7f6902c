//! SyncBlueprint - Config Loader output
//!
//! Describes the complete run configuration: sensor API access, context
//! store access and synchronization tuning.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete run configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncBlueprint {
    /// Configuration version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Vendor sensor API
    pub sensor_api: SensorApiConfig,

    /// Context store (Keystone + Orion)
    pub context_store: ContextStoreConfig,

    /// Synchronization tuning
    #[serde(default)]
    pub sync: SyncSettings,
}

/// Sensor API access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensorApiConfig {
    /// Base URL, without the `/v2` suffix
    #[serde(default = "default_sensor_endpoint")]
    pub endpoint: String,

    /// Organism (tenant) identifier
    pub organism: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Transport timeout per request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Token bucket shared by all requests
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

fn default_sensor_endpoint() -> String {
    "http://api.urbiotica.net".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl SensorApiConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Token bucket parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Burst capacity
    pub capacity: u32,
    /// Tokens restored per interval, spread continuously
    pub refill_amount: u32,
    /// Refill interval in seconds
    pub refill_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        // Vendor limit: 100 requests per minute
        Self {
            capacity: 100,
            refill_amount: 100,
            refill_interval_secs: 60,
        }
    }
}

/// Context store access
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextStoreConfig {
    /// Keystone base URL (token endpoint is `/v3/auth/tokens`)
    pub keystone_url: String,

    /// Orion base URL
    pub orion_url: String,

    /// `Fiware-Service` header and Keystone domain
    pub service: String,

    /// `Fiware-ServicePath` header and Keystone project; also the tenant key
    pub subservice: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Transport timeout per request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl ContextStoreConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Synchronization tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Maximum entities per store write
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Concurrent per-spot fetch units
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Fetch start for spots with no stored watermark
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: u32,

    /// Extra attempts for a rejected batch write
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Sleep between batch write attempts
    #[serde(default = "default_retry_sleep_secs")]
    pub retry_sleep_secs: u64,

    /// Pause after each successful batch write
    #[serde(default = "default_pace_ms")]
    pub pace_ms: u64,

    /// Also publish aggregated zone entities
    #[serde(default)]
    pub zones: bool,
}

fn default_batch_size() -> usize {
    100
}

fn default_workers() -> usize {
    8
}

fn default_lookback_hours() -> u32 {
    24
}

fn default_retries() -> u32 {
    3
}

fn default_retry_sleep_secs() -> u64 {
    5
}

fn default_pace_ms() -> u64 {
    1000
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            workers: default_workers(),
            lookback_hours: default_lookback_hours(),
            retries: default_retries(),
            retry_sleep_secs: default_retry_sleep_secs(),
            pace_ms: default_pace_ms(),
            zones: false,
        }
    }
}

impl SyncSettings {
    /// Retry discipline for store writes
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            retry_sleep: Duration::from_secs(self.retry_sleep_secs),
            pace: Duration::from_millis(self.pace_ms),
        }
    }

    pub fn lookback(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.lookback_hours))
    }
}

/// Bounded retry for batch writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Extra attempts after the first one
    pub retries: u32,
    /// Fixed sleep between attempts
    pub retry_sleep: Duration,
    /// Fixed sleep after every successful write
    pub pace: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        SyncSettings::default().retry_policy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_settings_defaults() {
        let settings = SyncSettings::default();
        assert_eq!(settings.batch_size, 100);
        assert_eq!(settings.workers, 8);
        assert_eq!(settings.lookback(), chrono::Duration::days(1));
        assert!(!settings.zones);
    }

    #[test]
    fn retry_policy_from_settings() {
        let settings = SyncSettings {
            retries: 2,
            retry_sleep_secs: 7,
            pace_ms: 250,
            ..Default::default()
        };
        let policy = settings.retry_policy();
        assert_eq!(policy.retries, 2);
        assert_eq!(policy.retry_sleep, Duration::from_secs(7));
        assert_eq!(policy.pace, Duration::from_millis(250));
    }

    #[test]
    fn rate_limit_defaults_match_vendor_quota() {
        let rl = RateLimitConfig::default();
        assert_eq!(rl.capacity, 100);
        assert_eq!(rl.refill_amount, 100);
        assert_eq!(rl.refill_interval_secs, 60);
    }
}
