//! Engine configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! { "broadcast": { "position_interval_secs": 5 },
//!   "rate_limit": { "trusted_identifiers": ["ingest-gateway"] } }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::error::ConfigError;

/// Environment variable naming a JSON config file.
pub const CONFIG_PATH_ENV: &str = "FLEETWATCH_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub broadcast: BroadcastSettings,
    pub resources: ResourceSettings,
    pub rate_limit: RateLimitSettings,
    pub capacity: CapacitySettings,
    pub retention: RetentionSettings,
    pub ingest: IngestSettings,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    /// Load from `FLEETWATCH_CONFIG` if set, defaults otherwise.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => {
                log::info!("CONFIG_LOAD path={}", path);
                Self::from_file(path)
            }
            _ => Ok(Self::default()),
        }
    }
}

/// Broadcast task intervals.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BroadcastSettings {
    pub fleet_interval_secs: u64,
    pub position_interval_secs: u64,
    pub alert_interval_secs: u64,
    pub capacity_interval_secs: u64,
}

impl Default for BroadcastSettings {
    fn default() -> Self {
        Self {
            fleet_interval_secs: 30,
            position_interval_secs: 15,
            alert_interval_secs: 60,
            capacity_interval_secs: 20,
        }
    }
}

impl BroadcastSettings {
    pub fn fleet_interval(&self) -> Duration {
        secs(self.fleet_interval_secs)
    }

    pub fn position_interval(&self) -> Duration {
        secs(self.position_interval_secs)
    }

    pub fn alert_interval(&self) -> Duration {
        secs(self.alert_interval_secs)
    }

    pub fn capacity_interval(&self) -> Duration {
        secs(self.capacity_interval_secs)
    }
}

/// Thresholds for the resource alert sweep.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ResourceSettings {
    pub low_battery_percent: f64,
    pub critical_battery_percent: f64,
    pub overheat_celsius: f64,
}

impl Default for ResourceSettings {
    fn default() -> Self {
        Self {
            low_battery_percent: 20.0,
            critical_battery_percent: 10.0,
            overheat_celsius: 60.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitSettings {
    pub default_limit: u32,
    pub window_secs: u64,
    /// Role name -> request limit per window.
    pub role_limits: HashMap<String, u32>,
    /// Identifiers always granted the `service` role limit.
    pub trusted_identifiers: Vec<String>,
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitSettings {
    fn default() -> Self {
        Self {
            default_limit: 100,
            window_secs: 60,
            role_limits: HashMap::from([
                ("admin".to_string(), 1000),
                ("operator".to_string(), 500),
                ("service".to_string(), 2000),
            ]),
            trusted_identifiers: Vec::new(),
            sweep_interval_secs: 300,
        }
    }
}

impl RateLimitSettings {
    pub fn sweep_interval(&self) -> Duration {
        secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CapacitySettings {
    pub holding_area_max: usize,
}

impl Default for CapacitySettings {
    fn default() -> Self {
        Self {
            holding_area_max: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetentionSettings {
    pub history_days: i64,
    pub purge_interval_secs: u64,
    pub expiry_sweep_interval_secs: u64,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            history_days: 30,
            purge_interval_secs: 3600,
            expiry_sweep_interval_secs: 60,
        }
    }
}

/// Longest retention honoured; keeps the cutoff arithmetic in range.
const MAX_HISTORY_DAYS: i64 = 36_500;

impl RetentionSettings {
    pub fn purge_interval(&self) -> Duration {
        secs(self.purge_interval_secs)
    }

    pub fn expiry_sweep_interval(&self) -> Duration {
        secs(self.expiry_sweep_interval_secs)
    }

    /// Records that arrived before this are purged.
    pub fn history_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - chrono::Duration::days(self.history_days.clamp(0, MAX_HISTORY_DAYS))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Reject reports older than the vehicle's current position.
    pub reject_stale_positions: bool,
}

/// Zero would make tokio's interval panic; clamp to one second.
fn secs(value: u64) -> Duration {
    Duration::from_secs(value.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.broadcast.position_interval(), Duration::from_secs(15));
        assert_eq!(config.rate_limit.role_limits.get("admin"), Some(&1000));
        assert!(!config.ingest.reject_stale_positions);
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = EngineConfig::from_json_str(
            r#"{"broadcast": {"fleet_interval_secs": 5}, "capacity": {"holding_area_max": 3}}"#,
        )
        .unwrap();
        assert_eq!(config.broadcast.fleet_interval_secs, 5);
        assert_eq!(config.broadcast.alert_interval_secs, 60);
        assert_eq!(config.capacity.holding_area_max, 3);
    }

    #[test]
    fn test_zero_interval_clamped() {
        let settings = BroadcastSettings {
            alert_interval_secs: 0,
            ..Default::default()
        };
        assert_eq!(settings.alert_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            EngineConfig::from_json_str("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_history_cutoff() {
        let now = Utc::now();
        let retention = RetentionSettings::default();
        assert_eq!(retention.history_cutoff(now), now - chrono::Duration::days(30));

        let unbounded = RetentionSettings {
            history_days: i64::MAX,
            ..Default::default()
        };
        assert!(unbounded.history_cutoff(now) < now);
    }
}
