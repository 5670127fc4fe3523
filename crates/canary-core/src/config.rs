//! canary.toml configuration parser.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default wait between stability polls.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Default number of stability polls before giving up (one hour at the
/// default interval).
pub const DEFAULT_MAX_TICKS: u32 = 60;

/// On-disk configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanaryConfig {
    pub rollout: Option<RolloutSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RolloutSection {
    /// Duration string such as "60s", "500ms" or "2m".
    pub tick_interval: Option<String>,
    pub max_ticks: Option<u32>,
}

impl CanaryConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Resolve the rollout settings, falling back to defaults.
    pub fn rollout_config(&self) -> Result<RolloutConfig, ConfigError> {
        let mut config = RolloutConfig::default();
        if let Some(section) = &self.rollout {
            if let Some(interval) = &section.tick_interval {
                config.tick_interval = parse_duration(interval)
                    .ok_or_else(|| ConfigError::Duration(interval.clone()))?;
            }
            if let Some(ticks) = section.max_ticks {
                config.max_ticks = ticks;
            }
        }
        config.validate()?;
        Ok(config)
    }
}

/// Timing of the stability poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolloutConfig {
    /// Wait between two polls of the instance group.
    pub tick_interval: Duration,
    /// Polls attempted before failing with a stability timeout.
    pub max_ticks: u32,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
            max_ticks: DEFAULT_MAX_TICKS,
        }
    }
}

impl RolloutConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_ticks == 0 {
            return Err(ConfigError::ZeroTicks);
        }
        Ok(())
    }
}

/// Parse a duration string like "5s", "500ms", "1m".
///
/// A bare number is read as seconds.
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(ms) = s.strip_suffix("ms") {
        ms.trim().parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.trim().parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.trim()
            .parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}
