//! Recurring billing scheduler configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Run the hourly renewal loop in this process
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// Renewal charges in flight per scan
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.interval_secs == 0 {
            return Err(ValidationError::MustBePositive("scheduler.interval_secs"));
        }
        if self.max_concurrency == 0 {
            return Err(ValidationError::MustBePositive("scheduler.max_concurrency"));
        }
        Ok(())
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            interval_secs: default_interval(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_interval() -> u64 {
    3600
}

fn default_max_concurrency() -> usize {
    4
}
