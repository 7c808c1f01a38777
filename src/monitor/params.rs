//! Live monitoring run parameters

use serde::{Deserialize, Serialize};

use crate::api::ApiError;
use crate::config::MonitorConfig;

/// Threshold sent when email alerts are switched off; nothing crosses it
pub const ALERTS_DISABLED_THRESHOLD: f64 = 1.0;

/// Parameters for `POST /monitor/start`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonitorParams {
    /// Run length in seconds (10-300)
    pub duration: u32,
    /// Seconds between samples (0.5-10)
    pub interval: f64,
    /// Probability above which an alert is sent (0.5-1.0)
    pub alert_threshold: f64,
}

impl Default for MonitorParams {
    fn default() -> Self {
        Self {
            duration: 30,
            interval: 2.0,
            alert_threshold: 0.8,
        }
    }
}

impl From<&MonitorConfig> for MonitorParams {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            duration: config.duration_secs,
            interval: config.sampling_interval_secs,
            alert_threshold: config.alert_threshold,
        }
    }
}

impl MonitorParams {
    /// Parameters actually sent: the threshold is pinned high when alerts are off
    pub fn effective(&self, email_alerts: bool) -> Self {
        if email_alerts {
            *self
        } else {
            Self {
                alert_threshold: ALERTS_DISABLED_THRESHOLD,
                ..*self
            }
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        if !(10..=300).contains(&self.duration) {
            return Err(ApiError::Validation(
                "Duration must be between 10 and 300 seconds".to_string(),
            ));
        }
        if !(0.5..=10.0).contains(&self.interval) {
            return Err(ApiError::Validation(
                "Sampling interval must be between 0.5 and 10 seconds".to_string(),
            ));
        }
        if !(0.5..=1.0).contains(&self.alert_threshold) {
            return Err(ApiError::Validation(
                "Alert threshold must be between 0.5 and 1.0".to_string(),
            ));
        }
        Ok(())
    }

    /// Samples the server will take for this run
    pub fn expected_samples(&self) -> u32 {
        (self.duration as f64 / self.interval) as u32
    }
}
