//! Session configuration

use posture::Label;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Posture classification period (milliseconds)
    pub posture_interval_ms: u64,

    /// Object detection period (milliseconds)
    pub detection_interval_ms: u64,

    /// Countdown step (milliseconds); one step removes one second
    pub countdown_tick_ms: u64,

    /// Examples captured per training command
    pub training_examples: usize,

    /// Delay between captured training examples (milliseconds)
    pub training_interval_ms: u64,

    /// Labels that must be trained before the session reports Ready
    pub required_labels: Vec<Label>,

    /// Test length used when a start command gives none (minutes)
    pub default_duration_minutes: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            posture_interval_ms: 200,
            detection_interval_ms: 500,
            countdown_tick_ms: 1000,
            training_examples: 50,
            training_interval_ms: 100,
            required_labels: Label::ALL.to_vec(),
            default_duration_minutes: 30,
        }
    }
}

impl SessionConfig {
    pub fn posture_interval(&self) -> Duration {
        Duration::from_millis(self.posture_interval_ms)
    }

    pub fn detection_interval(&self) -> Duration {
        Duration::from_millis(self.detection_interval_ms)
    }

    pub fn countdown_tick(&self) -> Duration {
        Duration::from_millis(self.countdown_tick_ms.max(1))
    }

    pub fn training_interval(&self) -> Duration {
        Duration::from_millis(self.training_interval_ms)
    }
}
