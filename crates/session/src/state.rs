//! Session lifecycle state

use alerting::{AlertKind, CooldownState};
use chrono::{DateTime, Utc};
use posture::Label;
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::DisplayState;

/// Test lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    /// Capturing examples for `label`; `progress` examples captured so far
    Training { label: Label, progress: usize },
    /// Every required label has been trained
    Ready,
    Testing { remaining_seconds: u64 },
    Finished,
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Training { .. } => "training",
            SessionState::Ready => "ready",
            SessionState::Testing { .. } => "testing",
            SessionState::Finished => "finished",
        }
    }

    pub fn is_testing(&self) -> bool {
        matches!(self, SessionState::Testing { .. })
    }
}

/// Point-in-time view for dashboards
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub state: SessionState,
    /// Id of the current or last test
    pub session_id: Option<Uuid>,
    pub started_at: Option<DateTime<Utc>>,
    /// Samplers running outside a test for live display
    pub preview: bool,
    pub trained_labels: Vec<Label>,
    pub display: DisplayState,
    pub alerts: HashMap<AlertKind, CooldownState>,
}
