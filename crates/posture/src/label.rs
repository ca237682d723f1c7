//! Posture labels and classification results

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::PostureError;

/// Behaviour the subject can be classified into
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    /// Seated, facing the screen
    NormalPosture,
    /// Head turned to the left
    HeadLeft,
    /// Head turned to the right
    HeadRight,
    /// Subject has stood up
    StandingUp,
    /// Nobody in frame
    Absent,
}

impl Label {
    /// Every label, in training-button order
    pub const ALL: [Label; 5] = [
        Label::NormalPosture,
        Label::HeadLeft,
        Label::HeadRight,
        Label::StandingUp,
        Label::Absent,
    ];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Label::NormalPosture => "normal_posture",
            Label::HeadLeft => "head_left",
            Label::HeadRight => "head_right",
            Label::StandingUp => "standing_up",
            Label::Absent => "absent",
        }
    }

    /// Human readable description for logs
    pub fn describe(&self) -> &'static str {
        match self {
            Label::NormalPosture => "Normal posture",
            Label::HeadLeft => "Head turned left",
            Label::HeadRight => "Head turned right",
            Label::StandingUp => "Standing up",
            Label::Absent => "Absent",
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = PostureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Label::ALL
            .into_iter()
            .find(|l| l.as_str() == s)
            .ok_or_else(|| PostureError::UnknownLabel(s.to_string()))
    }
}

/// Top label for one sampled frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub label: Label,
    /// Confidence of `label` (0.0 to 1.0)
    pub confidence: f32,
}

impl ClassificationResult {
    pub fn new(label: Label, confidence: f32) -> Self {
        Self { label, confidence }
    }

    /// Strictly above `threshold`; a result exactly at the threshold does not qualify
    pub fn exceeds(&self, threshold: f32) -> bool {
        self.confidence > threshold
    }
}
