//! Alerting System
//!
//! Maps posture and detection results to alert kinds and plays each
//! kind's audio cue, never overlapping a cue with itself.

mod cue;
mod dispatcher;

pub use cue::{AudioCuePlayer, CueRecord, TimedCuePlayer};
pub use dispatcher::{AlertConfig, AlertDispatcher, AlertKind, CooldownState, Observation};

use thiserror::Error;

/// Alerting errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AlertError {
    #[error("Cue playback failed for {kind}: {reason}")]
    Playback { kind: AlertKind, reason: String },
}
