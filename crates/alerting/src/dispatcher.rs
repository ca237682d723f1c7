//! Alert Dispatcher Implementation

use chrono::{DateTime, Utc};
use metrics::counter;
use object_detection::DetectedObject;
use posture::{ClassificationResult, Label};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::AudioCuePlayer;

/// User-facing alert, one audio cue each
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// Prohibited phone in frame
    PhoneDetected,
    /// Subject stood up or left
    NoMovementAllowed,
    /// Subject looked away from the screen
    NoCheatingAllowed,
    /// Test countdown began
    TestStarted,
    /// Test countdown reached zero
    TestEnded,
}

impl AlertKind {
    pub const ALL: [AlertKind; 5] = [
        AlertKind::PhoneDetected,
        AlertKind::NoMovementAllowed,
        AlertKind::NoCheatingAllowed,
        AlertKind::TestStarted,
        AlertKind::TestEnded,
    ];

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertKind::PhoneDetected => "phone_detected",
            AlertKind::NoMovementAllowed => "no_movement_allowed",
            AlertKind::NoCheatingAllowed => "no_cheating_allowed",
            AlertKind::TestStarted => "test_started",
            AlertKind::TestEnded => "test_ended",
        }
    }

    /// Message spoken by the cue
    pub fn message(&self) -> &'static str {
        match self {
            AlertKind::PhoneDetected => "Phone detected. Put the phone away.",
            AlertKind::NoMovementAllowed => "Please stay seated in front of the camera.",
            AlertKind::NoCheatingAllowed => "Please keep your eyes on the screen.",
            AlertKind::TestStarted => "The test has started.",
            AlertKind::TestEnded => "The test has ended.",
        }
    }
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Alert configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    /// Posture confidence must be strictly above this (default: 0.8)
    pub confidence_threshold: f32,
    /// Detector class that counts as a phone
    pub phone_class: String,
    /// Minimum detector score for the phone alert; `None` accepts any score
    pub phone_min_score: Option<f32>,
    /// How long a cue counts as playing (milliseconds)
    pub cue_duration_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.8,
            phone_class: "cell phone".to_string(),
            phone_min_score: None,
            cue_duration_ms: 3000,
        }
    }
}

impl AlertConfig {
    pub fn cue_duration(&self) -> Duration {
        Duration::from_millis(self.cue_duration_ms)
    }
}

/// One sampled result handed to the dispatcher
#[derive(Debug, Clone, Copy)]
pub enum Observation<'a> {
    Posture(ClassificationResult),
    Objects(&'a [DetectedObject]),
}

/// Firing history of one alert kind
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CooldownState {
    /// Last time this kind's cue was played
    pub last_fired_at: Option<DateTime<Utc>>,
    /// Number of times fired
    pub fire_count: usize,
    /// Candidates dropped because the cue was still playing
    pub suppressed_count: usize,
}

/// Maps results to alerts and debounces cue playback per kind
pub struct AlertDispatcher {
    /// Configuration
    config: AlertConfig,
    /// Cue output
    player: Arc<dyn AudioCuePlayer>,
    /// Cooldown states by alert kind
    cooldowns: HashMap<AlertKind, CooldownState>,
}

impl AlertDispatcher {
    /// Create a new dispatcher
    pub fn new(config: AlertConfig, player: Arc<dyn AudioCuePlayer>) -> Self {
        info!("Creating alert dispatcher with config: {:?}", config);
        Self {
            config,
            player,
            cooldowns: HashMap::new(),
        }
    }

    /// Map a result to the alert it calls for, if any
    pub fn evaluate(&self, observation: &Observation<'_>) -> Option<AlertKind> {
        match observation {
            Observation::Posture(result) => self.evaluate_posture(result),
            Observation::Objects(objects) => self.evaluate_objects(objects),
        }
    }

    fn evaluate_posture(&self, result: &ClassificationResult) -> Option<AlertKind> {
        if !result.exceeds(self.config.confidence_threshold) {
            debug!(
                "Posture {} at {:.2} below threshold {}",
                result.label, result.confidence, self.config.confidence_threshold
            );
            return None;
        }

        match result.label {
            Label::HeadLeft | Label::HeadRight => Some(AlertKind::NoCheatingAllowed),
            Label::StandingUp | Label::Absent => Some(AlertKind::NoMovementAllowed),
            Label::NormalPosture => None,
        }
    }

    fn evaluate_objects(&self, objects: &[DetectedObject]) -> Option<AlertKind> {
        let min_score = self.config.phone_min_score.unwrap_or(f32::NEG_INFINITY);
        objects
            .iter()
            .any(|o| o.class == self.config.phone_class && o.score >= min_score)
            .then_some(AlertKind::PhoneDetected)
    }

    /// Play the cue for `kind` unless that same cue is still playing.
    /// Returns whether the cue was played.
    pub fn dispatch(&mut self, kind: AlertKind) -> bool {
        if self.player.is_playing(kind) {
            self.cooldowns.entry(kind).or_default().suppressed_count += 1;
            counter!("proctor_alerts_suppressed_total", "kind" => kind.as_str()).increment(1);
            debug!("Alert {} suppressed: cue still playing", kind);
            return false;
        }
        self.play(kind)
    }

    /// Play the cue for a lifecycle event. Never debounced: every test start
    /// and end is announced even while an earlier cue of that kind plays.
    pub fn announce(&mut self, kind: AlertKind) -> bool {
        self.play(kind)
    }

    fn play(&mut self, kind: AlertKind) -> bool {
        if let Err(e) = self.player.play(kind) {
            warn!("Alert {} not played: {}", kind, e);
            return false;
        }

        let state = self.cooldowns.entry(kind).or_default();
        state.last_fired_at = Some(Utc::now());
        state.fire_count += 1;
        counter!("proctor_alerts_fired_total", "kind" => kind.as_str()).increment(1);
        info!("Alert fired: {} (count: {})", kind, state.fire_count);
        true
    }

    /// Evaluate a result and dispatch its alert. Returns the alert that
    /// actually played.
    pub fn handle(&mut self, observation: &Observation<'_>) -> Option<AlertKind> {
        let kind = self.evaluate(observation)?;
        self.dispatch(kind).then_some(kind)
    }

    /// Firing history for `kind`
    pub fn cooldown(&self, kind: AlertKind) -> CooldownState {
        self.cooldowns.get(&kind).cloned().unwrap_or_default()
    }

    /// Firing history for every kind seen so far
    pub fn cooldowns(&self) -> &HashMap<AlertKind, CooldownState> {
        &self.cooldowns
    }

    /// Forget all firing history
    pub fn clear(&mut self) {
        self.cooldowns.clear();
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }
}
