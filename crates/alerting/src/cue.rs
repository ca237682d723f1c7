//! Audio cue playback

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

use crate::{AlertError, AlertKind};

/// Output for alert cues, one cue per alert kind.
///
/// Loading and disposing the underlying sounds is the player's business;
/// callers only refer to cues by kind.
pub trait AudioCuePlayer: Send + Sync {
    /// Start the cue for `kind`
    fn play(&self, kind: AlertKind) -> Result<(), AlertError>;

    /// Whether the cue for `kind` is still playing
    fn is_playing(&self, kind: AlertKind) -> bool;
}

/// A cue that was played
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CueRecord {
    pub kind: AlertKind,
    pub message: &'static str,
    pub played_at: DateTime<Utc>,
}

#[derive(Default)]
struct PlaybackState {
    /// Playback start per kind
    started: HashMap<AlertKind, Instant>,
    /// Most recent plays, oldest first
    history: VecDeque<CueRecord>,
}

/// Player that treats every cue as a clip of known length.
///
/// Headless deployments have no speaker; the cue is announced in the log
/// and kept in a bounded history for the dashboard to poll.
pub struct TimedCuePlayer {
    durations: HashMap<AlertKind, Duration>,
    default_duration: Duration,
    max_history: usize,
    state: Mutex<PlaybackState>,
}

impl TimedCuePlayer {
    pub fn new(default_duration: Duration) -> Self {
        Self {
            durations: HashMap::new(),
            default_duration,
            max_history: 500,
            state: Mutex::new(PlaybackState::default()),
        }
    }

    /// Override the clip length for one kind
    pub fn with_duration(mut self, kind: AlertKind, duration: Duration) -> Self {
        self.durations.insert(kind, duration);
        self
    }

    /// Clip length for `kind`
    pub fn duration(&self, kind: AlertKind) -> Duration {
        self.durations.get(&kind).copied().unwrap_or(self.default_duration)
    }

    /// End playback of `kind` early
    pub fn stop(&self, kind: AlertKind) {
        self.lock().started.remove(&kind);
    }

    /// Most recent plays, newest first
    pub fn history(&self, limit: usize) -> Vec<CueRecord> {
        self.lock().history.iter().rev().take(limit).cloned().collect()
    }

    /// Times `kind` has been played (within the retained history)
    pub fn play_count(&self, kind: AlertKind) -> usize {
        self.lock().history.iter().filter(|r| r.kind == kind).count()
    }

    fn lock(&self) -> MutexGuard<'_, PlaybackState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TimedCuePlayer {
    fn default() -> Self {
        Self::new(Duration::from_millis(3000))
    }
}

impl AudioCuePlayer for TimedCuePlayer {
    fn play(&self, kind: AlertKind) -> Result<(), AlertError> {
        let mut state = self.lock();
        state.started.insert(kind, Instant::now());

        if state.history.len() >= self.max_history {
            state.history.pop_front();
        }
        state.history.push_back(CueRecord {
            kind,
            message: kind.message(),
            played_at: Utc::now(),
        });

        info!("Playing cue {}: {}", kind, kind.message());
        Ok(())
    }

    fn is_playing(&self, kind: AlertKind) -> bool {
        self.lock()
            .started
            .get(&kind)
            .is_some_and(|start| start.elapsed() < self.duration(kind))
    }
}
