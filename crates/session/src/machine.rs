//! Session state machine
//!
//! Lock order, outermost first: lifecycle, countdown, dispatcher, display.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use std::time::Duration;

use alerting::{AlertConfig, AlertDispatcher, AlertKind, AudioCuePlayer, CooldownState, Observation};
use camera_capture::VideoSource;
use chrono::{DateTime, Utc};
use frame_sampler::FrameSampler;
use metrics::counter;
use model_store::{DatasetDocument, DocumentStore};
use object_detection::{DetectedObject, ObjectDetectorAdapter};
use posture::{ClassificationResult, Label, PostureClassifier, PostureError};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

use crate::{DisplayState, RenderSurface, SessionConfig, SessionError, SessionSnapshot, SessionState};

/// External collaborators the session drives
pub struct Collaborators {
    pub video: Arc<dyn VideoSource>,
    pub classifier: Arc<PostureClassifier>,
    pub detector: Arc<ObjectDetectorAdapter>,
    pub player: Arc<dyn AudioCuePlayer>,
    pub surface: Arc<dyn RenderSurface>,
}

struct Lifecycle {
    state: SessionState,
    /// Bumped on every test start and reset; results tagged with an older
    /// generation are never acted on
    generation: u64,
    session_id: Option<Uuid>,
    started_at: Option<DateTime<Utc>>,
    preview: bool,
}

impl Lifecycle {
    /// Whether a result sampled under `generation` may still be shown.
    /// `Some(true)` when it may also alert.
    fn accepts(&self, generation: u64) -> Option<bool> {
        if self.generation != generation {
            return None;
        }
        match self.state {
            SessionState::Testing { .. } => Some(true),
            _ if self.preview => Some(false),
            _ => None,
        }
    }
}

struct Inner {
    config: SessionConfig,
    confidence_threshold: f32,
    video: Arc<dyn VideoSource>,
    classifier: Arc<PostureClassifier>,
    detector: Arc<ObjectDetectorAdapter>,
    surface: Arc<dyn RenderSurface>,
    lifecycle: Mutex<Lifecycle>,
    countdown: Mutex<Option<JoinHandle<()>>>,
    dispatcher: Mutex<AlertDispatcher>,
    display: RwLock<DisplayState>,
    posture_sampler: FrameSampler,
    detection_sampler: FrameSampler,
}

/// Proctoring session.
///
/// Cheap to clone; clones share one session. Commands that start timers
/// must run inside a tokio runtime.
#[derive(Clone)]
pub struct ProctorSession {
    inner: Arc<Inner>,
}

impl ProctorSession {
    /// Create an idle session
    pub fn new(config: SessionConfig, alert_config: AlertConfig, collaborators: Collaborators) -> Self {
        info!(
            "Creating proctor session: posture every {}ms, detection every {}ms",
            config.posture_interval_ms, config.detection_interval_ms
        );

        let inner = Inner {
            confidence_threshold: alert_config.confidence_threshold,
            posture_sampler: FrameSampler::new("posture", config.posture_interval()),
            detection_sampler: FrameSampler::new("detection", config.detection_interval()),
            dispatcher: Mutex::new(AlertDispatcher::new(alert_config, collaborators.player)),
            video: collaborators.video,
            classifier: collaborators.classifier,
            detector: collaborators.detector,
            surface: collaborators.surface,
            lifecycle: Mutex::new(Lifecycle {
                state: SessionState::Idle,
                generation: 0,
                session_id: None,
                started_at: None,
                preview: false,
            }),
            countdown: Mutex::new(None),
            display: RwLock::new(DisplayState::default()),
            config,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> SessionState {
        self.inner.lock_lifecycle().state
    }

    /// Live display state
    pub fn display(&self) -> DisplayState {
        self.inner.read_display().clone()
    }

    /// Firing history of one alert kind in the current session
    pub fn cooldown(&self, kind: AlertKind) -> CooldownState {
        self.inner.lock_dispatcher().cooldown(kind)
    }

    /// Whether either sampler is running
    pub fn samplers_running(&self) -> bool {
        self.inner.posture_sampler.is_running() || self.inner.detection_sampler.is_running()
    }

    /// Everything a dashboard needs in one read
    pub fn snapshot(&self) -> SessionSnapshot {
        let lifecycle = self.inner.lock_lifecycle();
        SessionSnapshot {
            state: lifecycle.state,
            session_id: lifecycle.session_id,
            started_at: lifecycle.started_at,
            preview: lifecycle.preview,
            trained_labels: self.inner.classifier.trained_labels(),
            alerts: self.inner.lock_dispatcher().cooldowns().clone(),
            display: self.inner.read_display().clone(),
        }
    }

    /// Capture `training_examples` frames as examples of `label`.
    ///
    /// Resolves with the resting state once done: `Ready` when every
    /// required label has examples, `Idle` otherwise. A reset while
    /// training resolves with `Cancelled`; examples captured so far stay.
    pub async fn train(&self, label: Label) -> Result<SessionState, SessionError> {
        let inner = &self.inner;
        let generation = {
            let mut lifecycle = inner.lock_lifecycle();
            match lifecycle.state {
                SessionState::Idle | SessionState::Ready => {}
                other => return Err(rejected("train", other)),
            }
            inner.video.ensure_available()?;
            lifecycle.state = SessionState::Training { label, progress: 0 };
            lifecycle.generation
        };
        info!("[ {} ] is training...", label);

        let target = inner.config.training_examples;
        let pause = inner.config.training_interval().max(Duration::from_millis(1));
        let mut progress = 0;

        while progress < target {
            if !inner.is_training(generation, label) {
                info!("[ {} ] training cancelled at {}/{}", label, progress, target);
                return Err(SessionError::Cancelled(label));
            }
            if let Err(e) = inner.video.ensure_available() {
                error!("[ {} ] training aborted: {}", label, e);
                inner.end_training(generation);
                return Err(e.into());
            }

            match inner.video.current_frame() {
                Some(frame) => {
                    if let Err(e) = inner.classifier.add_example(&frame, label).await {
                        warn!("[ {} ] training failed: {}", label, e);
                        inner.end_training(generation);
                        return Err(e.into());
                    }
                    progress += 1;
                    if !inner.advance_training(generation, label, progress) {
                        info!("[ {} ] training cancelled at {}/{}", label, progress, target);
                        return Err(SessionError::Cancelled(label));
                    }
                    debug!("Progress {:.0}%", progress as f32 / target as f32 * 100.0);
                }
                None => debug!("[ {} ] waiting for the first video frame", label),
            }

            time::sleep(pause).await;
        }

        let state = inner.end_training(generation);
        info!("[ {} ] training complete.", label);
        Ok(state)
    }

    /// Start a timed test of `duration_minutes`.
    ///
    /// Requires a loaded classifier dataset and an available camera. Fires
    /// `test_started`, starts the countdown and both samplers.
    pub fn start_test(&self, duration_minutes: u32) -> Result<Uuid, SessionError> {
        if duration_minutes == 0 {
            return Err(SessionError::InvalidDuration);
        }

        let inner = &self.inner;
        let mut lifecycle = inner.lock_lifecycle();
        match lifecycle.state {
            SessionState::Idle | SessionState::Ready => {}
            other => return Err(rejected("start a test", other)),
        }
        if let Err(e) = inner.video.ensure_available() {
            error!("Cannot start test: {}", e);
            return Err(e.into());
        }
        if !inner.classifier.has_dataset() {
            warn!("Cannot start test: no classifier dataset loaded");
            return Err(SessionError::NotReady);
        }

        let session_id = Uuid::new_v4();
        let remaining_seconds = u64::from(duration_minutes) * 60;
        lifecycle.generation += 1;
        lifecycle.state = SessionState::Testing { remaining_seconds };
        lifecycle.session_id = Some(session_id);
        lifecycle.started_at = Some(Utc::now());

        inner.start_countdown(lifecycle.generation);
        {
            let mut dispatcher = inner.lock_dispatcher();
            dispatcher.clear();
            dispatcher.announce(AlertKind::TestStarted);
        }
        inner.start_samplers();

        info!("Test {} started ({} minutes)", session_id, duration_minutes);
        Ok(session_id)
    }

    /// Run the samplers outside a test so the display stays live.
    /// Results sampled in preview never alert.
    pub fn set_preview(&self, enabled: bool) -> Result<(), SessionError> {
        let inner = &self.inner;
        let mut lifecycle = inner.lock_lifecycle();
        if enabled {
            inner.video.ensure_available()?;
            lifecycle.preview = true;
            inner.start_samplers();
        } else {
            lifecycle.preview = false;
            if !lifecycle.state.is_testing() {
                inner.stop_samplers();
            }
        }
        info!("Preview {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    /// Return to Idle from any state: stops the countdown and samplers and
    /// clears alert history.
    pub fn reset(&self) {
        let inner = &self.inner;
        let mut lifecycle = inner.lock_lifecycle();
        let from = lifecycle.state;

        lifecycle.generation += 1;
        lifecycle.state = SessionState::Idle;
        lifecycle.preview = false;

        inner.stop_samplers();
        if let Some(countdown) = inner.lock_countdown().take() {
            countdown.abort();
        }
        inner.lock_dispatcher().clear();

        info!("Session reset from {}", from.name());
    }

    /// Portable document of the active dataset
    pub fn export_dataset(&self) -> Result<DatasetDocument, SessionError> {
        let dataset = self.inner.classifier.dataset()?;
        if dataset.is_empty() {
            return Err(SessionError::EmptyDataset);
        }
        Ok(model_store::save(&dataset))
    }

    /// Replace the active dataset with a saved document.
    ///
    /// On any error the active dataset is left untouched.
    pub fn restore_dataset(&self, source: &[u8]) -> Result<SessionState, SessionError> {
        let dataset = model_store::load(source).map_err(|e| {
            warn!("Dataset rejected: {}", e);
            SessionError::from(e)
        })?;

        let inner = &self.inner;
        let mut lifecycle = inner.lock_lifecycle();
        match lifecycle.state {
            SessionState::Training { .. } | SessionState::Testing { .. } => {
                return Err(rejected("load a dataset", lifecycle.state));
            }
            _ => {}
        }

        inner.classifier.set_dataset(dataset).map_err(|e| match e {
            PostureError::DimensionMismatch { expected, actual } => SessionError::MalformedDataset(
                format!("embeddings have {} values, this classifier uses {}", actual, expected),
            ),
            other => SessionError::from(other),
        })?;
        if matches!(lifecycle.state, SessionState::Idle | SessionState::Ready) {
            lifecycle.state = inner.resting_state();
        }
        Ok(lifecycle.state)
    }

    /// Export the active dataset through `store`
    pub fn save_dataset_to(
        &self,
        store: &dyn DocumentStore,
        filename: &str,
    ) -> Result<PathBuf, SessionError> {
        let bytes = self.export_dataset()?.to_bytes()?;
        Ok(store.export_document(&bytes, filename)?)
    }

    /// Import a document through `store` and make it the active dataset
    pub fn load_dataset_from(
        &self,
        store: &dyn DocumentStore,
        path: &Path,
    ) -> Result<SessionState, SessionError> {
        let bytes = store.import_document(path)?;
        self.restore_dataset(&bytes)
    }
}

impl Inner {
    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_countdown(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.countdown.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_dispatcher(&self) -> MutexGuard<'_, AlertDispatcher> {
        self.dispatcher.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn read_display(&self) -> std::sync::RwLockReadGuard<'_, DisplayState> {
        self.display.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_display(&self) -> std::sync::RwLockWriteGuard<'_, DisplayState> {
        self.display.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn generation(&self) -> u64 {
        self.lock_lifecycle().generation
    }

    /// Ready when every required label has examples
    fn resting_state(&self) -> SessionState {
        let trained = self.classifier.trained_labels();
        let complete = !trained.is_empty()
            && self.config.required_labels.iter().all(|l| trained.contains(l));
        if complete {
            SessionState::Ready
        } else {
            SessionState::Idle
        }
    }

    fn is_training(&self, generation: u64, label: Label) -> bool {
        let lifecycle = self.lock_lifecycle();
        lifecycle.generation == generation
            && matches!(lifecycle.state, SessionState::Training { label: l, .. } if l == label)
    }

    fn advance_training(&self, generation: u64, label: Label, progress: usize) -> bool {
        let mut lifecycle = self.lock_lifecycle();
        match lifecycle.state {
            SessionState::Training { label: l, .. } if l == label && lifecycle.generation == generation => {
                lifecycle.state = SessionState::Training { label, progress };
                true
            }
            _ => false,
        }
    }

    fn end_training(&self, generation: u64) -> SessionState {
        let mut lifecycle = self.lock_lifecycle();
        if lifecycle.generation == generation
            && matches!(lifecycle.state, SessionState::Training { .. })
        {
            lifecycle.state = self.resting_state();
        }
        lifecycle.state
    }

    fn start_samplers(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        self.posture_sampler
            .start(move || Inner::posture_tick(weak.clone()));

        let weak = Arc::downgrade(self);
        self.detection_sampler
            .start(move || Inner::detection_tick(weak.clone()));
    }

    fn stop_samplers(&self) {
        self.posture_sampler.stop();
        self.detection_sampler.stop();
    }

    fn start_countdown(self: &Arc<Self>, generation: u64) {
        let weak = Arc::downgrade(self);
        let period = self.config.countdown_tick();

        let handle = tokio::spawn(async move {
            let mut timer = time::interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                timer.tick().await;
                let Some(inner) = weak.upgrade() else { break };
                if !inner.countdown_step(generation) {
                    break;
                }
            }
        });

        if let Some(previous) = self.lock_countdown().replace(handle) {
            previous.abort();
        }
    }

    /// One countdown second. Returns whether the countdown continues.
    fn countdown_step(&self, generation: u64) -> bool {
        let mut lifecycle = self.lock_lifecycle();
        if lifecycle.generation != generation {
            return false;
        }
        let SessionState::Testing { remaining_seconds } = lifecycle.state else {
            return false;
        };

        let remaining_seconds = remaining_seconds.saturating_sub(1);
        if remaining_seconds > 0 {
            lifecycle.state = SessionState::Testing { remaining_seconds };
            if remaining_seconds % 60 == 0 {
                info!("{} minutes remaining", remaining_seconds / 60);
            }
            return true;
        }

        lifecycle.state = SessionState::Finished;
        lifecycle.preview = false;
        self.stop_samplers();
        // the running task is this one; dropping the handle detaches it
        self.lock_countdown().take();
        self.lock_dispatcher().announce(AlertKind::TestEnded);

        if let Some(id) = lifecycle.session_id {
            info!("Test {} finished", id);
        }
        false
    }

    async fn posture_tick(weak: Weak<Inner>) {
        let Some(inner) = weak.upgrade() else { return };
        let Some(frame) = inner.video.current_frame() else {
            trace!("Posture tick skipped: video not ready");
            return;
        };
        let generation = inner.generation();

        match inner.classifier.classify(&frame).await {
            Ok(result) => inner.consume_posture(result, generation),
            Err(PostureError::EmptyClassifier) => {
                debug!("Posture tick skipped: classifier has no examples");
            }
            Err(e) => {
                counter!("proctor_inference_failures_total", "model" => "posture").increment(1);
                warn!("Posture inference failed, skipping tick: {}", e);
            }
        }
    }

    async fn detection_tick(weak: Weak<Inner>) {
        let Some(inner) = weak.upgrade() else { return };
        let Some(frame) = inner.video.current_frame() else {
            trace!("Detection tick skipped: video not ready");
            return;
        };
        let generation = inner.generation();

        match inner.detector.detect(&frame).await {
            Ok(objects) => inner.consume_detections(objects, frame.dimensions(), generation),
            Err(e) => {
                counter!("proctor_inference_failures_total", "model" => "detection").increment(1);
                warn!("Object detection failed, skipping tick: {}", e);
            }
        }
    }

    fn consume_posture(&self, result: ClassificationResult, generation: u64) {
        let lifecycle = self.lock_lifecycle();
        let Some(testing) = lifecycle.accepts(generation) else {
            trace!("Posture {} discarded: sampling has stopped", result.label);
            return;
        };

        let qualifies = result.exceeds(self.confidence_threshold);
        {
            let mut display = self.write_display();
            display.last_posture = Some(result);
            if qualifies {
                display.current_behavior = Some(result.label);
            }
            display.updated_at = Some(Utc::now());
        }
        if qualifies {
            self.surface.show_behavior(result.label);
        }

        if testing {
            self.lock_dispatcher().handle(&Observation::Posture(result));
        }
    }

    fn consume_detections(&self, objects: Vec<DetectedObject>, frame_size: (u32, u32), generation: u64) {
        let lifecycle = self.lock_lifecycle();
        let Some(testing) = lifecycle.accepts(generation) else {
            trace!("{} detections discarded: sampling has stopped", objects.len());
            return;
        };

        self.surface.draw_detections(frame_size, &objects);
        if testing {
            self.lock_dispatcher().handle(&Observation::Objects(&objects));
        }

        let mut display = self.write_display();
        display.detections = objects;
        display.frame_size = Some(frame_size);
        display.updated_at = Some(Utc::now());
    }
}

fn rejected(command: &'static str, state: SessionState) -> SessionError {
    warn!("Rejected command to {} while {}", command, state.name());
    SessionError::InvalidTransition {
        command,
        state: state.name(),
    }
}
