//! Proctoring Monitor API Server
//!
//! Headless HTTP surface for the proctoring session: frames are pushed in,
//! commands drive the session, alerts and dataset documents come out.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use alerting::TimedCuePlayer;
use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use camera_capture::{LatestFrameSource, VideoSource};
use chrono::{DateTime, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use model_store::FsDocumentStore;
use object_detection::{DetectorConfig, NullDetector, ObjectDetectorAdapter};
use posture::{KnnClassifier, PostureClassifier, ThumbnailEmbedding};
use serde::Serialize;
use session::{Collaborators, ProctorSession, TracingSurface};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod config;
pub mod error;
pub mod logging;
pub mod routes;

pub use config::AppConfig;
pub use error::ApiError;
pub use logging::init_logging;

/// Application state shared across handlers
pub struct AppState {
    pub session: ProctorSession,
    /// Push-fed camera the frames route writes to
    pub video: Arc<LatestFrameSource>,
    pub player: Arc<TimedCuePlayer>,
    pub store: FsDocumentStore,
    pub dataset_filename: String,
    pub metrics: PrometheusHandle,
    pub version: String,
    pub start_time: Instant,
}

impl AppState {
    /// Wire the session to the built-in models and a push-fed camera
    pub fn new(config: &AppConfig, metrics: PrometheusHandle) -> Self {
        let video = Arc::new(LatestFrameSource::new());
        let player = Arc::new(TimedCuePlayer::new(config.alerting.cue_duration()));
        let classifier = Arc::new(PostureClassifier::new(
            Arc::new(ThumbnailEmbedding::default()),
            KnnClassifier::default(),
        ));
        let detector = Arc::new(ObjectDetectorAdapter::new(
            Arc::new(NullDetector::new()),
            DetectorConfig::default(),
        ));

        let session = ProctorSession::new(
            config.session.clone(),
            config.alerting.clone(),
            Collaborators {
                video: video.clone(),
                classifier,
                detector,
                player: player.clone(),
                surface: Arc::new(TracingSurface),
            },
        );

        Self {
            session,
            video,
            player,
            store: FsDocumentStore::new(&config.store.export_dir),
            dataset_filename: config.store.dataset_filename.clone(),
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: Instant::now(),
        }
    }
}

/// Health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub uptime_seconds: u64,
    pub session_state: &'static str,
    pub components: ComponentStatus,
}

/// Component status
#[derive(Debug, Serialize)]
pub struct ComponentStatus {
    pub camera: ComponentHealth,
    pub classifier: ComponentHealth,
}

/// Individual component health
#[derive(Debug, Serialize)]
pub struct ComponentHealth {
    pub status: String,
    pub detail: String,
}

/// Create the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/health", get(health_handler))
        .route("/api/v1/session", get(routes::session::get_session))
        .route("/api/v1/session/train/:label", post(routes::session::train))
        .route("/api/v1/session/start", post(routes::session::start))
        .route("/api/v1/session/reset", post(routes::session::reset))
        .route("/api/v1/session/preview", post(routes::session::preview))
        .route("/api/v1/frames", post(routes::frames::push_frame))
        .route("/api/v1/alerts", get(routes::alerts::get_alerts))
        .route(
            "/api/v1/dataset",
            get(routes::dataset::export).post(routes::dataset::import),
        )
        .route("/api/v1/dataset/save", post(routes::dataset::save))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check handler
async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let camera = match state.video.ensure_available() {
        Ok(()) if state.video.is_ready() => ComponentHealth {
            status: "ok".to_string(),
            detail: format!("{} frames received", state.video.frames_received()),
        },
        Ok(()) => ComponentHealth {
            status: "waiting".to_string(),
            detail: "no frame received yet".to_string(),
        },
        Err(e) => ComponentHealth {
            status: "unavailable".to_string(),
            detail: e.to_string(),
        },
    };

    let snapshot = state.session.snapshot();
    let classifier = ComponentHealth {
        status: if snapshot.trained_labels.is_empty() { "untrained" } else { "ok" }.to_string(),
        detail: format!("{} labels trained", snapshot.trained_labels.len()),
    };

    let status = if camera.status == "unavailable" { "degraded" } else { "healthy" };

    Json(HealthResponse {
        status: status.to_string(),
        timestamp: Utc::now(),
        version: state.version.clone(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        session_state: snapshot.state.name(),
        components: ComponentStatus { camera, classifier },
    })
}

/// Prometheus scrape endpoint
async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Run the server until ctrl-c
pub async fn run_server(config: &AppConfig, metrics: PrometheusHandle) -> std::io::Result<()> {
    let state = Arc::new(AppState::new(config, metrics));
    let app = create_router(state.clone());

    let addr: SocketAddr = config
        .server
        .bind_address
        .parse()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.session.reset();
    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
