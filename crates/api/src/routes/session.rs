//! Session Routes

use std::str::FromStr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use posture::Label;
use serde::{Deserialize, Serialize};
use session::{SessionSnapshot, SessionState};
use uuid::Uuid;

use crate::{ApiError, AppState};

/// Body of a start command; the configured default applies when absent
#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    pub duration_minutes: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct StartResponse {
    pub session_id: Uuid,
    pub duration_minutes: u32,
    pub state: SessionState,
}

#[derive(Debug, Deserialize)]
pub struct PreviewRequest {
    pub enabled: bool,
}

/// Response carrying the state a command left the session in
#[derive(Debug, Serialize)]
pub struct StateResponse {
    pub state: SessionState,
}

/// Current session snapshot
pub async fn get_session(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot())
}

/// Train one label from the live feed; responds once training ends
pub async fn train(
    State(state): State<Arc<AppState>>,
    Path(label): Path<String>,
) -> Result<Json<StateResponse>, ApiError> {
    let label = Label::from_str(&label).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let resting = state.session.train(label).await?;
    Ok(Json(StateResponse { state: resting }))
}

/// Start a timed test
pub async fn start(
    State(state): State<Arc<AppState>>,
    body: Option<Json<StartRequest>>,
) -> Result<Json<StartResponse>, ApiError> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let duration_minutes = request
        .duration_minutes
        .unwrap_or(state.session.config().default_duration_minutes);

    let session_id = state.session.start_test(duration_minutes)?;
    Ok(Json(StartResponse {
        session_id,
        duration_minutes,
        state: state.session.state(),
    }))
}

/// Abort whatever is running and return to idle
pub async fn reset(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    state.session.reset();
    Json(StateResponse {
        state: state.session.state(),
    })
}

/// Toggle live display sampling outside a test
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    state.session.set_preview(request.enabled)?;
    Ok(Json(state.session.snapshot()))
}
