//! Frame ingest

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use camera_capture::VideoSource;
use metrics::counter;
use serde::Serialize;
use tracing::debug;

use crate::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct FrameResponse {
    pub sequence: u32,
    pub width: u32,
    pub height: u32,
}

/// Accept one JPEG frame as the current camera image
pub async fn push_frame(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<FrameResponse>, ApiError> {
    if body.is_empty() {
        return Err(ApiError::BadRequest("empty frame body".into()));
    }

    let sequence = state.video.push_jpeg(&body).map_err(|e| {
        counter!("proctor_frames_rejected_total").increment(1);
        e
    })?;
    counter!("proctor_frames_received_total").increment(1);
    let (width, height) = state.video.dimensions().unwrap_or_default();
    debug!("Frame #{} ({}x{}, {} bytes)", sequence, width, height, body.len());

    Ok(Json(FrameResponse {
        sequence,
        width,
        height,
    }))
}
