//! Dataset export and import

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use model_store::DatasetDocument;
use serde::Serialize;

use crate::routes::session::StateResponse;
use crate::{ApiError, AppState};

#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub path: PathBuf,
}

/// Download the active dataset
pub async fn export(State(state): State<Arc<AppState>>) -> Result<Json<DatasetDocument>, ApiError> {
    Ok(Json(state.session.export_dataset()?))
}

/// Replace the active dataset with an uploaded document
pub async fn import(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<StateResponse>, ApiError> {
    let resting = state.session.restore_dataset(&body)?;
    Ok(Json(StateResponse { state: resting }))
}

/// Write the active dataset to the export directory
pub async fn save(State(state): State<Arc<AppState>>) -> Result<Json<SaveResponse>, ApiError> {
    let path = state
        .session
        .save_dataset_to(&state.store, &state.dataset_filename)?;
    Ok(Json(SaveResponse { path }))
}
