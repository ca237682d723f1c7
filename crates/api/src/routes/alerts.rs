//! Alert Routes

use std::collections::HashMap;
use std::sync::Arc;

use alerting::{AlertKind, CooldownState, CueRecord};
use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::AppState;

/// Query parameters for alerts endpoint
#[derive(Debug, Deserialize)]
pub struct AlertQuery {
    /// Maximum number of records
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Only cues of this kind
    pub kind: Option<AlertKind>,
}

fn default_limit() -> usize {
    50
}

/// Response for alerts endpoint
#[derive(Debug, Serialize)]
pub struct AlertResponse {
    /// Played cues, newest first
    pub data: Vec<CueRecord>,
    pub count: usize,
    /// Firing history of the current test by kind
    pub cooldowns: HashMap<AlertKind, CooldownState>,
}

/// Get recently played alert cues
pub async fn get_alerts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AlertQuery>,
) -> Json<AlertResponse> {
    let data: Vec<CueRecord> = match params.kind {
        Some(kind) => state
            .player
            .history(usize::MAX)
            .into_iter()
            .filter(|r| r.kind == kind)
            .take(params.limit)
            .collect(),
        None => state.player.history(params.limit),
    };

    Json(AlertResponse {
        count: data.len(),
        data,
        cooldowns: state.session.snapshot().alerts,
    })
}
