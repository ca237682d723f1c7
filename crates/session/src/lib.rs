//! Proctoring Session Engine
//!
//! Owns the test lifecycle and decides when sampled model output becomes
//! an alert:
//! - Training labelled examples from the live feed
//! - Timed tests with a once-per-second countdown
//! - Posture and object samplers running on independent cadences
//! - Alert gating: only results consumed during a test can alert

pub mod config;
pub mod display;
pub mod machine;
pub mod state;

pub use config::SessionConfig;
pub use display::{DisplayState, RenderSurface, TracingSurface};
pub use machine::{Collaborators, ProctorSession};
pub use state::{SessionSnapshot, SessionState};

use camera_capture::CameraError;
use model_store::StoreError;
use posture::{Label, PostureError};
use thiserror::Error;

/// Session error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(#[from] CameraError),

    #[error("Model inference failed: {0}")]
    ModelInference(#[from] PostureError),

    #[error("No classifier dataset loaded; train or load a dataset first")]
    NotReady,

    #[error("Malformed dataset: {0}")]
    MalformedDataset(String),

    #[error("Dataset contains no labels")]
    EmptyDataset,

    #[error("Dataset storage failed: {0}")]
    Storage(String),

    #[error("Cannot {command} while {state}")]
    InvalidTransition {
        command: &'static str,
        state: &'static str,
    },

    #[error("Test duration must be at least one minute")]
    InvalidDuration,

    #[error("Training of {0} cancelled")]
    Cancelled(Label),
}

impl From<StoreError> for SessionError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::MalformedDataset(msg) => SessionError::MalformedDataset(msg),
            StoreError::EmptyDataset => SessionError::EmptyDataset,
            StoreError::Io(msg) | StoreError::Serialization(msg) => SessionError::Storage(msg),
        }
    }
}
