//! Camera Capture Library for the Proctoring Monitor
//!
//! Provides the frame type shared by every model adapter and the
//! video source the monitor samples from:
//! - RGB frames with resize and thumbnail helpers
//! - JPEG decoding for frames pushed by a webcam client
//! - A latest-frame source with a readiness flag

pub mod frame;
pub mod source;

pub use frame::VideoFrame;
pub use source::{LatestFrameSource, VideoSource};

use thiserror::Error;

/// Camera error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("Camera unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid frame: expected {expected} bytes, got {actual}")]
    FrameSize { expected: usize, actual: usize },

    #[error("Frame decode failed: {0}")]
    Decode(String),

    #[error("Video source has no frame dimensions yet")]
    NotReady,
}
