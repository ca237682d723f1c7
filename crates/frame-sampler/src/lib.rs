//! Frame Sampler for Periodic Model Inference
//!
//! Provides a restartable periodic timer whose ticks are time-driven:
//! every tick body runs as its own task, so a slow inference never
//! delays the next sample.

mod sampler;

pub use sampler::{FrameSampler, MIN_INTERVAL};
