//! Route handlers

pub mod alerts;
pub mod dataset;
pub mod frames;
pub mod session;
