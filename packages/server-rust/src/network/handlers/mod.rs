//! HTTP handler definitions for the `opgate` server.
//!
//! This module defines `AppState` (the shared state carried through axum
//! extractors) and re-exports all handler functions for convenient access
//! when building the router.

pub mod health;
pub mod operation;

pub use health::{health_handler, liveness_handler};
pub use operation::operation_handler;

use std::time::Instant;

use crate::service::OperationPipeline;

/// Shared application state passed to all axum handlers via `State` extraction.
///
/// Cloning is cheap: the pipeline shares its router and execution slots.
#[derive(Clone)]
pub struct AppState {
    /// Operation pipeline every `POST /{operation}` request goes through.
    pub pipeline: OperationPipeline,
    /// Server process start time, used for uptime calculation.
    pub start_time: Instant,
}
