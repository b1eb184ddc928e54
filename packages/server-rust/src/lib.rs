//! `opgate` Server — adapts typed business operations into uniform handlers,
//! classifies every outcome, and serves them over a Tower/axum pipeline.

pub mod handler;
pub mod network;
pub mod service;

pub use handler::{
    dispatch, HandlerResult, JsonDelegate, JsonRequest, JsonResponse, OperationDelegate,
    OperationHandler, OutputValidation, RequestHandler,
};
pub use service::{OperationPipeline, OperationRouter, ServerConfig};
