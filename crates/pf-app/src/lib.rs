//! Shared application service layer for polarflow.
//!
//! Frontends go through this crate for batch configuration, the
//! plan/execute/merge pipeline, store persistence, and coefficient queries.

pub mod batch_service;
pub mod cancel;
pub mod config;
pub mod error;
pub mod progress;
pub mod query;
pub mod store_service;

// Re-export key types for convenience
pub use batch_service::{
    BatchResponse, FailedJob, plan_batch, run_batch, run_batch_with_solver, run_single,
};
pub use cancel::StopFileWatcher;
pub use config::{
    BatchConfig, ControlSurfaceDef, DeflectionStateDef, SolverConfig, load_batch_config,
    load_control_surface,
};
pub use error::{AppError, AppResult};
pub use progress::{BatchProgressEvent, BatchStage};
pub use query::{FlapAnswer, FlapQuery, build_control_surface, query_flap, query_reynolds};
pub use store_service::{load_store, save_store};
