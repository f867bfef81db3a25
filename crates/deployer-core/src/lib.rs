//! Core orchestration logic for on-chain contract deployments.
//!
//! This crate wires the deployment pipeline together: the executor that
//! validates jobs and submits deployment transactions, the queue that
//! drives batches of jobs with retry accounting, the reusable retry
//! primitive, and the engine that runs the periodic processing loop.

/// Engine wiring and the periodic processing loop.
pub mod engine;
/// Deployment executor: validation, submission, confirmation wait.
pub mod executor;
/// Deployment queue: batch processing and retry accounting.
pub mod queue;
/// Reusable bounded-retry primitive with exponential backoff.
pub mod retry;

pub use engine::{Engine, EngineError, EventBus};
pub use executor::{DeploymentExecutor, ExecutorConfig, ExecutorError};
pub use queue::{DeploymentQueue, QueueConfig, QueueError, RetryOutcome};
pub use retry::{run_with_retry, RetryError};
