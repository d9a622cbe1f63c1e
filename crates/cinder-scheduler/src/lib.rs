//! Cinder Scheduler
//!
//! Trigger evaluation, matrix expansion, worker-pool dispatch, and result
//! aggregation for Cinder CI.

pub mod capability;
pub mod matrix;
pub mod pool;
pub mod scheduler;
pub mod triggers;

pub use capability::{AnyEnvironment, CapabilityMatcher};
pub use matrix::MatrixExpander;
pub use pool::WorkerPool;
pub use scheduler::Scheduler;
pub use triggers::{TriggerEvent, TriggerMatcher};
