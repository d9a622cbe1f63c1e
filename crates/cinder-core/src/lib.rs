//! Cinder Core
//!
//! Core domain types and error handling for Cinder CI.
//! This crate has minimal dependencies and defines the shared vocabulary
//! used across all other crates.

pub mod error;
pub mod ids;
pub mod interpolation;
pub mod overlay;
pub mod run;
pub mod workflow;

pub use error::{Error, Result};
pub use ids::*;
