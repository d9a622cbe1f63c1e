//! Integration test infrastructure for Cinder CI.
//!
//! This crate provides workflow fixtures and helpers for exercising the
//! full engine — trigger evaluation through matrix expansion, scheduling,
//! and real `sh` subprocess execution — without a workflow file on disk.

pub mod fixtures;
pub mod helpers;
