//! # SmashBloc Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Two-team match fixtures and a recording physics backend
//! - Determinism test harness
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;

/// Re-export proptest for convenience.
pub use proptest;
