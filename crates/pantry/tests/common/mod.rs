//! Shared test utilities for pantry integration tests.
//!
//! This module provides:
//! - `TestHarness` wrapping a `Pantry` with a controllable clock
//! - Builders for inventory items and configs

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::{start_time, TestHarness};
