//! Test utilities for unit and HTTP-level testing.
//!
//! This module provides:
//! - Test data factories for creating valid test fixtures
//! - In-memory implementations of the billing ports
//! - A builder for an `AppState` wired entirely to those fakes

mod app_state_builder;
mod billing_mocks;
mod factories;

pub use app_state_builder::*;
pub use billing_mocks::*;
pub use factories::*;
