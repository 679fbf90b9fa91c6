//! Shared test utilities for litbrief integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring an orchestrator to an in-memory database
//! - Scripted search and language-model doubles
//! - Builders for candidate papers and queries

pub mod builders;
pub mod harness;
pub mod scripted;

pub use builders::*;
pub use harness::TestHarness;
pub use scripted::{ScriptedModel, ScriptedSearch};
