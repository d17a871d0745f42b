//! Shared test utilities for transcriptor integration tests.
//!
//! This module provides:
//! - `TestHarness` for isolated runs with temp directories and fake engines
//! - `ScenarioBuilder` for producing recording-session exports on the fly
//! - Fake `AudioNormalizer` / `TranscriptionEngine` / `DocumentAssembler`

pub mod builders;
pub mod fakes;
pub mod harness;

pub use builders::*;
pub use fakes::*;
pub use harness::TestHarness;
