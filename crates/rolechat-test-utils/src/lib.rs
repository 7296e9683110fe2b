// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Rolechat integration tests.
//!
//! Provides mock adapters and test harness infrastructure for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`ScriptedProvider`] - provider that plays back per-call scripts
//! - [`FailingStorage`] - storage wrapper with injected failures
//! - [`TurnHarness`] - orchestrator over a temp database

pub mod failing_storage;
pub mod harness;
pub mod mock_provider;

pub use failing_storage::{FailPoint, FailingStorage};
pub use harness::{DEFAULT_CHARACTER_ID, TurnHarness, TurnResult};
pub use mock_provider::{Script, ScriptedProvider};
