// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming chat turn pipeline for Rolechat.
//!
//! The [`ChatOrchestrator`] runs one task per turn:
//! - Validates, rate-limits and safety-checks the user message
//! - Resolves or creates the conversation and persists the user message
//! - Assembles history and streams the provider reply through the relay
//! - Persists the assistant message and emits the terminal event
//!
//! The HTTP side only ever sees a [`RelayReceiver`].

pub mod characters;
pub mod history;
pub mod inference;
pub mod rate_limit;
pub mod relay;
pub mod safety;
pub mod session;
pub mod shutdown;

pub use characters::ConfigCharacterStore;
pub use history::HistoryAssembler;
pub use inference::{InferenceAdapter, InferenceStream};
pub use rate_limit::FixedWindowRateLimiter;
pub use relay::{BackpressurePolicy, EmitOutcome, RelayReceiver, RelaySender};
pub use safety::KeywordSafetyChecker;
pub use session::{
    ChatOrchestrator, ChatOrchestratorBuilder, TurnHandle, TurnOutcome, TurnRequest,
    TurnSettings, TurnState, join_turn,
};
