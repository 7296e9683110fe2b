// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for the collaborators a chat turn depends on.
//!
//! Provider and storage adapters extend the [`PluginAdapter`] base trait.
//! All traits use `#[async_trait]` so they can be held as `Arc<dyn _>`.

pub mod adapter;
pub mod collaborators;
pub mod provider;
pub mod storage;

pub use adapter::PluginAdapter;
pub use collaborators::{CharacterStore, RateLimiter, SafetyChecker};
pub use provider::{ProviderAdapter, ProviderStream};
pub use storage::StorageAdapter;
