// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collaborators consulted before a turn has any side effect.

use async_trait::async_trait;

use crate::error::RolechatError;
use crate::types::{Character, RateDecision, SafetyVerdict};

/// Read-only persona lookup.
#[async_trait]
pub trait CharacterStore: Send + Sync {
    async fn get_character(&self, id: i64) -> Result<Option<Character>, RolechatError>;
}

/// Decides whether user text may be sent to the provider.
#[async_trait]
pub trait SafetyChecker: Send + Sync {
    async fn check(&self, text: &str) -> Result<SafetyVerdict, RolechatError>;
}

/// Admits or denies a turn for a user. Admitting consumes budget.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn acquire(&self, user_id: i64) -> Result<RateDecision, RolechatError>;
}
