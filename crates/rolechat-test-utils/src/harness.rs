// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end turn testing.
//!
//! `TurnHarness` assembles a complete orchestrator with a scripted
//! provider, a temp SQLite database and config-backed characters, and
//! offers `send()` to drive one turn to completion.

use std::sync::Arc;

use rolechat_agent::{
    ChatOrchestrator, ConfigCharacterStore, FixedWindowRateLimiter, KeywordSafetyChecker,
    TurnHandle, TurnOutcome, TurnRequest, TurnSettings,
};
use rolechat_config::model::{
    CharacterConfig, ChatConfig, RateLimitConfig, StorageConfig, VoiceConfig,
};
use rolechat_core::{ChatEvent, ChatEventKind, ConversationId, Message, RolechatError, StorageAdapter};
use rolechat_storage::SqliteStorage;

use crate::failing_storage::{FailPoint, FailingStorage};
use crate::mock_provider::{Script, ScriptedProvider};

/// Character every harness knows about unless told otherwise.
pub const DEFAULT_CHARACTER_ID: i64 = 7;

/// Builder for creating turn test environments.
pub struct TurnHarnessBuilder {
    scripts: Vec<Script>,
    characters: Vec<CharacterConfig>,
    chat: ChatConfig,
    blocked_terms: Vec<String>,
    rate_limit: Option<RateLimitConfig>,
    fail_points: Vec<FailPoint>,
}

impl TurnHarnessBuilder {
    fn new() -> Self {
        Self {
            scripts: Vec::new(),
            characters: vec![CharacterConfig {
                id: DEFAULT_CHARACTER_ID,
                name: "Ada".into(),
                system_prompt: "You are Ada.".into(),
                voice: VoiceConfig::default(),
            }],
            chat: ChatConfig::default(),
            blocked_terms: Vec::new(),
            rate_limit: None,
            fail_points: Vec::new(),
        }
    }

    /// Scripts for successive provider calls.
    pub fn with_scripts(mut self, scripts: Vec<Script>) -> Self {
        self.scripts = scripts;
        self
    }

    pub fn with_character(mut self, id: i64, name: &str, system_prompt: &str) -> Self {
        self.characters.push(CharacterConfig {
            id,
            name: name.into(),
            system_prompt: system_prompt.into(),
            voice: VoiceConfig::default(),
        });
        self
    }

    /// Override `[chat]` settings.
    pub fn with_chat(mut self, chat: ChatConfig) -> Self {
        self.chat = chat;
        self
    }

    pub fn with_blocked_terms(mut self, terms: &[&str]) -> Self {
        self.blocked_terms = terms.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_rate_limit(mut self, max_turns: u32, window_secs: u64) -> Self {
        self.rate_limit = Some(RateLimitConfig {
            enabled: true,
            max_turns,
            window_secs,
        });
        self
    }

    /// Make the given storage operations fail.
    pub fn failing_at(mut self, points: &[FailPoint]) -> Self {
        self.fail_points = points.to_vec();
        self
    }

    /// Build the harness with a fresh temp database.
    pub async fn build(self) -> Result<TurnHarness, RolechatError> {
        let temp_dir = tempfile::TempDir::new().map_err(RolechatError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let sqlite = Arc::new(SqliteStorage::new(StorageConfig {
            database_path: db_path.to_string_lossy().to_string(),
            wal_mode: true,
        }));
        sqlite.initialize().await?;

        let storage: Arc<dyn StorageAdapter> = if self.fail_points.is_empty() {
            sqlite.clone() as Arc<dyn StorageAdapter>
        } else {
            Arc::new(FailingStorage::new(sqlite.clone(), self.fail_points))
        };

        let provider = Arc::new(ScriptedProvider::with_scripts(self.scripts));
        let characters = Arc::new(ConfigCharacterStore::new(
            &self.characters,
            &self.chat.default_system_prompt,
        ));
        let rate_limiter = match &self.rate_limit {
            Some(config) => FixedWindowRateLimiter::from_config(config),
            None => FixedWindowRateLimiter::disabled(),
        };

        let orchestrator = ChatOrchestrator::builder(storage, provider.clone(), characters)
            .safety(Arc::new(KeywordSafetyChecker::new(&self.blocked_terms)))
            .rate_limiter(Arc::new(rate_limiter))
            .settings(TurnSettings::from_config(&self.chat))
            .build();

        Ok(TurnHarness {
            provider,
            storage: sqlite,
            orchestrator,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete turn environment backed by a temp SQLite database.
pub struct TurnHarness {
    /// The scripted provider, for call and abort assertions.
    pub provider: Arc<ScriptedProvider>,
    /// Direct handle on the database, bypassing injected failures.
    pub storage: Arc<SqliteStorage>,
    pub orchestrator: ChatOrchestrator,
    _temp_dir: tempfile::TempDir,
}

impl TurnHarness {
    pub fn builder() -> TurnHarnessBuilder {
        TurnHarnessBuilder::new()
    }

    pub fn request(conversation_id: i64, character_id: i64, content: &str) -> TurnRequest {
        TurnRequest {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_id: 1,
            conversation_id: ConversationId(conversation_id),
            character_id,
            content: content.to_string(),
        }
    }

    /// Start a turn without consuming it.
    pub fn start(&self, conversation_id: i64, character_id: i64, content: &str) -> TurnHandle {
        self.orchestrator
            .start_turn(Self::request(conversation_id, character_id, content))
    }

    /// Run a turn to completion and collect everything it emitted.
    pub async fn send(
        &self,
        conversation_id: i64,
        character_id: i64,
        content: &str,
    ) -> Result<TurnResult, RolechatError> {
        let (events, outcome) = self.start(conversation_id, character_id, content).collect().await;
        Ok(TurnResult {
            events,
            outcome: outcome?,
        })
    }

    /// Stored messages of a conversation, in history order.
    pub async fn messages(&self, conversation_id: ConversationId) -> Result<Vec<Message>, RolechatError> {
        self.storage.load_messages(conversation_id).await
    }
}

/// Events and outcome of one completed turn.
#[derive(Debug)]
pub struct TurnResult {
    pub events: Vec<ChatEvent>,
    pub outcome: TurnOutcome,
}

impl TurnResult {
    pub fn kinds(&self) -> Vec<ChatEventKind> {
        self.events.iter().map(|e| e.kind).collect()
    }

    /// Concatenation of every delivered `delta`.
    pub fn delta_text(&self) -> String {
        self.events
            .iter()
            .filter_map(|e| e.delta.as_deref())
            .collect()
    }

    pub fn done(&self) -> Option<&ChatEvent> {
        self.events.iter().find(|e| e.kind == ChatEventKind::Done)
    }

    pub fn error(&self) -> Option<&ChatEvent> {
        self.events.iter().find(|e| e.kind == ChatEventKind::Error)
    }

    pub fn conversation_id(&self) -> ConversationId {
        self.outcome.conversation_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn harness_runs_default_turn() {
        let harness = TurnHarness::builder().build().await.unwrap();
        let result = harness.send(0, DEFAULT_CHARACTER_ID, "hello").await.unwrap();
        assert_eq!(result.delta_text(), "mock response");
        assert!(result.done().is_some());
        let stored = harness.messages(result.conversation_id()).await.unwrap();
        assert_eq!(stored.len(), 2);
    }
}
