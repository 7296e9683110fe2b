// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-turn FSM that turns one user message into a persisted exchange and a
//! live stream of [`ChatEvent`]s.
//!
//! Each turn goes through: Init -> ResolvingConversation ->
//! PersistingUserMessage -> Thinking -> LoadingHistory -> Streaming ->
//! Finalizing -> Done. Error and Cancelled are reachable from any
//! non-terminal state.
//!
//! The turn runs on its own task and talks to the response writer only
//! through the relay and the turn's cancellation token.

use std::sync::Arc;
use std::time::Duration;

use rolechat_config::model::{BackpressureMode, ChatConfig};
use rolechat_core::{
    Character, CharacterStore, ChatEvent, ConversationId, ErrorCategory, MessageId,
    NewConversation, NewMessage, RateDecision, RateLimiter, RolechatError, SafetyChecker,
    SafetyVerdict, StorageAdapter, TokenUsage,
};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::history::HistoryAssembler;
use crate::inference::InferenceAdapter;
use crate::rate_limit::FixedWindowRateLimiter;
use crate::relay::{self, BackpressurePolicy, EmitOutcome, RelayReceiver, RelaySender};
use crate::safety::KeywordSafetyChecker;

/// States in the turn FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// Validating input and consulting the rate limiter and safety checker.
    Init,
    /// Looking up or creating the conversation and its character.
    ResolvingConversation,
    PersistingUserMessage,
    /// Emitting the liveness event.
    Thinking,
    LoadingHistory,
    /// Relaying provider fragments.
    Streaming,
    /// Persisting the assistant message.
    Finalizing,
    Done,
    Error,
    Cancelled,
}

impl TurnState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TurnState::Done | TurnState::Error | TurnState::Cancelled
        )
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnState::Init => write!(f, "init"),
            TurnState::ResolvingConversation => write!(f, "resolving_conversation"),
            TurnState::PersistingUserMessage => write!(f, "persisting_user_message"),
            TurnState::Thinking => write!(f, "thinking"),
            TurnState::LoadingHistory => write!(f, "loading_history"),
            TurnState::Streaming => write!(f, "streaming"),
            TurnState::Finalizing => write!(f, "finalizing"),
            TurnState::Done => write!(f, "done"),
            TurnState::Error => write!(f, "error"),
            TurnState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Tunables for every turn, derived from `[chat]`.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub relay_capacity: usize,
    pub turn_timeout: Duration,
    pub inference_timeout: Duration,
    pub max_content_chars: usize,
    pub default_title: String,
    pub backpressure: BackpressurePolicy,
    pub history_limit: Option<usize>,
}

impl TurnSettings {
    pub fn from_config(config: &ChatConfig) -> Self {
        let backpressure = match config.backpressure {
            BackpressureMode::Drop => BackpressurePolicy::Drop,
            BackpressureMode::Block => BackpressurePolicy::Block {
                timeout: Duration::from_millis(config.block_timeout_ms),
            },
        };
        Self {
            relay_capacity: config.relay_capacity,
            turn_timeout: Duration::from_secs(config.turn_timeout_secs),
            inference_timeout: Duration::from_secs(config.inference_timeout_secs),
            max_content_chars: config.max_content_chars,
            default_title: config.default_title.clone(),
            backpressure,
            history_limit: config.history_limit,
        }
    }
}

impl Default for TurnSettings {
    fn default() -> Self {
        Self::from_config(&ChatConfig::default())
    }
}

/// One inbound chat message.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnRequest {
    /// Correlates log lines for this turn.
    pub request_id: String,
    pub user_id: i64,
    /// [`ConversationId::NONE`] asks for a new conversation.
    pub conversation_id: ConversationId,
    pub character_id: i64,
    pub content: String,
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Done {
        conversation_id: ConversationId,
        user_message_id: MessageId,
        message_id: MessageId,
        content: String,
    },
    Failed {
        /// [`ConversationId::NONE`] when the conversation was never resolved.
        conversation_id: ConversationId,
        category: ErrorCategory,
        /// Set when the user message was stored before the failure.
        user_message_id: Option<MessageId>,
    },
    Cancelled {
        conversation_id: ConversationId,
    },
}

impl TurnOutcome {
    pub fn conversation_id(&self) -> ConversationId {
        match self {
            TurnOutcome::Done {
                conversation_id, ..
            }
            | TurnOutcome::Failed {
                conversation_id, ..
            }
            | TurnOutcome::Cancelled { conversation_id } => *conversation_id,
        }
    }
}

/// A running turn: its event stream and its task.
///
/// Dropping `events` cancels the turn.
pub struct TurnHandle {
    pub events: RelayReceiver,
    task: JoinHandle<TurnOutcome>,
}

impl TurnHandle {
    pub fn into_parts(self) -> (RelayReceiver, JoinHandle<TurnOutcome>) {
        (self.events, self.task)
    }

    /// Drain every event, then wait for the turn task.
    pub async fn collect(mut self) -> (Vec<ChatEvent>, Result<TurnOutcome, RolechatError>) {
        let mut events = Vec::new();
        while let Some(event) = self.events.recv().await {
            events.push(event);
        }
        let outcome = join_turn(self.task).await;
        (events, outcome)
    }
}

/// Await a turn task, mapping a panic or abort to an internal error.
pub async fn join_turn(task: JoinHandle<TurnOutcome>) -> Result<TurnOutcome, RolechatError> {
    task.await
        .map_err(|e| RolechatError::Internal(format!("turn task failed: {e}")))
}

/// Starts and supervises chat turns.
///
/// Cheap to clone; every clone shares collaborators, the shutdown token and
/// the task tracker.
#[derive(Clone)]
pub struct ChatOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    storage: Arc<dyn StorageAdapter>,
    inference: InferenceAdapter,
    characters: Arc<dyn CharacterStore>,
    safety: Arc<dyn SafetyChecker>,
    rate_limiter: Arc<dyn RateLimiter>,
    history: HistoryAssembler,
    settings: TurnSettings,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

/// Builder for [`ChatOrchestrator`]. Safety and rate limiting default to
/// permissive implementations.
pub struct ChatOrchestratorBuilder {
    storage: Arc<dyn StorageAdapter>,
    provider: Arc<dyn rolechat_core::ProviderAdapter>,
    characters: Arc<dyn CharacterStore>,
    safety: Arc<dyn SafetyChecker>,
    rate_limiter: Arc<dyn RateLimiter>,
    settings: TurnSettings,
    shutdown: CancellationToken,
}

impl ChatOrchestratorBuilder {
    pub fn safety(mut self, safety: Arc<dyn SafetyChecker>) -> Self {
        self.safety = safety;
        self
    }

    pub fn rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn settings(mut self, settings: TurnSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Parent token; cancelling it cancels every in-flight turn.
    pub fn shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn build(self) -> ChatOrchestrator {
        let inference = InferenceAdapter::new(self.provider, self.settings.inference_timeout);
        ChatOrchestrator {
            inner: Arc::new(Inner {
                storage: self.storage,
                inference,
                characters: self.characters,
                safety: self.safety,
                rate_limiter: self.rate_limiter,
                history: HistoryAssembler::new(self.settings.history_limit),
                settings: self.settings,
                shutdown: self.shutdown,
                tracker: TaskTracker::new(),
            }),
        }
    }
}

impl ChatOrchestrator {
    pub fn builder(
        storage: Arc<dyn StorageAdapter>,
        provider: Arc<dyn rolechat_core::ProviderAdapter>,
        characters: Arc<dyn CharacterStore>,
    ) -> ChatOrchestratorBuilder {
        ChatOrchestratorBuilder {
            storage,
            provider,
            characters,
            safety: Arc::new(KeywordSafetyChecker::default()),
            rate_limiter: Arc::new(FixedWindowRateLimiter::disabled()),
            settings: TurnSettings::default(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Spawn a turn and return its event stream.
    pub fn start_turn(&self, request: TurnRequest) -> TurnHandle {
        let settings = &self.inner.settings;
        let cancel = self.inner.shutdown.child_token();
        let (tx, rx) = relay::channel(settings.relay_capacity, settings.backpressure, cancel);

        let span = info_span!(
            "turn",
            request_id = %request.request_id,
            user_id = request.user_id,
        );
        let inner = Arc::clone(&self.inner);
        let task = self
            .inner
            .tracker
            .spawn(async move { inner.run_turn(request, tx).await }.instrument(span));

        TurnHandle { events: rx, task }
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.inner.storage
    }

    pub fn settings(&self) -> &TurnSettings {
        &self.inner.settings
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.inner.shutdown
    }

    /// Tracker of every turn task spawned by this orchestrator.
    pub fn tracker(&self) -> &TaskTracker {
        &self.inner.tracker
    }

    pub fn in_flight(&self) -> usize {
        self.inner.tracker.len()
    }
}

/// Mutable bookkeeping for one turn.
struct Turn {
    state: TurnState,
    conversation_id: ConversationId,
    user_message_id: Option<MessageId>,
    content: String,
}

impl Turn {
    fn new() -> Self {
        Self {
            state: TurnState::Init,
            conversation_id: ConversationId::NONE,
            user_message_id: None,
            content: String::new(),
        }
    }

    fn enter(&mut self, state: TurnState) {
        debug!(
            from = %self.state,
            to = %state,
            conversation_id = %self.conversation_id,
            "turn state"
        );
        self.state = state;
    }
}

/// What streaming produced, for the assistant row.
struct StreamSummary {
    usage: Option<TokenUsage>,
    elapsed: Duration,
}

impl Inner {
    async fn run_turn(&self, request: TurnRequest, tx: RelaySender) -> TurnOutcome {
        let started = Instant::now();
        let deadline = started + self.settings.turn_timeout;
        let cancel = tx.cancel_token().clone();
        let mut turn = Turn::new();

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(RolechatError::Cancelled),
            _ = tokio::time::sleep_until(deadline) => Err(RolechatError::Timeout {
                duration: self.settings.turn_timeout,
            }),
            result = self.drive(&request, &mut turn, &tx, deadline) => result,
        };

        let outcome = match result {
            Ok(summary) => self.finalize(&mut turn, summary, &tx).await,
            Err(e) if !e.is_reportable() => self.cancelled(&mut turn),
            Err(e) => self.fail(&mut turn, e, &tx).await,
        };

        info!(
            state = %turn.state,
            conversation_id = %turn.conversation_id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            dropped_events = tx.dropped(),
            "turn finished"
        );
        outcome
    }

    /// Init through Streaming. Everything here is bounded by the turn deadline.
    async fn drive(
        &self,
        request: &TurnRequest,
        turn: &mut Turn,
        tx: &RelaySender,
        deadline: Instant,
    ) -> Result<StreamSummary, RolechatError> {
        self.validate(request)?;
        self.admit(request).await?;

        turn.enter(TurnState::ResolvingConversation);
        let (conversation_id, character) = self.resolve(request).await?;
        turn.conversation_id = conversation_id;

        turn.enter(TurnState::PersistingUserMessage);
        let user_message_id = self
            .storage
            .append_message(&NewMessage::user(conversation_id, request.content.as_str()))
            .await?;
        turn.user_message_id = Some(user_message_id);

        turn.enter(TurnState::Thinking);
        if tx.emit(ChatEvent::thinking(conversation_id)).await == EmitOutcome::Closed {
            return Err(RolechatError::Cancelled);
        }

        turn.enter(TurnState::LoadingHistory);
        let messages = self
            .history
            .assemble_messages(
                self.storage.as_ref(),
                conversation_id,
                Some(user_message_id),
                &request.content,
            )
            .await?;

        turn.enter(TurnState::Streaming);
        let provider_request = InferenceAdapter::build_request(&character.system_prompt, messages);
        let inference_started = Instant::now();
        let mut stream = self
            .inference
            .open(provider_request, deadline, tx.cancel_token())
            .await?;

        while let Some(fragment) = stream.next_fragment().await {
            let fragment = fragment?;
            turn.content.push_str(&fragment);
            let event = ChatEvent::delta(conversation_id, fragment, turn.content.as_str());
            if tx.emit(event).await == EmitOutcome::Closed {
                return Err(RolechatError::Cancelled);
            }
        }

        Ok(StreamSummary {
            usage: stream.usage(),
            elapsed: inference_started.elapsed(),
        })
    }

    fn validate(&self, request: &TurnRequest) -> Result<(), RolechatError> {
        if request.conversation_id.0 < 0 {
            return Err(RolechatError::Validation(
                "conversationId must not be negative".into(),
            ));
        }
        if request.content.trim().is_empty() {
            return Err(RolechatError::Validation("content must not be empty".into()));
        }
        let max = self.settings.max_content_chars;
        if request.content.chars().count() > max {
            return Err(RolechatError::Validation(format!(
                "content exceeds {max} characters"
            )));
        }
        if request.conversation_id.is_none() && request.character_id <= 0 {
            return Err(RolechatError::Validation(
                "characterId must be positive when creating a conversation".into(),
            ));
        }
        Ok(())
    }

    async fn admit(&self, request: &TurnRequest) -> Result<(), RolechatError> {
        if let RateDecision::Deny { retry_after } =
            self.rate_limiter.acquire(request.user_id).await?
        {
            return Err(RolechatError::RateLimited { retry_after });
        }
        if let SafetyVerdict::Fail { reason } = self.safety.check(&request.content).await? {
            return Err(RolechatError::UnsafeContent { reason });
        }
        Ok(())
    }

    /// The conversation's own character wins over the request's for an
    /// existing conversation.
    async fn resolve(
        &self,
        request: &TurnRequest,
    ) -> Result<(ConversationId, Character), RolechatError> {
        if !request.conversation_id.is_none() {
            let conversation = self
                .storage
                .get_conversation(request.conversation_id)
                .await?
                .ok_or(RolechatError::ConversationNotFound(request.conversation_id.0))?;
            let character = self.character(conversation.character_id).await?;
            return Ok((conversation.id, character));
        }

        let character = self.character(request.character_id).await?;
        let conversation = self
            .storage
            .create_conversation(&NewConversation {
                user_id: request.user_id,
                character_id: character.id,
                title: self.settings.default_title.clone(),
            })
            .await?;
        info!(
            conversation_id = %conversation.id,
            character_id = character.id,
            "conversation created"
        );
        Ok((conversation.id, character))
    }

    async fn character(&self, id: i64) -> Result<Character, RolechatError> {
        self.characters
            .get_character(id)
            .await?
            .ok_or(RolechatError::CharacterNotFound(id))
    }

    async fn finalize(
        &self,
        turn: &mut Turn,
        summary: StreamSummary,
        tx: &RelaySender,
    ) -> TurnOutcome {
        if tx.is_cancelled() {
            return self.cancelled(turn);
        }

        turn.enter(TurnState::Finalizing);
        let conversation_id = turn.conversation_id;
        let mut message = NewMessage::assistant(conversation_id, turn.content.as_str());
        message.token_used = summary.usage.map(|u| u.output_tokens);
        message.processing_time_ms = Some(summary.elapsed.as_millis() as u64);

        let message_id = match self.storage.append_message(&message).await {
            Ok(id) => id,
            Err(e) => return self.fail(turn, e, tx).await,
        };

        turn.enter(TurnState::Done);
        let done = ChatEvent::done(conversation_id, message_id, turn.content.as_str());
        if tx.finish(done).await == EmitOutcome::Closed {
            debug!(conversation_id = %conversation_id, "client gone before done event");
        }

        TurnOutcome::Done {
            conversation_id,
            user_message_id: turn.user_message_id.unwrap_or(MessageId(0)),
            message_id,
            content: std::mem::take(&mut turn.content),
        }
    }

    async fn fail(&self, turn: &mut Turn, error: RolechatError, tx: &RelaySender) -> TurnOutcome {
        let failed_in = turn.state;
        turn.enter(TurnState::Error);
        let category = error.category();
        warn!(
            error = %error,
            category = %category,
            state = %failed_in,
            conversation_id = %turn.conversation_id,
            "turn failed"
        );

        let event = ChatEvent::error(turn.conversation_id, category, turn.content.as_str());
        if tx.finish(event).await == EmitOutcome::Closed {
            debug!("client gone before error event");
        }

        TurnOutcome::Failed {
            conversation_id: turn.conversation_id,
            category,
            user_message_id: turn.user_message_id,
        }
    }

    fn cancelled(&self, turn: &mut Turn) -> TurnOutcome {
        let cancelled_in = turn.state;
        turn.enter(TurnState::Cancelled);
        info!(
            state = %cancelled_in,
            conversation_id = %turn.conversation_id,
            partial_chars = turn.content.chars().count(),
            "turn cancelled"
        );
        TurnOutcome::Cancelled {
            conversation_id: turn.conversation_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_display_is_snake_case() {
        assert_eq!(TurnState::ResolvingConversation.to_string(), "resolving_conversation");
        assert_eq!(TurnState::Streaming.to_string(), "streaming");
    }

    #[test]
    fn terminal_states() {
        assert!(TurnState::Done.is_terminal());
        assert!(TurnState::Error.is_terminal());
        assert!(TurnState::Cancelled.is_terminal());
        assert!(!TurnState::Finalizing.is_terminal());
    }

    #[test]
    fn settings_follow_chat_config() {
        let config = ChatConfig {
            backpressure: BackpressureMode::Block,
            block_timeout_ms: 250,
            history_limit: Some(10),
            ..Default::default()
        };
        let settings = TurnSettings::from_config(&config);
        assert_eq!(
            settings.backpressure,
            BackpressurePolicy::Block {
                timeout: Duration::from_millis(250)
            }
        );
        assert_eq!(settings.turn_timeout, Duration::from_secs(60));
        assert_eq!(settings.relay_capacity, 16);
        assert_eq!(settings.history_limit, Some(10));
    }

    #[test]
    fn outcome_reports_conversation() {
        let outcome = TurnOutcome::Cancelled {
            conversation_id: ConversationId(4),
        };
        assert_eq!(outcome.conversation_id(), ConversationId(4));
    }
}
