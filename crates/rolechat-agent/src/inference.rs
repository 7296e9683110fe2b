// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inference stream adapter.
//!
//! Wraps one provider call as a finite sequence of text fragments with a
//! hard wall-clock deadline and cooperative cancellation. When either
//! fires, the provider stream is dropped, which closes the HTTP response
//! and aborts the request upstream.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use rolechat_core::{
    ProviderAdapter, ProviderMessage, ProviderRequest, ProviderStream, ProviderStreamChunk,
    RolechatError, TokenUsage,
};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Opens provider streams under a per-call budget.
#[derive(Clone)]
pub struct InferenceAdapter {
    provider: Arc<dyn ProviderAdapter>,
    timeout: Duration,
}

impl InferenceAdapter {
    pub fn new(provider: Arc<dyn ProviderAdapter>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    /// Build the provider request from a system prompt and the assembled
    /// history (which already ends with the new user text).
    pub fn build_request(system_prompt: &str, messages: Vec<ProviderMessage>) -> ProviderRequest {
        ProviderRequest {
            system_prompt: system_prompt.to_string(),
            messages,
            ..Default::default()
        }
    }

    /// Start one inference call.
    ///
    /// The effective deadline is the earlier of `turn_deadline` and this
    /// adapter's own budget. Waiting for the provider to accept the request
    /// counts against it.
    pub async fn open(
        &self,
        request: ProviderRequest,
        turn_deadline: Instant,
        cancel: &CancellationToken,
    ) -> Result<InferenceStream, RolechatError> {
        let started = Instant::now();
        let deadline = turn_deadline.min(started + self.timeout);
        let budget = deadline.saturating_duration_since(started);

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RolechatError::Cancelled),
            opened = tokio::time::timeout_at(deadline, self.provider.stream(request)) => opened,
        };

        let inner = match opened {
            Ok(result) => result?,
            Err(_) => {
                warn!(budget_ms = budget.as_millis() as u64, "provider did not accept request in time");
                return Err(RolechatError::Timeout { duration: budget });
            }
        };

        debug!(
            provider = self.provider.name(),
            open_ms = started.elapsed().as_millis() as u64,
            "inference stream opened"
        );

        Ok(InferenceStream {
            inner: Some(inner),
            deadline,
            budget,
            cancel: cancel.clone(),
            usage: None,
        })
    }
}

enum Step {
    Cancelled,
    TimedOut,
    Next(Option<Result<ProviderStreamChunk, RolechatError>>),
}

/// A live, non-restartable sequence of reply fragments.
pub struct InferenceStream {
    inner: Option<ProviderStream>,
    deadline: Instant,
    budget: Duration,
    cancel: CancellationToken,
    usage: Option<TokenUsage>,
}

impl InferenceStream {
    /// Next non-empty fragment, `None` at normal end of stream.
    ///
    /// After an error or the end of the stream every later call returns
    /// `None`.
    pub async fn next_fragment(&mut self) -> Option<Result<String, RolechatError>> {
        loop {
            let inner = self.inner.as_mut()?;
            let step = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Step::Cancelled,
                _ = tokio::time::sleep_until(self.deadline) => Step::TimedOut,
                next = inner.next() => Step::Next(next),
            };

            let next = match step {
                Step::Cancelled => {
                    self.abort();
                    return Some(Err(RolechatError::Cancelled));
                }
                Step::TimedOut => {
                    self.abort();
                    warn!(budget_ms = self.budget.as_millis() as u64, "inference timed out mid-stream");
                    return Some(Err(RolechatError::Timeout {
                        duration: self.budget,
                    }));
                }
                Step::Next(next) => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    if let Some(usage) = chunk.usage {
                        self.usage = Some(usage);
                    }
                    if !chunk.delta.is_empty() {
                        return Some(Ok(chunk.delta));
                    }
                }
                Some(Err(e)) => {
                    self.abort();
                    return Some(Err(e));
                }
                None => {
                    self.inner = None;
                    return None;
                }
            }
        }
    }

    /// Token usage reported by the provider so far.
    pub fn usage(&self) -> Option<TokenUsage> {
        self.usage
    }

    fn abort(&mut self) {
        // Dropping the provider stream closes the upstream connection.
        self.inner = None;
    }
}
