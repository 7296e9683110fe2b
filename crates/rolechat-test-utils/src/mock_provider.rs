// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted provider adapter for deterministic testing.
//!
//! `ScriptedProvider` implements `ProviderAdapter` by popping one [`Script`]
//! per call, so a test can describe exactly how each inference behaves:
//! normal replies, upfront rejection, mid-stream failure, slow fragments,
//! or a stream that never ends.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream;
use tokio::sync::Mutex;

use rolechat_core::{
    AdapterType, HealthStatus, PluginAdapter, ProviderAdapter, ProviderRequest, ProviderStream,
    ProviderStreamChunk, RolechatError, TokenUsage,
};

/// Behaviour of one provider call.
#[derive(Debug, Clone)]
pub enum Script {
    /// Stream `fragments`, then a usage chunk, then end.
    Reply {
        fragments: Vec<String>,
        delay: Duration,
    },
    /// Refuse the request before streaming.
    Reject { status: u16, message: String },
    /// Stream `fragments`, then fail.
    FailAfter {
        fragments: Vec<String>,
        message: String,
    },
    /// Stream `fragments`, then never yield again.
    Hang { fragments: Vec<String> },
}

impl Script {
    pub fn reply(fragments: &[&str]) -> Self {
        Script::Reply {
            fragments: owned(fragments),
            delay: Duration::ZERO,
        }
    }

    /// Like [`Script::reply`] with a pause before every fragment.
    pub fn slow_reply(fragments: &[&str], delay: Duration) -> Self {
        Script::Reply {
            fragments: owned(fragments),
            delay,
        }
    }

    pub fn reject(status: u16) -> Self {
        Script::Reject {
            status,
            message: format!("mock rejection ({status})"),
        }
    }

    pub fn fail_after(fragments: &[&str], message: &str) -> Self {
        Script::FailAfter {
            fragments: owned(fragments),
            message: message.to_string(),
        }
    }

    pub fn hang(fragments: &[&str]) -> Self {
        Script::Hang {
            fragments: owned(fragments),
        }
    }
}

fn owned(fragments: &[&str]) -> Vec<String> {
    fragments.iter().map(|s| s.to_string()).collect()
}

/// Counts streams dropped before they reached their natural end.
struct AbortGuard {
    finished: bool,
    aborted: Arc<AtomicUsize>,
}

impl Drop for AbortGuard {
    fn drop(&mut self) {
        if !self.finished {
            self.aborted.fetch_add(1, Ordering::SeqCst);
        }
    }
}

struct StreamState {
    items: VecDeque<Result<ProviderStreamChunk, RolechatError>>,
    delay: Duration,
    hang: bool,
    guard: AbortGuard,
}

/// A provider that plays back queued scripts.
///
/// When the queue is empty, calls reply with `"mock response"` in two
/// fragments.
pub struct ScriptedProvider {
    scripts: Mutex<VecDeque<Script>>,
    requests: Mutex<Vec<ProviderRequest>>,
    aborted: Arc<AtomicUsize>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::with_scripts(Vec::new())
    }

    pub fn with_scripts(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(VecDeque::from(scripts)),
            requests: Mutex::new(Vec::new()),
            aborted: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn push(&self, script: Script) {
        self.scripts.lock().await.push_back(script);
    }

    /// Every request received so far, in call order.
    pub async fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.requests.lock().await.len()
    }

    /// Streams dropped by the caller before they ended.
    pub fn aborted_streams(&self) -> usize {
        self.aborted.load(Ordering::SeqCst)
    }

    async fn next_script(&self) -> Script {
        self.scripts
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Script::reply(&["mock ", "response"]))
    }

    fn build_stream(&self, script: Script) -> Result<ProviderStream, RolechatError> {
        let text = |fragments: Vec<String>| {
            fragments
                .into_iter()
                .map(|f| Ok(ProviderStreamChunk::text(f)))
                .collect::<VecDeque<_>>()
        };

        let (items, delay, hang) = match script {
            Script::Reject { status, message } => {
                return Err(RolechatError::ProviderRejected {
                    message,
                    status: Some(status),
                    source: None,
                });
            }
            Script::Reply { fragments, delay } => {
                let output_tokens = fragments.len() as u32;
                let mut items = text(fragments);
                items.push_back(Ok(ProviderStreamChunk {
                    usage: Some(TokenUsage {
                        input_tokens: 10,
                        output_tokens,
                    }),
                    finish_reason: Some("stop".into()),
                    ..Default::default()
                }));
                (items, delay, false)
            }
            Script::FailAfter { fragments, message } => {
                let mut items = text(fragments);
                items.push_back(Err(RolechatError::ProviderStream {
                    message,
                    source: None,
                }));
                (items, Duration::ZERO, false)
            }
            Script::Hang { fragments } => (text(fragments), Duration::ZERO, true),
        };

        let state = StreamState {
            items,
            delay,
            hang,
            guard: AbortGuard {
                finished: false,
                aborted: Arc::clone(&self.aborted),
            },
        };

        Ok(Box::pin(stream::unfold(state, |mut state| async move {
            if !state.delay.is_zero() {
                tokio::time::sleep(state.delay).await;
            }
            match state.items.pop_front() {
                Some(item) => Some((item, state)),
                None if state.hang => {
                    futures::future::pending::<()>().await;
                    None
                }
                None => {
                    state.guard.finished = true;
                    None
                }
            }
        })))
    }
}

impl Default for ScriptedProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PluginAdapter for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted-provider"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, RolechatError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RolechatError> {
        Ok(())
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedProvider {
    async fn stream(&self, request: ProviderRequest) -> Result<ProviderStream, RolechatError> {
        self.requests.lock().await.push(request);
        let script = self.next_script().await;
        self.build_stream(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    async fn drain(provider: &ScriptedProvider) -> Vec<Result<ProviderStreamChunk, RolechatError>> {
        provider
            .stream(ProviderRequest::default())
            .await
            .unwrap()
            .collect()
            .await
    }

    #[tokio::test]
    async fn default_reply_when_queue_empty() {
        let provider = ScriptedProvider::new();
        let text: String = drain(&provider)
            .await
            .into_iter()
            .map(|c| c.unwrap().delta)
            .collect();
        assert_eq!(text, "mock response");
        assert_eq!(provider.call_count().await, 1);
        assert_eq!(provider.aborted_streams(), 0);
    }

    #[tokio::test]
    async fn scripts_play_in_order() {
        let provider =
            ScriptedProvider::with_scripts(vec![Script::reject(400), Script::reply(&["ok"])]);
        assert!(provider.stream(ProviderRequest::default()).await.is_err());
        let chunks = drain(&provider).await;
        assert_eq!(chunks[0].as_ref().unwrap().delta, "ok");
        assert_eq!(chunks[1].as_ref().unwrap().usage.unwrap().output_tokens, 1);
    }

    #[tokio::test]
    async fn fail_after_ends_with_stream_error() {
        let provider = ScriptedProvider::with_scripts(vec![Script::fail_after(&["a"], "boom")]);
        let chunks = drain(&provider).await;
        assert_eq!(chunks.len(), 2);
        assert!(matches!(
            chunks[1],
            Err(RolechatError::ProviderStream { .. })
        ));
    }

    #[tokio::test]
    async fn dropping_a_hanging_stream_counts_as_abort() {
        let provider = ScriptedProvider::with_scripts(vec![Script::hang(&["a"])]);
        let mut stream = provider.stream(ProviderRequest::default()).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap().delta, "a");
        drop(stream);
        assert_eq!(provider.aborted_streams(), 1);
    }
}
