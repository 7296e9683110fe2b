// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded, cancellable event relay between a turn task and its HTTP writer.
//!
//! One [`RelaySender`] (the turn) and one [`RelayReceiver`] (the response
//! stream) share a bounded queue and the turn's [`CancellationToken`].
//! Incremental events follow the configured [`BackpressurePolicy`];
//! terminal events wait for room so the authoritative `done` is never
//! dropped. Dropping the receiver cancels the turn.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::Stream;
use rolechat_core::ChatEvent;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{trace, warn};

/// What to do with an incremental event when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackpressurePolicy {
    /// Drop it immediately.
    Drop,
    /// Wait up to `timeout` for room, then drop it.
    Block { timeout: Duration },
}

/// Result of handing an event to the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitOutcome {
    Delivered,
    /// Queue was full; the event is gone.
    Dropped,
    /// The consumer is gone or the turn was cancelled.
    Closed,
}

/// Create a relay with room for `capacity` undelivered events.
pub fn channel(
    capacity: usize,
    policy: BackpressurePolicy,
    cancel: CancellationToken,
) -> (RelaySender, RelayReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let dropped = Arc::new(AtomicU64::new(0));
    let sender = RelaySender {
        tx,
        policy,
        cancel: cancel.clone(),
        dropped: Arc::clone(&dropped),
    };
    let receiver = RelayReceiver {
        rx,
        cancel: cancel.clone(),
        dropped,
        _guard: cancel.drop_guard(),
    };
    (sender, receiver)
}

/// Producer half, owned by the turn task.
#[derive(Debug)]
pub struct RelaySender {
    tx: mpsc::Sender<ChatEvent>,
    policy: BackpressurePolicy,
    cancel: CancellationToken,
    dropped: Arc<AtomicU64>,
}

impl RelaySender {
    /// Enqueue an incremental event according to the backpressure policy.
    pub async fn emit(&self, event: ChatEvent) -> EmitOutcome {
        if self.cancel.is_cancelled() {
            return EmitOutcome::Closed;
        }

        match self.policy {
            BackpressurePolicy::Drop => match self.tx.try_send(event) {
                Ok(()) => EmitOutcome::Delivered,
                Err(mpsc::error::TrySendError::Full(event)) => self.record_drop(&event),
                Err(mpsc::error::TrySendError::Closed(_)) => EmitOutcome::Closed,
            },
            BackpressurePolicy::Block { timeout } => {
                let permit = tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return EmitOutcome::Closed,
                    permit = tokio::time::timeout(timeout, self.tx.reserve()) => permit,
                };
                match permit {
                    Ok(Ok(permit)) => {
                        permit.send(event);
                        EmitOutcome::Delivered
                    }
                    Ok(Err(_)) => EmitOutcome::Closed,
                    Err(_) => self.record_drop(&event),
                }
            }
        }
    }

    /// Enqueue a terminal event, waiting for room as long as the turn is live.
    pub async fn finish(&self, event: ChatEvent) -> EmitOutcome {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => EmitOutcome::Closed,
            sent = self.tx.send(event) => match sent {
                Ok(()) => EmitOutcome::Delivered,
                Err(_) => EmitOutcome::Closed,
            },
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Incremental events lost to backpressure so far.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn record_drop(&self, event: &ChatEvent) -> EmitOutcome {
        let total = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
        warn!(
            kind = %event.kind,
            conversation_id = %event.conversation_id,
            dropped_total = total,
            "relay full, dropping event"
        );
        EmitOutcome::Dropped
    }
}

/// Consumer half, owned by the response writer.
#[derive(Debug)]
pub struct RelayReceiver {
    rx: mpsc::Receiver<ChatEvent>,
    cancel: CancellationToken,
    dropped: Arc<AtomicU64>,
    _guard: DropGuard,
}

impl RelayReceiver {
    /// Next event, or `None` once the turn is over or cancelled.
    ///
    /// Cancellation wins over queued events: nothing is delivered after it.
    pub async fn recv(&mut self) -> Option<ChatEvent> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                trace!("relay cancelled, stopping delivery");
                self.rx.close();
                None
            }
            event = self.rx.recv() => event,
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Adapt into a stream that ends after a terminal event or on cancellation.
    pub fn into_stream(self) -> impl Stream<Item = ChatEvent> + Send + 'static {
        futures::stream::unfold((self, false), |(mut rx, ended)| async move {
            if ended {
                return None;
            }
            let event = rx.recv().await?;
            let ended = event.is_terminal();
            Some((event, (rx, ended)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use rolechat_core::{ConversationId, ErrorCategory, MessageId};
    use tracing_test::traced_test;

    fn delta(n: usize) -> ChatEvent {
        ChatEvent::delta(ConversationId(1), n.to_string(), n.to_string())
    }

    #[tokio::test]
    async fn delivers_in_fifo_order() {
        let (tx, mut rx) = channel(8, BackpressurePolicy::Drop, CancellationToken::new());
        for i in 0..5 {
            assert_eq!(tx.emit(delta(i)).await, EmitOutcome::Delivered);
        }
        drop(tx);
        let mut seen = Vec::new();
        while let Some(ev) = rx.recv().await {
            seen.push(ev.delta.unwrap());
        }
        assert_eq!(seen, vec!["0", "1", "2", "3", "4"]);
    }

    #[tokio::test]
    #[traced_test]
    async fn drop_policy_discards_when_full() {
        let (tx, mut rx) = channel(2, BackpressurePolicy::Drop, CancellationToken::new());
        assert_eq!(tx.emit(delta(0)).await, EmitOutcome::Delivered);
        assert_eq!(tx.emit(delta(1)).await, EmitOutcome::Delivered);
        assert_eq!(tx.emit(delta(2)).await, EmitOutcome::Dropped);
        assert_eq!(tx.dropped(), 1);
        assert_eq!(rx.dropped(), 1);
        assert!(logs_contain("relay full, dropping event"));
        assert_eq!(rx.recv().await.unwrap().delta.as_deref(), Some("0"));
    }

    #[tokio::test(start_paused = true)]
    async fn block_policy_waits_then_drops() {
        let policy = BackpressurePolicy::Block {
            timeout: Duration::from_millis(50),
        };
        let (tx, mut rx) = channel(1, policy, CancellationToken::new());
        assert_eq!(tx.emit(delta(0)).await, EmitOutcome::Delivered);
        assert_eq!(tx.emit(delta(1)).await, EmitOutcome::Dropped);

        // The consumer hands `rx` back so its drop guard does not cancel the turn.
        let consumer = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let first = rx.recv().await.and_then(|e| e.delta);
            (first, rx)
        });
        assert_eq!(tx.emit(delta(2)).await, EmitOutcome::Delivered);

        let (first, mut rx) = consumer.await.unwrap();
        assert_eq!(first.as_deref(), Some("0"));
        assert_eq!(rx.recv().await.unwrap().delta.as_deref(), Some("2"));
        assert_eq!(tx.dropped(), 1);
    }

    #[tokio::test]
    async fn finish_waits_for_room() {
        let (tx, mut rx) = channel(1, BackpressurePolicy::Drop, CancellationToken::new());
        tx.emit(delta(0)).await;
        let producer = tokio::spawn(async move {
            tx.finish(ChatEvent::done(ConversationId(1), MessageId(9), "0"))
                .await
        });
        assert_eq!(rx.recv().await.unwrap().delta.as_deref(), Some("0"));
        let done = rx.recv().await.unwrap();
        assert!(done.is_terminal());
        assert_eq!(producer.await.unwrap(), EmitOutcome::Delivered);
    }

    #[tokio::test]
    async fn cancellation_stops_delivery_of_queued_events() {
        let token = CancellationToken::new();
        let (tx, mut rx) = channel(8, BackpressurePolicy::Drop, token.clone());
        tx.emit(delta(0)).await;
        tx.emit(delta(1)).await;
        token.cancel();
        assert!(rx.recv().await.is_none());
        assert_eq!(tx.emit(delta(2)).await, EmitOutcome::Closed);
        assert_eq!(
            tx.finish(ChatEvent::error(
                ConversationId(1),
                ErrorCategory::Timeout,
                ""
            ))
            .await,
            EmitOutcome::Closed
        );
    }

    #[tokio::test]
    async fn dropping_receiver_cancels_turn() {
        let token = CancellationToken::new();
        let (tx, rx) = channel(4, BackpressurePolicy::Drop, token.clone());
        drop(rx);
        assert!(token.is_cancelled());
        assert!(tx.is_cancelled());
    }

    #[tokio::test]
    async fn stream_ends_after_terminal_event() {
        let (tx, rx) = channel(8, BackpressurePolicy::Drop, CancellationToken::new());
        tx.emit(ChatEvent::thinking(ConversationId(3))).await;
        tx.finish(ChatEvent::done(ConversationId(3), MessageId(1), "x"))
            .await;
        // Sender still alive: the stream must end on `done`, not on close.
        let events: Vec<ChatEvent> = rx.into_stream().collect().await;
        assert_eq!(events.len(), 2);
        assert!(events[1].is_terminal());
        drop(tx);
    }
}
