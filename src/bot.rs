//! Run loop: channel stream in, one ordered queue per user.
//!
//! Events are queued per identity in arrival order before any task runs, so
//! a user's second message can never overtake the first. Each queue is
//! drained by a worker that retires once the queue is empty.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono_tz::Tz;
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::channels::{Channel, IncomingMessage, MessageKind};
use crate::config::FunnelConfig;
use crate::error::Error;
use crate::funnel::FunnelEngine;

type Queues = Arc<Mutex<HashMap<String, mpsc::UnboundedSender<IncomingMessage>>>>;

pub struct Bot {
    channel: Arc<dyn Channel>,
    timezone: Tz,
    dispatcher: Dispatcher,
}

impl Bot {
    pub fn new(config: &FunnelConfig, channel: Arc<dyn Channel>, engine: Arc<FunnelEngine>) -> Self {
        Self {
            dispatcher: Dispatcher {
                engine,
                channel: Arc::clone(&channel),
                reconnect_delay: config.reconnect_delay,
                reconnecting: Arc::new(AtomicBool::new(false)),
                queues: Arc::default(),
            },
            channel,
            timezone: config.timezone,
        }
    }

    /// Consume the channel until Ctrl+C or the stream ends.
    pub async fn run(&self) -> Result<(), Error> {
        let mut stream = self.channel.start().await?;
        tracing::info!(channel = self.channel.name(), "Funnel bot ready and listening");

        loop {
            let message = tokio::select! {
                biased;
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl+C received, shutting down...");
                    break;
                }
                msg = stream.next() => match msg {
                    Some(m) => m,
                    None => {
                        tracing::info!("Channel stream ended, shutting down...");
                        break;
                    }
                },
            };

            if message.kind != MessageKind::DirectText {
                tracing::debug!(user_id = %message.user_id, kind = ?message.kind, "Skipping non-direct message");
                continue;
            }
            self.log_inbound(&message);
            self.dispatcher.enqueue(message);
        }

        let pending = self.dispatcher.pending_users();
        if pending > 0 {
            tracing::warn!(users = pending, "Shutting down with queued messages");
        }
        self.channel.shutdown().await?;
        Ok(())
    }

    fn log_inbound(&self, message: &IncomingMessage) {
        let local = message.received_at.with_timezone(&self.timezone);
        tracing::info!(
            at = %local.format("%d/%m/%Y %H:%M:%S"),
            name = message.user_name.as_deref().unwrap_or("Sin nombre"),
            user_id = %message.user_id,
            text = %message.content,
            "Inbound message"
        );
    }
}

/// Routes events into per-user queues and handles them off the run loop.
#[derive(Clone)]
struct Dispatcher {
    engine: Arc<FunnelEngine>,
    channel: Arc<dyn Channel>,
    reconnect_delay: Duration,
    reconnecting: Arc<AtomicBool>,
    queues: Queues,
}

impl Dispatcher {
    /// Append the event to its user's queue, starting a worker if none is
    /// draining it.
    fn enqueue(&self, message: IncomingMessage) {
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        let message = match queues.get(&message.user_id) {
            Some(tx) => match tx.send(message) {
                Ok(()) => return,
                Err(mpsc::error::SendError(message)) => message,
            },
            None => message,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let user_id = message.user_id.clone();
        // The receiver is alive, so this cannot fail.
        let _ = tx.send(message);
        queues.insert(user_id.clone(), tx);
        tokio::spawn(self.clone().drain(user_id, rx));
    }

    async fn drain(self, user_id: String, mut rx: mpsc::UnboundedReceiver<IncomingMessage>) {
        while let Some(message) = self.next_or_retire(&user_id, &mut rx) {
            self.handle(message).await;
        }
    }

    /// Next queued event, or `None` after removing the queue. The final
    /// emptiness check runs under the map lock, which `enqueue` also holds
    /// while sending, so no event is stranded.
    fn next_or_retire(
        &self,
        user_id: &str,
        rx: &mut mpsc::UnboundedReceiver<IncomingMessage>,
    ) -> Option<IncomingMessage> {
        if let Ok(message) = rx.try_recv() {
            return Some(message);
        }
        let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        match rx.try_recv() {
            Ok(message) => Some(message),
            Err(_) => {
                queues.remove(user_id);
                None
            }
        }
    }

    /// Handle one event in its own task. Errors and panics stay inside it.
    async fn handle(&self, message: IncomingMessage) {
        let engine = Arc::clone(&self.engine);
        let user_id = message.user_id.clone();
        let outcome = tokio::spawn(async move { engine.handle(&message).await }).await;

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::error!(user_id = %user_id, error = %e, "Error handling message");
                if e.is_session_lost() {
                    schedule_reconnect(
                        Arc::clone(&self.channel),
                        Arc::clone(&self.reconnecting),
                        self.reconnect_delay,
                    );
                }
            }
            Err(e) if e.is_panic() => {
                tracing::error!(user_id = %user_id, "Message handler panicked");
            }
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Message handler cancelled");
            }
        }
    }

    fn pending_users(&self) -> usize {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Reinitialize the channel after `delay`, unless a reconnect is already
/// pending.
fn schedule_reconnect(channel: Arc<dyn Channel>, pending: Arc<AtomicBool>, delay: Duration) {
    if pending.swap(true, Ordering::SeqCst) {
        tracing::debug!("Reconnect already pending");
        return;
    }
    tracing::warn!(delay_secs = delay.as_secs(), channel = channel.name(), "Channel session lost, reconnecting");
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        match channel.reconnect().await {
            Ok(()) => tracing::info!(channel = channel.name(), "Channel reconnected"),
            Err(e) => tracing::error!(channel = channel.name(), error = %e, "Channel reconnect failed"),
        }
        pending.store(false, Ordering::SeqCst);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{MediaRef, MessageStream};
    use crate::error::ChannelError;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingChannel {
        reconnects: AtomicUsize,
    }

    #[async_trait]
    impl Channel for CountingChannel {
        fn name(&self) -> &str {
            "counting"
        }
        async fn start(&self) -> Result<MessageStream, ChannelError> {
            Ok(Box::pin(futures::stream::empty()))
        }
        async fn send_text(&self, _: &str, _: &str) -> Result<(), ChannelError> {
            Ok(())
        }
        async fn send_media(&self, _: &str, _: &MediaRef) -> Result<(), ChannelError> {
            Ok(())
        }
        async fn health_check(&self) -> Result<(), ChannelError> {
            Ok(())
        }
        async fn reconnect(&self) -> Result<(), ChannelError> {
            self.reconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn shutdown(&self) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn only_one_reconnect_pending_at_a_time() {
        let channel = Arc::new(CountingChannel::default());
        let pending = Arc::new(AtomicBool::new(false));
        let delay = Duration::from_secs(10);

        schedule_reconnect(channel.clone(), pending.clone(), delay);
        schedule_reconnect(channel.clone(), pending.clone(), delay);
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(channel.reconnects.load(Ordering::SeqCst), 1);
        assert!(!pending.load(Ordering::SeqCst));

        schedule_reconnect(channel.clone(), pending.clone(), delay);
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(channel.reconnects.load(Ordering::SeqCst), 2);
    }
}
