//! Delayed follow-up that cancels itself by stage comparison.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channels::Channel;
use crate::funnel::locks::UserLocks;
use crate::funnel::messages::FOLLOW_UP_PROMPT;
use crate::funnel::stage::Stage;
use crate::store::StateStore;

/// Schedules the web-payment follow-up prompt.
///
/// A scheduled task holds only the identity and the stage it expects. When
/// it fires it re-reads the stored stage and sends only if nothing moved.
#[derive(Clone)]
pub struct FollowUpScheduler {
    store: Arc<dyn StateStore>,
    channel: Arc<dyn Channel>,
    locks: UserLocks,
    delay: Duration,
}

impl FollowUpScheduler {
    pub fn new(
        store: Arc<dyn StateStore>,
        channel: Arc<dyn Channel>,
        locks: UserLocks,
        delay: Duration,
    ) -> Self {
        Self {
            store,
            channel,
            locks,
            delay,
        }
    }

    /// Fire after the configured delay if `user_id` is still at `expected`.
    pub fn schedule(&self, reply_to: String, user_id: String, expected: Stage) -> JoinHandle<()> {
        let scheduler = self.clone();
        debug!(user_id = %user_id, stage = %expected, delay_secs = self.delay.as_secs(), "Follow-up scheduled");
        tokio::spawn(async move {
            tokio::time::sleep(scheduler.delay).await;
            scheduler.fire_if_current(&reply_to, &user_id, expected).await;
        })
    }

    /// Send the prompt if the stored stage still equals `expected`.
    /// Returns whether it was sent.
    pub async fn fire_if_current(&self, reply_to: &str, user_id: &str, expected: Stage) -> bool {
        let _guard = self.locks.acquire(user_id).await;

        let current = self.store.stage_of(user_id).await;
        if current != expected {
            debug!(user_id, %current, %expected, "Follow-up cancelled");
            return false;
        }

        match self.channel.send_text(reply_to, FOLLOW_UP_PROMPT).await {
            Ok(()) => {
                info!(user_id, "Follow-up sent");
                true
            }
            Err(e) => {
                warn!(user_id, error = %e, "Follow-up send failed");
                false
            }
        }
    }
}
