//! Funnel engine: the per-event dispatcher.
//!
//! One call to [`FunnelEngine::handle`] is one read-decide-write-send cycle
//! for a single inbound message, run under that user's lock. The order of
//! evaluation is:
//!
//! 1. A pending info burst (`SendingInfo`) is retried first, whatever the
//!    text. On success the same text is then evaluated as a profile reply.
//! 2. A start keyword that matches exactly one catalog entry (re)starts the
//!    funnel. Zero or several matches make the event a no-op.
//! 3. Otherwise the reply is dispatched on the stored stage.
//!
//! The info burst is guarded by persisting `SendingInfo` before the first
//! send and advancing only after the last one succeeds.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::catalog::{normalize_text, CatalogEntry, CatalogMatcher, ContentCatalog};
use crate::channels::{Channel, IncomingMessage};
use crate::config::FunnelConfig;
use crate::error::{ChannelError, Result};
use crate::funnel::followup::FollowUpScheduler;
use crate::funnel::hours::{BusinessHours, Clock};
use crate::funnel::locks::UserLocks;
use crate::funnel::pricing::PriceFormatter;
use crate::funnel::rules::is_start_trigger;
use crate::funnel::stage::{ConversationState, Stage};
use crate::funnel::transition::{self, NextState, OutboundAction, Step, TransitionContext};
use crate::store::StateStore;

/// Collaborators the engine is wired with.
pub struct EngineDeps {
    pub catalog: Arc<ContentCatalog>,
    pub matcher: Arc<dyn CatalogMatcher>,
    pub store: Arc<dyn StateStore>,
    pub channel: Arc<dyn Channel>,
    pub clock: Arc<dyn Clock>,
}

pub struct FunnelEngine {
    catalog: Arc<ContentCatalog>,
    matcher: Arc<dyn CatalogMatcher>,
    store: Arc<dyn StateStore>,
    channel: Arc<dyn Channel>,
    clock: Arc<dyn Clock>,
    prices: PriceFormatter,
    hours: BusinessHours,
    locks: UserLocks,
    follow_ups: FollowUpScheduler,
}

/// Result of delivering an info burst.
enum BurstOutcome {
    Delivered,
    Failed,
}

impl FunnelEngine {
    pub fn new(config: &FunnelConfig, deps: EngineDeps) -> Self {
        let locks = UserLocks::new();
        let follow_ups = FollowUpScheduler::new(
            Arc::clone(&deps.store),
            Arc::clone(&deps.channel),
            locks.clone(),
            config.follow_up_delay,
        );
        Self {
            catalog: deps.catalog,
            matcher: deps.matcher,
            store: deps.store,
            channel: deps.channel,
            clock: deps.clock,
            prices: PriceFormatter::new(config.exchange_rate, config.local_prefix.clone()),
            hours: BusinessHours::new(config.timezone),
            locks,
            follow_ups,
        }
    }

    pub fn follow_ups(&self) -> &FollowUpScheduler {
        &self.follow_ups
    }

    /// Handle one inbound direct text message.
    ///
    /// Send failures inside the info burst are absorbed by the retry
    /// protocol; only a lost channel session is reported from there. Other
    /// send failures leave the stored state untouched and are returned.
    pub async fn handle(&self, msg: &IncomingMessage) -> Result<()> {
        let user_id = msg.user_id.as_str();
        let reply_to = msg.reply_to.as_str();
        let _guard = self.locks.acquire(user_id).await;

        let text = normalize_text(&msg.content);
        let mut current = self.store.get(user_id).await;

        if let Some(state) = current.take_if(|s| s.stage == Stage::SendingInfo) {
            let Some(entry) = self.resolve(&state).await else {
                return Ok(());
            };
            return match self.deliver_info(reply_to, state, entry).await? {
                (BurstOutcome::Failed, _) => Ok(()),
                (BurstOutcome::Delivered, state) => {
                    self.dispatch(reply_to, state, entry, &text).await
                }
            };
        }

        if is_start_trigger(&text) {
            return self.start(reply_to, user_id, &text).await;
        }

        let Some(state) = current else {
            debug!(user_id, "No active conversation, ignoring message");
            return Ok(());
        };
        let Some(entry) = self.resolve(&state).await else {
            return Ok(());
        };
        self.dispatch(reply_to, state, entry, &text).await
    }

    async fn start(&self, reply_to: &str, user_id: &str, text: &str) -> Result<()> {
        let matches = self.matcher.find(text, self.catalog.entries());
        let [entry] = matches.as_slice() else {
            info!(user_id, matches = matches.len(), "Start keyword without a unique program, ignoring");
            return Ok(());
        };

        info!(user_id, program = %entry.program_name, edition = %entry.edition, "Starting funnel");
        let state = ConversationState::sending_info(user_id, entry);
        self.persist(state.clone()).await;
        self.deliver_info(reply_to, state, entry).await?;
        Ok(())
    }

    /// Send the info burst; advance to `AwaitingProfile` only if all of it
    /// went out.
    async fn deliver_info(
        &self,
        reply_to: &str,
        mut state: ConversationState,
        entry: &CatalogEntry,
    ) -> Result<(BurstOutcome, ConversationState)> {
        let actions = transition::info_burst(&self.catalog, entry);
        if let Err(e) = self.execute_burst(reply_to, &actions).await {
            error!(
                user_id = %state.user_id,
                program = %entry.program_name,
                error = %e,
                "Info burst failed, will retry on next message"
            );
            if matches!(e, ChannelError::SessionLost { .. }) {
                return Err(e.into());
            }
            return Ok((BurstOutcome::Failed, state));
        }

        if let Err(e) = state.advance(Stage::AwaitingProfile) {
            warn!(user_id = %state.user_id, error = %e, "Unexpected stage after info burst");
        }
        self.persist(state.clone()).await;
        info!(user_id = %state.user_id, stage = %state.stage, "Info burst delivered");
        Ok((BurstOutcome::Delivered, state))
    }

    /// Evaluate a reply against the stored stage and apply the step.
    async fn dispatch(
        &self,
        reply_to: &str,
        mut state: ConversationState,
        entry: &CatalogEntry,
        text: &str,
    ) -> Result<()> {
        state.category = entry.category;
        let user_id = &state.user_id;
        let ctx = TransitionContext {
            catalog: &self.catalog,
            entry,
            prices: &self.prices,
            region: self.prices.region_of(user_id),
            in_hours: self.hours.is_open_at(self.clock.now()),
        };

        let Some(step) = transition::on_reply(&state, text, &ctx) else {
            debug!(user_id = %user_id, stage = %state.stage, text, "Reply not valid for stage, ignoring");
            return Ok(());
        };

        self.execute_burst(reply_to, &step.actions).await?;
        self.apply(reply_to, state, step).await;
        Ok(())
    }

    async fn apply(&self, reply_to: &str, mut state: ConversationState, step: Step) {
        match step.next {
            NextState::Clear => {
                info!(user_id = %state.user_id, from = %state.stage, "Conversation finished");
                self.clear(&state.user_id).await;
            }
            NextState::Advance { stage, is_student } => {
                let from = state.stage;
                if let Err(e) = state.advance(stage) {
                    warn!(user_id = %state.user_id, error = %e, "Rejected transition");
                    return;
                }
                if is_student.is_some() {
                    state.is_student_segment = is_student;
                }
                info!(user_id = %state.user_id, %from, to = %stage, "Stage advanced");
                let user_id = state.user_id.clone();
                self.persist(state).await;
                if step.follow_up {
                    self.follow_ups.schedule(reply_to.to_string(), user_id, stage);
                }
            }
        }
    }

    /// Send actions in order, stopping at the first failure.
    async fn execute_burst(
        &self,
        reply_to: &str,
        actions: &[OutboundAction],
    ) -> std::result::Result<(), ChannelError> {
        for (index, action) in actions.iter().enumerate() {
            let sent = match action {
                OutboundAction::Text(text) => self.channel.send_text(reply_to, text).await,
                OutboundAction::Media(media) => self.channel.send_media(reply_to, media).await,
            };
            if let Err(e) = sent {
                debug!(reply_to, action = index, total = actions.len(), "Send failed mid-burst");
                return Err(e);
            }
        }
        Ok(())
    }

    /// Resolve the entry a stored state refers to, resetting the user to
    /// Idle when it no longer exists.
    async fn resolve(&self, state: &ConversationState) -> Option<&CatalogEntry> {
        let entry = self.catalog.find(&state.program_name, &state.edition);
        if entry.is_none() {
            warn!(
                user_id = %state.user_id,
                program = %state.program_name,
                edition = %state.edition,
                "Stored program no longer in catalog, resetting"
            );
            self.clear(&state.user_id).await;
        }
        entry
    }

    async fn persist(&self, state: ConversationState) {
        let user_id = state.user_id.clone();
        if let Err(e) = self.store.put(state).await {
            warn!(user_id = %user_id, error = %e, "Failed to persist state");
        }
    }

    async fn clear(&self, user_id: &str) {
        if let Err(e) = self.store.remove(user_id).await {
            warn!(user_id, error = %e, "Failed to remove state");
        }
    }
}
