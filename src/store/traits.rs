//! `StateStore` trait: the single persistence seam of the funnel.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::funnel::{ConversationState, Stage};

/// Durable mapping from user identity to conversation state.
///
/// Absence of a record means `Stage::Idle`. Every mutation is persisted
/// before it returns.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Current record for a user, if any.
    async fn get(&self, user_id: &str) -> Option<ConversationState>;

    /// Insert or replace the user's record.
    async fn put(&self, state: ConversationState) -> Result<(), StoreError>;

    /// Delete the user's record. Removing a missing record is a no-op.
    async fn remove(&self, user_id: &str) -> Result<(), StoreError>;

    /// Number of stored conversations.
    async fn len(&self) -> usize;

    /// Current stage, `Idle` when there is no record.
    async fn stage_of(&self, user_id: &str) -> Stage {
        self.get(user_id)
            .await
            .map(|state| state.stage)
            .unwrap_or_default()
    }
}
