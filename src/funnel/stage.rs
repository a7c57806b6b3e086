//! Funnel stage machine: tracks where each user is in the sales funnel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::{CatalogEntry, Category, Segment};

/// The stages of the funnel conversation.
///
/// Progresses: Idle → SendingInfo → AwaitingProfile → AwaitingDecision →
/// AwaitingPaymentMethod → AwaitingWebPaymentDecision. Idle is never stored;
/// a missing record means Idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    SendingInfo,
    AwaitingProfile,
    AwaitingDecision,
    AwaitingPaymentMethod,
    AwaitingWebPaymentDecision,
}

impl Stage {
    /// Check if a transition from `self` to `target` is valid.
    ///
    /// Every stage may exit to Idle, and every stage except a pending
    /// SendingInfo may restart into SendingInfo.
    pub fn can_transition_to(&self, target: Stage) -> bool {
        use Stage::*;
        matches!(
            (self, target),
            (_, Idle)
                | (Idle, SendingInfo)
                | (AwaitingProfile, SendingInfo)
                | (AwaitingDecision, SendingInfo)
                | (AwaitingPaymentMethod, SendingInfo)
                | (AwaitingWebPaymentDecision, SendingInfo)
                | (SendingInfo, AwaitingProfile)
                | (AwaitingProfile, AwaitingDecision)
                | (AwaitingDecision, AwaitingPaymentMethod)
                | (AwaitingPaymentMethod, AwaitingWebPaymentDecision)
        )
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::SendingInfo => "sending_info",
            Self::AwaitingProfile => "awaiting_profile",
            Self::AwaitingDecision => "awaiting_decision",
            Self::AwaitingPaymentMethod => "awaiting_payment_method",
            Self::AwaitingWebPaymentDecision => "awaiting_web_payment_decision",
        };
        write!(f, "{s}")
    }
}

/// Persisted per-user conversation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub user_id: String,
    pub stage: Stage,
    pub program_name: String,
    pub edition: String,
    pub category: Category,
    /// Known once the user answers the profile question.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_student_segment: Option<bool>,
    /// Diagnostics only; never used for expiry.
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    /// Fresh state for a user about to receive the info burst for `entry`.
    pub fn sending_info(user_id: impl Into<String>, entry: &CatalogEntry) -> Self {
        Self {
            user_id: user_id.into(),
            stage: Stage::SendingInfo,
            program_name: entry.program_name.clone(),
            edition: entry.edition.clone(),
            category: entry.category,
            is_student_segment: None,
            updated_at: Utc::now(),
        }
    }

    /// Move to `target`, rejecting transitions outside the funnel order.
    pub fn advance(&mut self, target: Stage) -> Result<(), String> {
        if !self.stage.can_transition_to(target) {
            return Err(format!("Cannot transition from {} to {}", self.stage, target));
        }
        self.stage = target;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Pricing segment; standard until the profile answer says otherwise.
    pub fn segment(&self) -> Segment {
        Segment::from_is_student(self.is_student_segment.unwrap_or(false))
    }
}
