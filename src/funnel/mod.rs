//! Sales funnel: stage model, reply rules, pricing and the engine that
//! drives a conversation through them.

pub mod engine;
pub mod followup;
pub mod hours;
pub mod locks;
pub mod messages;
pub mod pricing;
pub mod rules;
pub mod stage;
pub mod transition;

pub use engine::{EngineDeps, FunnelEngine};
pub use followup::FollowUpScheduler;
pub use hours::{BusinessHours, Clock, SystemClock};
pub use locks::UserLocks;
pub use pricing::{PriceFormatter, Region, PRICE_UNAVAILABLE};
pub use stage::{ConversationState, Stage};
pub use transition::OutboundAction;
