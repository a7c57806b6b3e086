//! Pure stage transitions.
//!
//! Each handler maps (stage, normalized reply, context) to the outbound
//! actions to send and the state change to apply once they are delivered.
//! `None` means the reply is not meaningful for the stage and is ignored.

use crate::catalog::{CatalogEntry, ContentCatalog, Segment};
use crate::channels::MediaRef;
use crate::funnel::messages;
use crate::funnel::pricing::{PriceFormatter, Region};
use crate::funnel::rules::{Decision, PaymentMethod, ProfileAnswer, WebPaymentOutcome};
use crate::funnel::stage::{ConversationState, Stage};

/// One unit of an ordered burst.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundAction {
    Text(String),
    Media(MediaRef),
}

impl OutboundAction {
    fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }
}

/// State change applied after a step's actions are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextState {
    /// Move to `stage`, recording the segment when it becomes known.
    Advance {
        stage: Stage,
        is_student: Option<bool>,
    },
    /// Delete the record (back to Idle).
    Clear,
}

/// Outcome of handling one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub actions: Vec<OutboundAction>,
    pub next: NextState,
    /// Schedule the web-payment follow-up after applying `next`.
    pub follow_up: bool,
}

impl Step {
    fn new(actions: Vec<OutboundAction>, next: NextState) -> Self {
        Self {
            actions,
            next,
            follow_up: false,
        }
    }

    fn advance(actions: Vec<OutboundAction>, stage: Stage) -> Self {
        Self::new(
            actions,
            NextState::Advance {
                stage,
                is_student: None,
            },
        )
    }

    fn clear(actions: Vec<OutboundAction>) -> Self {
        Self::new(actions, NextState::Clear)
    }
}

/// Everything a transition reads besides the reply itself.
pub struct TransitionContext<'a> {
    pub catalog: &'a ContentCatalog,
    pub entry: &'a CatalogEntry,
    pub prices: &'a PriceFormatter,
    pub region: Region,
    pub in_hours: bool,
}

/// The info burst for `entry`, absent items skipped.
pub fn info_burst(catalog: &ContentCatalog, entry: &CatalogEntry) -> Vec<OutboundAction> {
    let mut actions = Vec::with_capacity(7);
    let mut push_text = |text: Option<&String>| {
        if let Some(text) = text {
            actions.push(OutboundAction::text(text.as_str()));
        }
    };
    push_text(catalog.texts.greeting.as_ref());
    push_text(entry.personalized.as_ref());

    if let Some(media) = entry.media.intro_video.as_ref().or(entry.media.image.as_ref()) {
        actions.push(OutboundAction::Media(media.clone()));
    }
    if let Some(benefits) = &entry.benefits {
        actions.push(OutboundAction::text(benefits.as_str()));
    }
    if let Some(brochure) = &entry.media.brochure {
        actions.push(OutboundAction::Media(brochure.clone()));
    }
    if let Some(schedule) = &entry.schedule {
        actions.push(OutboundAction::text(schedule.as_str()));
    }
    actions.push(OutboundAction::text(catalog.profile_prompt()));
    actions
}

/// Handle a reply for a stored conversation past the info burst.
pub fn on_reply(state: &ConversationState, text: &str, ctx: &TransitionContext<'_>) -> Option<Step> {
    match state.stage {
        Stage::Idle | Stage::SendingInfo => None,
        Stage::AwaitingProfile => on_profile(text, ctx),
        Stage::AwaitingDecision => on_decision(text, ctx),
        Stage::AwaitingPaymentMethod => on_payment_method(state, text, ctx),
        Stage::AwaitingWebPaymentDecision => on_web_payment(text, ctx),
    }
}

fn on_profile(text: &str, ctx: &TransitionContext<'_>) -> Option<Step> {
    let answer = ProfileAnswer::parse(text)?;
    let is_student = answer.is_student();
    let segment = Segment::from_is_student(is_student);
    let texts = &ctx.catalog.texts;

    let mut actions = Vec::with_capacity(4);
    if let Some(response) = ctx.entry.profile_response(answer.number()) {
        actions.push(OutboundAction::text(response));
    }
    actions.push(OutboundAction::Text(messages::investment_message(
        texts.promo_headline.as_deref(),
        ctx.entry.category,
        ctx.entry.pricing(segment),
        |amount| ctx.prices.format(ctx.region, amount),
    )));
    if let Some(upsell) = &texts.upsell {
        actions.push(OutboundAction::text(upsell.as_str()));
    }
    if let Some(cta) = &texts.call_to_action {
        actions.push(OutboundAction::text(cta.as_str()));
    }

    Some(Step::new(
        actions,
        NextState::Advance {
            stage: Stage::AwaitingDecision,
            is_student: Some(is_student),
        },
    ))
}

fn on_decision(text: &str, ctx: &TransitionContext<'_>) -> Option<Step> {
    Some(match Decision::parse(text)? {
        Decision::Enroll => Step::advance(
            vec![OutboundAction::text(messages::PAYMENT_METHODS_PROMPT)],
            Stage::AwaitingPaymentMethod,
        ),
        Decision::TalkToAdvisor => Step::clear(vec![OutboundAction::text(
            messages::advisor_message(ctx.in_hours),
        )]),
    })
}

fn on_payment_method(
    state: &ConversationState,
    text: &str,
    ctx: &TransitionContext<'_>,
) -> Option<Step> {
    let category = ctx.entry.category;
    let payments = &ctx.catalog.payments;
    let assets = &ctx.catalog.assets;
    let data_prompt = || OutboundAction::Text(messages::data_collection_prompt(state.segment()));

    Some(match PaymentMethod::parse(text)? {
        PaymentMethod::Wallet => {
            let mut actions = vec![OutboundAction::Text(messages::wallet_instructions(
                &payments.wallet,
            ))];
            if let Some(qr) = assets.wallet_qr(category) {
                actions.push(OutboundAction::Media(qr.clone()));
            }
            actions.push(data_prompt());
            Step::clear(actions)
        }
        PaymentMethod::BankTransfer => Step::clear(vec![
            OutboundAction::Text(messages::bank_instructions(payments.bank_for(category))),
            data_prompt(),
        ]),
        PaymentMethod::WebCheckout => match ctx.entry.checkout_link.as_deref() {
            None => Step::clear(Vec::new()),
            Some(link) => {
                let mut actions = vec![OutboundAction::Text(messages::checkout_message(link))];
                if let Some(video) = &assets.checkout_video {
                    actions.push(OutboundAction::Media(video.clone()));
                }
                let mut step = Step::advance(actions, Stage::AwaitingWebPaymentDecision);
                step.follow_up = true;
                step
            }
        },
    })
}

fn on_web_payment(text: &str, ctx: &TransitionContext<'_>) -> Option<Step> {
    Some(match WebPaymentOutcome::parse(text)? {
        WebPaymentOutcome::Completed => {
            let mut actions = vec![OutboundAction::text(messages::REGISTRATION_CONFIRMED)];
            if let Some(image) = &ctx.catalog.assets.registration_image {
                actions.push(OutboundAction::Media(image.clone()));
            }
            actions.push(OutboundAction::text(messages::WELCOME_COMMUNITY));
            actions.push(OutboundAction::text(messages::MEMBERSHIP_OFFER));
            Step::clear(actions)
        }
        WebPaymentOutcome::NeedsHelp => Step::clear(vec![OutboundAction::text(
            messages::advisor_message(ctx.in_hours),
        )]),
    })
}
