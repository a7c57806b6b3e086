//! Web-payment follow-up timing, on a paused clock.

mod common;

use std::time::Duration;

use sales_funnel::funnel::messages::FOLLOW_UP_PROMPT;
use sales_funnel::funnel::Stage;

use common::{Harness, LOCAL_USER};

const DIPLOMA: &str = "Quiero info del Diplomado en Finanzas";

/// Drive a user to the web payment decision.
async fn reach_web_checkout(h: &Harness) {
    h.send(LOCAL_USER, DIPLOMA).await.unwrap();
    h.send(LOCAL_USER, "1").await.unwrap();
    h.send(LOCAL_USER, "2").await.unwrap();
    h.send(LOCAL_USER, "pago web").await.unwrap();
    assert_eq!(
        h.store.stage_of(LOCAL_USER).await,
        Stage::AwaitingWebPaymentDecision
    );
}

fn follow_ups_sent(h: &Harness) -> usize {
    h.channel
        .texts()
        .iter()
        .filter(|t| t.as_str() == FOLLOW_UP_PROMPT)
        .count()
}

#[tokio::test(start_paused = true)]
async fn web_checkout_sends_link_then_tutorial() {
    let h = Harness::in_memory();
    reach_web_checkout(&h).await;

    let delivered = h.channel.delivered();
    let tail = &delivered[delivered.len() - 2..];
    assert!(tail[0].text().unwrap().contains("https://pagos.example/finanzas"));
    assert_eq!(
        tail[1],
        common::Delivered::Media("media/videos/WEB.mp4".into())
    );
}

#[tokio::test(start_paused = true)]
async fn follow_up_fires_once_when_stage_is_unchanged() {
    let h = Harness::in_memory();
    reach_web_checkout(&h).await;

    tokio::time::sleep(h.config.follow_up_delay - Duration::from_secs(1)).await;
    assert_eq!(follow_ups_sent(&h), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(follow_ups_sent(&h), 1);

    tokio::time::sleep(h.config.follow_up_delay * 2).await;
    assert_eq!(follow_ups_sent(&h), 1);
    assert_eq!(
        h.store.stage_of(LOCAL_USER).await,
        Stage::AwaitingWebPaymentDecision
    );
}

#[tokio::test(start_paused = true)]
async fn answering_before_the_delay_cancels_the_follow_up() {
    let h = Harness::in_memory();
    reach_web_checkout(&h).await;

    tokio::time::sleep(Duration::from_secs(60)).await;
    h.send(LOCAL_USER, "1").await.unwrap();
    assert_eq!(h.store.stage_of(LOCAL_USER).await, Stage::Idle);
    let texts = h.channel.texts();
    assert!(texts.iter().any(|t| t.contains("registrado")));

    tokio::time::sleep(h.config.follow_up_delay).await;
    assert_eq!(follow_ups_sent(&h), 0);
}

#[tokio::test(start_paused = true)]
async fn restarting_the_funnel_cancels_the_follow_up() {
    let h = Harness::in_memory();
    reach_web_checkout(&h).await;

    h.send(LOCAL_USER, DIPLOMA).await.unwrap();
    assert_eq!(h.store.stage_of(LOCAL_USER).await, Stage::AwaitingProfile);

    tokio::time::sleep(h.config.follow_up_delay * 2).await;
    assert_eq!(follow_ups_sent(&h), 0);
}

#[tokio::test(start_paused = true)]
async fn scheduler_compares_stage_at_fire_time() {
    let h = Harness::in_memory();
    let scheduler = h.engine.follow_ups();

    // No record at all: nothing to follow up on.
    let handle = scheduler.schedule(
        LOCAL_USER.to_string(),
        LOCAL_USER.to_string(),
        Stage::AwaitingWebPaymentDecision,
    );
    handle.await.unwrap();
    assert_eq!(follow_ups_sent(&h), 0);

    reach_web_checkout(&h).await;
    let sent = scheduler
        .fire_if_current("chat-7", LOCAL_USER, Stage::AwaitingWebPaymentDecision)
        .await;
    assert!(sent);
    let (to, _) = h.channel.sent().pop().unwrap();
    assert_eq!(to, "chat-7");

    assert!(
        !scheduler
            .fire_if_current("chat-7", LOCAL_USER, Stage::AwaitingPaymentMethod)
            .await
    );
}
