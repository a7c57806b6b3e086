//! `Bot::run` on a multi-threaded runtime.

mod common;

use std::sync::Arc;
use std::time::Duration;

use sales_funnel::bot::Bot;
use sales_funnel::channels::{Channel, IncomingMessage};
use sales_funnel::funnel::Stage;

use common::Harness;

const START: &str = "Hola, quisiera información de Gestión Pública";
const USERS: usize = 300;

fn user(i: usize) -> String {
    format!("5190000{i:04}")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_user_events_are_handled_in_arrival_order() {
    let h = Harness::in_memory();
    for i in 0..USERS {
        let id = user(i);
        h.channel
            .push_inbound(IncomingMessage::new("recording", id.as_str(), START));
        h.channel
            .push_inbound(IncomingMessage::new("recording", id.as_str(), "3"));
    }

    let channel: Arc<dyn Channel> = h.channel.clone();
    Bot::new(&h.config, channel, Arc::clone(&h.engine))
        .run()
        .await
        .unwrap();

    let settled = tokio::time::timeout(Duration::from_secs(20), async {
        loop {
            let mut done = 0;
            for i in 0..USERS {
                if h.store.stage_of(&user(i)).await == Stage::AwaitingDecision {
                    done += 1;
                }
            }
            if done == USERS {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;

    if settled.is_err() {
        let mut stuck = Vec::new();
        for i in 0..USERS {
            let stage = h.store.stage_of(&user(i)).await;
            if stage != Stage::AwaitingDecision {
                stuck.push((user(i), stage));
            }
        }
        panic!("{} users did not reach AwaitingDecision: {stuck:?}", stuck.len());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn non_direct_events_are_skipped() {
    let h = Harness::in_memory();
    h.channel.push_inbound(
        IncomingMessage::new("recording", common::LOCAL_USER, START)
            .with_kind(sales_funnel::channels::MessageKind::GroupText),
    );

    let channel: Arc<dyn Channel> = h.channel.clone();
    Bot::new(&h.config, channel, Arc::clone(&h.engine))
        .run()
        .await
        .unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.channel.count(), 0);
    assert!(h.state(common::LOCAL_USER).await.is_none());
}
