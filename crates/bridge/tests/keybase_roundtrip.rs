#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Reconciliation against the real Keybase gateway over an in-memory chat.

mod common;

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use {
    async_trait::async_trait,
    common::{FakeSource, GENERAL, record, relayed},
    serde_json::{Value, json},
    slackbase_bridge::{Bridge, BridgeSettings, ChannelOutcome, SyncReport},
    slackbase_channels::{DestinationChat, HistoryWindow},
    slackbase_keybase::{ApiRunner, KeybaseGateway, Result},
    tokio_util::sync::CancellationToken,
};

/// Answers `chat api` requests from per-channel body lists, oldest first.
#[derive(Default)]
struct InMemoryKeybase {
    team: String,
    channels: Mutex<HashMap<String, Vec<String>>>,
}

impl InMemoryKeybase {
    fn new(team: &str, channels: &[&str]) -> Self {
        Self {
            team: team.into(),
            channels: Mutex::new(
                channels
                    .iter()
                    .map(|c| (c.to_string(), Vec::new()))
                    .collect(),
            ),
        }
    }

    fn post(&self, channel: &str, body: &str) {
        self.channels
            .lock()
            .unwrap()
            .entry(channel.into())
            .or_default()
            .push(body.into());
    }

    fn bodies(&self, channel: &str) -> Vec<String> {
        self.channels.lock().unwrap()[channel].clone()
    }
}

#[async_trait]
impl ApiRunner for InMemoryKeybase {
    async fn run(&self, request: &str) -> Result<String> {
        let request: Value = serde_json::from_str(request)?;
        let options = &request["params"]["options"];
        let topic = options["channel"]["topic_name"].as_str().unwrap_or_default();
        let mut channels = self.channels.lock().unwrap();
        let result = match request["method"].as_str() {
            Some("list") => json!({"conversations": channels
                .keys()
                .map(|topic| json!({"channel": {
                    "name": self.team,
                    "members_type": "team",
                    "topic_name": topic,
                }}))
                .collect::<Vec<_>>()}),
            Some("read") => {
                let num = options["pagination"]["num"].as_u64().unwrap_or(100) as usize;
                let skip: usize = options["pagination"]["next"]
                    .as_str()
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(0);
                let bodies = channels.get(topic).cloned().unwrap_or_default();
                let messages: Vec<Value> = bodies
                    .iter()
                    .enumerate()
                    .rev()
                    .skip(skip)
                    .take(num)
                    .map(|(id, body)| json!({"msg": {
                        "id": id + 1,
                        "content": {"type": "text", "text": {"body": body}},
                    }}))
                    .collect();
                let seen = skip + messages.len();
                json!({
                    "messages": messages,
                    "pagination": {"next": seen.to_string(), "last": seen >= bodies.len()},
                })
            },
            Some("send") => {
                let body = options["message"]["body"].as_str().unwrap_or_default();
                let bodies = channels.entry(topic.to_string()).or_default();
                bodies.push(body.to_string());
                json!({"message": "message sent", "id": bodies.len()})
            },
            other => return Ok(json!({"error": {"message": format!("unknown method {other:?}")}}).to_string()),
        };
        Ok(json!({ "result": result }).to_string())
    }
}

fn bridge(source: &Arc<FakeSource>, keybase: &Arc<InMemoryKeybase>) -> Bridge {
    Bridge::new(
        source.clone(),
        Arc::new(KeybaseGateway::new(Arc::clone(keybase))),
        BridgeSettings::default(),
    )
}

async fn sync(source: &Arc<FakeSource>, keybase: &Arc<InMemoryKeybase>) -> SyncReport {
    bridge(source, keybase)
        .sync_once(&CancellationToken::new())
        .await
        .unwrap()
}

#[tokio::test]
async fn relayed_history_reads_back_as_in_sync() {
    let source = Arc::new(FakeSource::default().with_history(GENERAL, vec![
        record("U1", 100, "first"),
        record("U2", 200, "second [with] brackets"),
    ]));
    let keybase = Arc::new(InMemoryKeybase::new("acme", &["general"]));

    let first = sync(&source, &keybase).await;
    let second = sync(&source, &keybase).await;

    assert_eq!(
        first.outcome("general"),
        Some(&ChannelOutcome::Backfilled { sent: 2, failed: 0 })
    );
    assert_eq!(second.outcome("general"), Some(&ChannelOutcome::InSync));
    let bodies = keybase.bodies("general");
    assert_eq!(bodies.len(), 2);
    assert!(bodies[0].ends_with("[Ann Lee] first"));
    assert!(bodies[1].ends_with("[Bob] second [with] brackets"));
}

#[tokio::test]
async fn human_messages_do_not_hide_relayed_history() {
    let source = Arc::new(FakeSource::default().with_history(GENERAL, vec![
        record("U1", 100, "first"),
        record("U1", 200, "second"),
    ]));
    let keybase = Arc::new(InMemoryKeybase::new("acme", &["general"]));
    sync(&source, &keybase).await;
    keybase.post("general", "typed straight into keybase");
    source.push(GENERAL, record("U2", 300, "third"));

    let report = sync(&source, &keybase).await;

    assert_eq!(
        report.outcome("general"),
        Some(&ChannelOutcome::Backfilled { sent: 1, failed: 0 })
    );
    assert_eq!(
        source.windows_for(GENERAL).last(),
        Some(&HistoryWindow::since(common::ts(200)))
    );
    let bodies = keybase.bodies("general");
    assert!(bodies.last().unwrap().ends_with("[Bob] third"));
}

#[tokio::test]
async fn gateway_decodes_what_it_encoded() {
    let keybase = Arc::new(InMemoryKeybase::new("acme", &["general"]));
    let gateway = KeybaseGateway::new(Arc::clone(&keybase));
    let msg = relayed("general", "Ann Lee", 100, "hello there");

    gateway.send_message("acme", &msg).await.unwrap();
    let read = gateway.read_history("acme", "general", 1, None).await.unwrap();

    assert_eq!(read, vec![msg]);
}
