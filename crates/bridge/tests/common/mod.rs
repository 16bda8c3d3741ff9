//! In-memory source and destination used by the bridge tests.
#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use {
    async_trait::async_trait,
    slackbase_channels::{
        DestinationChat, Error, HistoryWindow, Result, SourceChannel, SourceEvent, SourceRecord,
        SourceUser, SourceWorkspace,
    },
    slackbase_common::{Message, Timestamp},
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
};

pub const GENERAL: &str = "C_GENERAL";
pub const RANDOM: &str = "C_RANDOM";

pub fn ts(secs: i64) -> Timestamp {
    Timestamp::from_unix(secs, 250).unwrap()
}

/// Source record by `user` at `secs` (plus 250µs).
pub fn record(user: &str, secs: i64, text: &str) -> SourceRecord {
    SourceRecord {
        user_id: user.into(),
        timestamp_raw: ts(secs).to_epoch_fractional(),
        text: text.into(),
    }
}

/// Message as the relay renders `record(user, secs, text)`.
pub fn relayed(channel: &str, sender: &str, secs: i64, text: &str) -> Message {
    Message::new(ts(secs), channel, sender, text)
}

// ── Source ──────────────────────────────────────────────────────────────────

pub struct FakeSource {
    pub domain: String,
    pub channels: Vec<SourceChannel>,
    pub users: HashMap<String, String>,
    /// Channel id → records, oldest first.
    pub history: Mutex<HashMap<String, Vec<SourceRecord>>>,
    /// Every history request made, in order.
    pub windows: Mutex<Vec<(String, HistoryWindow)>>,
    pub user_lookups: AtomicUsize,
    pub channel_lookups: AtomicUsize,
    /// Events pushed by `connect`, which then returns.
    pub script: Mutex<Vec<SourceEvent>>,
    pub connect_result: Mutex<Option<Error>>,
}

impl Default for FakeSource {
    fn default() -> Self {
        Self {
            domain: "acme".into(),
            channels: vec![
                SourceChannel {
                    id: GENERAL.into(),
                    name: "general".into(),
                },
                SourceChannel {
                    id: RANDOM.into(),
                    name: "random".into(),
                },
            ],
            users: HashMap::from([
                ("U1".to_string(), "ann lee".to_string()),
                ("U2".to_string(), "bob".to_string()),
            ]),
            history: Mutex::default(),
            windows: Mutex::default(),
            user_lookups: AtomicUsize::new(0),
            channel_lookups: AtomicUsize::new(0),
            script: Mutex::default(),
            connect_result: Mutex::default(),
        }
    }
}

impl FakeSource {
    pub fn with_history(self, channel_id: &str, records: Vec<SourceRecord>) -> Self {
        self.history
            .lock()
            .unwrap()
            .insert(channel_id.to_string(), records);
        self
    }

    pub fn with_script(self, events: Vec<SourceEvent>) -> Self {
        *self.script.lock().unwrap() = events;
        self
    }

    pub fn push(&self, channel_id: &str, record: SourceRecord) {
        self.history
            .lock()
            .unwrap()
            .entry(channel_id.to_string())
            .or_default()
            .push(record);
    }

    pub fn windows_for(&self, channel_id: &str) -> Vec<HistoryWindow> {
        self.windows
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| id == channel_id)
            .map(|(_, w)| *w)
            .collect()
    }
}

#[async_trait]
impl SourceWorkspace for FakeSource {
    async fn connect(
        &self,
        events: mpsc::Sender<SourceEvent>,
        _cancel: CancellationToken,
    ) -> Result<()> {
        let script = std::mem::take(&mut *self.script.lock().unwrap());
        for event in script {
            if events.send(event).await.is_err() {
                break;
            }
        }
        match self.connect_result.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn workspace_domain(&self) -> Result<String> {
        Ok(self.domain.clone())
    }

    async fn list_channels(&self) -> Result<Vec<SourceChannel>> {
        Ok(self.channels.clone())
    }

    async fn channel_info(&self, channel_id: &str) -> Result<SourceChannel> {
        self.channel_lookups.fetch_add(1, Ordering::SeqCst);
        self.channels
            .iter()
            .find(|c| c.id == channel_id)
            .cloned()
            .ok_or_else(|| Error::channel_not_found(channel_id))
    }

    async fn user_info(&self, user_id: &str) -> Result<SourceUser> {
        self.user_lookups.fetch_add(1, Ordering::SeqCst);
        self.users
            .get(user_id)
            .map(|name| SourceUser {
                id: user_id.to_string(),
                name: name.clone(),
            })
            .ok_or_else(|| Error::user_not_found(user_id))
    }

    async fn channel_history(
        &self,
        channel_id: &str,
        window: &HistoryWindow,
    ) -> Result<Vec<SourceRecord>> {
        self.windows
            .lock()
            .unwrap()
            .push((channel_id.to_string(), *window));
        let history = self.history.lock().unwrap();
        let records = history.get(channel_id).cloned().unwrap_or_default();
        let mut newest_first: Vec<SourceRecord> = records
            .into_iter()
            .rev()
            .filter(|r| {
                Timestamp::parse(&r.timestamp_raw)
                    .map(|t| window.admits(t))
                    .unwrap_or(true)
            })
            .collect();
        if let Some(count) = window.count {
            newest_first.truncate(count);
        }
        Ok(newest_first)
    }
}

// ── Destination ─────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeDestination {
    /// Channel names the team exposes.
    pub available: Vec<String>,
    /// Channel → messages, oldest first.
    pub history: Mutex<HashMap<String, Vec<Message>>>,
    /// `(team, message)` for every successful send.
    pub sent: Mutex<Vec<(String, Message)>>,
    /// Channels passed to `read_history`.
    pub reads: Mutex<Vec<String>>,
    /// Sends of messages with this text fail.
    pub fail_text: Option<String>,
    pub fail_reads: bool,
    /// Each send takes this long.
    pub send_delay: Option<Duration>,
}

impl FakeDestination {
    pub fn with_channels(names: &[&str]) -> Self {
        Self {
            available: names.iter().map(|n| n.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_history(self, channel: &str, messages: Vec<Message>) -> Self {
        self.history
            .lock()
            .unwrap()
            .insert(channel.to_string(), messages);
        self
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn sent_teams(&self) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .map(|(t, _)| t.clone())
            .collect()
    }

    pub fn reads(&self) -> Vec<String> {
        self.reads.lock().unwrap().clone()
    }
}

#[async_trait]
impl DestinationChat for FakeDestination {
    async fn list_channels(&self, _team: &str) -> Result<Vec<String>> {
        Ok(self.available.clone())
    }

    async fn read_history(
        &self,
        _team: &str,
        channel: &str,
        count: usize,
        _cursor: Option<&str>,
    ) -> Result<Vec<Message>> {
        self.reads.lock().unwrap().push(channel.to_string());
        if self.fail_reads {
            return Err(Error::gateway(
                "read",
                std::io::Error::other("keybase not running"),
            ));
        }
        let history = self.history.lock().unwrap();
        Ok(history
            .get(channel)
            .map(|msgs| msgs.iter().rev().take(count).cloned().collect())
            .unwrap_or_default())
    }

    async fn send_message(&self, team: &str, msg: &Message) -> Result<String> {
        if let Some(delay) = self.send_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_text.as_deref() == Some(msg.text()) {
            return Err(Error::gateway("send", std::io::Error::other("send refused")));
        }
        self.history
            .lock()
            .unwrap()
            .entry(msg.channel().to_string())
            .or_default()
            .push(msg.clone());
        self.sent
            .lock()
            .unwrap()
            .push((team.to_string(), msg.clone()));
        Ok("message sent".into())
    }
}
