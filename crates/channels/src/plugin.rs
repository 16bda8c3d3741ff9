use {
    async_trait::async_trait, slackbase_common::Message, tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
};

use crate::{Result, history::HistoryWindow};

// ── Source events ───────────────────────────────────────────────────────────

/// A new message observed on the live event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub user_id: String,
    /// Source timestamp exactly as delivered (fractional epoch seconds).
    pub timestamp_raw: String,
    pub text: String,
}

/// Events emitted by the source's connection loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceEvent {
    /// The connection is up. Carries the workspace domain.
    Connected { workspace: String },
    /// The server greeted us after a (re)connect.
    Hello,
    Message(MessageEvent),
    /// A recoverable connection problem.
    Error { description: String },
    /// Credentials were rejected; the stream ends after this event.
    AuthError { description: String },
}

// ── Directory records ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceChannel {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUser {
    pub id: String,
    pub name: String,
}

/// One history entry as the source stores it, before name resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRecord {
    pub user_id: String,
    pub timestamp_raw: String,
    pub text: String,
}

// ── Traits ──────────────────────────────────────────────────────────────────

/// The messaging workspace messages originate from.
///
/// History is read-only here; live messages arrive through [`connect`].
///
/// [`connect`]: SourceWorkspace::connect
#[async_trait]
pub trait SourceWorkspace: Send + Sync {
    /// Run the event stream, pushing events into `events` until `cancel`
    /// fires or authentication fails.
    async fn connect(
        &self,
        events: mpsc::Sender<SourceEvent>,
        cancel: CancellationToken,
    ) -> Result<()>;

    /// Domain of the workspace the credentials belong to.
    async fn workspace_domain(&self) -> Result<String>;

    async fn list_channels(&self) -> Result<Vec<SourceChannel>>;

    async fn channel_info(&self, channel_id: &str) -> Result<SourceChannel>;

    async fn user_info(&self, user_id: &str) -> Result<SourceUser>;

    /// Channel history matching `window`, newest first.
    async fn channel_history(
        &self,
        channel_id: &str,
        window: &HistoryWindow,
    ) -> Result<Vec<SourceRecord>>;
}

/// The chat backend relayed messages are written to.
#[async_trait]
pub trait DestinationChat: Send + Sync {
    /// Channel (topic) names the team exposes.
    async fn list_channels(&self, team: &str) -> Result<Vec<String>>;

    /// Up to `count` decodable messages, newest first, optionally continuing
    /// from a pagination cursor.
    async fn read_history(
        &self,
        team: &str,
        channel: &str,
        count: usize,
        cursor: Option<&str>,
    ) -> Result<Vec<Message>>;

    /// Send one message and return the server acknowledgement.
    async fn send_message(&self, team: &str, msg: &Message) -> Result<String>;
}
