use std::sync::Arc;

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    slack_morphism::prelude::*,
    slackbase_channels::{
        Error as ChannelError, HistoryWindow, Result as ChannelResult, SourceChannel,
        SourceEvent, SourceRecord, SourceUser, SourceWorkspace,
    },
    slackbase_config::SlackConfig,
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::debug,
};

use crate::{
    error::{Error, Result},
    socket::run_socket_mode,
};

/// Largest page requested from paginated methods.
const PAGE_LIMIT: u16 = 200;

fn api_token(secret: &Secret<String>) -> SlackApiToken {
    SlackApiToken::new(SlackApiTokenValue::new(secret.expose_secret().to_string()))
}

/// A Slack workspace reached through the Web API and Socket Mode.
///
/// Directory lookups use the bot token, history reads use the history token
/// (a user token when configured), Socket Mode uses the app token.
pub struct SlackWorkspace {
    client: Arc<SlackHyperClient>,
    bot_token: SlackApiToken,
    app_token: SlackApiToken,
    history_token: SlackApiToken,
}

impl std::fmt::Debug for SlackWorkspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackWorkspace").finish_non_exhaustive()
    }
}

impl SlackWorkspace {
    pub fn from_config(config: &SlackConfig) -> Result<Self> {
        let connector =
            SlackClientHyperConnector::new().map_err(|e| Error::Connector(e.to_string()))?;
        Ok(Self {
            client: Arc::new(SlackClient::new(connector)),
            bot_token: api_token(&config.bot_token),
            app_token: api_token(&config.app_token),
            history_token: api_token(config.history_token()),
        })
    }

    pub(crate) fn client(&self) -> Arc<SlackHyperClient> {
        Arc::clone(&self.client)
    }

    pub(crate) fn app_token(&self) -> &SlackApiToken {
        &self.app_token
    }

    /// Workspace subdomain, e.g. `acme`. Also verifies the bot token.
    pub async fn domain(&self) -> Result<String> {
        let session = self.client.open_session(&self.bot_token);
        let identity = session.auth_test().await?;
        debug!(bot_user = ?identity.user, user_id = %identity.user_id, "slack bot authenticated");
        let team = session
            .team_info(&SlackApiTeamInfoRequest::new())
            .await?
            .team;
        Ok(pick_domain(team.domain, team.name, team.id.to_string()))
    }

    /// All non-archived public channels.
    pub async fn channels(&self) -> Result<Vec<SourceChannel>> {
        let session = self.client.open_session(&self.bot_token);
        let mut channels = Vec::new();
        let mut cursor: Option<SlackCursorId> = None;
        loop {
            let request = SlackApiConversationsListRequest::new()
                .with_exclude_archived(true)
                .with_types(vec![SlackConversationType::Public])
                .with_limit(PAGE_LIMIT)
                .opt_cursor(cursor.take());
            let page = session.conversations_list(&request).await?;
            channels.extend(page.channels.into_iter().filter_map(to_channel));
            match next_cursor(page.response_metadata) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }
        Ok(channels)
    }

    pub async fn channel(&self, channel_id: &str) -> Result<Option<SourceChannel>> {
        let session = self.client.open_session(&self.bot_token);
        let request = SlackApiConversationsInfoRequest::new(SlackChannelId::new(channel_id.into()));
        Ok(to_channel(session.conversations_info(&request).await?.channel))
    }

    pub async fn user(&self, user_id: &str) -> Result<SourceUser> {
        let session = self.client.open_session(&self.bot_token);
        let request = SlackApiUsersInfoRequest::new(SlackUserId::new(user_id.into()));
        let user = session.users_info(&request).await?.user;
        Ok(SourceUser {
            id: user.id.to_string(),
            name: user.name.unwrap_or_default(),
        })
    }

    /// Relayable messages of a channel, newest first.
    ///
    /// Without a count every page back to the window's lower bound is read.
    pub async fn history(&self, channel_id: &str, window: &HistoryWindow) -> Result<Vec<SourceRecord>> {
        let session = self.client.open_session(&self.history_token);
        let oldest = window
            .oldest
            .map(|t| SlackTs::new(t.to_epoch_fractional()));
        let mut records = Vec::new();
        let mut cursor: Option<SlackCursorId> = None;
        loop {
            let remaining = window
                .count
                .map_or(usize::from(PAGE_LIMIT), |c| c.saturating_sub(records.len()));
            if remaining == 0 {
                break;
            }
            let limit = u16::try_from(remaining).unwrap_or(PAGE_LIMIT).min(PAGE_LIMIT);
            let request = SlackApiConversationsHistoryRequest::new()
                .with_channel(SlackChannelId::new(channel_id.into()))
                .with_limit(limit)
                .opt_oldest(oldest.clone())
                .opt_cursor(cursor.take());
            let page = session.conversations_history(&request).await?;
            records.extend(
                page.messages
                    .into_iter()
                    .filter_map(to_record)
                    .take(remaining),
            );
            match next_cursor(page.response_metadata) {
                Some(next) if page.has_more.unwrap_or(false) => cursor = Some(next),
                _ => break,
            }
        }
        debug!(channel_id, count = records.len(), "read slack history");
        Ok(records)
    }
}

/// Team subdomain, falling back to the lowercased team name, then the id.
fn pick_domain(domain: Option<String>, name: Option<String>, id: String) -> String {
    domain
        .filter(|d| !d.is_empty())
        .or_else(|| name.map(|n| n.to_lowercase()).filter(|n| !n.is_empty()))
        .unwrap_or(id)
}

fn next_cursor(metadata: Option<SlackResponseMetadata>) -> Option<SlackCursorId> {
    metadata
        .and_then(|m| m.next_cursor)
        .filter(|c| !c.0.is_empty())
}

fn to_channel(info: SlackChannelInfo) -> Option<SourceChannel> {
    Some(SourceChannel {
        id: info.id.to_string(),
        name: info.name?,
    })
}

/// History entry as a record, or `None` for bot posts, subtyped messages
/// and entries without an author.
fn to_record(msg: SlackHistoryMessage) -> Option<SourceRecord> {
    if msg.sender.bot_id.is_some() || msg.subtype.is_some() {
        return None;
    }
    Some(SourceRecord {
        user_id: msg.sender.user?.to_string(),
        timestamp_raw: msg.origin.ts.to_string(),
        text: msg.content.text.unwrap_or_default(),
    })
}

/// Map "not found" codes onto directory lookup errors.
fn lookup_error(err: Error, kind: &'static str, id: &str) -> ChannelError {
    match err.api_code() {
        Some("channel_not_found" | "user_not_found") => ChannelError::DirectoryLookup {
            kind,
            id: id.to_owned(),
        },
        _ => err.into(),
    }
}

#[async_trait]
impl SourceWorkspace for SlackWorkspace {
    async fn connect(
        &self,
        events: mpsc::Sender<SourceEvent>,
        cancel: CancellationToken,
    ) -> ChannelResult<()> {
        Ok(run_socket_mode(self, events, cancel).await?)
    }

    async fn workspace_domain(&self) -> ChannelResult<String> {
        Ok(self.domain().await?)
    }

    async fn list_channels(&self) -> ChannelResult<Vec<SourceChannel>> {
        Ok(self.channels().await?)
    }

    async fn channel_info(&self, channel_id: &str) -> ChannelResult<SourceChannel> {
        self.channel(channel_id)
            .await
            .map_err(|e| lookup_error(e, "channel", channel_id))?
            .ok_or_else(|| ChannelError::channel_not_found(channel_id))
    }

    async fn user_info(&self, user_id: &str) -> ChannelResult<SourceUser> {
        self.user(user_id)
            .await
            .map_err(|e| lookup_error(e, "user", user_id))
    }

    async fn channel_history(
        &self,
        channel_id: &str,
        window: &HistoryWindow,
    ) -> ChannelResult<Vec<SourceRecord>> {
        self.history(channel_id, window)
            .await
            .map_err(|e| lookup_error(e, "channel", channel_id))
    }
}
