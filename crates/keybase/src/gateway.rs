use std::time::Duration;

use {
    async_trait::async_trait,
    slackbase_channels::{DestinationChat, Error as ChannelError, Result as ChannelResult},
    slackbase_common::Message,
    tracing::{debug, warn},
};

use crate::{
    api::{MessageEntry, Request, ResultBody, parse_response},
    metadata,
    process::{ApiRunner, CliRunner},
};

/// Smallest page requested from `chat api read`, so a few native messages
/// in front of the newest relayed one do not cost a round trip each.
const MIN_PAGE: usize = 20;

/// Keybase team chat as the relay destination.
pub struct KeybaseGateway<R = CliRunner> {
    runner: R,
}

impl KeybaseGateway<CliRunner> {
    /// Gateway driving the real `keybase` binary.
    pub fn cli(binary: impl Into<String>, timeout: Duration) -> Self {
        Self::new(CliRunner::new(binary, timeout))
    }
}

impl<R: ApiRunner> KeybaseGateway<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    async fn call(&self, operation: &'static str, request: &Request<'_>) -> ChannelResult<ResultBody> {
        let json = request
            .to_json()
            .map_err(|e| ChannelError::gateway(operation, e))?;
        let raw = self
            .runner
            .run(&json)
            .await
            .map_err(|e| ChannelError::gateway(operation, e))?;
        parse_response(&raw).map_err(|e| ChannelError::gateway(operation, e))
    }
}

/// Decode one read entry, skipping non-text content and foreign bodies.
fn decode_entry(entry: &MessageEntry, channel: &str) -> Option<Message> {
    let Some(msg) = &entry.msg else {
        debug!(channel, error = ?entry.error, "skipping unreadable keybase message");
        return None;
    };
    let body = msg.content.text_body()?;
    let decoded = metadata::decode(body, channel);
    if decoded.is_none() {
        debug!(channel, id = msg.id, "skipping message without relay metadata");
    }
    decoded
}

#[async_trait]
impl<R: ApiRunner> DestinationChat for KeybaseGateway<R> {
    async fn list_channels(&self, team: &str) -> ChannelResult<Vec<String>> {
        let result = self.call("list", &Request::list()).await?;
        let channels: Vec<String> = result
            .conversations
            .into_iter()
            .filter(|c| c.channel.name == team && !c.channel.topic_name.is_empty())
            .map(|c| c.channel.topic_name)
            .collect();
        debug!(team, count = channels.len(), "listed keybase channels");
        Ok(channels)
    }

    async fn read_history(
        &self,
        team: &str,
        channel: &str,
        count: usize,
        cursor: Option<&str>,
    ) -> ChannelResult<Vec<Message>> {
        let mut messages = Vec::with_capacity(count);
        let mut next = cursor.map(str::to_owned);

        while messages.len() < count {
            let wanted = count - messages.len();
            let request = Request::read(team, channel, wanted.max(MIN_PAGE), next.as_deref());
            let page = self.call("read", &request).await?;
            if page.messages.is_empty() {
                break;
            }
            messages.extend(
                page.messages
                    .iter()
                    .filter_map(|entry| decode_entry(entry, channel))
                    .take(wanted),
            );
            match page.pagination.as_ref().and_then(|p| p.next_cursor()) {
                Some(cursor) => next = Some(cursor.to_owned()),
                None => break,
            }
        }
        Ok(messages)
    }

    async fn send_message(&self, team: &str, msg: &Message) -> ChannelResult<String> {
        let body = metadata::encode(msg);
        let result = self
            .call("send", &Request::send(team, msg.channel(), &body))
            .await?;
        let ack = match (result.message, result.id) {
            (Some(message), _) => message,
            (None, Some(id)) => id.to_string(),
            (None, None) => {
                warn!(team, channel = msg.channel(), "keybase send returned no acknowledgement");
                String::new()
            },
        };
        Ok(ack)
    }
}
