use {
    slackbase_channels::{
        ChannelDirectory, DestinationChat, MessageEvent, Result, SourceWorkspace, UserNameCache,
    },
    slackbase_common::{Message, Timestamp},
    tracing::info,
};

/// Sends live source messages straight to the destination.
///
/// Relies on the source delivering events in chronological order.
pub struct RelayForwarder<'a> {
    source: &'a dyn SourceWorkspace,
    destination: &'a dyn DestinationChat,
    users: &'a UserNameCache,
}

impl<'a> RelayForwarder<'a> {
    pub fn new(
        source: &'a dyn SourceWorkspace,
        destination: &'a dyn DestinationChat,
        users: &'a UserNameCache,
    ) -> Self {
        Self {
            source,
            destination,
            users,
        }
    }

    /// Build the message for `event`. The channel name comes from
    /// `directory` when known, otherwise from the source.
    pub async fn message_for(
        &self,
        event: &MessageEvent,
        directory: &ChannelDirectory,
    ) -> Result<Message> {
        let time = Timestamp::parse(&event.timestamp_raw)?;
        let sender = self.users.resolve(self.source, &event.user_id).await?;
        let channel = match directory.name_of(&event.channel_id) {
            Some(name) => name.to_string(),
            None => self.source.channel_info(&event.channel_id).await?.name,
        };
        Ok(Message::new(time, channel, sender, event.text.clone()))
    }

    /// Relay one event and return the destination's acknowledgement.
    pub async fn forward(
        &self,
        team: &str,
        event: &MessageEvent,
        directory: &ChannelDirectory,
    ) -> Result<String> {
        let msg = self.message_for(event, directory).await?;
        let ack = self.destination.send_message(team, &msg).await?;
        info!(
            channel = msg.channel(),
            time = %msg.time(),
            sender = msg.sender(),
            text = msg.text(),
            "relayed message"
        );
        Ok(ack)
    }
}
