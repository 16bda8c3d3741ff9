use std::fmt;

use crate::time::Timestamp;

/// One relayed chat message.
///
/// Equality is structural over all four fields. `Message::default()` is the
/// sentinel for "no last message known" and never stands for a real message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Message {
    time: Timestamp,
    channel: String,
    sender: String,
    text: String,
}

impl Message {
    pub fn new(
        time: Timestamp,
        channel: impl Into<String>,
        sender: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            time,
            channel: channel.into(),
            sender: sender.into(),
            text: text.into(),
        }
    }

    pub fn time(&self) -> Timestamp {
        self.time
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether this is the zero value standing in for "no message".
    pub fn is_sentinel(&self) -> bool {
        self.time.is_zero()
            && self.channel.is_empty()
            && self.sender.is_empty()
            && self.text.is_empty()
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} [{}] [{}] {}",
            self.channel, self.time, self.sender, self.text
        )
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Message {
        Message::new(
            Timestamp::from_unix(1_563_305_596, 4_500).unwrap(),
            "general",
            "Alice",
            "hello",
        )
    }

    #[test]
    fn default_is_sentinel() {
        assert!(Message::default().is_sentinel());
        assert!(!sample().is_sentinel());
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(sample(), sample());
        let other_channel = Message::new(sample().time(), "random", "Alice", "hello");
        assert_ne!(sample(), other_channel);
        let other_text = Message::new(sample().time(), "general", "Alice", "bye");
        assert_ne!(sample(), other_text);
    }

    #[test]
    fn empty_text_from_real_sender_is_not_sentinel() {
        let msg = Message::new(Timestamp::default(), "", "Bob", "");
        assert!(!msg.is_sentinel());
    }

    #[test]
    fn display_includes_channel_and_sender() {
        let shown = sample().to_string();
        assert!(shown.starts_with("#general ["), "{shown}");
        assert!(shown.ends_with("[Alice] hello"), "{shown}");
    }
}
