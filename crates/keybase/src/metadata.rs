//! Sender and send time embedded into plain text bodies.
//!
//! Wire format: `"[<local time>] [<sender>] <text>"`. The time token is the
//! local-time rendering of [`Timestamp`]; decoding also accepts the epoch form.
//!
//! There is no escaping rule. Decoding splits the body on the literal
//! `[<sender>]` marker, so a text that repeats that marker is cut short at
//! the repetition.

use std::sync::LazyLock;

use {
    regex::Regex,
    slackbase_common::{Message, Timestamp},
    tracing::debug,
};

#[allow(clippy::unwrap_used)]
static TOKEN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\[\]]*)\]").unwrap());

/// Render `msg` as a destination body.
pub fn encode(msg: &Message) -> String {
    format!(
        "[{}] [{}] {}",
        msg.time().to_local(),
        msg.sender(),
        msg.text()
    )
}

/// Recover the message embedded in `body`, attributing it to `channel`.
///
/// Returns `None` for bodies without two bracketed tokens or whose first
/// token is not a timestamp. Such messages were not written by the relay.
pub fn decode(body: &str, channel: &str) -> Option<Message> {
    let mut tokens = TOKEN
        .captures_iter(body)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()));
    let time = tokens.next()?;
    let sender = tokens.next()?;

    let time = match Timestamp::parse(time) {
        Ok(time) => time,
        Err(e) => {
            debug!(channel, error = %e, "body carries no relay metadata");
            return None;
        },
    };

    let marker = format!("[{sender}]");
    let text = body.split(marker.as_str()).nth(1)?.trim();
    Some(Message::new(time, channel, sender, text))
}
