//! Wire types for `keybase chat api`.
//!
//! Only the fields the gateway consumes are modelled; everything else in the
//! responses is ignored.

use serde::{Deserialize, Serialize};

use crate::error::{Context, Error, Result};

// ── Requests ────────────────────────────────────────────────────────────────

/// One JSON command passed to `keybase chat api -m`.
#[derive(Debug, Serialize)]
pub struct Request<'a> {
    pub method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Params<'a>>,
}

#[derive(Debug, Serialize)]
pub struct Params<'a> {
    pub options: Options<'a>,
}

#[derive(Debug, Default, Serialize)]
pub struct Options<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<ChannelSpec<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageRequest<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<MessageBody<'a>>,
}

/// Addresses one topic of a team conversation.
#[derive(Debug, Serialize)]
pub struct ChannelSpec<'a> {
    pub name: &'a str,
    pub members_type: &'static str,
    pub topic_name: &'a str,
    pub topic_type: &'static str,
}

impl<'a> ChannelSpec<'a> {
    pub fn team_topic(team: &'a str, topic: &'a str) -> Self {
        Self {
            name: team,
            members_type: "team",
            topic_name: topic,
            topic_type: "chat",
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PageRequest<'a> {
    pub num: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct MessageBody<'a> {
    pub body: &'a str,
}

impl<'a> Request<'a> {
    /// Inbox listing.
    pub fn list() -> Self {
        Self {
            method: "list",
            params: None,
        }
    }

    /// Read up to `num` messages from a topic, newest first.
    pub fn read(team: &'a str, topic: &'a str, num: usize, next: Option<&'a str>) -> Self {
        Self::with_options("read", Options {
            channel: Some(ChannelSpec::team_topic(team, topic)),
            pagination: Some(PageRequest { num, next }),
            ..Default::default()
        })
    }

    /// Post `body` to a topic.
    pub fn send(team: &'a str, topic: &'a str, body: &'a str) -> Self {
        Self::with_options("send", Options {
            channel: Some(ChannelSpec::team_topic(team, topic)),
            message: Some(MessageBody { body }),
            ..Default::default()
        })
    }

    fn with_options(method: &'static str, options: Options<'a>) -> Self {
        Self {
            method,
            params: Some(Params { options }),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ── Responses ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    result: Option<ResultBody>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

/// The `result` object shared by list, read and send responses.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResultBody {
    /// Send acknowledgement, e.g. `"message sent"`.
    pub message: Option<String>,
    pub id: Option<u64>,
    pub messages: Vec<MessageEntry>,
    pub conversations: Vec<Conversation>,
    pub pagination: Option<Pagination>,
}

/// One read result. Keybase reports undecryptable entries as `error`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MessageEntry {
    pub msg: Option<MessageSummary>,
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MessageSummary {
    pub id: u64,
    pub content: Content,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Content {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: Option<TextContent>,
}

impl Content {
    /// Body of a plain text message, `None` for every other content type.
    pub fn text_body(&self) -> Option<&str> {
        if self.kind != "text" {
            return None;
        }
        self.text.as_ref().map(|t| t.body.as_str())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct TextContent {
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Conversation {
    pub channel: ConversationChannel,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConversationChannel {
    /// Team name for team conversations.
    pub name: String,
    pub members_type: String,
    pub topic_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Pagination {
    pub next: Option<String>,
    pub last: bool,
}

impl Pagination {
    /// Cursor for the following page, `None` once the history is exhausted.
    pub fn next_cursor(&self) -> Option<&str> {
        if self.last {
            return None;
        }
        self.next.as_deref().filter(|n| !n.is_empty())
    }
}

/// Parse CLI output, turning an API-level `error` object into [`Error::Api`].
pub fn parse_response(raw: &str) -> Result<ResultBody> {
    let response: Response = serde_json::from_str(raw)?;
    if let Some(error) = response.error {
        return Err(Error::Api {
            message: error.message,
        });
    }
    response.result.context("keybase response has no result")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, serde_json::json};

    #[test]
    fn read_request_shape() {
        let json = Request::read("acme", "general", 10, Some("abc"))
            .to_json()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            value,
            json!({
                "method": "read",
                "params": {"options": {
                    "channel": {
                        "name": "acme",
                        "members_type": "team",
                        "topic_name": "general",
                        "topic_type": "chat"
                    },
                    "pagination": {"num": 10, "next": "abc"}
                }}
            })
        );
    }

    #[test]
    fn send_request_escapes_body() {
        let body = "[t] [Ann] say \"hi\"\nbye";
        let json = Request::send("acme", "general", body).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["method"], "send");
        assert_eq!(value["params"]["options"]["message"]["body"], body);
        assert!(value["params"]["options"].get("pagination").is_none());
    }

    #[test]
    fn list_request_has_no_params() {
        assert_eq!(Request::list().to_json().unwrap(), r#"{"method":"list"}"#);
    }

    #[test]
    fn parses_read_response() {
        let raw = json!({"result": {
            "messages": [
                {"msg": {"id": 7, "content": {"type": "text", "text": {"body": "hello"}}}},
                {"msg": {"id": 6, "content": {"type": "join"}}},
                {"error": "unable to decrypt"}
            ],
            "pagination": {"next": "c2", "num": 3, "last": false}
        }})
        .to_string();
        let result = parse_response(&raw).unwrap();
        assert_eq!(result.messages.len(), 3);
        let first = result.messages[0].msg.as_ref().unwrap();
        assert_eq!(first.content.text_body(), Some("hello"));
        assert_eq!(result.messages[1].msg.as_ref().unwrap().content.text_body(), None);
        assert!(result.messages[2].msg.is_none());
        assert_eq!(result.pagination.unwrap().next_cursor(), Some("c2"));
    }

    #[test]
    fn last_page_has_no_cursor() {
        let page = Pagination {
            next: Some("c3".into()),
            last: true,
        };
        assert_eq!(page.next_cursor(), None);
        assert_eq!(Pagination::default().next_cursor(), None);
    }

    #[test]
    fn api_error_object_is_error() {
        let err = parse_response(r#"{"error": {"code": 0, "message": "no such team"}}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Api { ref message } if message == "no such team"));
    }

    #[test]
    fn malformed_json_is_error() {
        assert!(matches!(parse_response("not json"), Err(Error::Json(_))));
        assert!(matches!(parse_response("{}"), Err(Error::Message(_))));
    }
}
