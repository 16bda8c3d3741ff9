use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    /// The CLI exited non-zero. Output is kept for diagnostics.
    #[error("keybase exited with {}: {}", exit_label(.code), .stderr.trim())]
    Exit {
        code: Option<i32>,
        stdout: String,
        stderr: String,
    },

    #[error("keybase call timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("invalid keybase response: {0}")]
    Json(#[from] serde_json::Error),

    /// Keybase answered with an `error` object instead of a result.
    #[error("keybase api error: {message}")]
    Api { message: String },

    #[error("{0}")]
    Message(String),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

impl slackbase_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

slackbase_common::impl_context!();
