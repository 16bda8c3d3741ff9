use std::error::Error as StdError;

/// Crate-wide result type for collaborator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed errors shared across the source and destination traits.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A channel or user could not be resolved.
    #[error("{kind} not found: {id}")]
    DirectoryLookup { kind: &'static str, id: String },

    /// The source rejected our credentials.
    #[error("authentication failed: {message}")]
    Auth { message: String },

    /// The destination CLI failed or returned something unparsable.
    #[error("gateway {operation} failed: {source}")]
    Gateway {
        operation: &'static str,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Wrapped source error from an external dependency.
    #[error("channel operation failed: {context}: {source}")]
    External {
        context: String,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error(transparent)]
    Timestamp(#[from] slackbase_common::Error),
}

impl Error {
    #[must_use]
    pub fn channel_not_found(id: impl std::fmt::Display) -> Self {
        Self::DirectoryLookup {
            kind: "channel",
            id: id.to_string(),
        }
    }

    #[must_use]
    pub fn user_not_found(id: impl std::fmt::Display) -> Self {
        Self::DirectoryLookup {
            kind: "user",
            id: id.to_string(),
        }
    }

    #[must_use]
    pub fn auth(message: impl std::fmt::Display) -> Self {
        Self::Auth {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn gateway(
        operation: &'static str,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::Gateway {
            operation,
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn external(
        context: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self::External {
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Whether retrying cannot help until credentials change.
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case(Error::channel_not_found("C1"), "channel not found: C1", false)]
    #[case(Error::user_not_found("U1"), "user not found: U1", false)]
    #[case(Error::auth("invalid_auth"), "authentication failed: invalid_auth", true)]
    #[case(
        Error::gateway("send", std::io::Error::other("exit status 1")),
        "gateway send failed: exit status 1",
        false
    )]
    #[case(
        Error::external("slack", std::io::Error::other("ratelimited")),
        "channel operation failed: slack: ratelimited",
        false
    )]
    fn constructors_render_and_classify(
        #[case] err: Error,
        #[case] rendered: &str,
        #[case] auth: bool,
    ) {
        assert_eq!(err.to_string(), rendered);
        assert_eq!(err.is_auth(), auth);
    }

    #[test]
    fn timestamp_errors_pass_through() {
        let err = Error::from(slackbase_common::Error::invalid_timestamp("soon"));
        assert_eq!(err.to_string(), "invalid timestamp: \"soon\"");
        assert!(!err.is_auth());
    }
}
