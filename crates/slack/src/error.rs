use {slack_morphism::errors::SlackClientError, thiserror::Error};

/// Slack `error` codes that mean the token itself is unusable.
const AUTH_ERRORS: &[&str] = &[
    "invalid_auth",
    "not_authed",
    "account_inactive",
    "token_revoked",
    "token_expired",
];

/// Whether a Web API `error` code means the credentials were rejected.
pub fn is_auth_code(code: &str) -> bool {
    AUTH_ERRORS.contains(&code)
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("slack request failed: {0}")]
    Client(#[from] SlackClientError),

    /// The HTTPS connector could not be built.
    #[error("slack client setup failed: {0}")]
    Connector(String),
}

impl Error {
    /// The Web API `error` code, when Slack answered `ok: false`.
    pub fn api_code(&self) -> Option<&str> {
        match self {
            Self::Client(SlackClientError::ApiError(e)) => Some(e.code.as_str()),
            _ => None,
        }
    }

    /// Whether the credentials were rejected.
    pub fn is_auth(&self) -> bool {
        self.api_code().is_some_and(is_auth_code)
    }
}

impl From<Error> for slackbase_channels::Error {
    fn from(err: Error) -> Self {
        if err.is_auth() {
            Self::auth(err)
        } else {
            Self::external("slack", err)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest, slack_morphism::errors::SlackClientApiError};

    fn api_error(code: &str) -> Error {
        Error::Client(SlackClientError::ApiError(SlackClientApiError::new(
            code.into(),
        )))
    }

    #[rstest]
    #[case("invalid_auth", true)]
    #[case("not_authed", true)]
    #[case("token_revoked", true)]
    #[case("channel_not_found", false)]
    #[case("ratelimited", false)]
    fn classifies_auth_codes(#[case] code: &str, #[case] auth: bool) {
        assert_eq!(is_auth_code(code), auth);
        let err = api_error(code);
        assert_eq!(err.api_code(), Some(code));
        assert_eq!(err.is_auth(), auth);
        let converted = slackbase_channels::Error::from(err);
        assert_eq!(converted.is_auth(), auth);
    }

    #[test]
    fn connector_failure_has_no_code() {
        let err = Error::Connector("no native roots".into());
        assert_eq!(err.api_code(), None);
        assert!(!err.is_auth());
    }
}
