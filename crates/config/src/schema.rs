/// Config schema types (slack, keybase, sync, display).
use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Default number of messages replayed into a channel with no history.
pub const DEFAULT_INITIAL_COUNT: usize = 10;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackbaseConfig {
    pub slack: SlackConfig,
    pub keybase: KeybaseConfig,
    pub sync: SyncConfig,
    pub display: DisplayConfig,
}

/// Slack workspace credentials.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    /// Bot token (`xoxb-...`) used for directory lookups and the event stream.
    #[serde(serialize_with = "serialize_secret")]
    pub bot_token: Secret<String>,

    /// App-level token (`xapp-...`) that opens Socket Mode connections.
    #[serde(serialize_with = "serialize_secret")]
    pub app_token: Secret<String>,

    /// User token for history reads. Falls back to the bot token.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_option_secret"
    )]
    pub user_token: Option<Secret<String>>,
}

impl SlackConfig {
    /// Token used for `conversations.history`.
    pub fn history_token(&self) -> &Secret<String> {
        self.user_token.as_ref().unwrap_or(&self.bot_token)
    }
}

impl std::fmt::Debug for SlackConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackConfig")
            .field("bot_token", &"[REDACTED]")
            .field("app_token", &"[REDACTED]")
            .field("user_token", &self.user_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            bot_token: Secret::new(String::new()),
            app_token: Secret::new(String::new()),
            user_token: None,
        }
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

/// Keybase chat CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeybaseConfig {
    /// Path or name of the `keybase` binary.
    pub binary: String,
    /// Team receiving the messages. Defaults to the Slack workspace domain.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    /// Seconds before a single CLI call is killed.
    pub timeout_secs: u64,
}

impl Default for KeybaseConfig {
    fn default() -> Self {
        Self {
            binary: "keybase".into(),
            team: None,
            timeout_secs: 30,
        }
    }
}

/// History reconciliation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Reconcile history when the source connects.
    pub enabled: bool,
    /// Messages replayed into a channel whose destination history is empty.
    pub initial_count: usize,
    /// Channel names (or `*` globs) to reconcile. Empty means all.
    pub channels: Vec<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_count: DEFAULT_INITIAL_COUNT,
            channels: Vec::new(),
        }
    }
}

/// Rendering of the timestamps embedded into relayed messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// IANA zone name, e.g. "Europe/Berlin".
    pub timezone: String,
}

impl DisplayConfig {
    /// Parsed display zone, `None` when the name is unknown.
    pub fn tz(&self) -> Option<chrono_tz::Tz> {
        self.timezone.parse().ok()
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            timezone: "UTC".into(),
        }
    }
}
