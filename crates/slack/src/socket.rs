//! Socket Mode connection handler for Slack.
//!
//! Uses slack-morphism's socket mode listener to receive events via WebSocket
//! without requiring a public HTTP endpoint. The listener re-opens dropped
//! sockets itself; failures while setting it up are retried here with
//! exponential backoff, and rejected credentials end the stream.

use std::{sync::Arc, time::Duration};

use {
    slack_morphism::prelude::*,
    slackbase_channels::{MessageEvent, SourceEvent},
    tokio::sync::mpsc,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::{error::Result, workspace::SlackWorkspace};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
/// Maximum reconnect backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Delay between attempts to bring the listener up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Backoff {
    next: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            next: INITIAL_BACKOFF,
        }
    }
}

impl Backoff {
    /// Delay before the next attempt. Doubles for the one after, up to
    /// [`MAX_BACKOFF`].
    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = (self.next * 2).min(MAX_BACKOFF);
        delay
    }

    /// Start over after a session came up.
    pub(crate) fn reset(&mut self) {
        self.next = INITIAL_BACKOFF;
    }
}

/// Shared state for socket mode callbacks.
#[derive(Clone)]
struct SocketModeState {
    events: mpsc::Sender<SourceEvent>,
}

/// Run Socket Mode until `cancel` fires, the receiver is dropped, or the
/// credentials are rejected.
pub async fn run_socket_mode(
    workspace: &SlackWorkspace,
    events: mpsc::Sender<SourceEvent>,
    cancel: CancellationToken,
) -> Result<()> {
    let mut backoff = Backoff::default();

    loop {
        match run_listener(workspace, &events, &cancel, &mut backoff).await {
            Ok(()) => {
                info!("slack socket mode stopped");
                return Ok(());
            },
            Err(e) if e.is_auth() => {
                error!(error = %e, "slack rejected credentials");
                let _ = events
                    .send(SourceEvent::AuthError {
                        description: e.to_string(),
                    })
                    .await;
                return Err(e);
            },
            Err(e) => {
                warn!(error = %e, "slack socket mode error");
                if events
                    .send(SourceEvent::Error {
                        description: e.to_string(),
                    })
                    .await
                    .is_err()
                {
                    return Ok(());
                }
            },
        }

        let delay = backoff.next_delay();
        info!(delay_ms = delay.as_millis(), "reconnecting to slack after delay");
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = tokio::time::sleep(delay) => {},
        }
    }
}

/// Bring the listener up, announce the session, then hold it until `cancel`
/// fires or the receiver is dropped.
async fn run_listener(
    workspace: &SlackWorkspace,
    events: &mpsc::Sender<SourceEvent>,
    cancel: &CancellationToken,
    backoff: &mut Backoff,
) -> Result<()> {
    let domain = workspace.domain().await?;

    let callbacks = SlackSocketModeListenerCallbacks::new().with_push_events(handle_push_events);
    let listener_env = Arc::new(
        SlackClientEventsListenerEnvironment::new(workspace.client()).with_user_state(
            SocketModeState {
                events: events.clone(),
            },
        ),
    );
    let socket_listener = SlackClientSocketModeListener::new(
        &SlackClientSocketModeConfig::new(),
        listener_env,
        callbacks,
    );

    tokio::select! {
        result = socket_listener.listen_for(workspace.app_token()) => result?,
        _ = cancel.cancelled() => return Ok(()),
    }
    socket_listener.start().await;
    backoff.reset();
    info!(workspace = %domain, "slack socket mode connected");

    for event in [
        SourceEvent::Connected { workspace: domain },
        SourceEvent::Hello,
    ] {
        if events.send(event).await.is_err() {
            socket_listener.shutdown().await;
            return Ok(());
        }
    }

    tokio::select! {
        _ = cancel.cancelled() => debug!("slack socket mode cancelled"),
        _ = events.closed() => debug!("slack event receiver dropped"),
    }
    socket_listener.shutdown().await;
    Ok(())
}

/// Handle push events (messages, etc.)
async fn handle_push_events(
    event: SlackPushEventCallback,
    _client: Arc<SlackHyperClient>,
    states: SlackClientEventsUserState,
) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let guard = states.read().await;
    let state = guard
        .get_user_state::<SocketModeState>()
        .ok_or("missing socket mode state")?;

    match &event.event {
        SlackEventCallbackBody::Message(msg) => match message_event(msg) {
            Some(message) => {
                if state.events.send(SourceEvent::Message(message)).await.is_err() {
                    debug!("slack event receiver dropped, discarding message");
                }
            },
            None => debug!("skipping non-relayable message event"),
        },
        _ => debug!("ignoring event callback type"),
    }
    Ok(())
}

/// Relayable user message as a source event.
///
/// Bot posts (our own relays included) and subtyped messages such as edits
/// or joins yield `None`.
fn message_event(event: &SlackMessageEvent) -> Option<MessageEvent> {
    if event.sender.bot_id.is_some() || event.subtype.is_some() {
        return None;
    }
    Some(MessageEvent {
        channel_id: event.origin.channel.as_ref()?.to_string(),
        user_id: event.sender.user.as_ref()?.to_string(),
        timestamp_raw: event.origin.ts.to_string(),
        text: event
            .content
            .as_ref()
            .and_then(|c| c.text.clone())
            .unwrap_or_default(),
    })
}
