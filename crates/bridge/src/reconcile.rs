//! Catch the destination up with messages sent while the relay was down.
//!
//! Per channel: compare the newest message on both sides. If they differ,
//! replay everything the source has past the destination's newest message,
//! or the last `initial_count` messages when the destination has none.

use std::fmt;

use {
    slackbase_channels::{
        ChannelDirectory, DestinationChat, HistoryWindow, Result, SourceRecord, SourceWorkspace,
        UserNameCache, gating::is_allowed,
    },
    slackbase_common::{Message, Timestamp},
    slackbase_config::SyncConfig,
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

// ── Planning ────────────────────────────────────────────────────────────────

/// What a channel needs after comparing both sides' newest message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillPlan {
    InSync,
    /// Replay everything strictly newer than this instant.
    Since(Timestamp),
    /// The destination has no relayed history; replay the newest `n`.
    Initial(usize),
}

impl BackfillPlan {
    /// Source request for this plan, `None` when nothing is missing.
    pub fn window(&self) -> Option<HistoryWindow> {
        match *self {
            Self::InSync => None,
            Self::Since(time) => Some(HistoryWindow::since(time)),
            Self::Initial(count) => Some(HistoryWindow::latest(count)),
        }
    }
}

/// Decide the backfill for one channel.
///
/// Either side may be the sentinel message.
pub fn plan_backfill(
    source_latest: &Message,
    destination_latest: &Message,
    initial_count: usize,
) -> BackfillPlan {
    if source_latest == destination_latest {
        BackfillPlan::InSync
    } else if destination_latest.is_sentinel() {
        BackfillPlan::Initial(initial_count)
    } else {
        BackfillPlan::Since(destination_latest.time())
    }
}

// ── Reports ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    InSync,
    Backfilled { sent: usize, failed: usize },
    Skipped { reason: &'static str },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelReport {
    pub channel: String,
    pub outcome: ChannelOutcome,
}

/// Outcome of one reconciliation pass, ordered by channel name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub channels: Vec<ChannelReport>,
}

impl SyncReport {
    pub fn outcome(&self, channel: &str) -> Option<&ChannelOutcome> {
        self.channels
            .iter()
            .find(|r| r.channel == channel)
            .map(|r| &r.outcome)
    }

    /// Messages replayed across all channels.
    pub fn sent(&self) -> usize {
        self.channels
            .iter()
            .map(|r| match r.outcome {
                ChannelOutcome::Backfilled { sent, .. } => sent,
                _ => 0,
            })
            .sum()
    }

    /// Messages that could not be replayed.
    pub fn failed(&self) -> usize {
        self.channels
            .iter()
            .map(|r| match r.outcome {
                ChannelOutcome::Backfilled { failed, .. } => failed,
                _ => 0,
            })
            .sum()
    }

    fn count(&self, matches: impl Fn(&ChannelOutcome) -> bool) -> usize {
        self.channels.iter().filter(|r| matches(&r.outcome)).count()
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} channels: {} in sync, {} backfilled ({} sent, {} failed), {} skipped, {} failed",
            self.channels.len(),
            self.count(|o| matches!(o, ChannelOutcome::InSync)),
            self.count(|o| matches!(o, ChannelOutcome::Backfilled { .. })),
            self.sent(),
            self.failed(),
            self.count(|o| matches!(o, ChannelOutcome::Skipped { .. })),
            self.count(|o| matches!(o, ChannelOutcome::Failed { .. })),
        )
    }
}

// ── Reconciler ──────────────────────────────────────────────────────────────

/// Runs reconciliation passes against one source and one destination.
pub struct HistoryReconciler<'a> {
    source: &'a dyn SourceWorkspace,
    destination: &'a dyn DestinationChat,
    users: &'a UserNameCache,
    settings: &'a SyncConfig,
}

impl<'a> HistoryReconciler<'a> {
    pub fn new(
        source: &'a dyn SourceWorkspace,
        destination: &'a dyn DestinationChat,
        users: &'a UserNameCache,
        settings: &'a SyncConfig,
    ) -> Self {
        Self {
            source,
            destination,
            users,
            settings,
        }
    }

    /// Reconcile every channel in `directory`, one after another.
    ///
    /// Only rejected source credentials abort the pass; every other failure
    /// is confined to its channel. Once `cancel` fires no further channel is
    /// started and the report covers the channels visited so far.
    pub async fn reconcile_all(
        &self,
        team: &str,
        directory: &ChannelDirectory,
        cancel: &CancellationToken,
    ) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        for (name, id) in directory.channels() {
            if cancel.is_cancelled() {
                info!(team, visited = report.channels.len(), "reconciliation cancelled");
                break;
            }
            let outcome = if !is_allowed(name, &self.settings.channels) {
                debug!(channel = name, "channel not selected for sync");
                ChannelOutcome::Skipped {
                    reason: "not selected",
                }
            } else if !directory.is_available(name) {
                debug!(channel = name, team, "channel missing on keybase");
                ChannelOutcome::Skipped {
                    reason: "not on destination",
                }
            } else {
                info!(channel = name, "synchronizing channel");
                match self.reconcile_channel(team, name, id, cancel).await {
                    Ok(outcome) => outcome,
                    Err(e) if e.is_auth() => return Err(e),
                    Err(e) => {
                        warn!(channel = name, error = %e, "channel reconciliation failed");
                        ChannelOutcome::Failed {
                            error: e.to_string(),
                        }
                    },
                }
            };
            report.channels.push(ChannelReport {
                channel: name.to_string(),
                outcome,
            });
        }
        Ok(report)
    }

    /// Bring one channel up to date.
    ///
    /// A fired `cancel` stops the replay before the next send; the outcome
    /// then counts only what was attempted.
    pub async fn reconcile_channel(
        &self,
        team: &str,
        channel: &str,
        source_id: &str,
        cancel: &CancellationToken,
    ) -> Result<ChannelOutcome> {
        let source_latest = self.source_latest(channel, source_id).await?;
        let destination_latest = self.destination_latest(team, channel).await;

        let plan = plan_backfill(
            &source_latest,
            &destination_latest,
            self.settings.initial_count,
        );
        let Some(window) = plan.window() else {
            debug!(channel, "channel in sync");
            return Ok(ChannelOutcome::InSync);
        };
        debug!(channel, ?plan, "channel diverged");

        let records = self.source.channel_history(source_id, &window).await?;
        let mut failed = 0;
        let mut backlog = Vec::with_capacity(records.len());
        for record in records {
            match self.to_message(record, channel).await {
                Ok(msg) if window.admits(msg.time()) => backlog.push(msg),
                Ok(msg) => debug!(channel, time = %msg.time(), "dropping record at or before bound"),
                Err(e) if e.is_auth() => return Err(e),
                Err(e) => {
                    warn!(channel, error = %e, "skipping unreadable source record");
                    failed += 1;
                },
            }
        }
        // Oldest first, so the destination's newest message stays the
        // source's newest once the replay completes.
        backlog.sort_by_key(Message::time);

        let mut sent = 0;
        for (done, msg) in backlog.iter().enumerate() {
            if cancel.is_cancelled() {
                info!(channel, sent, remaining = backlog.len() - done, "backfill interrupted");
                break;
            }
            match self.destination.send_message(team, msg).await {
                Ok(ack) => {
                    info!(channel, time = %msg.time(), sender = msg.sender(), text = msg.text(), ack = %ack, "replayed message");
                    sent += 1;
                },
                Err(e) => {
                    warn!(channel, time = %msg.time(), error = %e, "failed to replay message");
                    failed += 1;
                },
            }
        }
        info!(channel, sent, failed, "channel backfilled");
        Ok(ChannelOutcome::Backfilled { sent, failed })
    }

    /// Newest source message, or the sentinel for an empty channel.
    async fn source_latest(&self, channel: &str, source_id: &str) -> Result<Message> {
        let records = self
            .source
            .channel_history(source_id, &HistoryWindow::latest(1))
            .await?;
        match records.into_iter().next() {
            Some(record) => self.to_message(record, channel).await,
            None => Ok(Message::default()),
        }
    }

    /// Newest decodable destination message. Failures read as "no history".
    async fn destination_latest(&self, team: &str, channel: &str) -> Message {
        match self.destination.read_history(team, channel, 1, None).await {
            Ok(messages) => messages.into_iter().next().unwrap_or_default(),
            Err(e) => {
                warn!(channel, error = %e, "could not read keybase history, assuming none");
                Message::default()
            },
        }
    }

    async fn to_message(&self, record: SourceRecord, channel: &str) -> Result<Message> {
        let time = Timestamp::parse(&record.timestamp_raw)?;
        let sender = self.users.resolve(self.source, &record.user_id).await?;
        Ok(Message::new(time, channel, sender, record.text))
    }
}
