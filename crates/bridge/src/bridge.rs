use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use {
    slackbase_channels::{
        ChannelDirectory, DestinationChat, Error, Result, SourceEvent, SourceWorkspace,
        UserNameCache,
    },
    slackbase_config::SyncConfig,
    tokio::sync::{RwLock, mpsc},
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use crate::{
    forward::RelayForwarder,
    reconcile::{HistoryReconciler, SyncReport},
};

/// Events buffered between the source stream and the dispatch loop.
const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, Default)]
pub struct BridgeSettings {
    /// Destination team. `None` uses the workspace domain the source reports.
    pub team: Option<String>,
    pub sync: SyncConfig,
}

/// Relay from one source workspace to one destination team.
pub struct Bridge {
    source: Arc<dyn SourceWorkspace>,
    destination: Arc<dyn DestinationChat>,
    settings: BridgeSettings,
    users: UserNameCache,
    directory: RwLock<ChannelDirectory>,
    team: RwLock<Option<String>>,
    reconciled: AtomicBool,
}

impl Bridge {
    pub fn new(
        source: Arc<dyn SourceWorkspace>,
        destination: Arc<dyn DestinationChat>,
        settings: BridgeSettings,
    ) -> Self {
        Self {
            source,
            destination,
            settings,
            users: UserNameCache::new(),
            directory: RwLock::new(ChannelDirectory::default()),
            team: RwLock::new(None),
            reconciled: AtomicBool::new(false),
        }
    }

    /// Run the relay until `cancel` fires or the source rejects our
    /// credentials.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
        let stream_cancel = cancel.child_token();
        let source = Arc::clone(&self.source);
        let stream = {
            let cancel = stream_cancel.clone();
            tokio::spawn(async move { source.connect(tx, cancel).await })
        };

        let mut outcome = Ok(());
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                event = rx.recv() => event,
            };
            let Some(event) = event else {
                debug!("source event stream ended");
                break;
            };
            if let Err(e) = self.handle_event(event, &cancel).await {
                outcome = Err(e);
                break;
            }
        }

        stream_cancel.cancel();
        match stream.await {
            Ok(Ok(())) => {},
            Ok(Err(e)) if e.is_auth() && outcome.is_ok() => outcome = Err(e),
            Ok(Err(e)) => warn!(error = %e, "source stream ended with error"),
            Err(e) => warn!(error = %e, "source stream task failed"),
        }
        info!("closing connection");
        outcome
    }

    /// React to one source event. Only an authentication failure is an error.
    ///
    /// `cancel` cuts a reconciliation pass short between sends.
    pub async fn handle_event(&self, event: SourceEvent, cancel: &CancellationToken) -> Result<()> {
        match event {
            SourceEvent::Connected { workspace } => {
                info!(workspace = %workspace, "connection established");
                let team = self.settings.team.clone().unwrap_or(workspace);
                *self.team.write().await = Some(team.clone());
                if let Err(e) = self.refresh_directory(&team).await {
                    if e.is_auth() {
                        return Err(e);
                    }
                    warn!(team = %team, error = %e, "failed to load channel directory");
                    return Ok(());
                }
                if self.settings.sync.enabled && !self.reconciled.swap(true, Ordering::SeqCst) {
                    let report = self.reconcile(&team, cancel).await?;
                    info!(team = %team, summary = %report, "history reconciliation finished");
                }
            },
            SourceEvent::Hello => info!("chat history synchronized"),
            SourceEvent::Message(event) => {
                let Some(team) = self.team.read().await.clone() else {
                    warn!(channel_id = %event.channel_id, "message before connect, dropping");
                    return Ok(());
                };
                let directory = self.directory.read().await;
                let forwarder = RelayForwarder::new(&*self.source, &*self.destination, &self.users);
                if let Err(e) = forwarder.forward(&team, &event, &directory).await {
                    if e.is_auth() {
                        return Err(e);
                    }
                    warn!(
                        channel_id = %event.channel_id,
                        user_id = %event.user_id,
                        error = %e,
                        "failed to relay message"
                    );
                }
            },
            SourceEvent::Error { description } => {
                warn!(error = %description, "source connection error");
            },
            SourceEvent::AuthError { description } => {
                error!(error = %description, "invalid credentials");
                return Err(Error::auth(description));
            },
        }
        Ok(())
    }

    /// One reconciliation pass without the live stream.
    pub async fn sync_once(&self, cancel: &CancellationToken) -> Result<SyncReport> {
        let team = self.resolve_team().await?;
        self.refresh_directory(&team).await?;
        self.reconciled.store(true, Ordering::SeqCst);
        self.reconcile(&team, cancel).await
    }

    /// Destination team: the configured override or the workspace domain.
    pub async fn resolve_team(&self) -> Result<String> {
        match &self.settings.team {
            Some(team) => Ok(team.clone()),
            None => self.source.workspace_domain().await,
        }
    }

    async fn refresh_directory(&self, team: &str) -> Result<()> {
        let directory = ChannelDirectory::load(&*self.source, &*self.destination, team).await?;
        info!(team, channels = directory.len(), "channel directory refreshed");
        *self.directory.write().await = directory;
        Ok(())
    }

    async fn reconcile(&self, team: &str, cancel: &CancellationToken) -> Result<SyncReport> {
        let directory = self.directory.read().await;
        HistoryReconciler::new(
            &*self.source,
            &*self.destination,
            &self.users,
            &self.settings.sync,
        )
        .reconcile_all(team, &directory, cancel)
        .await
    }
}
