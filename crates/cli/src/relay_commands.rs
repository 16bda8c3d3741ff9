use std::{sync::Arc, time::Duration};

use {
    anyhow::{Context, Result},
    slackbase_bridge::{Bridge, BridgeSettings},
    slackbase_channels::{DestinationChat, SourceWorkspace},
    slackbase_config::SlackbaseConfig,
    slackbase_keybase::KeybaseGateway,
    slackbase_slack::SlackWorkspace,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

fn source(config: &SlackbaseConfig) -> Result<Arc<dyn SourceWorkspace>> {
    let workspace =
        SlackWorkspace::from_config(&config.slack).context("failed to build the slack client")?;
    Ok(Arc::new(workspace))
}

fn destination(config: &SlackbaseConfig) -> Arc<dyn DestinationChat> {
    Arc::new(KeybaseGateway::cli(
        config.keybase.binary.clone(),
        Duration::from_secs(config.keybase.timeout_secs),
    ))
}

fn bridge(config: &SlackbaseConfig) -> Result<Bridge> {
    Ok(Bridge::new(source(config)?, destination(config), BridgeSettings {
        team: config.keybase.team.clone(),
        sync: config.sync.clone(),
    }))
}

/// Fire `cancel` on SIGINT or SIGTERM.
fn cancel_on_signal(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                },
                Err(e) => {
                    warn!(error = %e, "failed to listen for SIGTERM");
                    std::future::pending::<()>().await;
                },
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
        info!("shutdown signal received");
        cancel.cancel();
    });
}

pub async fn run(config: &SlackbaseConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    cancel_on_signal(cancel.clone());
    bridge(config)?
        .run(cancel)
        .await
        .context("relay stopped")?;
    info!("relay stopped");
    Ok(())
}

pub async fn sync(config: &SlackbaseConfig) -> Result<()> {
    let cancel = CancellationToken::new();
    cancel_on_signal(cancel.clone());
    let report = bridge(config)?
        .sync_once(&cancel)
        .await
        .context("history reconciliation failed")?;
    for channel in &report.channels {
        println!("  #{:<24} {:?}", channel.channel, channel.outcome);
    }
    println!("{report}");
    Ok(())
}

pub async fn channels(config: &SlackbaseConfig) -> Result<()> {
    let team = match &config.keybase.team {
        Some(team) => team.clone(),
        None => source(config)?
            .workspace_domain()
            .await
            .context("failed to resolve the slack workspace domain")?,
    };
    let channels = destination(config)
        .list_channels(&team)
        .await
        .with_context(|| format!("failed to list keybase channels for {team}"))?;
    if channels.is_empty() {
        println!("No channels found in team {team}.");
    } else {
        println!("Team {team}:");
        for name in &channels {
            println!("  #{name}");
        }
    }
    Ok(())
}
