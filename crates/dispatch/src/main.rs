mod logging;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use dispatch::{AppState, DispatchConfig, LogMailer, Mailer, MailerKind, OutboxMailer, router};
use tracing::info;

#[derive(Parser)]
#[command(name = "dispatch-server", version, about = "Receive intake submissions and send notifications")]
struct Args {
    /// Address to listen on
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
    /// Directory receiving outgoing messages
    #[arg(long, value_name = "DIR")]
    outbox: Option<PathBuf>,
    /// Log messages instead of writing them to the outbox
    #[arg(long)]
    log_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install().map_err(|e| anyhow!(e))?;
    let args = Args::parse();

    let mut config = DispatchConfig::new().context("loading configuration")?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(outbox) = args.outbox {
        config.outbox_dir = outbox;
    }
    if args.log_only {
        config.mailer = MailerKind::Log;
    }

    let _log_guard = logging::init()?;

    let mailer: Arc<dyn Mailer> = match config.mailer {
        MailerKind::Outbox => Arc::new(OutboxMailer::new(config.outbox_dir.clone())),
        MailerKind::Log => Arc::new(LogMailer),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind)
        .await
        .with_context(|| format!("binding {}", config.bind))?;
    info!(
        addr = %listener.local_addr()?,
        mailer = ?config.mailer,
        operator = %config.operator_address,
        "dispatch server listening"
    );

    axum::serve(listener, router(AppState::new(config, mailer)))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await?;
    Ok(())
}
