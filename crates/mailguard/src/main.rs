//! `MailGuard` - terminal front-end for the MailGuard DLP proxy
//!
//! Live inbox and sent views for one address, an admin dashboard over all
//! intercepted mail, and one-shot commands for sending and inspecting.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod app;
mod cli;
mod commands;
mod input;
mod message;
mod tui;
mod view;

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, bail};
use clap::Parser;
use mailguard_client::{ApiClient, ClientConfig, IdentityStore};
use mailguard_core::{MailView, ProcessingStatus};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use app::Session;
use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    // Full-screen sessions own the terminal, so their logs go to a file.
    let log_file = matches!(
        cli.command,
        Commands::Inbox | Commands::Sent | Commands::Dashboard { .. }
    )
    .then(log_path);
    setup_logging(cli.verbose, log_file.as_deref());

    info!("Starting MailGuard");
    let config = load_config(&cli).await?;
    let api = ApiClient::new(&config)?;
    let store = IdentityStore::default();

    match cli.command {
        Commands::Inbox => mail_session(config, api, store, MailView::Inbox, cli.as_identity).await,
        Commands::Sent => mail_session(config, api, store, MailView::Sent, cli.as_identity).await,
        Commands::Dashboard { flagged, status } => {
            let status = match status.as_deref() {
                None => None,
                Some(s) if s.eq_ignore_ascii_case("all") => None,
                Some(s) => match ProcessingStatus::parse(s) {
                    Some(status) => Some(status),
                    None => bail!("Unknown status: {s}"),
                },
            };
            let (session, rx) = Session::new(config, api, store, MailView::Admin, None);
            session.with_filters(flagged, status).run(rx).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Send {
            to,
            subject,
            body,
            attach,
            from,
        } => {
            let from = match from.or(cli.as_identity) {
                Some(from) => from,
                None => match store.load().await? {
                    Some(identity) => identity.as_str().to_string(),
                    None => bail!("No sender: pass --from or run `mailguard identity set <email>`"),
                },
            };
            commands::send(&api, from, to, subject, body, &attach).await
        }
        Commands::Stats => commands::stats(&api).await,
        Commands::Show { id } => commands::show(&api, id).await,
        Commands::Download {
            id,
            dir,
            name,
            open,
        } => {
            let dir = dir.unwrap_or_else(app::download_dir);
            commands::download(&api, id, &dir, name.as_deref(), open).await
        }
        Commands::Identity { action } => commands::identity(&store, action).await,
    }
}

async fn mail_session(
    config: ClientConfig,
    api: ApiClient,
    store: IdentityStore,
    view: MailView,
    as_identity: Option<String>,
) -> anyhow::Result<ExitCode> {
    let identity = commands::resolve_identity(&store, as_identity.as_deref()).await?;
    let (session, rx) = Session::new(config, api, store, view, Some(identity));
    session.run(rx).await?;
    Ok(ExitCode::SUCCESS)
}

/// Where full-screen sessions write their logs.
fn log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("mailguard")
        .join("mailguard.log")
}

/// Logs go to `log_file` when given, otherwise to stderr so they do not mix
/// with command output.
fn setup_logging(verbose: bool, log_file: Option<&Path>) {
    let default = if verbose {
        "mailguard=debug,mailguard_client=debug,mailguard_core=debug"
    } else {
        "mailguard=info,mailguard_client=info,mailguard_core=info"
    };
    let file = log_file.and_then(|path| match open_log(path) {
        Ok(file) => Some(file),
        Err(e) => {
            eprintln!("Logging disabled: cannot open {}: {e}", path.display());
            None
        }
    });
    let file_layer = file.map(|file| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
    });
    let stderr_layer = log_file
        .is_none()
        .then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(file_layer)
        .with(stderr_layer)
        .init();
}

fn open_log(path: &Path) -> std::io::Result<fs::File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Defaults, config file and environment, then command-line flags.
async fn load_config(cli: &Cli) -> anyhow::Result<ClientConfig> {
    let mut builder = ClientConfig::load(cli.config.as_deref())
        .await
        .context("Failed to load configuration")?;
    if let Some(url) = &cli.api_url {
        builder = builder.api_url(url.clone());
    }
    if let Some(transport) = cli.transport {
        builder = builder.transport(transport);
    }
    if cli.notify {
        builder = builder.desktop_notifications(true);
    }
    builder.build().context("Invalid configuration")
}
