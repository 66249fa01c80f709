//! One-shot subcommands and identity resolution.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, bail};
use mailguard_client::{ApiClient, IdentityStore};
use mailguard_core::{EmailId, Identity, OutgoingAttachment, OutgoingEmail};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

use crate::cli::IdentityAction;
use crate::view;

/// Identity for a session: `--as`, then the saved one, then a prompt whose
/// answer is saved.
pub async fn resolve_identity(
    store: &IdentityStore,
    flag: Option<&str>,
) -> anyhow::Result<Identity> {
    if let Some(raw) = flag {
        return Ok(Identity::new(raw)?);
    }
    if let Some(identity) = store.load().await? {
        return Ok(identity);
    }

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        stdout.write_all(b"Enter your email address: ").await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            bail!("No email address entered");
        };
        if let Ok(identity) = Identity::new(line) {
            store.save(&identity).await?;
            return Ok(identity);
        }
    }
}

/// Composes and sends one email.
pub async fn send(
    api: &ApiClient,
    from: String,
    to: Vec<String>,
    subject: String,
    body: String,
    attach: &[PathBuf],
) -> anyhow::Result<ExitCode> {
    let mut email = OutgoingEmail::new(from, subject, body);
    for recipient in to {
        email = email.to(recipient);
    }
    for path in attach {
        let content = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let filename = path
            .file_name()
            .map_or_else(|| "attachment".to_string(), |n| n.to_string_lossy().into_owned());
        email = email.attach(OutgoingAttachment::new(filename, content));
    }

    print!("{}", view::compose::summary(&email));
    let result = api.send_email(&email).await;
    let notice = view::compose::result_notice(&result);
    println!("{notice}");
    Ok(if notice.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

/// Prints the stats grid.
pub async fn stats(api: &ApiClient) -> anyhow::Result<ExitCode> {
    let stats = api.stats().await.context("Failed to load stats")?;
    print!("{}", view::stats::grid(&stats));
    Ok(ExitCode::SUCCESS)
}

/// Prints one email.
pub async fn show(api: &ApiClient, id: i64) -> anyhow::Result<ExitCode> {
    let record = api
        .get_email(EmailId(id))
        .await
        .with_context(|| format!("Failed to load email {id}"))?;
    print!("{}", view::message_view::render(&record));
    Ok(ExitCode::SUCCESS)
}

/// Saves an attachment and optionally opens it.
pub async fn download(
    api: &ApiClient,
    id: i64,
    dir: &Path,
    name: Option<&str>,
    open: bool,
) -> anyhow::Result<ExitCode> {
    let path = api
        .download_attachment_to(id, dir, name.unwrap_or_default())
        .await
        .with_context(|| format!("Failed to download attachment {id}"))?;
    println!("Saved {}", path.display());
    if open {
        opener::open(&path).with_context(|| format!("Failed to open {}", path.display()))?;
    }
    Ok(ExitCode::SUCCESS)
}

/// `identity show|set|clear`.
pub async fn identity(
    store: &IdentityStore,
    action: Option<IdentityAction>,
) -> anyhow::Result<ExitCode> {
    match action.unwrap_or(IdentityAction::Show) {
        IdentityAction::Show => match store.load().await? {
            Some(identity) => println!("{identity}"),
            None => println!("No identity saved ({})", store.path().display()),
        },
        IdentityAction::Set { email } => {
            let identity = Identity::new(email)?;
            store.save(&identity).await?;
            println!("Identity set to {identity}");
        }
        IdentityAction::Clear => {
            if store.clear().await? {
                info!(path = %store.path().display(), "Identity cleared");
                println!("Identity cleared");
            } else {
                println!("No identity saved");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
