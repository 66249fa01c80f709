//! Command-line interface definitions and parsing

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use mailguard_client::Transport;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// API base URL (overrides config and MAILGUARD_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Push transport: sse or socket
    #[arg(long, global = true)]
    pub transport: Option<Transport>,

    /// Act as this address for this run without saving it
    #[arg(long = "as", global = true, value_name = "EMAIL")]
    pub as_identity: Option<String>,

    /// Raise a desktop notification for each new email
    #[arg(long, global = true)]
    pub notify: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Live inbox for your address
    Inbox,
    /// Live view of mail you sent
    Sent,
    /// Admin dashboard: stats and all intercepted mail
    Dashboard {
        /// Show flagged emails only
        #[arg(long)]
        flagged: bool,
        /// Filter by status (processed, blocked, quarantined, error, ...)
        #[arg(long)]
        status: Option<String>,
    },
    /// Compose and send an email through the proxy
    Send {
        /// Recipient address (repeatable)
        #[arg(short, long, required = true)]
        to: Vec<String>,
        /// Subject line
        #[arg(short, long, default_value = "")]
        subject: String,
        /// Message body
        #[arg(short, long, default_value = "")]
        body: String,
        /// File to attach (repeatable)
        #[arg(short, long)]
        attach: Vec<PathBuf>,
        /// Sender address (defaults to your identity)
        #[arg(long)]
        from: Option<String>,
    },
    /// Print interception statistics
    Stats,
    /// Show one intercepted email
    Show {
        /// Email id
        id: i64,
    },
    /// Download an attachment
    Download {
        /// Attachment id
        id: i64,
        /// Target directory (defaults to the downloads directory)
        #[arg(short, long)]
        dir: Option<PathBuf>,
        /// File name to save as
        #[arg(short, long)]
        name: Option<String>,
        /// Open the file after saving
        #[arg(short, long)]
        open: bool,
    },
    /// Show or change the saved identity
    Identity {
        #[command(subcommand)]
        action: Option<IdentityAction>,
    },
}

#[derive(Subcommand)]
pub enum IdentityAction {
    /// Print the saved identity
    Show,
    /// Save a new identity
    Set {
        /// Your email address
        email: String,
    },
    /// Forget the saved identity
    Clear,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "mailguard",
            "inbox",
            "--as",
            "a@x.com",
            "--transport",
            "socket",
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(cli.command, Commands::Inbox));
        assert_eq!(cli.as_identity.as_deref(), Some("a@x.com"));
        assert_eq!(cli.transport, Some(Transport::Socket));
    }

    #[test]
    fn test_send_requires_recipient() {
        assert!(Cli::try_parse_from(["mailguard", "send", "--subject", "hi"]).is_err());
        let cli = Cli::try_parse_from([
            "mailguard", "send", "-t", "b@y.com", "-t", "c@z.com", "-a", "x.pdf",
        ])
        .unwrap_or_else(|e| panic!("{e}"));
        let Commands::Send { to, attach, .. } = cli.command else {
            panic!("expected send");
        };
        assert_eq!(to, ["b@y.com", "c@z.com"]);
        assert_eq!(attach, [PathBuf::from("x.pdf")]);
    }
}
