//! Client configuration.
//!
//! Values are layered: built-in defaults, then an optional JSON file under
//! the user config directory, then environment variables. The binary applies
//! its command-line flags on top through [`ConfigBuilder`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use mailguard_core::DEFAULT_HIGHLIGHT_TTL;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::{Error, Result};

/// Default API base URL.
pub const DEFAULT_API_URL: &str = "http://localhost:5001";

/// Environment variable overriding the API base URL.
pub const ENV_API_URL: &str = "MAILGUARD_API_URL";

/// Environment variable overriding the push transport.
pub const ENV_TRANSPORT: &str = "MAILGUARD_TRANSPORT";

/// Push transport used for live updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    /// `GET /api/events/stream`, a `text/event-stream` response.
    #[default]
    Sse,
    /// Socket.IO over WebSocket at `/socket.io/`.
    Socket,
}

impl Transport {
    /// Configuration name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sse => "sse",
            Self::Socket => "socket",
        }
    }
}

impl std::str::FromStr for Transport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sse" | "eventsource" => Ok(Self::Sse),
            "socket" | "socketio" | "socket.io" | "websocket" => Ok(Self::Socket),
            other => Err(Error::InvalidConfig(format!("unknown transport: {other}"))),
        }
    }
}

/// Fixed-delay reconnect policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Attempts after the first connection; `None` retries forever.
    pub max_attempts: Option<u32>,
    /// Delay between attempts.
    pub delay: Duration,
}

impl ReconnectPolicy {
    /// Retries forever with `delay` between attempts.
    #[must_use]
    pub const fn indefinite(delay: Duration) -> Self {
        Self {
            max_attempts: None,
            delay,
        }
    }

    /// Retries at most `attempts` times with `delay` between attempts.
    #[must_use]
    pub const fn bounded(attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: Some(attempts),
            delay,
        }
    }

    /// Whether reconnect attempt number `attempt` (1-based) is allowed.
    #[must_use]
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.is_none_or(|max| attempt <= max)
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL.
    pub api_url: Url,
    /// Push transport.
    pub transport: Transport,
    /// Page size for the inbox and sent views.
    pub mail_page_size: u32,
    /// Page size for the dashboard.
    pub admin_page_size: u32,
    /// Dashboard auto-refresh interval.
    pub dashboard_refresh: Duration,
    /// Periodic refresh for the mail views, if any.
    pub mail_refresh: Option<Duration>,
    /// How long pushed records stay highlighted.
    pub highlight_ttl: Duration,
    /// Timeout applied to each REST request.
    pub request_timeout: Duration,
    /// Event-stream reconnect policy.
    pub sse_reconnect: ReconnectPolicy,
    /// Socket reconnect policy.
    pub socket_reconnect: ReconnectPolicy,
    /// Raise a desktop notification for pushed records.
    pub desktop_notifications: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ConfigBuilder::new().build_with_url(default_url())
    }
}

impl ClientConfig {
    /// Creates a builder with default values.
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Default location of the configuration file.
    #[must_use]
    pub fn default_path() -> PathBuf {
        config_dir().join("config.json")
    }

    /// Loads configuration from `path` (or the default location) and the
    /// environment. A missing file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error when the file exists but cannot be read or parsed, or
    /// when a value is invalid.
    pub async fn load(path: Option<&Path>) -> Result<ConfigBuilder> {
        let path = path.map_or_else(Self::default_path, Path::to_path_buf);
        let mut builder = ConfigBuilder::new();

        if tokio::fs::try_exists(&path).await? {
            let contents = tokio::fs::read_to_string(&path).await?;
            let file: FileConfig = serde_json::from_str(&contents)?;
            info!(path = %path.display(), "Loaded configuration file");
            builder = builder.apply_file(file)?;
        } else {
            debug!(path = %path.display(), "No configuration file");
        }

        builder.apply_env(|key| std::env::var(key).ok())
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    api_url: Option<String>,
    transport: Transport,
    mail_page_size: u32,
    admin_page_size: u32,
    dashboard_refresh: Duration,
    mail_refresh: Option<Duration>,
    highlight_ttl: Duration,
    request_timeout: Duration,
    sse_reconnect: ReconnectPolicy,
    socket_reconnect: ReconnectPolicy,
    desktop_notifications: bool,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    /// Creates a builder with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            api_url: None,
            transport: Transport::Sse,
            mail_page_size: 100,
            admin_page_size: 50,
            dashboard_refresh: Duration::from_secs(5),
            mail_refresh: Some(Duration::from_secs(30)),
            highlight_ttl: DEFAULT_HIGHLIGHT_TTL,
            request_timeout: Duration::from_secs(30),
            sse_reconnect: ReconnectPolicy::indefinite(Duration::from_secs(3)),
            socket_reconnect: ReconnectPolicy::bounded(5, Duration::from_secs(1)),
            desktop_notifications: false,
        }
    }

    /// Sets the API base URL.
    #[must_use]
    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = Some(url.into());
        self
    }

    /// Sets the push transport.
    #[must_use]
    pub const fn transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    /// Sets the page size of the mail views.
    #[must_use]
    pub const fn mail_page_size(mut self, size: u32) -> Self {
        self.mail_page_size = size;
        self
    }

    /// Sets the page size of the dashboard.
    #[must_use]
    pub const fn admin_page_size(mut self, size: u32) -> Self {
        self.admin_page_size = size;
        self
    }

    /// Sets the dashboard refresh interval.
    #[must_use]
    pub const fn dashboard_refresh(mut self, interval: Duration) -> Self {
        self.dashboard_refresh = interval;
        self
    }

    /// Sets or disables periodic refresh of the mail views.
    #[must_use]
    pub const fn mail_refresh(mut self, interval: Option<Duration>) -> Self {
        self.mail_refresh = interval;
        self
    }

    /// Sets the highlight lifetime.
    #[must_use]
    pub const fn highlight_ttl(mut self, ttl: Duration) -> Self {
        self.highlight_ttl = ttl;
        self
    }

    /// Sets the REST request timeout.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Sets the event-stream reconnect policy.
    #[must_use]
    pub const fn sse_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.sse_reconnect = policy;
        self
    }

    /// Sets the socket reconnect policy.
    #[must_use]
    pub const fn socket_reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.socket_reconnect = policy;
        self
    }

    /// Enables or disables desktop notifications.
    #[must_use]
    pub const fn desktop_notifications(mut self, enabled: bool) -> Self {
        self.desktop_notifications = enabled;
        self
    }

    /// Applies the values present in a configuration file.
    fn apply_file(mut self, file: FileConfig) -> Result<Self> {
        if let Some(url) = file.api_url {
            self.api_url = Some(url);
        }
        if let Some(transport) = file.transport {
            self.transport = transport;
        }
        if let Some(size) = file.page_size {
            self.mail_page_size = size;
        }
        if let Some(size) = file.admin_page_size {
            self.admin_page_size = size;
        }
        if let Some(secs) = file.refresh_interval_secs {
            self.dashboard_refresh = Duration::from_secs(secs);
        }
        if let Some(secs) = file.mail_refresh_secs {
            self.mail_refresh = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(ms) = file.highlight_ttl_ms {
            self.highlight_ttl = Duration::from_millis(ms);
        }
        if let Some(secs) = file.request_timeout_secs {
            if secs == 0 {
                return Err(Error::InvalidConfig(
                    "request_timeout_secs must be positive".into(),
                ));
            }
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(attempts) = file.reconnect_attempts {
            self.socket_reconnect.max_attempts = Some(attempts);
        }
        if let Some(ms) = file.reconnect_delay_ms {
            self.socket_reconnect.delay = Duration::from_millis(ms);
        }
        if let Some(enabled) = file.desktop_notifications {
            self.desktop_notifications = enabled;
        }
        Ok(self)
    }

    /// Applies `MAILGUARD_API_URL` and `MAILGUARD_TRANSPORT` as read by
    /// `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown transport name.
    pub fn apply_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup(ENV_API_URL).filter(|v| !v.trim().is_empty()) {
            self.api_url = Some(url);
        }
        if let Some(transport) = lookup(ENV_TRANSPORT).filter(|v| !v.trim().is_empty()) {
            self.transport = transport.parse()?;
        }
        Ok(self)
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when the API URL does not parse or is not http(s).
    pub fn build(self) -> Result<ClientConfig> {
        let url = match &self.api_url {
            Some(raw) => parse_api_url(raw)?,
            None => default_url(),
        };
        Ok(self.build_with_url(url))
    }

    fn build_with_url(self, api_url: Url) -> ClientConfig {
        ClientConfig {
            api_url,
            transport: self.transport,
            mail_page_size: self.mail_page_size.max(1),
            admin_page_size: self.admin_page_size.max(1),
            dashboard_refresh: self.dashboard_refresh,
            mail_refresh: self.mail_refresh,
            highlight_ttl: self.highlight_ttl,
            request_timeout: self.request_timeout,
            sse_reconnect: self.sse_reconnect,
            socket_reconnect: self.socket_reconnect,
            desktop_notifications: self.desktop_notifications,
        }
    }
}

/// On-disk configuration. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    api_url: Option<String>,
    transport: Option<Transport>,
    page_size: Option<u32>,
    admin_page_size: Option<u32>,
    refresh_interval_secs: Option<u64>,
    mail_refresh_secs: Option<u64>,
    highlight_ttl_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    reconnect_attempts: Option<u32>,
    reconnect_delay_ms: Option<u64>,
    desktop_notifications: Option<bool>,
}

/// `$CONFIG_DIR/mailguard`, falling back to the working directory.
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mailguard")
}

fn parse_api_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw.trim())?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::InvalidConfig(format!(
            "API URL must be http or https: {raw}"
        )));
    }
    // Joining relative paths needs a trailing slash on the base.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn default_url() -> Url {
    parse_api_url(DEFAULT_API_URL).unwrap_or_else(|_| unreachable!("default API URL is valid"))
}
