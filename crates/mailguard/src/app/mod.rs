//! Live session: the inbox, sent and dashboard screens.
//!
//! One task owns the [`Reconciler`] and runs [`Session::run`]. Fetches run
//! as spawned tasks that report back through the message queue with their
//! load ticket, so a snapshot and a pushed record are never applied
//! concurrently. Timers, the key reader and the push channel are dropped
//! with the loop.

mod notices;
mod push;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use chrono::Utc;
use crossterm::event::Event;
use mailguard_client::{ApiClient, ChannelEvent, ClientConfig, IdentityStore, PushChannel};
use mailguard_core::{
    Dispatcher, EmailId, EmailRecord, Identity, MailView, Notice, ProcessingStatus, Reconciler,
    Stats, ViewState,
};
use ratatui::{Frame, widgets::TableState};
use tokio::sync::mpsc;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::input::{Action, Prompt};
use crate::message::{Command, Message};
use crate::tui::{KeyReader, Tui};
use crate::view::{self, Screen};
use notices::{NOTICE_TTL, Notices};

/// Capacity of the session message queue.
const QUEUE: usize = 64;

/// Whether the loop keeps going after a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// State of one interactive session.
pub struct Session {
    config: ClientConfig,
    api: ApiClient,
    store: IdentityStore,
    reconciler: Reconciler,
    stats: Option<Stats>,
    detail: Option<EmailRecord>,
    notices: Notices,
    prompt: Prompt,
    selected: TableState,
    channel: Option<PushChannel>,
    tx: mpsc::Sender<Message>,
}

impl Session {
    /// Creates a session for `view` and the queue its tasks report to.
    pub fn new(
        config: ClientConfig,
        api: ApiClient,
        store: IdentityStore,
        view: MailView,
        identity: Option<Identity>,
    ) -> (Self, mpsc::Receiver<Message>) {
        let per_page = if view.is_mail_view() {
            config.mail_page_size
        } else {
            config.admin_page_size
        };
        let reconciler = Reconciler::new(
            ViewState::new(view, per_page),
            identity,
            config.highlight_ttl,
        );
        let (tx, rx) = mpsc::channel(QUEUE);
        let session = Self {
            config,
            api,
            store,
            reconciler,
            stats: None,
            detail: None,
            notices: Notices::new(NOTICE_TTL),
            prompt: Prompt::default(),
            selected: TableState::default(),
            channel: None,
            tx,
        };
        (session, rx)
    }

    /// Sets the dashboard filters before the first load.
    pub fn with_filters(
        mut self,
        flagged_only: bool,
        status: Option<ProcessingStatus>,
    ) -> Self {
        self.reconciler.set_filters(flagged_only, status);
        self
    }

    /// Runs until the user quits.
    ///
    /// # Errors
    ///
    /// Fails when the terminal cannot be set up or drawn to.
    pub async fn run(mut self, mut rx: mpsc::Receiver<Message>) -> anyhow::Result<()> {
        let view = self.reconciler.view_state().view();
        info!(view = view.as_str(), transport = self.config.transport.as_str(), "Session started");

        let mut tui = Tui::enter().context("Failed to set up the terminal")?;
        let keys = KeyReader::spawn(self.tx.clone());
        let dispatcher = push::dispatcher();
        let mut refresh = self.refresh_period().map(|period| {
            let mut interval =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        self.open_channel();
        self.refresh();

        let outcome = loop {
            if let Err(e) = tui.draw(|frame| self.draw(frame)) {
                break Err(e);
            }
            let deadline = earliest(
                self.reconciler.next_highlight_deadline(),
                self.notices.next_deadline(),
            );
            let message = tokio::select! {
                Some(message) = rx.recv() => message,
                Some(event) = next_push(self.channel.as_mut()) => Message::Push(event),
                () = sleep_until(deadline) => Message::Expire,
                () = tick(refresh.as_mut()) => Message::Refresh,
                else => break Ok(()),
            };
            if self.update(message, &dispatcher) == Flow::Quit {
                break Ok(());
            }
        };

        drop(keys);
        drop(tui);
        if let Some(channel) = self.channel.take() {
            channel.close().await;
        }
        self.reconciler.clear();
        info!("Session ended");
        outcome.context("Failed to draw the screen")
    }

    /// Applies one message.
    pub fn update(&mut self, message: Message, dispatcher: &Dispatcher<Self>) -> Flow {
        match message {
            Message::EmailsLoaded { ticket, result } => match result {
                Ok(page) => {
                    self.reconciler.apply_snapshot(ticket, page);
                }
                Err(e) => {
                    if let Some(notice) = self.reconciler.apply_failure(ticket, e) {
                        self.notify(notice);
                    }
                }
            },
            Message::StatsLoaded(result) => match result {
                Ok(stats) => self.stats = Some(stats),
                Err(e) => self.notify(Notice::error(format!("Failed to load stats: {e}"))),
            },
            Message::DetailLoaded(result) => match result {
                Ok(record) => self.detail = Some(record),
                Err(e) => self.notify(Notice::error(format!("Failed to load email: {e}"))),
            },
            Message::AttachmentSaved(result) => match result {
                Ok(path) => self.notify(Notice::success(format!("Saved {}", path.display()))),
                Err(e) => self.notify(Notice::error(format!("Download failed: {e}"))),
            },
            Message::IdentitySaved(result) => {
                if let Err(e) = result {
                    self.notify(Notice::error(format!("Failed to save identity: {e}")));
                }
            }
            Message::Push(event) => self.on_channel_event(event, dispatcher),
            Message::Terminal(Event::Key(key)) => {
                if let Some(action) = self.prompt.on_key(key) {
                    return self.action(action);
                }
            }
            Message::Terminal(_) => {}
            Message::Expire => {
                let now = Instant::now();
                let expired = self.reconciler.expire_highlights(now);
                let dismissed = self.notices.expire(now);
                debug!(highlights = expired.len(), notices = dismissed, "Expired");
            }
            Message::Refresh => self.refresh(),
        }
        Flow::Continue
    }

    fn on_channel_event(&mut self, event: ChannelEvent, dispatcher: &Dispatcher<Self>) {
        match event {
            ChannelEvent::Opened => debug!("Push channel opened"),
            ChannelEvent::Event(event) => {
                dispatcher.dispatch(self, event);
            }
            ChannelEvent::Error(e) => {
                warn!(error = %e, "Push channel error");
                self.notify(Notice::error(format!("Live updates: {e}")));
            }
            ChannelEvent::Closed => {
                self.channel = None;
                self.notify(Notice::info("Live updates stopped; press r to refresh"));
            }
        }
    }

    fn action(&mut self, action: Action) -> Flow {
        match action {
            Action::Run(command) => return self.command(command),
            Action::Invalid(text) => self.notify(Notice::error(text)),
            Action::Select(delta) => self.select(delta),
            Action::OpenSelected => {
                let id = self
                    .selected
                    .selected()
                    .and_then(|i| self.reconciler.emails().get(i))
                    .map(|record| record.id);
                if let Some(id) = id {
                    self.load_detail(id);
                }
            }
            Action::NextView => match self.reconciler.view_state().view() {
                MailView::Inbox => return self.command(Command::SwitchView(MailView::Sent)),
                MailView::Sent => return self.command(Command::SwitchView(MailView::Inbox)),
                MailView::Admin => {}
            },
        }
        Flow::Continue
    }

    /// Moves the row selection, clamped to the held list.
    fn select(&mut self, delta: isize) {
        let len = self.reconciler.emails().len();
        if len == 0 {
            self.selected.select(None);
            return;
        }
        let next = self
            .selected
            .selected()
            .map_or(0, |i| i.saturating_add_signed(delta).min(len - 1));
        self.selected.select(Some(next));
    }

    fn command(&mut self, command: Command) -> Flow {
        let view = self.reconciler.view_state().view();
        match command {
            Command::Refresh => self.refresh(),
            Command::Open(id) => self.load_detail(id),
            Command::Back => self.detail = None,
            Command::SwitchView(target) => {
                if !view.is_mail_view() {
                    self.notify(Notice::info("The dashboard has no other views"));
                } else if self.reconciler.set_view(target) {
                    self.detail = None;
                    self.selected.select(None);
                    self.start_load();
                }
            }
            Command::SetIdentity(raw) => self.change_identity(&raw),
            Command::NextPage => self.step_page(1),
            Command::PrevPage => self.step_page(-1),
            Command::ToggleFlagged | Command::StatusFilter(_) if view.is_mail_view() => {
                self.notify(Notice::info("Filters are available on the dashboard"));
            }
            Command::ToggleFlagged => {
                self.reconciler.toggle_flagged();
                self.start_load();
            }
            Command::StatusFilter(status) => {
                let flagged_only = self.reconciler.view_state().flagged_only();
                if self.reconciler.set_filters(flagged_only, status) {
                    self.start_load();
                }
            }
            Command::Download(id) => self.download(id),
            Command::Quit => return Flow::Quit,
        }
        Flow::Continue
    }

    fn step_page(&mut self, delta: i64) {
        if self.reconciler.step_page(delta) {
            self.start_load();
        } else {
            self.notify(Notice::info("No more pages"));
        }
    }

    fn change_identity(&mut self, raw: &str) {
        if !self.reconciler.view_state().view().is_mail_view() {
            self.notify(Notice::info("The dashboard shows every address"));
            return;
        }
        let identity = match Identity::new(raw) {
            Ok(identity) => identity,
            Err(e) => {
                self.notify(Notice::error(e.to_string()));
                return;
            }
        };
        if !self.reconciler.set_identity(identity.clone()) {
            return;
        }
        self.detail = None;
        self.selected.select(None);

        let store = self.store.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = store.save(&identity).await.map_err(|e| e.to_string());
            let _ = tx.send(Message::IdentitySaved(result)).await;
        });

        // Pushes already queued for the old identity are filtered by membership.
        self.open_channel();
        self.start_load();
    }

    /// Reloads the list, and the stats on the dashboard.
    fn refresh(&mut self) {
        self.start_load();
        if !self.reconciler.view_state().view().is_mail_view() {
            self.load_stats();
        }
    }

    fn start_load(&mut self) {
        if self.reconciler.view_state().view().is_mail_view() && self.reconciler.identity().is_none()
        {
            return;
        }
        let (ticket, query) = self.reconciler.begin_load();
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api.list_emails(&query).await.map_err(|e| e.to_string());
            let _ = tx.send(Message::EmailsLoaded { ticket, result }).await;
        });
    }

    fn load_stats(&self) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api.stats().await.map_err(|e| e.to_string());
            let _ = tx.send(Message::StatsLoaded(result)).await;
        });
    }

    fn load_detail(&self, id: EmailId) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api.get_email(id).await.map_err(|e| e.to_string());
            let _ = tx.send(Message::DetailLoaded(result)).await;
        });
    }

    fn download(&self, id: i64) {
        let filename = self.attachment_name(id).unwrap_or_default();
        let dir = download_dir();
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api
                .download_attachment_to(id, &dir, &filename)
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(Message::AttachmentSaved(result)).await;
        });
    }

    /// Filename of attachment `id` among the open detail and held records.
    fn attachment_name(&self, id: i64) -> Option<String> {
        self.detail
            .iter()
            .chain(self.reconciler.emails())
            .flat_map(EmailRecord::attachment_list)
            .find(|attachment| attachment.id == Some(id))
            .map(|attachment| attachment.filename)
    }

    /// Replaces the push channel; the old one is aborted when dropped.
    fn open_channel(&mut self) {
        self.channel = match PushChannel::open(&self.config) {
            Ok(channel) => Some(channel),
            Err(e) => {
                warn!(error = %e, "Live updates unavailable");
                self.notify(Notice::error(format!("Live updates unavailable: {e}")));
                None
            }
        };
    }

    fn refresh_period(&self) -> Option<Duration> {
        if self.reconciler.view_state().view().is_mail_view() {
            self.config.mail_refresh
        } else {
            Some(self.config.dashboard_refresh)
        }
    }

    fn notify(&mut self, notice: Notice) {
        self.notices.push(notice, Instant::now());
    }

    /// Draws the current state.
    fn draw(&mut self, frame: &mut Frame) {
        let len = self.reconciler.emails().len();
        if self.selected.selected().is_some_and(|i| i >= len) {
            self.selected.select(len.checked_sub(1));
        }
        let screen = Screen {
            reconciler: &self.reconciler,
            stats: self.stats.as_ref(),
            detail: self.detail.as_ref(),
            notices: self.notices.iter().collect(),
            prompt: self.prompt.text(),
            now: Utc::now(),
        };
        view::draw(frame, &screen, &mut self.selected);
    }
}

fn earliest(a: Option<Instant>, b: Option<Instant>) -> Option<Instant> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

async fn next_push(channel: Option<&mut PushChannel>) -> Option<ChannelEvent> {
    match channel {
        Some(channel) => channel.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await,
        None => std::future::pending().await,
    }
}

async fn tick(interval: Option<&mut Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Where `d <id>` saves attachments.
pub fn download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("."))
}
