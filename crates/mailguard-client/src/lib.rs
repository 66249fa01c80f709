//! # mailguard-client
//!
//! Network side of the MailGuard front-ends: the REST client for the DLP
//! API, the live push channel (Server-Sent Events or Socket.IO) and the
//! locally persisted user identity.
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailguard_client::{ApiClient, ChannelEvent, ClientConfig, PushChannel};
//! use mailguard_core::{MailView, ViewState};
//!
//! #[tokio::main]
//! async fn main() -> mailguard_client::Result<()> {
//!     let config = ClientConfig::load(None).await?.build()?;
//!     let api = ApiClient::new(&config)?;
//!
//!     let query = ViewState::new(MailView::Admin, config.admin_page_size).query();
//!     let page = api.list_emails(&query).await?;
//!     println!("{} of {} emails", page.emails.len(), page.total);
//!
//!     let mut channel = PushChannel::open(&config)?;
//!     while let Some(event) = channel.recv().await {
//!         if let ChannelEvent::Event(event) = event {
//!             println!("{:?}", event.kind());
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Push transports
//!
//! | Transport | Endpoint | Reconnect |
//! |-----------|----------|-----------|
//! | `sse` | `GET /api/events/stream` | indefinite, server `retry:` or 3 s |
//! | `socket` | `/socket.io/?EIO=4&transport=websocket` | 5 attempts, 1 s apart |

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod api;
pub mod channel;
pub mod config;
mod error;
pub mod identity;
pub mod socketio;
pub mod sse;

pub use api::{ApiClient, SendReceipt};
pub use channel::{ChannelEvent, PushChannel};
pub use config::{ClientConfig, ConfigBuilder, ReconnectPolicy, Transport};
pub use error::{Error, Result};
pub use identity::IdentityStore;
pub use sse::{SseDecoder, SseEvent};
