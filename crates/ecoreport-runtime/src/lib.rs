//! # ecoreport-runtime
//!
//! Async runtime for the report wizard.
//!
//! This crate wires the deterministic state machine from `ecoreport-core`
//! to the outside world: a chat transport, a session store with idle
//! expiry, environment-driven configuration, and report delivery (review
//! channel plus a detached notification email).
//!
//! ## Guarantees
//!
//! - Events from one chat are applied in order under that chat's session
//!   lock; distinct chats never wait on each other.
//! - Review-channel delivery is awaited on the submit path and decides the
//!   user-facing outcome.
//! - The notification email is fired as a detached task and is never
//!   allowed to fail a submission.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ecoreport_runtime::{AppConfig, Engine};
//!
//! let config = AppConfig::from_env()?;
//! let engine = Engine::new(
//!     transport,
//!     mailer,
//!     config.review_channel,
//!     config.media_limits,
//!     config.session_idle_ttl,
//! );
//! engine.run(events).await;
//! ```

pub mod config;
pub mod engine;
pub mod mailer;
pub mod session;
pub mod transport;

pub use config::{AppConfig, ConfigError, SmtpConfig};
pub use engine::Engine;
pub use mailer::{compose_report_email, EmailAttachment, EmailMessage, MailError, Mailer};
pub use session::SessionStore;
pub use transport::{
    ChatError, ChatEvent, ChatEventKind, ChatId, ChatTransport, FileDownload,
};
