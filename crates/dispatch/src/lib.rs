//! Notification service for submitted intake forms.
//!
//! `POST /api/send-email` takes the raw form snapshot, builds one message for
//! the operator and one for the submitter, and hands both to a [`Mailer`].
//! Delivery is pluggable: [`OutboxMailer`] stores messages as JSON files for a
//! relay to pick up, [`LogMailer`] only records them in the log.

pub mod config;
pub mod mail;
pub mod message;
pub mod server;

pub use config::{DispatchConfig, MailerKind};
pub use mail::{LogMailer, MailError, Mailer, OutboxMailer};
pub use message::{MessageBody, OutgoingMessage, build_messages, resolve_recipient};
pub use server::{AppState, router};
