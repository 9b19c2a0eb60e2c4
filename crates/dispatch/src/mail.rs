use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::message::OutgoingMessage;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("no recipient address at {0:?}")]
    MissingRecipient(String),

    #[error("outbox write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("message encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), MailError>;
}

#[derive(Serialize)]
struct StoredMessage<'a> {
    id: Uuid,
    created_at: String,
    #[serde(flatten)]
    message: &'a OutgoingMessage,
}

/// Writes each message as `<timestamp>-<uuid>.json` into a directory.
#[derive(Debug, Clone)]
pub struct OutboxMailer {
    dir: PathBuf,
}

impl OutboxMailer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), MailError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let now = Utc::now();
        let id = Uuid::new_v4();
        let stored = StoredMessage {
            id,
            created_at: now.to_rfc3339(),
            message,
        };
        let file = self
            .dir
            .join(format!("{}-{id}.json", now.format("%Y%m%dT%H%M%S%.3f")));
        tokio::fs::write(&file, serde_json::to_vec_pretty(&stored)?).await?;
        info!(to = %message.to, subject = %message.subject, file = %file.display(), "message queued");
        Ok(())
    }
}

/// Records messages in the log and delivers nothing.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &OutgoingMessage) -> Result<(), MailError> {
        info!(
            from = %message.from,
            to = %message.to,
            cc = ?message.cc,
            subject = %message.subject,
            "message (log only)"
        );
        Ok(())
    }
}
