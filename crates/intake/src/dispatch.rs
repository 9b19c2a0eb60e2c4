//! Delivery of a form snapshot to the dispatch collaborator.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde_json::Value as JsonValue;
use thiserror::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("dispatch rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Successful delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchReceipt {
    pub status: u16,
    pub body: String,
}

#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, snapshot: &JsonValue) -> Result<DispatchReceipt, DispatchError>;
}

/// Posts the snapshot as JSON to a single endpoint.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: Client,
    endpoint: String,
}

impl HttpDispatcher {
    pub fn new(endpoint: impl Into<String>) -> Result<Self, DispatchError> {
        Self::with_timeout(endpoint, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, DispatchError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(&self, snapshot: &JsonValue) -> Result<DispatchReceipt, DispatchError> {
        let body = serde_json::to_vec(snapshot)?;
        tracing::debug!(endpoint = %self.endpoint, bytes = body.len(), "posting form snapshot");
        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .body(body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if status.is_success() {
            Ok(DispatchReceipt {
                status: status.as_u16(),
                body: text,
            })
        } else {
            Err(DispatchError::Rejected {
                status: status.as_u16(),
                body: text,
            })
        }
    }
}
