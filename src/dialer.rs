use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::AppConfig;

/// Outbound call request in the voice provider's wire shape.
#[derive(Debug, Clone, Serialize)]
pub struct CallRequest {
    pub phone_number: String,
    pub task: String,
    pub model: String,
    pub voice_id: String,
    pub callback_url: String,
}

#[derive(Debug, Deserialize)]
struct CallResponse {
    call_id: Option<String>,
}

#[derive(Debug, Error)]
pub enum DialError {
    #[error("voice provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("voice provider returned {status}: {body}")]
    Rejected { status: reqwest::StatusCode, body: String },
    #[error("voice provider response missing call_id")]
    MissingCallId,
}

/// Thin wrapper over the voice-call provider. Success means the provider
/// accepted the call and issued a correlation id; everything else is an
/// error for the caller to record.
#[async_trait]
pub trait Dialer: Send + Sync + 'static {
    async fn place_call(&self, request: &CallRequest) -> Result<String, DialError>;
}

pub struct BlandDialer {
    client: reqwest::Client,
    api_url: String,
    api_key: Option<String>,
}

impl BlandDialer {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.dispatch_timeout_seconds))
            .build()
            .context("failed to build dialer HTTP client")?;
        Ok(Self {
            client,
            api_url: config.bland_api_url.clone(),
            api_key: config.bland_api_key.clone(),
        })
    }
}

#[async_trait]
impl Dialer for BlandDialer {
    async fn place_call(&self, request: &CallRequest) -> Result<String, DialError> {
        let mut builder = self.client.post(&self.api_url).json(request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", key);
        }

        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DialError::Rejected { status, body });
        }

        let parsed: CallResponse = response.json().await?;
        parsed.call_id.ok_or(DialError::MissingCallId)
    }
}
