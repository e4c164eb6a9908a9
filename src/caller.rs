use crate::config::{mask_phone_number, CallerConfig};
use anyhow::{Context, Result};
use reqwest::{Client, Url};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::log::{debug, error, info};

#[derive(thiserror::Error, Debug)]
pub enum DispatchError {
    #[error("Invalid call provider URL: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Network(#[from] reqwest::Error),
}

/// Outcome of a single call attempt, returned as-is to HTTP callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CallResult {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Provider response body, never interpreted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
impl CallResult {
    pub fn initiated(data: Value) -> Self {
        Self {
            success: true,
            message: Some("Call initiated".to_string()),
            data: Some(data),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message: None,
            data: None,
            error: Some(error.into()),
        }
    }
}

/// Builds the CallMeBot `start.php` URL, percent-encoding every query value.
pub fn build_call_url(caller: &CallerConfig, message: &str) -> Result<Url, DispatchError> {
    let separator = if caller.provider_url.contains('?') {
        '&'
    } else {
        '?'
    };

    let url = format!(
        "{}{separator}user={}&text={}&lang={}&rpt={}",
        caller.provider_url,
        urlencoding::encode(&caller.username),
        urlencoding::encode(message),
        urlencoding::encode(&caller.voice_lang),
        caller.repeat_count
    );

    Url::parse(&url).map_err(|e| DispatchError::InvalidUrl(e.to_string()))
}

#[derive(Clone)]
pub struct CallDispatcher {
    caller: Arc<CallerConfig>,
    client: Client,
}
impl CallDispatcher {
    pub fn new(caller: CallerConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = caller.timeout() {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .context("Failed to build call dispatcher HTTP client")?;

        Ok(Self {
            caller: Arc::new(caller),
            client,
        })
    }

    pub async fn place_default_call(&self) -> CallResult {
        self.place_call(&self.caller.message).await
    }

    pub async fn place_call(&self, message: &str) -> CallResult {
        info!(
            "Initiating Telegram call to {} (backup number {})",
            self.caller.username,
            mask_phone_number(&self.caller.phone_number)
        );
        info!("Call message: {message}");

        match self.dispatch(message).await {
            Ok(data) => {
                info!("Call initiated successfully!");
                debug!("Call provider response: {data}");
                CallResult::initiated(data)
            }
            Err(e) => {
                error!("Error making call: {e}");
                CallResult::failed(e.to_string())
            }
        }
    }

    async fn dispatch(&self, message: &str) -> Result<Value, DispatchError> {
        let url = build_call_url(&self.caller, message)?;
        let text = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| e.without_url())?
            .text()
            .await
            .map_err(|e| e.without_url())?;

        Ok(serde_json::from_str::<Value>(&text).unwrap_or_else(|_| Value::String(text)))
    }
}
