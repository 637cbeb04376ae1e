//! Transport adapter for the external retirement calculator.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::CalculatorConfig;
use crate::model::{RetirementRequest, RetirementResult};

/// Shown when a transport failure carries no message of its own.
pub const DEFAULT_FAILURE_MESSAGE: &str =
    "Unable to calculate your retirement plan right now. Please try again later.";

/// Failures talking to the calculator.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The service answered with a non-success status. `error` is the parsed
    /// JSON body, when there was one.
    #[error("calculator rejected the request with status {status}")]
    Rejected { status: u16, error: Option<Value> },

    /// The request never produced a usable response.
    #[error("calculator request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// An arbitrary error payload, shaped like `{ "error": { "message": .. } }`.
    #[error("calculator transport failure")]
    Payload(Value),
}

impl TransportError {
    /// The single human-readable message surfaced to the user.
    pub fn user_message(&self) -> String {
        let nested = match self {
            TransportError::Rejected {
                error: Some(body), ..
            } => body.get("message"),
            TransportError::Payload(payload) => payload.pointer("/error/message"),
            _ => None,
        };
        nested
            .and_then(Value::as_str)
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_FAILURE_MESSAGE)
            .to_string()
    }
}

/// Something that can run a projection for a request.
#[async_trait]
pub trait CalculatorTransport: Send + Sync {
    async fn calculate(
        &self,
        request: &RetirementRequest,
    ) -> Result<RetirementResult, TransportError>;
}

/// HTTP client for the calculator service.
pub struct HttpCalculator {
    client: Client,
    url: String,
}

impl HttpCalculator {
    pub fn new(config: &CalculatorConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    pub fn with_client(client: Client, config: &CalculatorConfig) -> Self {
        Self {
            client,
            url: config.calculate_url(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CalculatorTransport for HttpCalculator {
    async fn calculate(
        &self,
        request: &RetirementRequest,
    ) -> Result<RetirementResult, TransportError> {
        debug!(url = %self.url, ?request, "posting calculation request");
        let response = self.client.post(&self.url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let error = serde_json::from_str::<Value>(&body).ok();
            return Err(TransportError::Rejected {
                status: status.as_u16(),
                error,
            });
        }

        Ok(response.json::<RetirementResult>().await?)
    }
}
