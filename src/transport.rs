//! HTTP transport to move providers.
//!
//! The gateway only ever sees [`TransportRequest`] and
//! [`TransportResponse`]; swapping the transport is how tests run the
//! full turn cycle without a network.

use derive_getters::Getters;
use derive_more::{Display, Error};
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// A JSON POST to a provider endpoint.
#[derive(Clone, Getters)]
pub struct TransportRequest {
    /// Full endpoint URL.
    endpoint: String,
    /// Header name/value pairs. Values may contain credentials.
    headers: Vec<(String, String)>,
    /// JSON request body.
    body: serde_json::Value,
}

impl TransportRequest {
    /// Creates a request.
    pub fn new(endpoint: String, headers: Vec<(String, String)>, body: serde_json::Value) -> Self {
        Self {
            endpoint,
            headers,
            body,
        }
    }
}

impl std::fmt::Debug for TransportRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(name, _)| name.as_str()).collect();
        f.debug_struct("TransportRequest")
            .field("endpoint", &self.endpoint)
            .field("headers", &header_names)
            .field("body", &self.body)
            .finish()
    }
}

/// Status and raw body of a provider response.
#[derive(Debug, Clone, PartialEq, Eq, Getters)]
pub struct TransportResponse {
    /// HTTP status code.
    status: u16,
    /// Response body as text.
    body: String,
}

impl TransportResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// True for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network-level failure: no HTTP response was obtained.
#[derive(Debug, Clone, Display, Error)]
#[display("Transport error: {} at {}:{}", message, file, line)]
pub struct TransportError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl TransportError {
    /// Creates a new transport error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        let message = message.into();
        error!(error_message = %message, "Transport error created");
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Sends provider requests.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Issues `request` and returns whatever the server answered.
    ///
    /// Non-success statuses are returned as responses, not errors.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// [`Transport`] over `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport whose requests fail after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the HTTP client cannot be built.
    #[instrument]
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        info!("Creating HTTP transport");
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::new(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, request), fields(endpoint = %request.endpoint))]
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self.client.post(&request.endpoint).json(&request.body);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        debug!("Sending provider request");
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::new(format!("Request timed out: {}", e))
            } else {
                TransportError::new(format!("Request failed: {}", e))
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::new(format!("Failed to read response: {}", e)))?;

        debug!(status, body_length = body.len(), "Provider responded");
        Ok(TransportResponse::new(status, body))
    }
}
