//! @ai:module:intent Answering-service client for harness execution
//! @ai:module:layer infrastructure
//! @ai:module:public_api AnswerClientTrait, AnswerRequest, AnswerResponse, AnswerError, HttpAnswerClient, MockAnswerClient
//! @ai:module:stateless false

use crate::config::ServiceConfig;
use crate::dataset::ExamVariant;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// @ai:intent Request sent to the answering service for one item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerRequest {
    pub question: String,
    pub exam_variant: ExamVariant,
    pub user_id: String,
    /// Synthetic per-item session so repeated runs never share caller state
    pub session_id: String,
}

/// @ai:intent Answer and self-assessment returned by the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    pub is_verified: bool,
    pub trust_score: f64,
    pub verifier_equiv: bool,
}

impl AnswerResponse {
    /// @ai:intent Reject responses whose trust score is not a probability
    /// @ai:effects pure
    pub fn validated(self) -> Result<Self, AnswerError> {
        if !self.trust_score.is_finite() || !(0.0..=1.0).contains(&self.trust_score) {
            return Err(AnswerError::Malformed(format!(
                "trust_score {} outside [0, 1]",
                self.trust_score
            )));
        }
        Ok(self)
    }
}

/// @ai:intent Failure of a single call to the answering service
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnswerError {
    #[error("request timed out after {0}ms")]
    Timeout(u64),

    #[error("service unreachable: {0}")]
    Unreachable(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("service returned HTTP {status}: {body}")]
    Service { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl AnswerError {
    /// @ai:intent Whether the call never reached the service at all
    /// @ai:effects pure
    pub fn is_transport_level(&self) -> bool {
        matches!(self, AnswerError::Unreachable(_) | AnswerError::Transport(_))
    }
}

/// @ai:intent Trait for the answering contract the harness scores
#[allow(async_fn_in_trait)]
pub trait AnswerClientTrait: Send + Sync {
    /// @ai:intent Ask the service one question
    async fn answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, AnswerError>;
}

/// @ai:intent HTTP client for the answering service
pub struct HttpAnswerClient {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
    timeout_ms: u64,
}

impl HttpAnswerClient {
    /// @ai:intent Create a client from service configuration
    /// @ai:effects env
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let token = std::env::var(&config.token_env).ok().filter(|t| !t.is_empty());

        if token.is_none() {
            tracing::warn!(
                "{} not set, calling {} without authorization",
                config.token_env,
                config.endpoint
            );
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            token,
            timeout_ms: config.timeout_ms,
        })
    }

    /// @ai:intent Map a reqwest failure onto the harness error taxonomy
    /// @ai:effects pure
    fn classify(&self, err: reqwest::Error) -> AnswerError {
        if err.is_timeout() {
            AnswerError::Timeout(self.timeout_ms)
        } else if err.is_connect() {
            AnswerError::Unreachable(err.to_string())
        } else if err.is_decode() {
            AnswerError::Malformed(err.to_string())
        } else {
            AnswerError::Transport(err.to_string())
        }
    }
}

impl AnswerClientTrait for HttpAnswerClient {
    /// @ai:intent POST the question and decode the answer
    /// @ai:effects network
    async fn answer(&self, request: &AnswerRequest) -> Result<AnswerResponse, AnswerError> {
        let mut builder = self.client.post(&self.endpoint).json(request);

        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(AnswerError::Service {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| AnswerError::Malformed(e.to_string()))
    }
}

/// @ai:intent Mock client returning one fixed response, used for dry runs
pub struct MockAnswerClient {
    response: AnswerResponse,
}

impl MockAnswerClient {
    /// @ai:intent Create a mock client that returns a fixed response
    /// @ai:effects pure
    pub fn new(response: AnswerResponse) -> Self {
        Self { response }
    }

    /// @ai:intent Mock client that reports every answer as verified and equivalent
    /// @ai:effects pure
    pub fn always_verified(answer: &str) -> Self {
        Self::new(AnswerResponse {
            answer: answer.to_string(),
            is_verified: true,
            trust_score: 1.0,
            verifier_equiv: true,
        })
    }
}

impl AnswerClientTrait for MockAnswerClient {
    /// @ai:intent Return mock response
    /// @ai:effects pure
    async fn answer(&self, _request: &AnswerRequest) -> Result<AnswerResponse, AnswerError> {
        Ok(self.response.clone())
    }
}
