// SPDX-FileCopyrightText: 2026 Rolechat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for OpenAI-compatible chat completion endpoints.
//!
//! [`OpenAiClient`] handles bearer authentication, retries on transient
//! status codes before the stream opens, and hands the response body to
//! the SSE parser.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use rolechat_core::{ProviderStream, RolechatError};
use tracing::{debug, warn};

use crate::sse;
use crate::types::{ApiErrorResponse, ChatCompletionRequest};

const COMPLETIONS_PATH: &str = "/chat/completions";

#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: String,
    max_retries: u32,
    retry_delay: Duration,
}

impl OpenAiClient {
    /// Build a client for `base_url` (e.g. `https://api.deepseek.com`).
    pub fn new(api_key: &str, base_url: &str, max_retries: u32) -> Result<Self, RolechatError> {
        let mut headers = HeaderMap::new();
        let mut auth = HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| RolechatError::Config(format!("invalid API key header value: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| RolechatError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}{COMPLETIONS_PATH}", base_url.trim_end_matches('/')),
            max_retries,
            retry_delay: Duration::from_secs(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Shortens the pause between retries.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Send a streaming request. Transient statuses (429, 500, 502, 503)
    /// are retried up to `max_retries` times; anything else that is not a
    /// success is a rejection.
    pub async fn stream_chat(
        &self,
        request: &ChatCompletionRequest,
    ) -> Result<ProviderStream, RolechatError> {
        let mut req = request.clone();
        req.stream = true;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying streaming request after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = self
                .client
                .post(&self.endpoint)
                .json(&req)
                .send()
                .await
                .map_err(|e| RolechatError::ProviderRejected {
                    message: format!("HTTP request failed: {e}"),
                    status: None,
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "streaming response received");

            if status.is_success() {
                return Ok(sse::parse_sse_stream(response));
            }

            let body = response.text().await.unwrap_or_default();
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient error, will retry");
                continue;
            }

            return Err(rejection(status, &body));
        }

        Err(RolechatError::ProviderRejected {
            message: "streaming request failed after retries".into(),
            status: None,
            source: None,
        })
    }
}

fn rejection(status: StatusCode, body: &str) -> RolechatError {
    let message = match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_err) => format!(
            "provider error ({}): {}",
            api_err.error.type_.as_deref().unwrap_or("unknown"),
            api_err.error.message
        ),
        Err(_) => format!("API returned {status}: {body}"),
    };
    RolechatError::ProviderRejected {
        message,
        status: Some(status.as_u16()),
        source: None,
    }
}

fn is_transient_error(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
    )
}
