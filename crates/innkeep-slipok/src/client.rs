// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the SlipOK verification API.
//!
//! Provides [`SlipokClient`], which handles request construction,
//! authentication, and mapping of provider answers to verification outcomes.

use std::time::Duration;

use innkeep_config::model::SlipokConfig;
use innkeep_core::{InnkeepError, VerificationOutcome};
use serde_json::json;
use tracing::{debug, info, warn};

use crate::types::{SlipokRequest, SlipokResponse};

/// Outcome code used when credentials are missing.
pub const NOT_CONFIGURED: &str = "NOT_CONFIGURED";

#[derive(Debug, Clone)]
struct Credentials {
    api_key: String,
    branch_id: String,
}

/// HTTP client for SlipOK API communication.
///
/// Provider rejections (bad slip, duplicate, quota) come back as `Ok`
/// outcomes; only transport and decoding failures are `Err`.
#[derive(Debug, Clone)]
pub struct SlipokClient {
    client: reqwest::Client,
    credentials: Option<Credentials>,
    api_url: String,
    public_base_url: Option<String>,
    timeout: Duration,
}

impl SlipokClient {
    /// Creates a client from configuration. Missing or blank credentials
    /// produce an unconfigured client rather than an error.
    pub fn new(config: &SlipokConfig) -> Result<Self, InnkeepError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InnkeepError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let credentials = match (non_blank(&config.api_key), non_blank(&config.branch_id)) {
            (Some(api_key), Some(branch_id)) => Some(Credentials {
                api_key: api_key.to_string(),
                branch_id: branch_id.to_string(),
            }),
            _ => None,
        };

        Ok(Self {
            client,
            credentials,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            public_base_url: config.public_base_url.clone(),
            timeout,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    /// Endpoint for this branch, or `None` when unconfigured.
    pub fn endpoint(&self) -> Option<String> {
        self.credentials
            .as_ref()
            .map(|c| format!("{}/{}", self.api_url, c.branch_id))
    }

    /// Turn a stored slip path into an absolute URL the provider can fetch.
    pub fn resolve_image_url(&self, image_url: &str) -> String {
        if image_url.starts_with("http://") || image_url.starts_with("https://") {
            return image_url.to_string();
        }
        match &self.public_base_url {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                image_url.trim_start_matches('/')
            ),
            None => image_url.to_string(),
        }
    }

    /// Submit the slip at `image_url` for verification.
    pub async fn verify(&self, image_url: &str) -> Result<VerificationOutcome, InnkeepError> {
        let (Some(credentials), Some(endpoint)) = (&self.credentials, self.endpoint()) else {
            warn!("SlipOK API key or branch ID not configured, skipping verification");
            return Ok(VerificationOutcome::failed(
                json!({ "code": NOT_CONFIGURED }),
                format!("{NOT_CONFIGURED}: SlipOK API key or branch ID not configured"),
            ));
        };

        let request = SlipokRequest {
            url: self.resolve_image_url(image_url),
            log: true,
        };

        let response = self
            .client
            .post(&endpoint)
            .header("x-authorization", &credentials.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    InnkeepError::Timeout {
                        duration: self.timeout,
                    }
                } else {
                    InnkeepError::Provider {
                        message: format!("SlipOK request failed: {e}"),
                        source: Some(Box::new(e)),
                    }
                }
            })?;

        let status = response.status();
        debug!(status = %status, "SlipOK response received");

        let body = response.text().await.map_err(|e| InnkeepError::Provider {
            message: format!("failed to read SlipOK response body: {e}"),
            source: Some(Box::new(e)),
        })?;

        if !status.is_success() {
            let raw = serde_json::from_str::<serde_json::Value>(&body)
                .unwrap_or_else(|_| json!({ "body": body }));
            let raw = json!({ "http_status": status.as_u16(), "response": raw });
            if status.as_u16() == 429 {
                warn!("SlipOK rate limited (HTTP 429), treating as quota exceeded");
                return Ok(VerificationOutcome::quota_exceeded(
                    raw,
                    "SlipOK monthly quota exceeded",
                ));
            }
            warn!(status = %status, "SlipOK API error");
            return Ok(VerificationOutcome::failed(
                raw,
                format!("HTTP_{}: {}", status.as_u16(), truncate(&body, 200)),
            ));
        }

        let raw: serde_json::Value =
            serde_json::from_str(&body).map_err(|e| InnkeepError::Provider {
                message: format!("malformed SlipOK response: {e}"),
                source: Some(Box::new(e)),
            })?;
        let parsed: SlipokResponse =
            serde_json::from_value(raw.clone()).map_err(|e| InnkeepError::Provider {
                message: format!("unexpected SlipOK response shape: {e}"),
                source: Some(Box::new(e)),
            })?;

        if parsed.success {
            let details = parsed.details();
            info!(
                transaction_id = details.transaction_id.as_deref().unwrap_or("unknown"),
                amount = ?details.amount,
                "SlipOK verification successful"
            );
            return Ok(VerificationOutcome::verified(raw));
        }

        let message = parsed
            .message
            .clone()
            .unwrap_or_else(|| "Slip verification failed".to_string());
        if parsed.is_quota_error() {
            warn!(%message, "SlipOK reported quota exceeded");
            return Ok(VerificationOutcome::quota_exceeded(raw, message));
        }

        let code = parsed
            .code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "VERIFICATION_FAILED".to_string());
        warn!(error_code = %code, error_message = %message, "SlipOK verification failed");
        Ok(VerificationOutcome::failed(raw, format!("{code}: {message}")))
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
