// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Slip verification provider trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::InnkeepError;
use crate::traits::adapter::PluginAdapter;
use crate::types::SlipokStatus;

/// Provider quota snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaStatus {
    pub exceeded: bool,
    /// Calls made in the current quota window.
    pub used: u64,
    /// Window limit, if one is configured.
    pub limit: Option<u64>,
}

/// Result of one verification call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    /// One of `Verified`, `Failed`, or `QuotaExceeded`; never `Pending`.
    pub status: SlipokStatus,
    /// Raw provider payload, persisted for audit.
    pub raw_response: serde_json::Value,
    pub error_message: Option<String>,
}

impl VerificationOutcome {
    pub fn verified(raw_response: serde_json::Value) -> Self {
        Self {
            status: SlipokStatus::Verified,
            raw_response,
            error_message: None,
        }
    }

    pub fn failed(raw_response: serde_json::Value, message: impl Into<String>) -> Self {
        Self {
            status: SlipokStatus::Failed,
            raw_response,
            error_message: Some(message.into()),
        }
    }

    pub fn quota_exceeded(raw_response: serde_json::Value, message: impl Into<String>) -> Self {
        Self {
            status: SlipokStatus::QuotaExceeded,
            raw_response,
            error_message: Some(message.into()),
        }
    }
}

/// External slip-recognition service.
#[async_trait]
pub trait SlipVerifier: PluginAdapter {
    /// Whether another verification call is allowed.
    async fn check_quota(&self) -> Result<QuotaStatus, InnkeepError>;

    /// Verify the transfer slip image at `image_url`.
    ///
    /// Provider-side rejections are returned as `Ok` with a non-verified
    /// status; `Err` means the call itself failed (network, timeout, bad payload).
    async fn verify_slip(&self, image_url: &str) -> Result<VerificationOutcome, InnkeepError>;
}
