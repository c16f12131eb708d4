// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock slip verifier with scripted results.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Mutex;

use innkeep_core::traits::adapter::PluginAdapter;
use innkeep_core::traits::verifier::{QuotaStatus, SlipVerifier, VerificationOutcome};
use innkeep_core::types::{AdapterType, HealthStatus};
use innkeep_core::InnkeepError;

/// Returns queued results in FIFO order. When the queue is empty, every
/// slip verifies.
#[derive(Default)]
pub struct MockSlipVerifier {
    results: Mutex<VecDeque<Result<VerificationOutcome, String>>>,
    calls: Mutex<Vec<String>>,
    quota_exceeded: AtomicBool,
}

impl MockSlipVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn push_outcome(&self, outcome: VerificationOutcome) {
        self.results.lock().await.push_back(Ok(outcome));
    }

    /// Queue a transport failure, surfaced as `InnkeepError::Provider`.
    pub async fn push_error(&self, message: &str) {
        self.results.lock().await.push_back(Err(message.to_string()));
    }

    pub fn set_quota_exceeded(&self, exceeded: bool) {
        self.quota_exceeded.store(exceeded, Ordering::SeqCst);
    }

    /// Image URLs passed to `verify_slip`, in call order.
    pub async fn calls(&self) -> Vec<String> {
        self.calls.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockSlipVerifier {
    fn name(&self) -> &str {
        "mock-verifier"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::SlipVerifier
    }

    async fn health_check(&self) -> Result<HealthStatus, InnkeepError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl SlipVerifier for MockSlipVerifier {
    async fn check_quota(&self) -> Result<QuotaStatus, InnkeepError> {
        let used = self.calls.lock().await.len() as u64;
        Ok(QuotaStatus {
            exceeded: self.quota_exceeded.load(Ordering::SeqCst),
            used,
            limit: None,
        })
    }

    async fn verify_slip(&self, image_url: &str) -> Result<VerificationOutcome, InnkeepError> {
        self.calls.lock().await.push(image_url.to_string());
        match self.results.lock().await.pop_front() {
            Some(Ok(outcome)) => Ok(outcome),
            Some(Err(message)) => Err(InnkeepError::Provider {
                message,
                source: None,
            }),
            None => Ok(VerificationOutcome::verified(json!({
                "success": true,
                "data": { "transRef": "MOCK-REF", "amount": 1000 }
            }))),
        }
    }
}
