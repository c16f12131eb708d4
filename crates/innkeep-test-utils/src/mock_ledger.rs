// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock loyalty ledger that records every call.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use innkeep_core::traits::adapter::PluginAdapter;
use innkeep_core::traits::loyalty::LoyaltyLedger;
use innkeep_core::types::{AdapterType, HealthStatus};
use innkeep_core::InnkeepError;

/// One call made against the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerCall {
    Award {
        user_id: String,
        points: i64,
        description: String,
        reference_id: String,
    },
    Deduct {
        user_id: String,
        points: i64,
        description: String,
    },
}

/// Records calls in order. When set to fail, calls are still recorded and
/// then return a provider error.
#[derive(Default)]
pub struct MockLoyaltyLedger {
    calls: Mutex<Vec<LedgerCall>>,
    failing: AtomicBool,
}

impl MockLoyaltyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// A ledger whose every call fails.
    pub fn failing() -> Self {
        let ledger = Self::default();
        ledger.set_failing(true);
        ledger
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub async fn calls(&self) -> Vec<LedgerCall> {
        self.calls.lock().await.clone()
    }

    fn outcome(&self) -> Result<(), InnkeepError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(InnkeepError::Provider {
                message: "loyalty ledger unavailable".into(),
                source: None,
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl PluginAdapter for MockLoyaltyLedger {
    fn name(&self) -> &str {
        "mock-ledger"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::LoyaltyLedger
    }

    async fn health_check(&self) -> Result<HealthStatus, InnkeepError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl LoyaltyLedger for MockLoyaltyLedger {
    async fn award(
        &self,
        user_id: &str,
        points: i64,
        description: &str,
        reference_id: &str,
    ) -> Result<(), InnkeepError> {
        self.calls.lock().await.push(LedgerCall::Award {
            user_id: user_id.to_string(),
            points,
            description: description.to_string(),
            reference_id: reference_id.to_string(),
        });
        self.outcome()
    }

    async fn deduct(
        &self,
        user_id: &str,
        points: i64,
        description: &str,
    ) -> Result<(), InnkeepError> {
        self.calls.lock().await.push(LedgerCall::Deduct {
            user_id: user_id.to_string(),
            points,
            description: description.to_string(),
        });
        self.outcome()
    }
}
