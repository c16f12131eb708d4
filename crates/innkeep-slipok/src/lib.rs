// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SlipOK payment slip verification adapter.
//!
//! This crate implements [`SlipVerifier`] for the SlipOK API. Calls are
//! counted in a persistent usage table and gated by a monthly
//! [`QuotaTracker`], since the provider offers no quota endpoint.

pub mod client;
pub mod quota;
pub mod types;
pub mod usage;

use async_trait::async_trait;
use chrono::Utc;
use innkeep_config::model::SlipokConfig;
use innkeep_core::{
    AdapterType, HealthStatus, InnkeepError, PluginAdapter, QuotaStatus, SlipVerifier,
    SlipokStatus, VerificationOutcome,
};
use innkeep_storage::Database;
use tokio::sync::Mutex;
use tracing::{error, info};

pub use client::SlipokClient;
pub use quota::QuotaTracker;
pub use usage::UsageLedger;

/// SlipOK verifier implementing [`SlipVerifier`].
pub struct SlipokVerifier {
    client: SlipokClient,
    usage: UsageLedger,
    quota: Mutex<QuotaTracker>,
}

impl SlipokVerifier {
    /// Build the verifier and re-hydrate this month's usage from `db`.
    pub async fn new(config: &SlipokConfig, db: Database) -> Result<Self, InnkeepError> {
        let client = SlipokClient::new(config)?;
        let usage = UsageLedger::new(db);
        let quota = QuotaTracker::from_usage(config.monthly_quota, &usage, Utc::now()).await?;

        info!(
            configured = client.is_configured(),
            used = quota.used(),
            limit = ?config.monthly_quota,
            "SlipOK verifier initialized"
        );

        Ok(Self {
            client,
            usage,
            quota: Mutex::new(quota),
        })
    }

    pub fn client(&self) -> &SlipokClient {
        &self.client
    }
}

#[async_trait]
impl PluginAdapter for SlipokVerifier {
    fn name(&self) -> &str {
        "slipok"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::SlipVerifier
    }

    async fn health_check(&self) -> Result<HealthStatus, InnkeepError> {
        if !self.client.is_configured() {
            return Ok(HealthStatus::Degraded(
                "SlipOK API key or branch ID not configured".into(),
            ));
        }
        let status = self.quota.lock().await.check(Utc::now());
        if status.exceeded {
            return Ok(HealthStatus::Degraded("monthly quota exceeded".into()));
        }
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl SlipVerifier for SlipokVerifier {
    async fn check_quota(&self) -> Result<QuotaStatus, InnkeepError> {
        Ok(self.quota.lock().await.check(Utc::now()))
    }

    async fn verify_slip(&self, image_url: &str) -> Result<VerificationOutcome, InnkeepError> {
        if !self.client.is_configured() {
            return self.client.verify(image_url).await;
        }

        // Timeouts and unreadable bodies still count: the request may have
        // been billed by SlipOK.
        let result = self.client.verify(image_url).await;
        let status = match &result {
            Ok(outcome) => outcome.status,
            Err(_) => SlipokStatus::Failed,
        };
        let now = Utc::now();
        {
            let mut quota = self.quota.lock().await;
            quota.record_call(now);
            if status == SlipokStatus::QuotaExceeded {
                quota.mark_exhausted(now);
            }
        }
        // Usage recording is best-effort.
        if let Err(e) = self.usage.record(status, now).await {
            error!(error = %e, "failed to record SlipOK usage");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_url: &str, monthly_quota: Option<u64>) -> SlipokConfig {
        SlipokConfig {
            api_key: Some("k".into()),
            branch_id: Some("b".into()),
            api_url: api_url.to_string(),
            public_base_url: None,
            timeout_secs: 5,
            monthly_quota,
        }
    }

    #[tokio::test]
    async fn calls_are_counted_against_the_monthly_cap() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"success": true})),
            )
            .mount(&server)
            .await;

        let db = Database::open_in_memory().await.unwrap();
        let verifier = SlipokVerifier::new(&config(&server.uri(), Some(2)), db.clone())
            .await
            .unwrap();

        assert!(!verifier.check_quota().await.unwrap().exceeded);
        verifier.verify_slip("https://cdn.example/1.jpg").await.unwrap();
        verifier.verify_slip("https://cdn.example/2.jpg").await.unwrap();
        let status = verifier.check_quota().await.unwrap();
        assert!(status.exceeded);
        assert_eq!(status.used, 2);

        // A fresh verifier over the same database sees the same usage.
        let restarted = SlipokVerifier::new(&config(&server.uri(), Some(2)), db)
            .await
            .unwrap();
        assert!(restarted.check_quota().await.unwrap().exceeded);
    }

    #[tokio::test]
    async fn errored_calls_still_count_as_usage() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let db = Database::open_in_memory().await.unwrap();
        let verifier = SlipokVerifier::new(&config(&server.uri(), Some(5)), db.clone())
            .await
            .unwrap();
        let err = verifier.verify_slip("https://cdn.example/1.jpg").await;
        assert!(err.is_err());
        assert_eq!(verifier.check_quota().await.unwrap().used, 1);

        let usage = UsageLedger::new(db);
        assert_eq!(usage.monthly_count(Utc::now()).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn provider_quota_error_trips_the_tracker() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let db = Database::open_in_memory().await.unwrap();
        let verifier = SlipokVerifier::new(&config(&server.uri(), None), db).await.unwrap();
        let outcome = verifier.verify_slip("https://cdn.example/1.jpg").await.unwrap();
        assert_eq!(outcome.status, SlipokStatus::QuotaExceeded);
        assert!(verifier.check_quota().await.unwrap().exceeded);
        assert!(matches!(
            verifier.health_check().await.unwrap(),
            HealthStatus::Degraded(_)
        ));
    }

    #[tokio::test]
    async fn unconfigured_verifier_is_degraded_and_uncounted() {
        let db = Database::open_in_memory().await.unwrap();
        let mut cfg = config("https://api.example", Some(1));
        cfg.branch_id = None;
        let verifier = SlipokVerifier::new(&cfg, db).await.unwrap();

        let outcome = verifier.verify_slip("https://cdn.example/1.jpg").await.unwrap();
        assert_eq!(outcome.status, SlipokStatus::Failed);
        assert_eq!(verifier.check_quota().await.unwrap().used, 0);
        assert!(matches!(
            verifier.health_check().await.unwrap(),
            HealthStatus::Degraded(_)
        ));
    }
}
