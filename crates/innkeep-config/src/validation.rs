// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes.

use crate::diagnostic::ConfigError;
use crate::model::InnkeepConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &InnkeepConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut invalid = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.engine.log_level.as_str()) {
        invalid(format!(
            "engine.log_level `{}` must be one of: {}",
            config.engine.log_level,
            LOG_LEVELS.join(", ")
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        invalid("storage.database_path must not be empty".to_string());
    }

    if !(1..=100).contains(&config.booking.deposit_percent) {
        invalid(format!(
            "booking.deposit_percent must be between 1 and 100, got {}",
            config.booking.deposit_percent
        ));
    }

    if config.booking.utc_offset_minutes.abs() >= 24 * 60 {
        invalid(format!(
            "booking.utc_offset_minutes must be within +/-1439, got {}",
            config.booking.utc_offset_minutes
        ));
    }

    let api_url = config.slipok.api_url.trim();
    if !(api_url.starts_with("https://") || api_url.starts_with("http://")) {
        invalid(format!(
            "slipok.api_url `{api_url}` must be an http(s) URL"
        ));
    }

    if let Some(base) = &config.slipok.public_base_url
        && !(base.starts_with("https://") || base.starts_with("http://"))
    {
        invalid(format!(
            "slipok.public_base_url `{base}` must be an http(s) URL"
        ));
    }

    if config.slipok.timeout_secs == 0 {
        invalid("slipok.timeout_secs must be greater than 0".to_string());
    }

    if config.slipok.api_key.is_some() != config.slipok.branch_id.is_some() {
        invalid("slipok.api_key and slipok.branch_id must be set together".to_string());
    }

    if config.worker.max_attempts == 0 {
        invalid("worker.max_attempts must be at least 1".to_string());
    }

    if config.worker.poll_interval_ms == 0 {
        invalid("worker.poll_interval_ms must be greater than 0".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
