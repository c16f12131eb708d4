// SPDX-FileCopyrightText: 2026 Innkeep Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./innkeep.toml` > `~/.config/innkeep/innkeep.toml` > `/etc/innkeep/innkeep.toml`
//! with environment variable overrides via `INNKEEP_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::InnkeepConfig;

/// Config sections, in the order env var prefixes are matched.
const SECTIONS: &[&str] = &["engine", "storage", "booking", "slipok", "worker"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/innkeep/innkeep.toml` (system-wide)
/// 3. `~/.config/innkeep/innkeep.toml` (user XDG config)
/// 4. `./innkeep.toml` (local directory)
/// 5. `INNKEEP_*` environment variables
pub fn load_config() -> Result<InnkeepConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string over the defaults (no files, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<InnkeepConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(InnkeepConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<InnkeepConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(InnkeepConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the layered Figment before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(InnkeepConfig::default()))
        .merge(Toml::file("/etc/innkeep/innkeep.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("innkeep/innkeep.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("innkeep.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `INNKEEP_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Only the first underscore after the section name becomes a dot, so
/// `INNKEEP_SLIPOK_API_KEY` maps to `slipok.api_key`, not `slipok.api.key`.
pub(crate) fn env_provider() -> Env {
    Env::prefixed("INNKEEP_").map(|key| map_env_key(key.as_str()).into())
}

fn map_env_key(key: &str) -> String {
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
