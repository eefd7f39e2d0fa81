// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./keyward.toml` > `~/.config/keyward/keyward.toml` > `/etc/keyward/keyward.toml`
//! with environment variable overrides. Conventional variables (`VAULT_ADDR`,
//! `GITHUB_TOKEN`, `PGPASSWORD`, ...) are honored, and `KEYWARD_*` variables
//! override everything.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use tracing::debug;

use crate::model::KeywardConfig;

/// Top-level config sections, used to map `KEYWARD_<SECTION>_<KEY>` onto `section.key`.
const SECTIONS: &[&str] = &[
    "service",
    "transit",
    "envelope",
    "storage",
    "database",
    "release_store",
    "backup",
];

/// Conventional environment variables and the config key each one feeds.
const CONVENTIONAL_VARS: &[(&str, &str)] = &[
    ("VAULT_ADDR", "transit.address"),
    ("VAULT_TOKEN", "transit.token"),
    ("GITHUB_TOKEN", "release_store.token"),
    ("GITHUB_OWNER", "release_store.owner"),
    ("GITHUB_REPO", "release_store.repo"),
    ("PGPASSWORD", "database.password"),
];

/// Free-form string keys. Environment values for these are taken verbatim
/// instead of being parsed as TOML-like scalars, so `PGPASSWORD=0042` stays
/// `"0042"` rather than becoming the integer 42.
const VERBATIM_KEYS: &[&str] = &[
    "service.name",
    "service.log_level",
    "transit.address",
    "transit.token",
    "transit.key_name",
    "transit.kv_mount",
    "envelope.passphrase",
    "storage.database_path",
    "database.host",
    "database.user",
    "database.name",
    "database.password",
    "database.container",
    "database.dump_command",
    "release_store.api_url",
    "release_store.uploads_url",
    "release_store.owner",
    "release_store.repo",
    "release_store.token",
    "backup.schedule",
    "backup.output_dir",
];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/keyward/keyward.toml` (system-wide)
/// 3. `~/.config/keyward/keyward.toml` (user XDG config)
/// 4. `./keyward.toml` (local directory)
/// 5. Conventional variables (`VAULT_TOKEN`, `GITHUB_TOKEN`, ...)
/// 6. `KEYWARD_*` environment variables
pub fn load_config() -> Result<KeywardConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env vars).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<KeywardConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(KeywardConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<KeywardConfig, figment::Error> {
    debug!(path = %path.display(), "loading config file");
    let figment = Figment::new()
        .merge(Serialized::defaults(KeywardConfig::default()))
        .merge(Toml::file(path));
    merge_env(figment).extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    let user_config = dirs::config_dir()
        .map(|d| d.join("keyward/keyward.toml"))
        .unwrap_or_default();
    let mut figment = Figment::new().merge(Serialized::defaults(KeywardConfig::default()));
    for path in [
        Path::new("/etc/keyward/keyward.toml"),
        user_config.as_path(),
        Path::new("keyward.toml"),
    ] {
        if path.is_file() {
            debug!(path = %path.display(), "found config file");
        }
        figment = figment.merge(Toml::file(path));
    }
    merge_env(figment)
}

/// Layer conventional variables, then `KEYWARD_*` variables, onto `figment`.
fn merge_env(figment: Figment) -> Figment {
    let figment = merge_verbatim(figment, conventional_env_provider());
    let figment = figment.merge(env_provider().ignore(VERBATIM_KEYS));
    merge_verbatim(figment, env_provider().only(VERBATIM_KEYS))
}

/// Merge each variable of `env` as an unparsed string at its mapped key.
fn merge_verbatim(figment: Figment, env: Env) -> Figment {
    env.iter().fold(figment, |figment, (key, value)| {
        debug!(key = key.as_str(), "config value from environment");
        figment.merge(Serialized::default(key.as_str(), value))
    })
}

/// Map a prefix-stripped env key onto its lowercase dotted config path.
///
/// Only the leading section name is split off, so underscores inside key
/// names survive: `RELEASE_STORE_UPLOADS_URL` becomes `release_store.uploads_url`.
pub fn map_env_key(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    for section in SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|rest| rest.strip_prefix('_'))
            && !rest.is_empty()
        {
            return format!("{section}.{rest}");
        }
    }
    key
}

/// Create the `KEYWARD_*` environment variable provider.
///
/// Uses `Env::map()` rather than `Env::split("_")`, since both section and key
/// names contain underscores.
fn env_provider() -> Env {
    Env::prefixed("KEYWARD_").map(|key| map_env_key(key.as_str()).into())
}

/// Provider for the unprefixed variables deployments of this kind usually export.
fn conventional_env_provider() -> Env {
    let names: Vec<&str> = CONVENTIONAL_VARS.iter().map(|(name, _)| *name).collect();
    Env::raw().only(&names).map(|key| {
        CONVENTIONAL_VARS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key.as_str()))
            .map(|(_, target)| (*target).to_string())
            .unwrap_or_else(|| key.as_str().to_string())
            .into()
    })
}
