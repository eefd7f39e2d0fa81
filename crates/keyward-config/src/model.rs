// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Keyward.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages. Sections
//! holding secrets implement `Debug` by hand so tokens and passwords never
//! reach log output.

use serde::{Deserialize, Serialize};

/// Top-level Keyward configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values, but
/// [`crate::validation::validate_config`] rejects a config whose required
/// secrets are absent.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct KeywardConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Transit encryption service settings.
    #[serde(default)]
    pub transit: TransitConfig,

    /// Local envelope cipher settings.
    #[serde(default)]
    pub envelope: EnvelopeConfig,

    /// Credential record storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Database that gets dumped for backups.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Release store receiving backup uploads.
    #[serde(default)]
    pub release_store: ReleaseStoreConfig,

    /// Backup schedule settings.
    #[serde(default)]
    pub backup: BackupConfig,
}

fn redacted(value: &Option<String>) -> &'static str {
    match value {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used in logs and the release-store user agent.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "keyward".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Which implementation backs credential encryption.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitBackend {
    /// Remote Vault-compatible transit service.
    #[default]
    Vault,
    /// Local envelope cipher keyed by `envelope.passphrase`.
    Local,
}

/// Transit service configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TransitConfig {
    /// Encryption backend.
    #[serde(default)]
    pub backend: TransitBackend,

    /// Base address of the transit service.
    #[serde(default = "default_transit_address")]
    pub address: String,

    /// Token sent as `X-Vault-Token`. Required for the `vault` backend.
    #[serde(default)]
    pub token: Option<String>,

    /// Name of the transit encryption key.
    #[serde(default = "default_transit_key_name")]
    pub key_name: String,

    /// Mount path of the KV v2 secrets engine.
    #[serde(default = "default_kv_mount")]
    pub kv_mount: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_transit_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TransitConfig {
    fn default() -> Self {
        Self {
            backend: TransitBackend::default(),
            address: default_transit_address(),
            token: None,
            key_name: default_transit_key_name(),
            kv_mount: default_kv_mount(),
            timeout_secs: default_transit_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for TransitConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitConfig")
            .field("backend", &self.backend)
            .field("address", &self.address)
            .field("token", &redacted(&self.token))
            .field("key_name", &self.key_name)
            .field("kv_mount", &self.kv_mount)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_transit_address() -> String {
    "http://127.0.0.1:8200".to_string()
}

fn default_transit_key_name() -> String {
    "pg-creds".to_string()
}

fn default_kv_mount() -> String {
    "secrets".to_string()
}

fn default_transit_timeout_secs() -> u64 {
    30
}

/// Local envelope cipher configuration.
#[derive(Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnvelopeConfig {
    /// Passphrase the envelope key is derived from. Required for the `local` backend.
    #[serde(default)]
    pub passphrase: Option<String>,
}

impl std::fmt::Debug for EnvelopeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeConfig")
            .field("passphrase", &redacted(&self.passphrase))
            .finish()
    }
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("keyward").join("keyward.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("keyward.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Connection parameters of the database that is dumped for backups.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_host")]
    pub host: String,

    #[serde(default = "default_db_port")]
    pub port: u16,

    #[serde(default = "default_db_user")]
    pub user: String,

    /// Database name.
    #[serde(default = "default_db_name")]
    pub name: String,

    /// Password passed to the dump process via `PGPASSWORD`.
    #[serde(default)]
    pub password: Option<String>,

    /// Run the dump inside this container with `docker exec` instead of locally.
    #[serde(default)]
    pub container: Option<String>,

    /// Dump executable.
    #[serde(default = "default_dump_command")]
    pub dump_command: String,

    /// Upper bound on a single dump run, in seconds.
    #[serde(default = "default_dump_timeout_secs")]
    pub dump_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_db_host(),
            port: default_db_port(),
            user: default_db_user(),
            name: default_db_name(),
            password: None,
            container: None,
            dump_command: default_dump_command(),
            dump_timeout_secs: default_dump_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("name", &self.name)
            .field("password", &redacted(&self.password))
            .field("container", &self.container)
            .field("dump_command", &self.dump_command)
            .field("dump_timeout_secs", &self.dump_timeout_secs)
            .finish()
    }
}

fn default_db_host() -> String {
    "localhost".to_string()
}

fn default_db_port() -> u16 {
    5432
}

fn default_db_user() -> String {
    "postgres".to_string()
}

fn default_db_name() -> String {
    "postgres".to_string()
}

fn default_dump_command() -> String {
    "pg_dump".to_string()
}

fn default_dump_timeout_secs() -> u64 {
    600
}

/// Release store (GitHub Releases) configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseStoreConfig {
    /// REST API base URL.
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Asset upload base URL.
    #[serde(default = "default_uploads_url")]
    pub uploads_url: String,

    /// Repository owner.
    #[serde(default = "default_owner")]
    pub owner: String,

    /// Repository name.
    #[serde(default = "default_repo")]
    pub repo: String,

    /// Access token. Required when backups are enabled.
    #[serde(default)]
    pub token: Option<String>,

    /// Per-request timeout in seconds. Uploads of large dumps need headroom.
    #[serde(default = "default_release_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ReleaseStoreConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            uploads_url: default_uploads_url(),
            owner: default_owner(),
            repo: default_repo(),
            token: None,
            timeout_secs: default_release_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for ReleaseStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseStoreConfig")
            .field("api_url", &self.api_url)
            .field("uploads_url", &self.uploads_url)
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("token", &redacted(&self.token))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_uploads_url() -> String {
    "https://uploads.github.com".to_string()
}

fn default_owner() -> String {
    "keyward".to_string()
}

fn default_repo() -> String {
    "backups".to_string()
}

fn default_release_timeout_secs() -> u64 {
    120
}

/// Backup schedule configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackupConfig {
    /// Run the daily schedule under `keyward serve`.
    #[serde(default = "default_backup_enabled")]
    pub enabled: bool,

    /// Cron expression for scheduled runs (minute hour day month weekday).
    #[serde(default = "default_backup_schedule")]
    pub schedule: String,

    /// Evaluate the schedule in UTC; local time otherwise.
    #[serde(default = "default_use_utc")]
    pub use_utc: bool,

    /// Directory the dump file is written to before upload.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            enabled: default_backup_enabled(),
            schedule: default_backup_schedule(),
            use_utc: default_use_utc(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_backup_enabled() -> bool {
    true
}

fn default_backup_schedule() -> String {
    "0 0 * * *".to_string() // daily at midnight
}

fn default_use_utc() -> bool {
    true
}

fn default_output_dir() -> String {
    ".".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = KeywardConfig::default();
        config.transit.token = Some("hvs.super-secret".into());
        config.release_store.token = Some("ghp_secret".into());
        config.database.password = Some("pg-password".into());
        config.envelope.passphrase = Some("envelope-pass".into());

        let debug = format!("{config:?}");
        assert!(!debug.contains("hvs.super-secret"));
        assert!(!debug.contains("ghp_secret"));
        assert!(!debug.contains("pg-password"));
        assert!(!debug.contains("envelope-pass"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn transit_backend_parses_snake_case() {
        let config: KeywardConfig = toml::from_str("[transit]\nbackend = \"local\"\n").unwrap();
        assert_eq!(config.transit.backend, TransitBackend::Local);
    }
}
