// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde cannot express: secrets the selected deployment
//! needs, URL schemes, cron syntax, non-zero timeouts and ports.

use croner::Cron;

use crate::diagnostic::ConfigError;
use crate::model::{KeywardConfig, TransitBackend};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &KeywardConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    require_non_empty(&mut errors, "service.name", &config.service.name);
    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "service.log_level must be one of {}, got `{}`",
                LOG_LEVELS.join(", "),
                config.service.log_level
            ),
        });
    }

    // Transit
    match config.transit.backend {
        TransitBackend::Vault => {
            require_secret(&mut errors, "transit.token", "VAULT_TOKEN", &config.transit.token);
            require_http_url(&mut errors, "transit.address", &config.transit.address);
            require_non_empty(&mut errors, "transit.key_name", &config.transit.key_name);
        }
        TransitBackend::Local => {
            require_secret(
                &mut errors,
                "envelope.passphrase",
                "KEYWARD_ENVELOPE_PASSPHRASE",
                &config.envelope.passphrase,
            );
        }
    }
    require_non_empty(&mut errors, "transit.kv_mount", &config.transit.kv_mount);
    require_non_zero(&mut errors, "transit.timeout_secs", config.transit.timeout_secs);

    // Storage
    require_non_empty(&mut errors, "storage.database_path", &config.storage.database_path);

    // Database dumped for backups
    require_non_empty(&mut errors, "database.host", &config.database.host);
    require_non_empty(&mut errors, "database.user", &config.database.user);
    require_non_empty(&mut errors, "database.name", &config.database.name);
    require_non_empty(&mut errors, "database.dump_command", &config.database.dump_command);
    if config.database.port == 0 {
        errors.push(ConfigError::Validation {
            message: "database.port must be non-zero".to_string(),
        });
    }
    require_non_zero(
        &mut errors,
        "database.dump_timeout_secs",
        config.database.dump_timeout_secs,
    );

    // Release store
    if config.backup.enabled {
        require_secret(
            &mut errors,
            "release_store.token",
            "GITHUB_TOKEN",
            &config.release_store.token,
        );
    }
    require_http_url(&mut errors, "release_store.api_url", &config.release_store.api_url);
    require_http_url(
        &mut errors,
        "release_store.uploads_url",
        &config.release_store.uploads_url,
    );
    require_non_empty(&mut errors, "release_store.owner", &config.release_store.owner);
    require_non_empty(&mut errors, "release_store.repo", &config.release_store.repo);
    require_non_zero(
        &mut errors,
        "release_store.timeout_secs",
        config.release_store.timeout_secs,
    );

    // Backup schedule
    if let Err(e) = config.backup.schedule.parse::<Cron>() {
        errors.push(ConfigError::Validation {
            message: format!(
                "backup.schedule `{}` is not a valid cron expression: {e}",
                config.backup.schedule
            ),
        });
    }
    require_non_empty(&mut errors, "backup.output_dir", &config.backup.output_dir);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn require_non_empty(errors: &mut Vec<ConfigError>, key: &str, value: &str) {
    if value.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: format!("{key} must not be empty"),
        });
    }
}

fn require_non_zero(errors: &mut Vec<ConfigError>, key: &str, value: u64) {
    if value == 0 {
        errors.push(ConfigError::Validation {
            message: format!("{key} must be greater than zero"),
        });
    }
}

fn require_secret(errors: &mut Vec<ConfigError>, key: &str, env_var: &str, value: &Option<String>) {
    if value.as_deref().is_none_or(|v| v.trim().is_empty()) {
        errors.push(ConfigError::MissingSecret {
            key: key.to_string(),
            env_var: env_var.to_string(),
        });
    }
}

fn require_http_url(errors: &mut Vec<ConfigError>, key: &str, value: &str) {
    let value = value.trim();
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    if rest.is_none_or(|host| host.is_empty() || host.starts_with('/')) {
        errors.push(ConfigError::Validation {
            message: format!("{key} `{value}` must be an http:// or https:// URL"),
        });
    }
}
