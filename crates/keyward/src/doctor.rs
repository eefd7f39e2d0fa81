// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `keyward doctor` command implementation.
//!
//! Checks each external collaborator independently so one broken adapter
//! does not hide the state of the others.

use std::io::IsTerminal;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};

use keyward_backup::{BackupSchedule, GitHubReleaseStore};
use keyward_config::KeywardConfig;
use keyward_core::{HealthStatus, KeywardError, PluginAdapter};
use keyward_storage::SqliteStorage;

const TOOL_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }

    fn from_health(name: &str, health: Result<HealthStatus, KeywardError>, start: Instant) -> Self {
        match health {
            Ok(HealthStatus::Healthy) => Self::new(name, CheckStatus::Pass, "healthy", start),
            Ok(HealthStatus::Degraded(reason)) => Self::new(name, CheckStatus::Warn, reason, start),
            Ok(HealthStatus::Unhealthy(reason)) => Self::new(name, CheckStatus::Fail, reason, start),
            Err(e) => Self::new(name, CheckStatus::Fail, e.to_string(), start),
        }
    }
}

/// Run every check, print the report, and return whether nothing failed.
pub async fn run_doctor(config: &KeywardConfig, plain: bool) -> bool {
    let use_color = !plain && std::io::stdout().is_terminal();

    let results = vec![
        check_transit(config).await,
        check_storage(config).await,
        check_release_store(config).await,
        check_dump_tool(config).await,
        check_schedule(config),
    ];

    print_report(&results, use_color);
    results.iter().all(|r| r.status != CheckStatus::Fail)
}

async fn check_transit(config: &KeywardConfig) -> CheckResult {
    let start = Instant::now();
    match keyward::build_transit(config) {
        Ok(transit) => CheckResult::from_health("Transit", transit.health_check().await, start),
        Err(e) => CheckResult::new("Transit", CheckStatus::Fail, e.to_string(), start),
    }
}

async fn check_storage(config: &KeywardConfig) -> CheckResult {
    let start = Instant::now();
    let path = &config.storage.database_path;
    if !Path::new(path).exists() {
        return CheckResult::new(
            "Storage",
            CheckStatus::Warn,
            format!("not found: {path} (will be created on first run)"),
            start,
        );
    }

    let storage = SqliteStorage::new(config.storage.clone());
    if let Err(e) = storage.initialize().await {
        return CheckResult::new("Storage", CheckStatus::Fail, e.to_string(), start);
    }
    let result = CheckResult::from_health("Storage", storage.health_check().await, start);
    let _ = storage.close().await;
    result
}

async fn check_release_store(config: &KeywardConfig) -> CheckResult {
    let start = Instant::now();
    let has_token = config
        .release_store
        .token
        .as_deref()
        .is_some_and(|t| !t.trim().is_empty());
    if !has_token {
        let status = if config.backup.enabled {
            CheckStatus::Fail
        } else {
            CheckStatus::Warn
        };
        return CheckResult::new("Release store", status, "no token configured", start);
    }

    match GitHubReleaseStore::from_config(&config.release_store) {
        Ok(store) => CheckResult::from_health("Release store", store.health_check().await, start),
        Err(e) => CheckResult::new("Release store", CheckStatus::Fail, e.to_string(), start),
    }
}

/// Confirm the dump executable (or docker, in container mode) runs.
async fn check_dump_tool(config: &KeywardConfig) -> CheckResult {
    let start = Instant::now();
    let program = match &config.database.container {
        Some(container) if !container.trim().is_empty() => "docker",
        _ => config.database.dump_command.as_str(),
    };

    let output = tokio::process::Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(TOOL_CHECK_TIMEOUT, output).await {
        Ok(Ok(output)) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout);
            let first_line = version.lines().next().unwrap_or(program).trim().to_string();
            CheckResult::new("Dump tool", CheckStatus::Pass, first_line, start)
        }
        Ok(Ok(output)) => CheckResult::new(
            "Dump tool",
            CheckStatus::Fail,
            format!("{program} --version exited with {}", output.status),
            start,
        ),
        Ok(Err(e)) => CheckResult::new(
            "Dump tool",
            CheckStatus::Fail,
            format!("{program} not runnable: {e}"),
            start,
        ),
        Err(_) => CheckResult::new(
            "Dump tool",
            CheckStatus::Fail,
            format!("{program} --version timed out"),
            start,
        ),
    }
}

fn check_schedule(config: &KeywardConfig) -> CheckResult {
    let start = Instant::now();
    if !config.backup.enabled {
        return CheckResult::new("Backup schedule", CheckStatus::Warn, "disabled", start);
    }
    let next = BackupSchedule::from_config(&config.backup)
        .and_then(|s| s.next_after(chrono::Utc::now()));
    match next {
        Ok(next) => CheckResult::new(
            "Backup schedule",
            CheckStatus::Pass,
            format!("next run {}", next.format("%Y-%m-%d %H:%M UTC")),
            start,
        ),
        Err(e) => CheckResult::new("Backup schedule", CheckStatus::Fail, e.to_string(), start),
    }
}

fn print_report(results: &[CheckResult], use_color: bool) {
    use colored::Colorize;

    println!();
    println!("  keyward doctor");
    println!("  {}", "-".repeat(50));

    let mut issues = 0;
    for result in results {
        let duration_ms = result.duration.as_millis();
        let line = match (&result.status, use_color) {
            (CheckStatus::Pass, true) => format!(
                "    {} {:<16} {} ({duration_ms}ms)",
                "✓".green(),
                result.name,
                result.message
            ),
            (CheckStatus::Warn, true) => format!(
                "    {} {:<16} {} ({duration_ms}ms)",
                "!".yellow(),
                result.name,
                result.message.yellow()
            ),
            (CheckStatus::Fail, true) => format!(
                "    {} {:<16} {} ({duration_ms}ms)",
                "✗".red(),
                result.name,
                result.message.red()
            ),
            (CheckStatus::Pass, false) => format!(
                "    [OK]   {:<16} {} ({duration_ms}ms)",
                result.name, result.message
            ),
            (CheckStatus::Warn, false) => format!(
                "    [WARN] {:<16} {} ({duration_ms}ms)",
                result.name, result.message
            ),
            (CheckStatus::Fail, false) => format!(
                "    [FAIL] {:<16} {} ({duration_ms}ms)",
                result.name, result.message
            ),
        };
        if result.status != CheckStatus::Pass {
            issues += 1;
        }
        println!("{line}");
    }

    println!();
    if issues > 0 {
        let word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {word} found.");
    } else {
        println!("  All checks passed.");
    }
    println!();
}

#[cfg(test)]
mod tests {
    use keyward_config::model::TransitBackend;

    use super::*;

    fn local_config(dir: &tempfile::TempDir) -> KeywardConfig {
        let mut config = KeywardConfig::default();
        config.transit.backend = TransitBackend::Local;
        config.envelope.passphrase = Some("correct horse".into());
        config.storage.database_path = dir.path().join("k.db").to_string_lossy().into_owned();
        config
    }

    #[test]
    fn health_maps_to_check_status() {
        let start = Instant::now();
        assert_eq!(
            CheckResult::from_health("x", Ok(HealthStatus::Healthy), start).status,
            CheckStatus::Pass
        );
        assert_eq!(
            CheckResult::from_health("x", Ok(HealthStatus::Degraded("slow".into())), start).status,
            CheckStatus::Warn
        );
        assert_eq!(
            CheckResult::from_health("x", Err(KeywardError::transit_unavailable("down")), start)
                .status,
            CheckStatus::Fail
        );
    }

    #[tokio::test]
    async fn local_transit_is_healthy() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(check_transit(&local_config(&dir)).await.status, CheckStatus::Pass);
    }

    #[tokio::test]
    async fn missing_database_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(check_storage(&local_config(&dir)).await.status, CheckStatus::Warn);
    }

    #[tokio::test]
    async fn missing_release_token_fails_when_backups_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = local_config(&dir);
        config.release_store.token = None;
        assert_eq!(check_release_store(&config).await.status, CheckStatus::Fail);

        config.backup.enabled = false;
        assert_eq!(check_release_store(&config).await.status, CheckStatus::Warn);
    }

    #[tokio::test]
    async fn missing_dump_binary_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = local_config(&dir);
        config.database.dump_command = "/nonexistent/pg_dump".into();
        assert_eq!(check_dump_tool(&config).await.status, CheckStatus::Fail);
    }

    #[test]
    fn default_schedule_passes() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(check_schedule(&local_config(&dir)).status, CheckStatus::Pass);
    }
}
