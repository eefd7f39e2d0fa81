// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `pg_dump` subprocess runner.
//!
//! Runs the dump either directly against the database host or inside a
//! container with `docker exec`. The password is passed through the
//! `PGPASSWORD` environment variable and never appears in the argument list.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use keyward_config::model::DatabaseConfig;
use keyward_core::{DumpRunner, KeywardError};
use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;
use tracing::{debug, warn};

const PASSWORD_ENV: &str = "PGPASSWORD";
const MAX_STDERR_CHARS: usize = 2048;

/// Dumps one PostgreSQL database to a plain SQL file.
pub struct PgDumpRunner {
    dump_command: String,
    host: String,
    port: u16,
    user: String,
    database: String,
    password: Option<SecretString>,
    container: Option<String>,
    timeout: Duration,
}

impl PgDumpRunner {
    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            dump_command: config.dump_command.clone(),
            host: config.host.clone(),
            port: config.port,
            user: config.user.clone(),
            database: config.name.clone(),
            password: config.password.clone().map(SecretString::from),
            container: config.container.clone().filter(|c| !c.trim().is_empty()),
            timeout: Duration::from_secs(config.dump_timeout_secs),
        }
    }

    /// Program and arguments for a dump into `output`.
    ///
    /// In container mode the dump goes to stdout, which the caller redirects.
    fn command_line(&self, output: &Path) -> (OsString, Vec<OsString>) {
        match &self.container {
            Some(container) => {
                let mut args: Vec<OsString> = vec!["exec".into()];
                if self.password.is_some() {
                    // `-e NAME` without a value forwards the variable from docker's own env.
                    args.extend(["-e".into(), PASSWORD_ENV.into()]);
                }
                args.extend([
                    container.into(),
                    self.dump_command.clone().into(),
                    "-U".into(),
                    self.user.clone().into(),
                    "-d".into(),
                    self.database.clone().into(),
                ]);
                ("docker".into(), args)
            }
            None => (
                self.dump_command.clone().into(),
                vec![
                    "-h".into(),
                    self.host.clone().into(),
                    "-p".into(),
                    self.port.to_string().into(),
                    "-U".into(),
                    self.user.clone().into(),
                    "-d".into(),
                    self.database.clone().into(),
                    "-f".into(),
                    output.as_os_str().to_owned(),
                ],
            ),
        }
    }
}

impl std::fmt::Debug for PgDumpRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgDumpRunner")
            .field("dump_command", &self.dump_command)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("database", &self.database)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("container", &self.container)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[async_trait]
impl DumpRunner for PgDumpRunner {
    async fn dump(&self, output: &Path) -> Result<(), KeywardError> {
        let (program, args) = self.command_line(output);
        let program_name = program.to_string_lossy().into_owned();

        let mut command = Command::new(&program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(password) = &self.password {
            command.env(PASSWORD_ENV, password.expose_secret());
        }

        if self.container.is_some() {
            let file = tokio::fs::File::create(output).await.map_err(|e| {
                KeywardError::Dump(format!("failed to create {}: {e}", output.display()))
            })?;
            command.stdout(Stdio::from(file.into_std().await));
        } else {
            command.stdout(Stdio::null());
        }

        debug!(program = %program_name, output = %output.display(), "starting database dump");
        let child = command
            .spawn()
            .map_err(|e| KeywardError::Dump(format!("failed to start {program_name}: {e}")))?;

        let result = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(result) => result,
            Err(_) => {
                warn!(program = %program_name, timeout = ?self.timeout, "database dump timed out, child killed");
                return Err(KeywardError::Timeout {
                    operation: "database dump".to_string(),
                    duration: self.timeout,
                });
            }
        };
        let output_status = result
            .map_err(|e| KeywardError::Dump(format!("failed waiting for {program_name}: {e}")))?;

        if !output_status.status.success() {
            let stderr = String::from_utf8_lossy(&output_status.stderr);
            return Err(KeywardError::Dump(format!(
                "{program_name} exited with {}: {}",
                output_status.status,
                truncate(stderr.trim(), MAX_STDERR_CHARS)
            )));
        }

        debug!(output = %output.display(), "database dump finished");
        Ok(())
    }
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DatabaseConfig {
        DatabaseConfig {
            host: "db.internal".into(),
            port: 6543,
            user: "backup".into(),
            name: "app".into(),
            password: Some("hunter2".into()),
            ..DatabaseConfig::default()
        }
    }

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn direct_mode_writes_with_dash_f() {
        let runner = PgDumpRunner::from_config(&config());
        let (program, args) = runner.command_line(Path::new("/tmp/out.sql"));
        assert_eq!(program, "pg_dump");
        assert_eq!(
            strings(&args),
            ["-h", "db.internal", "-p", "6543", "-U", "backup", "-d", "app", "-f", "/tmp/out.sql"]
        );
    }

    #[test]
    fn container_mode_forwards_password_by_name() {
        let runner = PgDumpRunner::from_config(&DatabaseConfig {
            container: Some("pg".into()),
            ..config()
        });
        let (program, args) = runner.command_line(Path::new("/tmp/out.sql"));
        assert_eq!(program, "docker");
        let args = strings(&args);
        assert_eq!(
            args,
            ["exec", "-e", "PGPASSWORD", "pg", "pg_dump", "-U", "backup", "-d", "app"]
        );
        assert!(!args.iter().any(|a| a.contains("hunter2")));
    }

    #[test]
    fn blank_container_means_direct_mode() {
        let runner = PgDumpRunner::from_config(&DatabaseConfig {
            container: Some("  ".into()),
            ..config()
        });
        assert_eq!(runner.command_line(Path::new("o.sql")).0, "pg_dump");
    }

    #[test]
    fn debug_redacts_password() {
        let runner = PgDumpRunner::from_config(&config());
        let debug = format!("{runner:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[cfg(unix)]
    mod process {
        use std::os::unix::fs::PermissionsExt;

        use serial_test::serial;

        use super::*;

        /// Write an executable shell script standing in for `pg_dump`.
        fn fake_pg_dump(dir: &Path, body: &str) -> String {
            let path = dir.join("fake_pg_dump");
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().into_owned()
        }

        fn runner(dump_command: String, timeout_secs: u64) -> PgDumpRunner {
            PgDumpRunner::from_config(&DatabaseConfig {
                dump_command,
                dump_timeout_secs: timeout_secs,
                ..config()
            })
        }

        #[tokio::test]
        #[serial]
        async fn successful_dump_writes_file_with_password_from_env() {
            let dir = tempfile::tempdir().unwrap();
            let script = fake_pg_dump(
                dir.path(),
                r#"while [ $# -gt 0 ]; do
  if [ "$1" = "-f" ]; then out="$2"; fi
  shift
done
echo "-- dumped with $PGPASSWORD" > "$out""#,
            );
            let output = dir.path().join("backup.sql");

            runner(script, 10).dump(&output).await.unwrap();
            let contents = std::fs::read_to_string(&output).unwrap();
            assert_eq!(contents.trim(), "-- dumped with hunter2");
        }

        #[tokio::test]
        #[serial]
        async fn non_zero_exit_is_dump_error_with_stderr() {
            let dir = tempfile::tempdir().unwrap();
            let script = fake_pg_dump(dir.path(), "echo 'connection refused' >&2\nexit 1");

            let err = runner(script, 10)
                .dump(&dir.path().join("backup.sql"))
                .await
                .unwrap_err();
            match err {
                KeywardError::Dump(message) => assert!(message.contains("connection refused")),
                other => panic!("expected Dump, got {other:?}"),
            }
        }

        #[tokio::test]
        #[serial]
        async fn slow_dump_times_out() {
            let dir = tempfile::tempdir().unwrap();
            let script = fake_pg_dump(dir.path(), "sleep 30");

            let err = runner(script, 1)
                .dump(&dir.path().join("backup.sql"))
                .await
                .unwrap_err();
            assert!(matches!(err, KeywardError::Timeout { .. }));
            assert!(err.is_retryable());
        }

        #[tokio::test]
        #[serial]
        async fn missing_binary_is_dump_error() {
            let dir = tempfile::tempdir().unwrap();
            let err = runner("/nonexistent/pg_dump".into(), 10)
                .dump(&dir.path().join("backup.sql"))
                .await
                .unwrap_err();
            assert!(matches!(err, KeywardError::Dump(_)));
        }
    }
}
