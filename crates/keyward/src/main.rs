// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyward - webhook credential custody and daily database backups.
//!
//! This is the binary entry point.

mod commands;
mod doctor;
mod serve;
mod shutdown;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use keyward_config::KeywardConfig;
use keyward_core::KeywardError;

/// Keyward - webhook credential custody and daily database backups.
#[derive(Parser, Debug)]
#[command(name = "keyward", version, about, long_about = None)]
struct Cli {
    /// Load configuration from this file instead of the standard locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run scheduled backups until SIGINT or SIGTERM.
    Serve,
    /// Run one backup now and print the result as JSON.
    Backup,
    /// Store and verify webhook credentials.
    Credential {
        #[command(subcommand)]
        action: CredentialCommand,
    },
    /// Encrypt or decrypt with the local passphrase cipher.
    Envelope {
        #[command(subcommand)]
        action: EnvelopeCommand,
    },
    /// Read and write secrets in the transit service's KV store.
    Secret {
        #[command(subcommand)]
        action: SecretCommand,
    },
    /// Check configuration and connectivity of every adapter.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

#[derive(Subcommand, Debug)]
enum CredentialCommand {
    /// Store or replace a credential. The credential is read from stdin.
    Store {
        #[arg(long)]
        webhook_id: String,
        /// Webhook config document (JSON).
        #[arg(long, default_value = "{}")]
        config_json: String,
    },
    /// Check a credential read from stdin. Exits 2 when it does not match.
    Verify {
        #[arg(long)]
        webhook_id: String,
    },
    /// Print the config stored with a credential.
    Show {
        #[arg(long)]
        webhook_id: String,
    },
}

#[derive(Subcommand, Debug)]
enum EnvelopeCommand {
    /// Encrypt a secret read from stdin and print hex.
    Encrypt,
    /// Decrypt a hex ciphertext.
    Decrypt { ciphertext: String },
}

#[derive(Subcommand, Debug)]
enum SecretCommand {
    /// Write a JSON object read from stdin.
    Put { id: String },
    /// Print a secret; string values are masked unless --reveal is given.
    Get {
        id: String,
        #[arg(long)]
        reveal: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // The envelope cipher is self-contained and needs no configuration.
    let command = match cli.command {
        Commands::Envelope { action } => {
            init_tracing("warn");
            return report(run_envelope(&action));
        }
        command => command,
    };

    let config = match load_config(cli.config.as_deref()) {
        Some(config) => config,
        None => return ExitCode::FAILURE,
    };
    init_tracing(&config.service.log_level);

    let result = match command {
        Commands::Serve => serve::run_serve(config).await.map(|()| ExitCode::SUCCESS),
        Commands::Backup => commands::run_backup(&config)
            .await
            .map(|()| ExitCode::SUCCESS),
        Commands::Credential { action } => match action {
            CredentialCommand::Store {
                webhook_id,
                config_json,
            } => commands::store_credential(&config, webhook_id, &config_json)
                .await
                .map(|()| ExitCode::SUCCESS),
            CredentialCommand::Verify { webhook_id } => {
                commands::verify_credential(&config, &webhook_id)
                    .await
                    .map(|matches| {
                        if matches {
                            ExitCode::SUCCESS
                        } else {
                            ExitCode::from(2)
                        }
                    })
            }
            CredentialCommand::Show { webhook_id } => {
                commands::show_credential(&config, &webhook_id)
                    .await
                    .map(|()| ExitCode::SUCCESS)
            }
        },
        Commands::Secret { action } => match action {
            SecretCommand::Put { id } => commands::secret_put(&config, &id)
                .await
                .map(|()| ExitCode::SUCCESS),
            SecretCommand::Get { id, reveal } => commands::secret_get(&config, &id, reveal)
                .await
                .map(|()| ExitCode::SUCCESS),
        },
        Commands::Doctor { plain } => Ok(if doctor::run_doctor(&config, plain).await {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }),
        Commands::Envelope { .. } => unreachable!("envelope commands return before config load"),
    };
    report(result)
}

fn run_envelope(action: &EnvelopeCommand) -> Result<ExitCode, KeywardError> {
    match action {
        EnvelopeCommand::Encrypt => commands::envelope_encrypt(),
        EnvelopeCommand::Decrypt { ciphertext } => commands::envelope_decrypt(ciphertext),
    }
    .map(|()| ExitCode::SUCCESS)
}

fn load_config(path: Option<&std::path::Path>) -> Option<KeywardConfig> {
    let result = match path {
        Some(path) => keyward_config::load_and_validate_from_path(path),
        None => keyward_config::load_and_validate(),
    };
    match result {
        Ok(config) => Some(config),
        Err(errors) => {
            keyward_config::render_errors(&errors);
            None
        }
    }
}

fn report(result: Result<ExitCode, KeywardError>) -> ExitCode {
    match result {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("keyward={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_credential_store() {
        let cli = Cli::try_parse_from([
            "keyward",
            "credential",
            "store",
            "--webhook-id",
            "w1",
            "--config-json",
            r#"{"events":[]}"#,
        ])
        .unwrap();
        match cli.command {
            Commands::Credential {
                action:
                    CredentialCommand::Store {
                        webhook_id,
                        config_json,
                    },
            } => {
                assert_eq!(webhook_id, "w1");
                assert_eq!(config_json, r#"{"events":[]}"#);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn envelope_decrypt_takes_positional_ciphertext() {
        let cli = Cli::try_parse_from(["keyward", "envelope", "decrypt", "00ff"]).unwrap();
        assert!(cli.config.is_none());
        match cli.command {
            Commands::Envelope {
                action: EnvelopeCommand::Decrypt { ciphertext },
            } => assert_eq!(ciphertext, "00ff"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["keyward", "backup", "--config", "/etc/k.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/etc/k.toml")));
        assert!(matches!(cli.command, Commands::Backup));
    }
}
