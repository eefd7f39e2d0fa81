// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Keyward: webhook credential custody and daily database backups.
//!
//! [`Keyward`] wires the configured adapters together once at startup and
//! exposes the inbound operations used by the CLI and by embedding services.

use std::sync::Arc;

use keyward_backup::{
    BackupOrchestrator, BackupSchedule, GitHubReleaseStore, PgDumpRunner, spawn_scheduled_backups,
};
use keyward_config::KeywardConfig;
use keyward_config::model::{BackupConfig, TransitBackend};
use keyward_core::{
    AdapterType, BackupArtifact, CredentialRepository, DumpRunner, HealthStatus, KeywardError,
    PluginAdapter, ReleaseStore, TransitAdapter,
};
use keyward_credentials::CredentialStore;
use keyward_envelope::LocalTransit;
use keyward_storage::SqliteStorage;
use keyward_transit::VaultClient;
use secrecy::SecretString;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use keyward_credentials::UpsertCredential;

/// Health of one wired adapter, as reported by [`Keyward::health`].
#[derive(Debug)]
pub struct AdapterHealth {
    pub name: String,
    pub adapter_type: AdapterType,
    pub status: Result<HealthStatus, KeywardError>,
}

/// The assembled service.
pub struct Keyward {
    credentials: CredentialStore,
    transit: Arc<dyn TransitAdapter>,
    repository: Arc<dyn CredentialRepository>,
    release_store: Option<Arc<dyn ReleaseStore>>,
    backups: Option<Arc<BackupOrchestrator>>,
    schedule: BackupSchedule,
    sqlite: Option<Arc<SqliteStorage>>,
}

impl Keyward {
    /// Build every adapter from a validated configuration.
    ///
    /// The backup pipeline is only wired when a release-store token is
    /// configured; [`Keyward::trigger_backup`] fails with a config error otherwise.
    pub async fn from_config(config: &KeywardConfig) -> Result<Self, KeywardError> {
        let transit = build_transit(config)?;

        let sqlite = Arc::new(SqliteStorage::new(config.storage.clone()));
        sqlite.initialize().await?;

        let release_store: Option<Arc<dyn ReleaseStore>> = match &config.release_store.token {
            Some(token) if !token.trim().is_empty() => {
                Some(Arc::new(GitHubReleaseStore::from_config(&config.release_store)?))
            }
            _ => None,
        };
        let dumper: Arc<dyn DumpRunner> = Arc::new(PgDumpRunner::from_config(&config.database));

        let mut keyward = Self::assemble(
            transit,
            sqlite.clone(),
            dumper,
            release_store,
            &config.backup,
        )?;
        keyward.sqlite = Some(sqlite);
        info!(name = %config.service.name, backend = ?config.transit.backend, "keyward initialized");
        Ok(keyward)
    }

    /// Assemble from explicit adapters.
    pub fn new(
        transit: Arc<dyn TransitAdapter>,
        repository: Arc<dyn CredentialRepository>,
        dumper: Arc<dyn DumpRunner>,
        release_store: Arc<dyn ReleaseStore>,
        backup: &BackupConfig,
    ) -> Result<Self, KeywardError> {
        Self::assemble(transit, repository, dumper, Some(release_store), backup)
    }

    fn assemble(
        transit: Arc<dyn TransitAdapter>,
        repository: Arc<dyn CredentialRepository>,
        dumper: Arc<dyn DumpRunner>,
        release_store: Option<Arc<dyn ReleaseStore>>,
        backup: &BackupConfig,
    ) -> Result<Self, KeywardError> {
        let schedule = BackupSchedule::from_config(backup)?;
        let backups = release_store.clone().map(|store| {
            Arc::new(BackupOrchestrator::new(
                dumper,
                store,
                &backup.output_dir,
                backup.use_utc,
            ))
        });

        Ok(Self {
            credentials: CredentialStore::new(transit.clone(), repository.clone()),
            transit,
            repository,
            release_store,
            backups,
            schedule,
            sqlite: None,
        })
    }

    pub async fn upsert_credential(&self, request: UpsertCredential) -> Result<(), KeywardError> {
        self.credentials.upsert(request).await
    }

    pub async fn verify_credential(
        &self,
        webhook_id: &str,
        supplied: &str,
    ) -> Result<bool, KeywardError> {
        self.credentials.verify(webhook_id, supplied).await
    }

    pub async fn credential_config(
        &self,
        webhook_id: &str,
    ) -> Result<serde_json::Value, KeywardError> {
        self.credentials.config(webhook_id).await
    }

    /// Run the backup pipeline now and wait for its result.
    pub async fn trigger_backup(&self) -> Result<BackupArtifact, KeywardError> {
        self.orchestrator()?.run_backup().await
    }

    /// Start the scheduled backup loop; it stops when `cancel` fires.
    pub fn schedule_backups(
        &self,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<()>, KeywardError> {
        let orchestrator = self.orchestrator()?.clone();
        Ok(spawn_scheduled_backups(
            orchestrator,
            self.schedule.clone(),
            cancel,
        ))
    }

    /// Health of the transit, storage and release-store adapters.
    pub async fn health(&self) -> Vec<AdapterHealth> {
        let mut adapters: Vec<&dyn PluginAdapter> = Vec::with_capacity(3);
        adapters.push(self.transit.as_ref());
        adapters.push(self.repository.as_ref());
        if let Some(store) = &self.release_store {
            adapters.push(store.as_ref());
        }

        let mut report = Vec::with_capacity(adapters.len());
        for adapter in adapters {
            report.push(AdapterHealth {
                name: adapter.name().to_string(),
                adapter_type: adapter.adapter_type(),
                status: adapter.health_check().await,
            });
        }
        report
    }

    /// Checkpoint storage before exit.
    pub async fn close(&self) -> Result<(), KeywardError> {
        if let Some(sqlite) = &self.sqlite {
            sqlite.close().await?;
        }
        Ok(())
    }

    fn orchestrator(&self) -> Result<&Arc<BackupOrchestrator>, KeywardError> {
        self.backups.as_ref().ok_or_else(|| {
            KeywardError::Config("release_store.token is required for backups".to_string())
        })
    }
}

/// The transit adapter selected by `transit.backend`.
pub fn build_transit(config: &KeywardConfig) -> Result<Arc<dyn TransitAdapter>, KeywardError> {
    let transit: Arc<dyn TransitAdapter> = match config.transit.backend {
        TransitBackend::Vault => Arc::new(VaultClient::from_config(&config.transit)?),
        TransitBackend::Local => {
            let passphrase = config
                .envelope
                .passphrase
                .clone()
                .filter(|p| !p.is_empty())
                .map(SecretString::from)
                .ok_or_else(|| {
                    KeywardError::Config(
                        "envelope.passphrase is required for the local backend".to_string(),
                    )
                })?;
            Arc::new(LocalTransit::new(&passphrase))
        }
    };
    Ok(transit)
}
