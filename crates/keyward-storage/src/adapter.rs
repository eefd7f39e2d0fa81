// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the CredentialRepository trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use keyward_config::model::StorageConfig;
use keyward_core::{
    AdapterType, CredentialRecord, CredentialRepository, HealthStatus, KeywardError,
    PluginAdapter,
};

use crate::database::{Database, map_tr_err};
use crate::queries;

/// SQLite-backed credential repository.
///
/// The database is opened on [`SqliteStorage::initialize`]; every other
/// operation fails with a storage error until then.
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Wrap an already opened database, e.g. an in-memory one.
    pub fn with_database(config: StorageConfig, db: Database) -> Self {
        Self {
            config,
            db: OnceCell::new_with(Some(db)),
        }
    }

    /// Open the database file and run migrations.
    pub async fn initialize(&self) -> Result<(), KeywardError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| KeywardError::Storage {
            source: "storage already initialized".into(),
        })?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    /// Checkpoint the WAL before shutdown.
    pub async fn close(&self) -> Result<(), KeywardError> {
        self.db()?.close().await
    }

    fn db(&self) -> Result<&Database, KeywardError> {
        self.db.get().ok_or_else(|| KeywardError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, KeywardError> {
        self.db()?
            .connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl CredentialRepository for SqliteStorage {
    async fn upsert_record(
        &self,
        webhook_id: &str,
        config: &serde_json::Value,
        encrypted_credential: &[u8],
    ) -> Result<(), KeywardError> {
        queries::credentials::upsert_record(self.db()?, webhook_id, config, encrypted_credential)
            .await
    }

    async fn get_record(&self, webhook_id: &str) -> Result<Option<CredentialRecord>, KeywardError> {
        queries::credentials::get_record(self.db()?, webhook_id).await
    }

    async fn delete_record(&self, webhook_id: &str) -> Result<bool, KeywardError> {
        queries::credentials::delete_record(self.db()?, webhook_id).await
    }
}
