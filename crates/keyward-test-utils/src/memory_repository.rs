// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory credential repository with injectable write failures.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use keyward_core::{
    AdapterType, CredentialRecord, CredentialRepository, HealthStatus, KeywardError,
    PluginAdapter,
};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryRepository {
    records: Mutex<HashMap<String, CredentialRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with `StoreWrite`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Insert a record verbatim, bypassing validation (e.g. an empty ciphertext).
    pub async fn insert_raw(&self, record: CredentialRecord) {
        self.records
            .lock()
            .await
            .insert(record.webhook_id.clone(), record);
    }

    fn check_writable(&self) -> Result<(), KeywardError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(KeywardError::StoreWrite {
                source: "memory repository writes disabled".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for MemoryRepository {
    fn name(&self) -> &str {
        "memory"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, KeywardError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl CredentialRepository for MemoryRepository {
    async fn upsert_record(
        &self,
        webhook_id: &str,
        config: &serde_json::Value,
        encrypted_credential: &[u8],
    ) -> Result<(), KeywardError> {
        self.check_writable()?;
        let now = chrono::Utc::now().to_rfc3339();
        let mut records = self.records.lock().await;
        let created_at = records
            .get(webhook_id)
            .map(|r| r.created_at.clone())
            .unwrap_or_else(|| now.clone());
        records.insert(
            webhook_id.to_string(),
            CredentialRecord {
                webhook_id: webhook_id.to_string(),
                config: config.clone(),
                encrypted_credential: encrypted_credential.to_vec(),
                created_at,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn get_record(&self, webhook_id: &str) -> Result<Option<CredentialRecord>, KeywardError> {
        Ok(self.records.lock().await.get(webhook_id).cloned())
    }

    async fn delete_record(&self, webhook_id: &str) -> Result<bool, KeywardError> {
        self.check_writable()?;
        Ok(self.records.lock().await.remove(webhook_id).is_some())
    }
}
