// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence of credential records keyed by identity.

use async_trait::async_trait;

use crate::error::KeywardError;
use crate::traits::adapter::PluginAdapter;
use crate::types::CredentialRecord;

/// Upsert/read store for [`CredentialRecord`]s.
#[async_trait]
pub trait CredentialRepository: PluginAdapter {
    /// Inserts or wholesale replaces the record for `webhook_id` atomically.
    ///
    /// Failures are [`KeywardError::StoreWrite`] and leave any previous record intact.
    async fn upsert_record(
        &self,
        webhook_id: &str,
        config: &serde_json::Value,
        encrypted_credential: &[u8],
    ) -> Result<(), KeywardError>;

    /// Reads the record for `webhook_id`.
    async fn get_record(&self, webhook_id: &str) -> Result<Option<CredentialRecord>, KeywardError>;

    /// Deletes the record for `webhook_id`. Returns whether a record existed.
    async fn delete_record(&self, webhook_id: &str) -> Result<bool, KeywardError>;
}
