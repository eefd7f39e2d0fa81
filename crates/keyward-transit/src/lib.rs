// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vault-compatible transit adapter for Keyward.
//!
//! Implements [`TransitAdapter`] on top of [`VaultClient`]. Encryption keys
//! stay inside the transit service; Keyward only ever holds opaque tokens.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use keyward_config::model::TransitConfig;
use keyward_core::{AdapterType, HealthStatus, KeywardError, PluginAdapter, TransitAdapter};
use secrecy::SecretString;
use tracing::info;

pub use client::VaultClient;

impl VaultClient {
    /// Build a client from the `[transit]` config section.
    ///
    /// Fails with [`KeywardError::Config`] when no token is configured.
    pub fn from_config(config: &TransitConfig) -> Result<Self, KeywardError> {
        let token = config
            .token
            .clone()
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from)
            .ok_or_else(|| {
                KeywardError::Config("transit.token is required for the vault backend".to_string())
            })?;

        let client = Self::new(
            &config.address,
            &token,
            &config.key_name,
            &config.kv_mount,
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(address = %config.address, key = %config.key_name, "transit client initialized");
        Ok(client)
    }
}

#[async_trait]
impl PluginAdapter for VaultClient {
    fn name(&self) -> &str {
        "vault-transit"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transit
    }

    async fn health_check(&self) -> Result<HealthStatus, KeywardError> {
        self.health().await
    }
}

#[async_trait]
impl TransitAdapter for VaultClient {
    async fn encrypt(&self, plaintext: &str) -> Result<String, KeywardError> {
        VaultClient::encrypt(self, plaintext).await
    }

    async fn decrypt(&self, token: &str) -> Result<SecretString, KeywardError> {
        VaultClient::decrypt(self, token).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn from_config_requires_token() {
        let config = TransitConfig::default();
        assert!(matches!(
            VaultClient::from_config(&config),
            Err(KeywardError::Config(_))
        ));
    }

    #[test]
    fn from_config_uses_configured_key() {
        let config = TransitConfig {
            token: Some("hvs.x".into()),
            key_name: "other-key".into(),
            address: "http://vault.test:8200/".into(),
            ..TransitConfig::default()
        };
        let client = VaultClient::from_config(&config).unwrap();
        assert_eq!(client.key_name(), "other-key");
        assert_eq!(client.address(), "http://vault.test:8200");
    }

    #[test]
    fn usable_as_shared_transit_adapter() {
        let config = TransitConfig {
            token: Some("hvs.x".into()),
            ..TransitConfig::default()
        };
        let adapter: Arc<dyn TransitAdapter> = Arc::new(VaultClient::from_config(&config).unwrap());
        assert_eq!(adapter.name(), "vault-transit");
        assert_eq!(adapter.adapter_type(), AdapterType::Transit);
    }
}
