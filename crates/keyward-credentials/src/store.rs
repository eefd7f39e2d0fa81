// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential store: encrypt-then-persist upsert and decrypt-then-compare verify.

use std::sync::Arc;

use keyward_core::{CredentialRepository, KeywardError, TransitAdapter};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::compare::constant_time_eq;

/// Inbound upsert request. Every field is optional at the type level so
/// missing values surface as validation errors rather than parse errors.
#[derive(Debug, Default, Deserialize)]
pub struct UpsertCredential {
    #[serde(default, rename = "webhookId")]
    pub webhook_id: Option<String>,
    #[serde(default)]
    pub config: Option<serde_json::Value>,
    #[serde(default, rename = "pgCreds")]
    pub credential: Option<SecretString>,
}

impl UpsertCredential {
    pub fn new(
        webhook_id: impl Into<String>,
        config: serde_json::Value,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            webhook_id: Some(webhook_id.into()),
            config: Some(config),
            credential: Some(SecretString::from(credential.into())),
        }
    }
}

/// Stores credentials encrypted by a transit adapter.
///
/// Plaintext exists only in memory between the caller and the transit call.
#[derive(Clone)]
pub struct CredentialStore {
    transit: Arc<dyn TransitAdapter>,
    repository: Arc<dyn CredentialRepository>,
}

impl CredentialStore {
    pub fn new(transit: Arc<dyn TransitAdapter>, repository: Arc<dyn CredentialRepository>) -> Self {
        Self {
            transit,
            repository,
        }
    }

    /// Validate, encrypt and persist a credential, replacing any existing record.
    ///
    /// Validation runs before any remote call. On any failure the stored
    /// record, if present, is left as it was.
    pub async fn upsert(&self, request: UpsertCredential) -> Result<(), KeywardError> {
        let webhook_id = require_webhook_id(request.webhook_id.as_deref())?;
        let config = match request.config {
            Some(config) if !config.is_null() => config,
            _ => return Err(KeywardError::Validation("config is required".to_string())),
        };
        let credential = request
            .credential
            .filter(|c| !c.expose_secret().trim().is_empty())
            .ok_or_else(|| KeywardError::Validation("pgCreds is required".to_string()))?;

        let token = self
            .transit
            .encrypt(credential.expose_secret())
            .await
            .inspect_err(|e| warn!(webhook_id, error = %e, "credential encryption failed"))?;

        self.repository
            .upsert_record(webhook_id, &config, token.as_bytes())
            .await
            .inspect_err(|e| warn!(webhook_id, error = %e, "credential write failed"))?;

        info!(webhook_id, "credential stored");
        Ok(())
    }

    /// Check `supplied` against the stored credential for `webhook_id`.
    ///
    /// Decrypts on every call; nothing is cached.
    pub async fn verify(&self, webhook_id: &str, supplied: &str) -> Result<bool, KeywardError> {
        let webhook_id = require_webhook_id(Some(webhook_id))?;

        let record = self
            .repository
            .get_record(webhook_id)
            .await?
            .filter(|r| !r.encrypted_credential.is_empty())
            .ok_or_else(|| KeywardError::NotFound(format!("credential for `{webhook_id}`")))?;

        let token = String::from_utf8(record.encrypted_credential).map_err(|_| {
            KeywardError::TransitTokenInvalid("stored token is not valid UTF-8".to_string())
        })?;
        let plaintext = self.transit.decrypt(&token).await?;

        let matches = constant_time_eq(plaintext.expose_secret().as_bytes(), supplied.as_bytes())?;
        debug!(webhook_id, matches, "credential verified");
        Ok(matches)
    }

    /// The config document stored alongside the credential.
    pub async fn config(&self, webhook_id: &str) -> Result<serde_json::Value, KeywardError> {
        let webhook_id = require_webhook_id(Some(webhook_id))?;
        self.repository
            .get_record(webhook_id)
            .await?
            .map(|r| r.config)
            .ok_or_else(|| KeywardError::NotFound(format!("credential for `{webhook_id}`")))
    }
}

fn require_webhook_id(webhook_id: Option<&str>) -> Result<&str, KeywardError> {
    webhook_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| KeywardError::Validation("webhookId is required".to_string()))
}
