// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transit adapter backed by the local envelope cipher.
//!
//! Used when `transit.backend = "local"`: tokens are produced in-process
//! instead of by a remote transit service.

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use keyward_core::{AdapterType, HealthStatus, KeywardError, PluginAdapter, TransitAdapter};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use zeroize::Zeroizing;

use crate::ciphertext::EnvelopeCiphertext;
use crate::crypto::{open, seal};
use crate::kdf::{KEY_LEN, derive_key};

/// Prefix of every token issued by [`LocalTransit`].
pub const TOKEN_PREFIX: &str = "envelope:v1:";

/// [`TransitAdapter`] that seals secrets with a passphrase-derived key.
pub struct LocalTransit {
    key: Zeroizing<[u8; KEY_LEN]>,
}

impl LocalTransit {
    /// Derive the key once from `passphrase`; the passphrase itself is not retained.
    pub fn new(passphrase: &SecretString) -> Self {
        Self {
            key: derive_key(passphrase.expose_secret()),
        }
    }
}

impl std::fmt::Debug for LocalTransit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalTransit")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl PluginAdapter for LocalTransit {
    fn name(&self) -> &str {
        "local-envelope"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transit
    }

    async fn health_check(&self) -> Result<HealthStatus, KeywardError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl TransitAdapter for LocalTransit {
    async fn encrypt(&self, plaintext: &str) -> Result<String, KeywardError> {
        let ciphertext = seal(&self.key, plaintext.as_bytes())?;
        debug!(bytes = ciphertext.as_bytes().len(), "sealed secret locally");
        Ok(format!("{TOKEN_PREFIX}{}", STANDARD.encode(ciphertext.as_bytes())))
    }

    async fn decrypt(&self, token: &str) -> Result<SecretString, KeywardError> {
        let encoded = token.strip_prefix(TOKEN_PREFIX).ok_or_else(|| {
            KeywardError::TransitTokenInvalid(format!("token is not prefixed with `{TOKEN_PREFIX}`"))
        })?;
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| KeywardError::TransitTokenInvalid(format!("token payload is not base64: {e}")))?;

        let ciphertext = EnvelopeCiphertext::from_bytes(bytes)?;
        let plaintext = open(&self.key, &ciphertext)?;
        let text = std::str::from_utf8(&plaintext)
            .map_err(|_| KeywardError::Integrity("decrypted payload is not valid UTF-8".to_string()))?;
        Ok(SecretString::from(text.to_owned()))
    }
}
