// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Transit encryption capability.

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::KeywardError;
use crate::traits::adapter::PluginAdapter;

/// Encrypt/decrypt delegated to a service that holds the key.
///
/// Tokens are opaque to callers and are consumed by a matching `decrypt`.
/// Implementations never cache plaintext.
#[async_trait]
pub trait TransitAdapter: PluginAdapter {
    /// Encrypts `plaintext` and returns an opaque token.
    async fn encrypt(&self, plaintext: &str) -> Result<String, KeywardError>;

    /// Decrypts a token produced by [`TransitAdapter::encrypt`].
    async fn decrypt(&self, token: &str) -> Result<SecretString, KeywardError>;
}
