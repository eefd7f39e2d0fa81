// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock transit adapter for deterministic testing.
//!
//! `MockTransit` issues reversible tokens without any cryptography and can be
//! switched into an outage mode to exercise `TransitUnavailable` paths.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use keyward_core::{AdapterType, HealthStatus, KeywardError, PluginAdapter, TransitAdapter};
use secrecy::SecretString;

const TOKEN_PREFIX: &str = "mock:v1:";

/// A transit adapter whose tokens are `mock:v1:<sequence>:<hex plaintext>`.
///
/// Each call yields a distinct token, mirroring a real transit service.
#[derive(Debug, Default)]
pub struct MockTransit {
    unavailable: AtomicBool,
    sequence: AtomicUsize,
    encrypt_calls: AtomicUsize,
    decrypt_calls: AtomicUsize,
}

impl MockTransit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the transit service going down (or coming back).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn encrypt_calls(&self) -> usize {
        self.encrypt_calls.load(Ordering::SeqCst)
    }

    pub fn decrypt_calls(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), KeywardError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(KeywardError::transit_unavailable("mock transit is down"));
        }
        Ok(())
    }
}

#[async_trait]
impl PluginAdapter for MockTransit {
    fn name(&self) -> &str {
        "mock-transit"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Transit
    }

    async fn health_check(&self) -> Result<HealthStatus, KeywardError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Ok(HealthStatus::Unhealthy("mock transit is down".to_string()));
        }
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl TransitAdapter for MockTransit {
    async fn encrypt(&self, plaintext: &str) -> Result<String, KeywardError> {
        self.encrypt_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{TOKEN_PREFIX}{seq}:{}", hex::encode(plaintext)))
    }

    async fn decrypt(&self, token: &str) -> Result<SecretString, KeywardError> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let invalid = || KeywardError::TransitTokenInvalid("not a mock transit token".to_string());
        let (_, encoded) = token
            .strip_prefix(TOKEN_PREFIX)
            .and_then(|rest| rest.split_once(':'))
            .ok_or_else(invalid)?;
        let bytes = hex::decode(encoded).map_err(|_| invalid())?;
        let text = String::from_utf8(bytes).map_err(|_| invalid())?;
        Ok(SecretString::from(text))
    }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[tokio::test]
    async fn roundtrip_and_counters() {
        let transit = MockTransit::new();
        let t1 = transit.encrypt("secret").await.unwrap();
        let t2 = transit.encrypt("secret").await.unwrap();
        assert_ne!(t1, t2);
        assert_eq!(transit.decrypt(&t1).await.unwrap().expose_secret(), "secret");
        assert_eq!(transit.encrypt_calls(), 2);
        assert_eq!(transit.decrypt_calls(), 1);
    }

    #[tokio::test]
    async fn outage_fails_both_directions() {
        let transit = MockTransit::new();
        let token = transit.encrypt("secret").await.unwrap();
        transit.set_unavailable(true);
        assert!(matches!(
            transit.encrypt("x").await,
            Err(KeywardError::TransitUnavailable { .. })
        ));
        assert!(matches!(
            transit.decrypt(&token).await,
            Err(KeywardError::TransitUnavailable { .. })
        ));
    }
}
