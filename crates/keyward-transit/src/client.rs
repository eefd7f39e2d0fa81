// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for a Vault-compatible transit engine and KV v2 store.
//!
//! Provides [`VaultClient`] which handles authentication, request
//! construction, and mapping of HTTP failures onto [`KeywardError`] kinds.
//! Plaintext never appears in errors or logs.

use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use keyward_core::{HealthStatus, KeywardError};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use crate::types::{
    DataEnvelope, DecryptData, DecryptRequest, EncryptData, EncryptRequest, KvReadData,
    KvWriteRequest, VaultErrorResponse,
};

/// Prefix every Vault transit ciphertext carries (`vault:v<N>:...`).
pub const VAULT_TOKEN_PREFIX: &str = "vault:v";

/// Which call produced a response, for error mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Encrypt,
    Decrypt,
    KvWrite,
    KvRead,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Encrypt => "transit encrypt",
            Self::Decrypt => "transit decrypt",
            Self::KvWrite => "kv write",
            Self::KvRead => "kv read",
        })
    }
}

/// Client for one Vault address, transit key and KV mount.
///
/// Cheap to clone; share one instance per process.
#[derive(Clone)]
pub struct VaultClient {
    client: reqwest::Client,
    address: String,
    key_name: String,
    kv_mount: String,
}

impl VaultClient {
    /// Creates a client authenticating with `token` via `X-Vault-Token`.
    ///
    /// Every request is bounded by `timeout`.
    pub fn new(
        address: &str,
        token: &SecretString,
        key_name: &str,
        kv_mount: &str,
        timeout: Duration,
    ) -> Result<Self, KeywardError> {
        let mut token_header = HeaderValue::from_str(token.expose_secret())
            .map_err(|_| KeywardError::Config("transit token is not a valid header value".to_string()))?;
        token_header.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("X-Vault-Token", token_header);
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| KeywardError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            address: address.trim_end_matches('/').to_string(),
            key_name: key_name.to_string(),
            kv_mount: kv_mount.trim_matches('/').to_string(),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn key_name(&self) -> &str {
        &self.key_name
    }

    /// Encrypts `plaintext` under the transit key and returns the `vault:v<N>:...` token.
    pub async fn encrypt(&self, plaintext: &str) -> Result<String, KeywardError> {
        let url = format!("{}/v1/transit/encrypt/{}", self.address, self.key_name);
        let encoded = STANDARD.encode(plaintext.as_bytes());
        debug!(key = %self.key_name, "transit encrypt");

        let response = self
            .client
            .post(&url)
            .json(&EncryptRequest { plaintext: &encoded })
            .send()
            .await
            .map_err(|e| send_error(Operation::Encrypt, e))?;

        let body: DataEnvelope<EncryptData> = parse_success(Operation::Encrypt, response).await?;
        Ok(body.data.ciphertext)
    }

    /// Decrypts a token produced by [`VaultClient::encrypt`].
    ///
    /// Tokens without the `vault:v` prefix are rejected without a network call.
    pub async fn decrypt(&self, token: &str) -> Result<SecretString, KeywardError> {
        if !token.starts_with(VAULT_TOKEN_PREFIX) {
            return Err(KeywardError::TransitTokenInvalid(format!(
                "token is not prefixed with `{VAULT_TOKEN_PREFIX}`"
            )));
        }

        let url = format!("{}/v1/transit/decrypt/{}", self.address, self.key_name);
        debug!(key = %self.key_name, "transit decrypt");

        let response = self
            .client
            .post(&url)
            .json(&DecryptRequest { ciphertext: token })
            .send()
            .await
            .map_err(|e| send_error(Operation::Decrypt, e))?;

        let body: DataEnvelope<DecryptData> = parse_success(Operation::Decrypt, response).await?;
        let bytes = STANDARD.decode(body.data.plaintext.as_bytes()).map_err(|_| {
            KeywardError::TransitTokenInvalid("transit returned undecodable plaintext".to_string())
        })?;
        let text = String::from_utf8(bytes).map_err(|_| {
            KeywardError::TransitTokenInvalid("transit plaintext is not valid UTF-8".to_string())
        })?;
        Ok(SecretString::from(text))
    }

    /// Writes `data` as the current version of KV secret `id`.
    pub async fn write_secret(&self, id: &str, data: &serde_json::Value) -> Result<(), KeywardError> {
        let url = self.kv_url(id)?;
        debug!(mount = %self.kv_mount, id, "kv write");

        let response = self
            .client
            .post(&url)
            .json(&KvWriteRequest { data })
            .send()
            .await
            .map_err(|e| send_error(Operation::KvWrite, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        Err(status_error(Operation::KvWrite, status, response).await)
    }

    /// Reads the current version of KV secret `id`. A missing secret is [`KeywardError::NotFound`].
    pub async fn read_secret(&self, id: &str) -> Result<serde_json::Value, KeywardError> {
        let url = self.kv_url(id)?;
        debug!(mount = %self.kv_mount, id, "kv read");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| send_error(Operation::KvRead, e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(KeywardError::NotFound(format!("secret `{id}`")));
        }
        let body: DataEnvelope<KvReadData> = parse_success(Operation::KvRead, response).await?;
        Ok(body.data.data)
    }

    /// Queries `/v1/sys/health`. Standby nodes report as degraded.
    pub async fn health(&self) -> Result<HealthStatus, KeywardError> {
        let url = format!("{}/v1/sys/health", self.address);
        let response = self.client.get(&url).send().await.map_err(|e| {
            KeywardError::TransitUnavailable {
                message: format!("health check failed: {e}"),
                source: Some(Box::new(e)),
            }
        })?;

        let status = response.status();
        Ok(match status.as_u16() {
            200 => HealthStatus::Healthy,
            429 | 472 | 473 => HealthStatus::Degraded(format!("standby node ({status})")),
            503 => HealthStatus::Unhealthy("sealed".to_string()),
            501 => HealthStatus::Unhealthy("not initialized".to_string()),
            _ => HealthStatus::Unhealthy(format!("unexpected status {status}")),
        })
    }

    fn kv_url(&self, id: &str) -> Result<String, KeywardError> {
        let id = id.trim_matches('/');
        if id.is_empty() {
            return Err(KeywardError::Validation("secret id must not be empty".to_string()));
        }
        Ok(format!("{}/v1/{}/data/{}", self.address, self.kv_mount, id))
    }
}

impl std::fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("address", &self.address)
            .field("token", &"[REDACTED]")
            .field("key_name", &self.key_name)
            .field("kv_mount", &self.kv_mount)
            .finish()
    }
}

fn send_error(op: Operation, e: reqwest::Error) -> KeywardError {
    let message = if e.is_timeout() {
        format!("{op} timed out")
    } else {
        format!("{op} request failed: {e}")
    };
    warn!(operation = %op, error = %e, "transit request failed");
    KeywardError::TransitUnavailable {
        message,
        source: Some(Box::new(e)),
    }
}

async fn parse_success<T: serde::de::DeserializeOwned>(
    op: Operation,
    response: reqwest::Response,
) -> Result<T, KeywardError> {
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(op, status, response).await);
    }
    response.json::<T>().await.map_err(|e| KeywardError::TransitUnavailable {
        message: format!("{op} returned an unparseable body"),
        source: Some(Box::new(e)),
    })
}

/// Map a non-2xx response onto an error kind, carrying only Vault's error strings.
async fn status_error(op: Operation, status: StatusCode, response: reqwest::Response) -> KeywardError {
    let body = response.text().await.unwrap_or_default();
    let detail = VaultErrorResponse::from_body(&body).joined();
    debug!(operation = %op, status = %status, "transit error response");

    match status.as_u16() {
        401 | 403 => KeywardError::TransitAuth(format!("{op} returned {status}: {detail}")),
        400 if op == Operation::Decrypt => {
            KeywardError::TransitTokenInvalid(format!("{op} returned {status}: {detail}"))
        }
        _ => KeywardError::transit_unavailable(format!("{op} returned {status}: {detail}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(address: &str) -> VaultClient {
        VaultClient::new(
            address,
            &SecretString::from("test-token".to_string()),
            "pg-creds",
            "secrets",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn encrypt_sends_base64_plaintext_and_token_header() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/transit/encrypt/pg-creds"))
            .and(header("X-Vault-Token", "test-token"))
            .and(body_json(serde_json::json!({"plaintext": STANDARD.encode("secret123")})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"ciphertext": "vault:v1:c2VjcmV0", "key_version": 1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = test_client(&server.uri()).encrypt("secret123").await.unwrap();
        assert_eq!(token, "vault:v1:c2VjcmV0");
    }

    #[tokio::test]
    async fn decrypt_returns_decoded_plaintext() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/transit/decrypt/pg-creds"))
            .and(body_json(serde_json::json!({"ciphertext": "vault:v1:xyz"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"plaintext": STANDARD.encode("secret123")}
            })))
            .mount(&server)
            .await;

        let plaintext = test_client(&server.uri()).decrypt("vault:v1:xyz").await.unwrap();
        assert_eq!(plaintext.expose_secret(), "secret123");
    }

    #[tokio::test]
    async fn malformed_token_is_rejected_without_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).decrypt("not-a-token").await.unwrap_err();
        assert!(matches!(err, KeywardError::TransitTokenInvalid(_)));
    }

    #[tokio::test]
    async fn status_codes_map_to_error_kinds() {
        let cases = [
            (503, "TransitUnavailable"),
            (500, "TransitUnavailable"),
            (429, "TransitUnavailable"),
            (403, "TransitAuth"),
            (401, "TransitAuth"),
            (400, "TransitTokenInvalid"),
        ];

        for (status, expected) in cases {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/v1/transit/decrypt/pg-creds"))
                .respond_with(
                    ResponseTemplate::new(status)
                        .set_body_json(serde_json::json!({"errors": ["vault says no"]})),
                )
                .mount(&server)
                .await;

            let err = test_client(&server.uri()).decrypt("vault:v1:xyz").await.unwrap_err();
            let kind = match &err {
                KeywardError::TransitUnavailable { .. } => "TransitUnavailable",
                KeywardError::TransitAuth(_) => "TransitAuth",
                KeywardError::TransitTokenInvalid(_) => "TransitTokenInvalid",
                other => panic!("unexpected error {other:?}"),
            };
            assert_eq!(kind, expected, "status {status}");
            assert!(err.to_string().contains("vault says no"));
        }
    }

    #[tokio::test]
    async fn bad_request_on_encrypt_is_not_a_token_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/transit/encrypt/pg-creds"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).encrypt("x").await.unwrap_err();
        assert!(matches!(err, KeywardError::TransitUnavailable { .. }));
    }

    #[tokio::test]
    async fn unreachable_service_is_unavailable() {
        // Port 9 (discard) on localhost is expected to refuse connections.
        let err = test_client("http://127.0.0.1:9").encrypt("x").await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(err, KeywardError::TransitUnavailable { .. }));
    }

    #[tokio::test]
    async fn slow_service_times_out_as_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let client = VaultClient::new(
            &server.uri(),
            &SecretString::from("t".to_string()),
            "pg-creds",
            "secrets",
            Duration::from_millis(200),
        )
        .unwrap();
        let err = client.encrypt("x").await.unwrap_err();
        assert!(err.to_string().contains("timed out"), "got: {err}");
    }

    #[tokio::test]
    async fn kv_write_and_read() {
        let server = MockServer::start().await;
        let secret = serde_json::json!({"host": "db", "password": "pw"});

        Mock::given(method("POST"))
            .and(path("/v1/secrets/data/w1"))
            .and(body_json(serde_json::json!({"data": secret})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"version": 1}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/secrets/data/w1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": {"data": secret, "metadata": {"version": 1}}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        client.write_secret("w1", &secret).await.unwrap();
        assert_eq!(client.read_secret("w1").await.unwrap(), secret);
    }

    #[tokio::test]
    async fn kv_read_missing_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/secrets/data/missing"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({"errors": []})))
            .mount(&server)
            .await;

        let err = test_client(&server.uri()).read_secret("missing").await.unwrap_err();
        assert!(matches!(err, KeywardError::NotFound(_)));
    }

    #[tokio::test]
    async fn health_maps_vault_status_codes() {
        for (status, healthy) in [(200, true), (429, false), (503, false)] {
            let server = MockServer::start().await;
            Mock::given(method("GET"))
                .and(path("/v1/sys/health"))
                .respond_with(ResponseTemplate::new(status))
                .mount(&server)
                .await;

            let health = test_client(&server.uri()).health().await.unwrap();
            assert_eq!(health == HealthStatus::Healthy, healthy, "status {status}");
        }
    }

    #[test]
    fn debug_redacts_token() {
        let client = test_client("http://127.0.0.1:8200");
        let debug = format!("{client:?}");
        assert!(!debug.contains("test-token"));
        assert!(debug.contains("[REDACTED]"));
    }
}
