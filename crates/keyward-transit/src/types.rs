// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request/response bodies of the Vault transit and KV v2 HTTP APIs.

use serde::{Deserialize, Serialize};

/// `POST /v1/transit/encrypt/:name` body.
#[derive(Debug, Serialize)]
pub struct EncryptRequest<'a> {
    /// Base64 of the plaintext bytes.
    pub plaintext: &'a str,
}

/// `POST /v1/transit/decrypt/:name` body.
#[derive(Debug, Serialize)]
pub struct DecryptRequest<'a> {
    pub ciphertext: &'a str,
}

/// Vault wraps every payload in a `data` envelope.
#[derive(Debug, Deserialize)]
pub struct DataEnvelope<T> {
    pub data: T,
}

#[derive(Debug, Deserialize)]
pub struct EncryptData {
    pub ciphertext: String,
}

/// Plaintext is base64 and deliberately has no `Debug`.
#[derive(Deserialize)]
pub struct DecryptData {
    pub plaintext: String,
}

/// KV v2 write body: `{"data": {...}}`.
#[derive(Debug, Serialize)]
pub struct KvWriteRequest<'a> {
    pub data: &'a serde_json::Value,
}

/// KV v2 read payload; the secret itself is the nested `data`.
#[derive(Debug, Deserialize)]
pub struct KvReadData {
    pub data: serde_json::Value,
}

/// Error body returned by Vault on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub struct VaultErrorResponse {
    #[serde(default)]
    pub errors: Vec<String>,
}

impl VaultErrorResponse {
    /// Parse an error body, tolerating empty or non-JSON bodies.
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str(body).unwrap_or_default()
    }

    pub fn joined(&self) -> String {
        if self.errors.is_empty() {
            "no error detail".to_string()
        } else {
            self.errors.join("; ")
        }
    }
}
