// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot CLI commands: backup, credential, envelope and secret.
//!
//! Secrets are read from stdin (or a hidden TTY prompt), never from argv.

use std::io::{IsTerminal, Read};

use keyward::{Keyward, UpsertCredential};
use keyward_config::KeywardConfig;
use keyward_core::KeywardError;
use keyward_envelope::{EnvelopeCiphertext, get_passphrase, mask_secret};
use keyward_transit::VaultClient;
use secrecy::{ExposeSecret, SecretString};

/// Read one secret line from a hidden prompt, or from stdin when piped.
fn read_secret_input(prompt: &str) -> Result<SecretString, KeywardError> {
    let value = if std::io::stdin().is_terminal() {
        rpassword::prompt_password(prompt)
            .map_err(|e| KeywardError::Validation(format!("failed to read input: {e}")))?
    } else {
        let mut line = String::new();
        std::io::stdin()
            .read_line(&mut line)
            .map_err(|e| KeywardError::Validation(format!("failed to read stdin: {e}")))?;
        line.trim_end_matches(['\r', '\n']).to_string()
    };
    if value.is_empty() {
        return Err(KeywardError::Validation("empty input".to_string()));
    }
    Ok(SecretString::from(value))
}

fn parse_json(input: &str, what: &str) -> Result<serde_json::Value, KeywardError> {
    serde_json::from_str(input)
        .map_err(|e| KeywardError::Validation(format!("{what} is not valid JSON: {e}")))
}

/// `keyward backup`: run the pipeline once and print the artifact as JSON.
pub async fn run_backup(config: &KeywardConfig) -> Result<(), KeywardError> {
    let keyward = Keyward::from_config(config).await?;
    let result = keyward.trigger_backup().await;
    keyward.close().await?;

    let artifact = result?;
    let json = serde_json::to_string_pretty(&artifact)
        .map_err(|e| KeywardError::Internal(format!("failed to serialize artifact: {e}")))?;
    println!("{json}");
    Ok(())
}

/// `keyward credential store`.
pub async fn store_credential(
    config: &KeywardConfig,
    webhook_id: String,
    webhook_config: &str,
) -> Result<(), KeywardError> {
    let webhook_config = parse_json(webhook_config, "--config-json")?;
    let credential = read_secret_input("Credential: ")?;

    let keyward = Keyward::from_config(config).await?;
    let result = keyward
        .upsert_credential(UpsertCredential {
            webhook_id: Some(webhook_id.clone()),
            config: Some(webhook_config),
            credential: Some(credential),
        })
        .await;
    keyward.close().await?;
    result?;

    eprintln!("credential stored for {webhook_id}");
    Ok(())
}

/// `keyward credential verify`. Returns whether the supplied credential matched.
pub async fn verify_credential(
    config: &KeywardConfig,
    webhook_id: &str,
) -> Result<bool, KeywardError> {
    let supplied = read_secret_input("Credential: ")?;

    let keyward = Keyward::from_config(config).await?;
    let result = keyward
        .verify_credential(webhook_id, supplied.expose_secret())
        .await;
    keyward.close().await?;

    let matches = result?;
    println!("{}", if matches { "match" } else { "no match" });
    Ok(matches)
}

/// `keyward credential show`: print the stored config document.
pub async fn show_credential(config: &KeywardConfig, webhook_id: &str) -> Result<(), KeywardError> {
    let keyward = Keyward::from_config(config).await?;
    let result = keyward.credential_config(webhook_id).await;
    keyward.close().await?;

    let json = serde_json::to_string_pretty(&result?)
        .map_err(|e| KeywardError::Internal(format!("failed to serialize config: {e}")))?;
    println!("{json}");
    Ok(())
}

/// `keyward envelope encrypt`: seal a secret read from stdin, print hex.
pub fn envelope_encrypt() -> Result<(), KeywardError> {
    let passphrase = get_passphrase()?;
    let plaintext = read_secret_input("Secret to encrypt: ")?;
    let sealed = keyward_envelope::encrypt(plaintext.expose_secret(), passphrase.expose_secret())?;
    println!("{}", sealed.to_hex());
    Ok(())
}

/// `keyward envelope decrypt`: open a hex ciphertext and print the plaintext.
pub fn envelope_decrypt(ciphertext_hex: &str) -> Result<(), KeywardError> {
    let ciphertext = EnvelopeCiphertext::from_hex(ciphertext_hex.trim())?;
    let passphrase = get_passphrase()?;
    let plaintext = keyward_envelope::decrypt(&ciphertext, passphrase.expose_secret())?;
    println!("{}", plaintext.expose_secret());
    Ok(())
}

/// `keyward secret put`: write a JSON object read from stdin to the KV store.
pub async fn secret_put(config: &KeywardConfig, id: &str) -> Result<(), KeywardError> {
    let mut input = String::new();
    std::io::stdin()
        .read_to_string(&mut input)
        .map_err(|e| KeywardError::Validation(format!("failed to read stdin: {e}")))?;
    let data = parse_json(&input, "secret data")?;
    if !data.is_object() {
        return Err(KeywardError::Validation(
            "secret data must be a JSON object".to_string(),
        ));
    }

    VaultClient::from_config(&config.transit)?
        .write_secret(id, &data)
        .await?;
    eprintln!("secret `{id}` written");
    Ok(())
}

/// `keyward secret get`: print a KV secret, masking string values unless `reveal`.
pub async fn secret_get(config: &KeywardConfig, id: &str, reveal: bool) -> Result<(), KeywardError> {
    let mut data = VaultClient::from_config(&config.transit)?
        .read_secret(id)
        .await?;
    if !reveal {
        mask_string_values(&mut data);
    }
    let json = serde_json::to_string_pretty(&data)
        .map_err(|e| KeywardError::Internal(format!("failed to serialize secret: {e}")))?;
    println!("{json}");
    Ok(())
}

fn mask_string_values(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::String(s) => *s = mask_secret(s),
        serde_json::Value::Array(items) => items.iter_mut().for_each(mask_string_values),
        serde_json::Value::Object(map) => map.values_mut().for_each(mask_string_values),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn masking_reaches_nested_strings() {
        let mut value = json!({
            "user": "postgres",
            "password": "a-very-long-password",
            "port": 5432,
            "hosts": ["primary.db.internal"]
        });
        mask_string_values(&mut value);
        assert_eq!(value["user"], "****");
        assert_eq!(value["password"], "a-ve...word");
        assert_eq!(value["port"], 5432);
        assert_eq!(value["hosts"][0], "prim...rnal");
    }

    #[test]
    fn invalid_json_is_validation_error() {
        assert!(matches!(
            parse_json("{not json", "--config"),
            Err(KeywardError::Validation(_))
        ));
    }
}
