// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM seal/open over [`EnvelopeCiphertext`].
//!
//! Every call to [`seal`] generates a fresh random 96-bit nonce via the system
//! CSPRNG. Nonce reuse would be catastrophic for GCM security.

use keyward_core::KeywardError;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::SecretString;
use zeroize::Zeroizing;

use crate::ciphertext::{EnvelopeCiphertext, NONCE_LEN};
use crate::kdf::{KEY_LEN, derive_key};

fn aead_key(key: &[u8; KEY_LEN]) -> Result<LessSafeKey, KeywardError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| KeywardError::Internal("failed to create AES-256-GCM key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext` under `key` with a random nonce. No associated data.
pub fn seal(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<EnvelopeCiphertext, KeywardError> {
    let key = aead_key(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| KeywardError::Internal("failed to generate random nonce".to_string()))?;

    // Seal in place: the buffer is extended with the authentication tag.
    let mut in_out = plaintext.to_vec();
    key.seal_in_place_append_tag(
        Nonce::assume_unique_for_key(nonce_bytes),
        Aad::empty(),
        &mut in_out,
    )
    .map_err(|_| KeywardError::Internal("AES-256-GCM encryption failed".to_string()))?;

    Ok(EnvelopeCiphertext::from_parts(nonce_bytes, in_out))
}

/// Authenticate and decrypt `ciphertext` under `key`.
///
/// Any failure is [`KeywardError::Integrity`]; no bytes are returned unless
/// the tag verifies.
pub fn open(
    key: &[u8; KEY_LEN],
    ciphertext: &EnvelopeCiphertext,
) -> Result<Zeroizing<Vec<u8>>, KeywardError> {
    let key = aead_key(key)?;
    let nonce = Nonce::try_assume_unique_for_key(ciphertext.nonce())
        .map_err(|_| KeywardError::Integrity("malformed nonce".to_string()))?;

    let mut in_out = Zeroizing::new(ciphertext.sealed().to_vec());
    let plaintext_len = key
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| {
            KeywardError::Integrity(
                "authentication failed: wrong passphrase or corrupted data".to_string(),
            )
        })?
        .len();
    in_out.truncate(plaintext_len);

    Ok(in_out)
}

/// Encrypt a UTF-8 secret with a key derived from `passphrase`.
pub fn encrypt(plaintext: &str, passphrase: &str) -> Result<EnvelopeCiphertext, KeywardError> {
    let key = derive_key(passphrase);
    seal(&key, plaintext.as_bytes())
}

/// Decrypt an envelope produced by [`encrypt`] with the same passphrase.
///
/// Fails with [`KeywardError::Integrity`] on a wrong passphrase, any modified
/// byte, or a plaintext that is not UTF-8.
pub fn decrypt(ciphertext: &EnvelopeCiphertext, passphrase: &str) -> Result<SecretString, KeywardError> {
    let key = derive_key(passphrase);
    let plaintext = open(&key, ciphertext)?;
    let text = std::str::from_utf8(&plaintext)
        .map_err(|_| KeywardError::Integrity("decrypted payload is not valid UTF-8".to_string()))?;
    Ok(SecretString::from(text.to_owned()))
}
