// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire layout of an envelope ciphertext: `nonce(12) || ciphertext || tag(16)`.

use keyward_core::KeywardError;

/// AES-GCM nonce length.
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length.
pub const TAG_LEN: usize = 16;

/// Output of [`crate::encrypt`]: the nonce followed by the sealed payload.
///
/// Construction from untrusted bytes checks only the minimum length; the
/// tag is verified when the ciphertext is opened.
#[derive(Clone, PartialEq, Eq)]
pub struct EnvelopeCiphertext(Vec<u8>);

impl EnvelopeCiphertext {
    /// Assemble from a nonce and the sealed payload (ciphertext plus tag).
    pub(crate) fn from_parts(nonce: [u8; NONCE_LEN], sealed: Vec<u8>) -> Self {
        let mut bytes = Vec::with_capacity(NONCE_LEN + sealed.len());
        bytes.extend_from_slice(&nonce);
        bytes.extend_from_slice(&sealed);
        Self(bytes)
    }

    /// Wrap raw bytes, rejecting input too short to hold a nonce and tag.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, KeywardError> {
        if bytes.len() < NONCE_LEN + TAG_LEN {
            return Err(KeywardError::Integrity(format!(
                "ciphertext is {} bytes, shorter than nonce and tag ({} bytes)",
                bytes.len(),
                NONCE_LEN + TAG_LEN
            )));
        }
        Ok(Self(bytes))
    }

    /// Decode from lowercase or uppercase hex.
    pub fn from_hex(encoded: &str) -> Result<Self, KeywardError> {
        let bytes = hex::decode(encoded.trim())
            .map_err(|e| KeywardError::Integrity(format!("ciphertext is not valid hex: {e}")))?;
        Self::from_bytes(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// The 12-byte nonce prefix.
    pub fn nonce(&self) -> &[u8] {
        &self.0[..NONCE_LEN]
    }

    /// Ciphertext with the trailing tag.
    pub fn sealed(&self) -> &[u8] {
        &self.0[NONCE_LEN..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl std::fmt::Debug for EnvelopeCiphertext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EnvelopeCiphertext([{} bytes])", self.0.len())
    }
}
