// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Constant-time secret comparison.

use keyward_core::KeywardError;
use ring::hmac;
use ring::rand::SystemRandom;

/// Compare two byte strings without leaking where they differ.
///
/// Both sides are MACed under a fresh random HMAC-SHA256 key and the tags
/// are checked with `ring::hmac::verify`, so timing depends on neither the
/// contents nor the length of the secrets.
pub fn constant_time_eq(expected: &[u8], supplied: &[u8]) -> Result<bool, KeywardError> {
    let key = hmac::Key::generate(hmac::HMAC_SHA256, &SystemRandom::new())
        .map_err(|_| KeywardError::Internal("failed to generate comparison key".to_string()))?;
    let tag = hmac::sign(&key, expected);
    Ok(hmac::verify(&key, supplied, tag.as_ref()).is_ok())
}
