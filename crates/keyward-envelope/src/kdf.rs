// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Passphrase to key derivation.
//!
//! The envelope key is the SHA-256 digest of the UTF-8 passphrase. There is
//! no salt, so a given passphrase always yields the same key and ciphertexts
//! stay decryptable across processes without stored parameters.

use ring::digest::{SHA256, digest};
use zeroize::Zeroizing;

/// Length of the derived AES-256 key in bytes.
pub const KEY_LEN: usize = 32;

/// Derive the 32-byte envelope key from `passphrase`.
///
/// The returned key is wrapped in [`Zeroizing`] so it is wiped on drop.
pub fn derive_key(passphrase: &str) -> Zeroizing<[u8; KEY_LEN]> {
    let hash = digest(&SHA256, passphrase.as_bytes());
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    key.copy_from_slice(hash.as_ref());
    key
}
