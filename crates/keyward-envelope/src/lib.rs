// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Passphrase-keyed envelope cipher for Keyward.
//!
//! Secrets are sealed with AES-256-GCM under `SHA-256(passphrase)`. The
//! output is `nonce || ciphertext || tag` with a fresh random nonce per call.
//! [`LocalTransit`] exposes the same cipher as a transit adapter for
//! deployments without a remote transit service.

pub mod ciphertext;
pub mod crypto;
pub mod kdf;
pub mod local;
pub mod secret;

pub use ciphertext::EnvelopeCiphertext;
pub use crypto::{decrypt, encrypt};
pub use kdf::derive_key;
pub use local::LocalTransit;
pub use secret::{get_passphrase, mask_secret};
