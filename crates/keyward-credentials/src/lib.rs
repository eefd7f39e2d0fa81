// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential store service for Keyward.
//!
//! Credentials are encrypted through a [`keyward_core::TransitAdapter`]
//! before they reach the repository, and verified by decrypting the stored
//! token and comparing in constant time.

pub mod compare;
pub mod store;

pub use compare::constant_time_eq;
pub use store::{CredentialStore, UpsertCredential};
