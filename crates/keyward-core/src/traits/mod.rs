// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Adapter trait definitions.
//!
//! Remote-facing adapters extend the [`PluginAdapter`] base trait and use
//! `#[async_trait]` for dynamic dispatch compatibility.

pub mod adapter;
pub mod dump;
pub mod release;
pub mod repository;
pub mod transit;

pub use adapter::PluginAdapter;
pub use dump::DumpRunner;
pub use release::ReleaseStore;
pub use repository::CredentialRepository;
pub use transit::TransitAdapter;
