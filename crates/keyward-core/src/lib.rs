// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Keyward.
//!
//! This crate provides the error taxonomy, shared types, and the adapter
//! traits that front every external collaborator: the transit service, the
//! release store, the database dump process, and credential persistence.

pub mod error;
pub mod traits;
pub mod types;

pub use error::KeywardError;
pub use types::{
    AdapterType, BackupArtifact, CredentialRecord, HealthStatus, NewRelease, Release,
    ReleaseAsset, WebhookId, backup_file_name, backup_tag,
};

pub use traits::{CredentialRepository, DumpRunner, PluginAdapter, ReleaseStore, TransitAdapter};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_traits_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_transit_adapter<T: TransitAdapter>() {}
        fn _assert_release_store<T: ReleaseStore>() {}
        fn _assert_dump_runner<T: DumpRunner>() {}
        fn _assert_credential_repository<T: CredentialRepository>() {}
    }

    #[test]
    fn health_status_variants() {
        assert_eq!(HealthStatus::Healthy, HealthStatus::Healthy);
        assert_ne!(HealthStatus::Degraded("slow".into()), HealthStatus::Healthy);
        assert_ne!(HealthStatus::Unhealthy("down".into()), HealthStatus::Healthy);
    }
}
