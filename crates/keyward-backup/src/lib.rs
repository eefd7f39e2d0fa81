// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Daily database backups for Keyward.
//!
//! [`BackupOrchestrator`] dumps the database with a [`keyward_core::DumpRunner`],
//! resolves or creates the release tagged for the day, uploads the dump as a
//! release asset, and removes the local file. [`spawn_scheduled_backups`]
//! drives it from a cron expression.

pub mod dump;
pub mod github;
pub mod orchestrator;
pub mod schedule;

pub use dump::PgDumpRunner;
pub use github::GitHubReleaseStore;
pub use orchestrator::{BackupOrchestrator, BackupStage};
pub use schedule::{BackupSchedule, spawn_scheduled_backups};
