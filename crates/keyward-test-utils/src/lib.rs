// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Keyward integration tests.
//!
//! Provides mock adapters for fast, deterministic, CI-runnable tests without
//! a transit service, a release host, or a database to dump.
//!
//! # Components
//!
//! - [`MockTransit`] - Reversible tokens with an outage switch and call counters
//! - [`MockReleaseStore`] - GitHub-like release store with per-stage failures
//! - [`MockDumpRunner`] - Writes a fixed SQL file, can fail on demand
//! - [`MemoryRepository`] - In-memory credential records with write failures

pub mod memory_repository;
pub mod mock_dump;
pub mod mock_release_store;
pub mod mock_transit;

pub use memory_repository::MemoryRepository;
pub use mock_dump::{MOCK_DUMP_SQL, MockDumpRunner};
pub use mock_release_store::{MockReleaseStore, RecordedUpload};
pub use mock_transit::MockTransit;
