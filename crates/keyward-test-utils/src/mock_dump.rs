// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock dump runner that writes a small fixed SQL file.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use keyward_core::{DumpRunner, KeywardError};

/// Contents written by [`MockDumpRunner`] on success.
pub const MOCK_DUMP_SQL: &str = "-- mock dump\nCREATE TABLE t (id integer);\n";

#[derive(Debug, Default)]
pub struct MockDumpRunner {
    calls: AtomicUsize,
    failures_remaining: AtomicUsize,
}

impl MockDumpRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` dumps with a non-zero exit, then succeed again.
    pub fn fail_next(&self, n: usize) {
        self.failures_remaining.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DumpRunner for MockDumpRunner {
    async fn dump(&self, output: &Path) -> Result<(), KeywardError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let failing = self
            .failures_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(KeywardError::Dump(
                "pg_dump exited with status 1: connection refused".to_string(),
            ));
        }

        tokio::fs::write(output, MOCK_DUMP_SQL)
            .await
            .map_err(|e| KeywardError::Dump(format!("failed to write {}: {e}", output.display())))
    }
}
