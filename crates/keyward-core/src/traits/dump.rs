// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Full-database dump capability.

use std::path::Path;

use async_trait::async_trait;

use crate::error::KeywardError;

/// Produces a full SQL dump of the database at `output`.
#[async_trait]
pub trait DumpRunner: Send + Sync + 'static {
    /// Writes the dump to `output`. A non-zero exit of the underlying process
    /// is reported as [`KeywardError::Dump`].
    async fn dump(&self, output: &Path) -> Result<(), KeywardError>;
}
