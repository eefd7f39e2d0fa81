// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Release store capability used for backup delivery.

use async_trait::async_trait;

use crate::error::KeywardError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{NewRelease, Release, ReleaseAsset};

/// Remote store of tagged releases with attached file assets.
#[async_trait]
pub trait ReleaseStore: PluginAdapter {
    /// Looks up the release for `tag`.
    ///
    /// Returns `Ok(None)` only when the store reports the tag does not exist.
    /// Transient or auth failures are errors, never `None`.
    async fn get_release_by_tag(&self, tag: &str) -> Result<Option<Release>, KeywardError>;

    /// Creates a release.
    async fn create_release(&self, release: &NewRelease) -> Result<Release, KeywardError>;

    /// Uploads `data` as an asset named `name` on `release`.
    async fn upload_asset(
        &self,
        release: &Release,
        name: &str,
        data: Vec<u8>,
    ) -> Result<ReleaseAsset, KeywardError>;

    /// Deletes an asset by id.
    async fn delete_asset(&self, asset_id: u64) -> Result<(), KeywardError>;

    /// Renames an existing asset. Fails if another asset on the release
    /// already has `name`.
    async fn rename_asset(&self, asset_id: u64, name: &str) -> Result<ReleaseAsset, KeywardError>;
}
