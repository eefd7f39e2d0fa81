// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock release store mirroring GitHub's release semantics.
//!
//! Creating a release for an existing tag fails, and uploading an asset whose
//! name is already taken on the release fails, exactly as the real API does.
//! Individual stages can be made to fail for error-path tests.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use keyward_core::{
    AdapterType, HealthStatus, KeywardError, NewRelease, PluginAdapter, Release, ReleaseAsset,
    ReleaseStore,
};
use tokio::sync::Mutex;

/// An asset upload observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedUpload {
    pub release_id: u64,
    pub name: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct MockReleaseStore {
    releases: Mutex<Vec<Release>>,
    uploads: Mutex<Vec<RecordedUpload>>,
    next_id: AtomicU64,
    create_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    fail_lookup: AtomicBool,
    fail_create: AtomicBool,
    fail_upload: AtomicBool,
    fail_rename: AtomicBool,
    create_delay_ms: AtomicU64,
}

impl MockReleaseStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            ..Self::default()
        }
    }

    /// Make lookups fail with a non-404 error.
    pub fn set_fail_lookup(&self, fail: bool) {
        self.fail_lookup.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_upload(&self, fail: bool) {
        self.fail_upload.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_rename(&self, fail: bool) {
        self.fail_rename.store(fail, Ordering::SeqCst);
    }

    /// Delay release creation, widening any lookup/create race window.
    pub fn set_create_delay(&self, delay: Duration) {
        self.create_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub async fn releases(&self) -> Vec<Release> {
        self.releases.lock().await.clone()
    }

    pub async fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().await.clone()
    }
}

#[async_trait]
impl PluginAdapter for MockReleaseStore {
    fn name(&self) -> &str {
        "mock-release-store"
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::ReleaseStore
    }

    async fn health_check(&self) -> Result<HealthStatus, KeywardError> {
        Ok(HealthStatus::Healthy)
    }
}

#[async_trait]
impl ReleaseStore for MockReleaseStore {
    async fn get_release_by_tag(&self, tag: &str) -> Result<Option<Release>, KeywardError> {
        if self.fail_lookup.load(Ordering::SeqCst) {
            return Err(KeywardError::ReleaseLookup(
                "mock release store returned 500".to_string(),
            ));
        }
        Ok(self
            .releases
            .lock()
            .await
            .iter()
            .find(|r| r.tag_name == tag)
            .cloned())
    }

    async fn create_release(&self, release: &NewRelease) -> Result<Release, KeywardError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(KeywardError::ReleaseCreate(
                "mock release store rejected create".to_string(),
            ));
        }

        let delay = self.create_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        let mut releases = self.releases.lock().await;
        if releases.iter().any(|r| r.tag_name == release.tag_name) {
            return Err(KeywardError::ReleaseCreate(format!(
                "tag_name `{}` already_exists",
                release.tag_name
            )));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let created = Release {
            id,
            tag_name: release.tag_name.clone(),
            name: Some(release.name.clone()),
            html_url: format!("https://example.test/releases/{id}"),
            assets: Vec::new(),
        };
        releases.push(created.clone());
        Ok(created)
    }

    async fn upload_asset(
        &self,
        release: &Release,
        name: &str,
        data: Vec<u8>,
    ) -> Result<ReleaseAsset, KeywardError> {
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(KeywardError::Upload("mock upload connection reset".to_string()));
        }

        let mut releases = self.releases.lock().await;
        let stored = releases
            .iter_mut()
            .find(|r| r.id == release.id)
            .ok_or_else(|| KeywardError::Upload(format!("release {} not found", release.id)))?;
        if stored.asset_named(name).is_some() {
            return Err(KeywardError::Upload(format!("asset `{name}` already_exists")));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let asset = ReleaseAsset {
            id,
            name: name.to_string(),
            browser_download_url: format!(
                "https://example.test/releases/download/{}/{name}",
                stored.tag_name
            ),
        };
        stored.assets.push(asset.clone());
        self.uploads.lock().await.push(RecordedUpload {
            release_id: release.id,
            name: name.to_string(),
            data,
        });
        Ok(asset)
    }

    async fn delete_asset(&self, asset_id: u64) -> Result<(), KeywardError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let mut releases = self.releases.lock().await;
        for release in releases.iter_mut() {
            if let Some(pos) = release.assets.iter().position(|a| a.id == asset_id) {
                release.assets.remove(pos);
                return Ok(());
            }
        }
        Err(KeywardError::NotFound(format!("asset {asset_id}")))
    }

    async fn rename_asset(&self, asset_id: u64, name: &str) -> Result<ReleaseAsset, KeywardError> {
        if self.fail_rename.load(Ordering::SeqCst) {
            return Err(KeywardError::Upload("mock rename rejected".to_string()));
        }

        let mut releases = self.releases.lock().await;
        for release in releases.iter_mut() {
            let Some(pos) = release.assets.iter().position(|a| a.id == asset_id) else {
                continue;
            };
            if release.assets.iter().any(|a| a.id != asset_id && a.name == name) {
                return Err(KeywardError::Upload(format!("asset `{name}` already_exists")));
            }
            let asset = &mut release.assets[pos];
            asset.name = name.to_string();
            asset.browser_download_url = format!(
                "https://example.test/releases/download/{}/{name}",
                release.tag_name
            );
            return Ok(asset.clone());
        }
        Err(KeywardError::NotFound(format!("asset {asset_id}")))
    }
}
