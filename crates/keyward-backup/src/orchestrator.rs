// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The dump, tag, upload and cleanup pipeline.
//!
//! Each run moves through [`BackupStage`]s in order and stops at the first
//! failing stage. Runs are serialized: a manual trigger issued while the
//! scheduled run is in flight waits for it, then resolves the same release.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};
use keyward_core::{
    BackupArtifact, DumpRunner, KeywardError, NewRelease, Release, ReleaseAsset, ReleaseStore,
    backup_file_name, backup_tag,
};
use strum::Display;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Pipeline stage, recorded in every log line of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum BackupStage {
    Dumping,
    ResolvingRelease,
    Uploading,
    Cleanup,
    Done,
}

pub struct BackupOrchestrator {
    dumper: Arc<dyn DumpRunner>,
    releases: Arc<dyn ReleaseStore>,
    output_dir: PathBuf,
    use_utc: bool,
    run_lock: Mutex<()>,
}

impl BackupOrchestrator {
    pub fn new(
        dumper: Arc<dyn DumpRunner>,
        releases: Arc<dyn ReleaseStore>,
        output_dir: impl Into<PathBuf>,
        use_utc: bool,
    ) -> Self {
        Self {
            dumper,
            releases,
            output_dir: output_dir.into(),
            use_utc,
            run_lock: Mutex::new(()),
        }
    }

    /// The date a run started now would be tagged with.
    pub fn today(&self) -> NaiveDate {
        if self.use_utc {
            Utc::now().date_naive()
        } else {
            Local::now().date_naive()
        }
    }

    /// Back up the database under today's tag.
    pub async fn run_backup(&self) -> Result<BackupArtifact, KeywardError> {
        self.run_backup_for(self.today()).await
    }

    /// Back up the database under the tag for `date`.
    ///
    /// Reruns for the same date reuse the release and replace its asset.
    pub async fn run_backup_for(&self, date: NaiveDate) -> Result<BackupArtifact, KeywardError> {
        let _guard = self.run_lock.lock().await;
        let tag = backup_tag(date);
        let mut stage = BackupStage::Dumping;

        match self.execute(date, &tag, &mut stage).await {
            Ok(artifact) => {
                info!(
                    stage = %BackupStage::Done,
                    tag = %artifact.tag,
                    release_id = artifact.release_id,
                    asset = %artifact.asset_name,
                    "backup complete"
                );
                Ok(artifact)
            }
            Err(e) => {
                error!(stage = %stage, tag = %tag, retryable = e.is_retryable(), error = %e, "backup failed");
                Err(e)
            }
        }
    }

    async fn execute(
        &self,
        date: NaiveDate,
        tag: &str,
        stage: &mut BackupStage,
    ) -> Result<BackupArtifact, KeywardError> {
        let file_name = backup_file_name(date);
        let path = self.output_dir.join(&file_name);

        enter(stage, BackupStage::Dumping, tag);
        tokio::fs::create_dir_all(&self.output_dir).await.map_err(|e| {
            KeywardError::Dump(format!(
                "failed to create output directory {}: {e}",
                self.output_dir.display()
            ))
        })?;
        self.dumper.dump(&path).await?;

        enter(stage, BackupStage::ResolvingRelease, tag);
        let release = self.resolve_release(date, tag).await?;

        enter(stage, BackupStage::Uploading, tag);
        let data = tokio::fs::read(&path).await.map_err(|e| {
            KeywardError::Upload(format!("failed to read dump {}: {e}", path.display()))
        })?;
        let asset = self.publish_asset(&release, &file_name, data, tag).await?;

        enter(stage, BackupStage::Cleanup, tag);
        if let Err(e) = tokio::fs::remove_file(&path).await {
            warn!(stage = %BackupStage::Cleanup, tag, path = %path.display(), error = %e, "failed to remove local dump");
        }

        Ok(BackupArtifact {
            tag: tag.to_string(),
            release_id: release.id,
            asset_name: asset.name,
            download_url: asset.browser_download_url,
            release_url: release.html_url,
        })
    }

    /// Attach `data` to `release` as `file_name`.
    ///
    /// An asset left by an earlier run is only removed once the new dump is
    /// stored under a staging name, so a failed upload never leaves the
    /// release without a backup.
    async fn publish_asset(
        &self,
        release: &Release,
        file_name: &str,
        data: Vec<u8>,
        tag: &str,
    ) -> Result<ReleaseAsset, KeywardError> {
        let Some(stale) = release.asset_named(file_name) else {
            return self.releases.upload_asset(release, file_name, data).await;
        };

        let staging_name = format!("{file_name}.tmp-{}", Utc::now().timestamp_millis());
        let staged = self.releases.upload_asset(release, &staging_name, data).await?;
        info!(tag, asset_id = stale.id, staged_id = staged.id, "replacing asset from an earlier run");

        match self.releases.delete_asset(stale.id).await {
            Ok(()) | Err(KeywardError::NotFound(_)) => {}
            Err(e) => {
                if let Err(cleanup) = self.releases.delete_asset(staged.id).await {
                    warn!(tag, asset = %staging_name, error = %cleanup, "failed to remove staged asset");
                }
                return Err(KeywardError::Upload(format!(
                    "failed to remove stale asset {}: {e}",
                    stale.id
                )));
            }
        }

        self.releases
            .rename_asset(staged.id, file_name)
            .await
            .map_err(|e| {
                KeywardError::Upload(format!(
                    "new dump is stored as `{staging_name}` but could not be renamed: {e}"
                ))
            })
    }

    /// Find the release for `tag`, creating it only when the lookup says it does not exist.
    async fn resolve_release(&self, date: NaiveDate, tag: &str) -> Result<Release, KeywardError> {
        if let Some(release) = self.releases.get_release_by_tag(tag).await? {
            info!(tag, release_id = release.id, "reusing existing release");
            return Ok(release);
        }

        let release = self
            .releases
            .create_release(&NewRelease {
                tag_name: tag.to_string(),
                name: format!("Backup for {date}"),
                draft: false,
                prerelease: false,
            })
            .await?;
        info!(tag, release_id = release.id, "created release");
        Ok(release)
    }
}

fn enter(stage: &mut BackupStage, next: BackupStage, tag: &str) {
    *stage = next;
    info!(stage = %next, tag, "backup stage");
}
