// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cron-driven backup scheduling.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, Utc};
use croner::Cron;
use keyward_config::model::BackupConfig;
use keyward_core::KeywardError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::orchestrator::BackupOrchestrator;

/// A parsed cron expression plus the timezone it is evaluated in.
#[derive(Debug, Clone)]
pub struct BackupSchedule {
    cron: Cron,
    expression: String,
    use_utc: bool,
}

impl BackupSchedule {
    pub fn parse(expression: &str, use_utc: bool) -> Result<Self, KeywardError> {
        let cron = expression.parse::<Cron>().map_err(|e| {
            KeywardError::Config(format!("invalid backup schedule `{expression}`: {e}"))
        })?;
        Ok(Self {
            cron,
            expression: expression.to_string(),
            use_utc,
        })
    }

    pub fn from_config(config: &BackupConfig) -> Result<Self, KeywardError> {
        Self::parse(&config.schedule, config.use_utc)
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// First scheduled instant strictly after `now`.
    pub fn next_after(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, KeywardError> {
        let next = if self.use_utc {
            self.cron.find_next_occurrence(&now, false)
        } else {
            self.cron
                .find_next_occurrence(&now.with_timezone(&Local), false)
                .map(|t| t.with_timezone(&Utc))
        };
        next.map_err(|e| {
            KeywardError::Internal(format!(
                "no next occurrence for schedule `{}`: {e}",
                self.expression
            ))
        })
    }

    /// The occurrence after `previous`, skipping any already behind `now`.
    ///
    /// Anchoring on `previous` keeps a timer that fires slightly before the
    /// wall clock reaches `previous` from scheduling the same instant twice.
    pub fn following(
        &self,
        previous: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, KeywardError> {
        self.next_after(previous.max(now))
    }

    /// Calendar date of `instant` in the schedule's timezone.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        if self.use_utc {
            instant.date_naive()
        } else {
            instant.with_timezone(&Local).date_naive()
        }
    }
}

/// Run `orchestrator` on `schedule` until `cancel` fires.
///
/// A failed run is logged and the loop waits for the next occurrence.
pub fn spawn_scheduled_backups(
    orchestrator: Arc<BackupOrchestrator>,
    schedule: BackupSchedule,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(schedule = %schedule.expression(), utc = schedule.use_utc, "backup scheduler started");
        let mut next = match schedule.next_after(Utc::now()) {
            Ok(next) => next,
            Err(e) => {
                error!(error = %e, "backup scheduler stopping");
                return;
            }
        };
        loop {
            let wait = (next - Utc::now()).to_std().unwrap_or(Duration::ZERO);
            info!(next = %next, "next scheduled backup");

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            // Tag by the scheduled instant; the wall clock may still read the previous day.
            match orchestrator.run_backup_for(schedule.date_of(next)).await {
                Ok(artifact) => {
                    info!(tag = %artifact.tag, release_id = artifact.release_id, "scheduled backup complete");
                }
                Err(e) => {
                    error!(retryable = e.is_retryable(), error = %e, "scheduled backup failed");
                }
            }

            next = match schedule.following(next, Utc::now()) {
                Ok(following) => following,
                Err(e) => {
                    error!(error = %e, "backup scheduler stopping");
                    break;
                }
            };
        }
        info!("backup scheduler stopped");
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use keyward_test_utils::{MockDumpRunner, MockReleaseStore};

    use super::*;

    #[test]
    fn daily_midnight_utc() {
        let schedule = BackupSchedule::parse("0 0 * * *", true).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 7, 13, 45, 0).unwrap();
        let next = schedule.next_after(now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 8, 0, 0, 0).unwrap());
    }

    #[test]
    fn exactly_on_the_hour_moves_to_the_next_day() {
        let schedule = BackupSchedule::parse("0 0 * * *", true).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 8, 0, 0, 0).unwrap();
        let next = schedule.next_after(now).unwrap();
        assert_eq!(next, Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap());
    }

    #[test]
    fn local_schedule_is_after_now() {
        let schedule = BackupSchedule::parse("30 2 * * *", false).unwrap();
        let now = Utc::now();
        let next = schedule.next_after(now).unwrap();
        assert!(next > now);
        assert!(next - now <= chrono::Duration::hours(25));
    }

    #[test]
    fn early_wakeup_does_not_repeat_the_occurrence() {
        let schedule = BackupSchedule::parse("0 0 * * *", true).unwrap();
        let scheduled = Utc.with_ymd_and_hms(2026, 3, 8, 0, 0, 0).unwrap();
        let early = scheduled - chrono::Duration::milliseconds(15);

        assert_eq!(schedule.next_after(early).unwrap(), scheduled);
        assert_eq!(
            schedule.following(scheduled, early).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap()
        );
        assert_eq!(
            schedule.date_of(scheduled),
            NaiveDate::from_ymd_opt(2026, 3, 8).unwrap()
        );
    }

    #[test]
    fn overrun_skips_missed_occurrences() {
        let schedule = BackupSchedule::parse("0 * * * *", true).unwrap();
        let scheduled = Utc.with_ymd_and_hms(2026, 3, 8, 0, 0, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2026, 3, 8, 3, 20, 0).unwrap();
        assert_eq!(
            schedule.following(scheduled, now).unwrap(),
            Utc.with_ymd_and_hms(2026, 3, 8, 4, 0, 0).unwrap()
        );
    }

    #[test]
    fn invalid_expression_is_config_error() {
        let err = BackupSchedule::parse("every day", true).unwrap_err();
        assert!(matches!(err, KeywardError::Config(_)));
    }

    #[test]
    fn from_config_uses_default_daily_schedule() {
        let schedule = BackupSchedule::from_config(&BackupConfig::default()).unwrap();
        assert_eq!(schedule.expression(), "0 0 * * *");
    }

    fn orchestrator(
        dir: &tempfile::TempDir,
    ) -> (Arc<MockDumpRunner>, Arc<MockReleaseStore>, Arc<BackupOrchestrator>) {
        let dumper = Arc::new(MockDumpRunner::new());
        let releases = Arc::new(MockReleaseStore::new());
        let orchestrator = Arc::new(BackupOrchestrator::new(
            dumper.clone(),
            releases.clone(),
            dir.path(),
            true,
        ));
        (dumper, releases, orchestrator)
    }

    #[tokio::test(start_paused = true)]
    async fn failed_run_does_not_stop_the_scheduler() {
        let dir = tempfile::tempdir().unwrap();
        let (dumper, releases, orchestrator) = orchestrator(&dir);
        dumper.fail_next(1);

        let cancel = CancellationToken::new();
        let schedule = BackupSchedule::parse("* * * * *", true).unwrap();
        let handle = spawn_scheduled_backups(orchestrator, schedule, cancel.clone());

        for _ in 0..200 {
            if dumper.calls() >= 2 && !releases.uploads().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        assert!(dumper.calls() >= 2, "scheduler stopped after a failed run");
        assert!(!releases.uploads().await.is_empty());

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_an_idle_scheduler() {
        let dir = tempfile::tempdir().unwrap();
        let (dumper, _releases, orchestrator) = orchestrator(&dir);

        let cancel = CancellationToken::new();
        let schedule = BackupSchedule::parse("0 0 1 1 *", true).unwrap();
        let handle = spawn_scheduled_backups(orchestrator, schedule, cancel.clone());

        tokio::task::yield_now().await;
        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(dumper.calls(), 0);
    }
}
