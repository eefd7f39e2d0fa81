// SPDX-FileCopyrightText: 2026 Keyward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `keyward serve`: run the backup schedule until shutdown.

use keyward::Keyward;
use keyward_config::KeywardConfig;
use keyward_core::KeywardError;
use tracing::{info, warn};

use crate::shutdown;

pub async fn run_serve(config: KeywardConfig) -> Result<(), KeywardError> {
    info!(name = %config.service.name, "starting keyward serve");

    let keyward = Keyward::from_config(&config).await?;
    let cancel = shutdown::install_signal_handler();

    let scheduler = if config.backup.enabled {
        Some(keyward.schedule_backups(cancel.clone())?)
    } else {
        info!("scheduled backups disabled");
        None
    };

    cancel.cancelled().await;

    if let Some(handle) = scheduler
        && let Err(e) = handle.await
    {
        warn!(error = %e, "backup scheduler task ended abnormally");
    }

    keyward.close().await?;
    info!("keyward serve shutdown complete");
    Ok(())
}
