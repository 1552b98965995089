use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use tokio::time::{Duration as TokioDuration, sleep};
use tracing::{error, info};

use crate::web::AppState;

const CLEANUP_INTERVAL_MINUTES: u64 = 5;

pub fn spawn(state: AppState) {
    tokio::spawn(async move {
        let interval = TokioDuration::from_secs(CLEANUP_INTERVAL_MINUTES * 60);
        loop {
            if let Err(err) = run_cleanup_cycle(&state).await {
                error!(?err, "maintenance cycle failed");
            }
            sleep(interval).await;
        }
    });
}

/// Discards idle verification flows with their uploads, then expired sessions.
pub async fn run_cleanup_cycle(state: &AppState) -> Result<()> {
    let cutoff = Utc::now() - Duration::minutes(state.config().flow_ttl_minutes);
    let flows_removed = state.flows().purge_idle(cutoff).await;

    let sessions_removed = state
        .auth()
        .purge_expired_sessions()
        .await
        .context("failed to purge expired sessions")?;

    if flows_removed > 0 || sessions_removed > 0 {
        let flows_live = state.flows().len().await;
        info!(flows_removed, flows_live, sessions_removed, "maintenance cleanup completed");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn cycle_keeps_fresh_flows() {
        let storage = tempfile::tempdir().unwrap();
        let state = AppState::for_tests(storage.path()).await;
        let owner = Uuid::new_v4();
        let id = state.flows().create(owner).await;

        run_cleanup_cycle(&state).await.expect("cycle");

        assert!(state.flows().snapshot(id, owner).await.is_ok());
    }
}
