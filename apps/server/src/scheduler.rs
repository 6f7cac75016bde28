//! Background jobs for the historical update and cache cleanup.

use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};

use crate::main_lib::AppState;

/// Initial delay before the first historical update (let the server fully start)
const INITIAL_DELAY_SECS: u64 = 60;

/// Starts the periodic bulk historical update. A zero period disables it.
pub fn start_historical_update_scheduler(state: Arc<AppState>, period: Duration) {
    if period.is_zero() {
        info!("Historical update scheduler disabled");
        return;
    }

    tokio::spawn(async move {
        info!(
            "Historical update scheduler started ({}s interval)",
            period.as_secs()
        );
        tokio::time::sleep(Duration::from_secs(INITIAL_DELAY_SECS)).await;

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            run_historical_update(&state).await;
        }
    });
}

async fn run_historical_update(state: &Arc<AppState>) {
    info!("Running scheduled historical update...");
    match state
        .market_data_service
        .run_scheduled_historical_update()
        .await
    {
        Ok(summary) => info!(
            "Scheduled historical update finished: {} of {} symbols updated, {} failed",
            summary.success, summary.total, summary.failed
        ),
        Err(e) => warn!("Scheduled historical update failed: {}", e),
    }
}

/// Starts the periodic removal of expired cache entries. A zero period disables it.
pub fn start_cache_cleanup_scheduler(state: Arc<AppState>, period: Duration) {
    if period.is_zero() {
        info!("Cache cleanup scheduler disabled");
        return;
    }

    tokio::spawn(async move {
        info!("Cache cleanup scheduler started ({}s interval)", period.as_secs());
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match state.market_data_service.cleanup_cache().await {
                Ok(removed) => info!("Cache cleanup removed {} expired entries", removed),
                Err(e) => warn!("Cache cleanup failed: {}", e),
            }
        }
    });
}
