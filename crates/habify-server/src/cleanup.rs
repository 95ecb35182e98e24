use std::time::Duration;

use tracing::{info, warn};

use habify_api::auth::AppState;

/// Background task that forgets revoked sessions and reset tokens once they
/// can no longer be presented.
pub async fn run_cleanup_loop(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let db_state = state.clone();
        let now = state.clock.now();
        let result = tokio::task::spawn_blocking(move || db_state.db.prune_expired(now)).await;

        match result {
            Ok(Ok(count)) => {
                if count > 0 {
                    info!("Cleanup: pruned {} expired tokens", count);
                }
            }
            Ok(Err(e)) => warn!("Cleanup error: {}", e),
            Err(e) => warn!("Cleanup task failed: {}", e),
        }
    }
}
