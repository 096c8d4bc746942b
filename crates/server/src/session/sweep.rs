//! Background purge of expired sessions and login states.

use super::SessionManager;
use crate::auth::StateStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Spawns the sweep loop. Returns `None` when `every` is zero (sweeping
/// disabled, lookups still evict lazily). The task ends once `shutdown` is
/// cancelled.
pub fn spawn_sweep_task(
    sessions: Arc<SessionManager>,
    states: Arc<StateStore>,
    every: Duration,
    shutdown: CancellationToken,
) -> Option<JoinHandle<()>> {
    if every.is_zero() {
        tracing::info!("session sweep disabled");
        return None;
    }

    Some(tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        interval.tick().await;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::debug!("session sweep stopped");
                    break;
                }
                _ = interval.tick() => {
                    let sessions_purged = sessions.purge_expired();
                    let states_purged = states.purge_expired();
                    if sessions_purged > 0 || states_purged > 0 {
                        tracing::info!(
                            sessions_purged,
                            states_purged,
                            live_sessions = sessions.len(),
                            "expired sessions purged"
                        );
                    }
                }
            }
        }
    }))
}
