//! Epoch keeper.
//!
//! Wakes every `keeper_interval_secs` and updates the oracle when its epoch
//! gate is open. Update failures are logged and published, never retried
//! within the same tick.

use std::sync::Arc;
use std::time::Duration;

use cadence_oracle::twap::UpdateOutcome;
use cadence_oracle::OracleError;
use cadence_types::events::{Event, EventType};
use tokio::sync::broadcast;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::DaemonState;

/// Run the keeper until a shutdown signal arrives.
pub async fn run(state: Arc<DaemonState>, mut shutdown: broadcast::Receiver<()>) {
    let interval = Duration::from_secs(state.config.oracle.keeper_interval_secs.max(1));
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval_secs = interval.as_secs(), "keeper started");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                tick(&state).await;
            }
            _ = shutdown.recv() => {
                info!("keeper stopping");
                break;
            }
        }
    }
}

/// One keeper pass. Returns the outcome if an update was attempted and
/// succeeded.
pub async fn tick(state: &DaemonState) -> Option<UpdateOutcome> {
    let mut oracle = state.oracle.write().await;
    if !oracle.can_update() {
        return None;
    }

    match oracle.update() {
        Ok(outcome) => {
            publish_outcome(state, &outcome);
            Some(outcome)
        }
        Err(e) => {
            publish_failure(state, &e);
            None
        }
    }
}

/// Publish the notification for a successful update, if any.
pub fn publish_outcome(state: &DaemonState, outcome: &UpdateOutcome) {
    match outcome {
        UpdateOutcome::Updated(updated) => {
            state.event_bus.emit(updated.to_event(state.now()));
        }
        UpdateOutcome::Unchanged { epoch } => {
            info!(epoch, "epoch consumed without new averages");
        }
    }
}

fn publish_failure(state: &DaemonState, error: &OracleError) {
    warn!(error = %error, "keeper update failed");
    state.event_bus.emit(Event::new(
        EventType::ErrorOccurred,
        state.now(),
        serde_json::json!({
            "source": "keeper",
            "error": error.to_string(),
        }),
    ));
}
