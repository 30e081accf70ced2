use std::time::Duration;

use homework_bot::workflows::homework::{BatchRunner, SourceForge, TrackingSystem};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

/// Runs a batch pass every `period`, starting immediately. Passes never overlap.
pub(crate) fn spawn<T, F>(runner: BatchRunner<T, F>, period: Duration) -> JoinHandle<()>
where
    T: TrackingSystem + 'static,
    F: SourceForge + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = period.as_secs(), "poll trigger started");

        loop {
            ticker.tick().await;
            if let Err(err) = runner.run().await {
                error!(error = %err, "scheduled homework pass failed");
            }
        }
    })
}
