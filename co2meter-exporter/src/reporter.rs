use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::state::EnvironmentState;

/// Log the current readings every `period` until cancelled.
pub async fn run_reporter(state: EnvironmentState, period: Duration, cancel: CancellationToken) {
    info!(period_secs = period.as_secs(), "Reporter started");

    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; report only after a full period.
    interval.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Reporter shutting down");
                break;
            }
            _ = interval.tick() => {
                let snapshot = state.snapshot();
                info!(
                    co2 = snapshot.co2,
                    temperature = snapshot.temperature,
                    "CO2: {} ppm, Temperature: {:.2} C",
                    snapshot.co2,
                    snapshot.temperature
                );
            }
        }
    }
}
