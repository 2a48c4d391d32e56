use std::time::Duration;

use tokio::task::JoinHandle;

use crate::services::otp::OtpEngine;

/// Periodically delete expired and used verification tokens.
pub fn spawn_token_sweeper(otp: OtpEngine, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            match otp.sweep_expired().await {
                Ok(0) => {}
                Ok(removed) => tracing::debug!(removed, "swept stale verification tokens"),
                Err(e) => tracing::warn!(error = %e, "verification token sweep failed"),
            }
        }
    })
}
