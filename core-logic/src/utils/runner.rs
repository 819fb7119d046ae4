use anyhow::Result;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, Instrument};

/// Drives a poll-process-wait loop until cancelled.
#[derive(Debug, Clone)]
pub struct PollRunner {
    name: String,
    interval: Duration,
    max_updates: Option<u64>,
}

impl PollRunner {
    pub fn new(name: &str, interval: Duration) -> Self {
        Self {
            name: name.to_string(),
            interval,
            max_updates: None,
        }
    }

    /// Stop after `n` updates instead of running forever.
    pub fn with_max_updates(mut self, n: u64) -> Self {
        self.max_updates = Some(n);
        self
    }

    /// Returns a token that is cancelled on Ctrl+C.
    pub fn shutdown_on_ctrl_c() -> CancellationToken {
        let token = CancellationToken::new();
        let cloned_token = token.clone();

        tokio::spawn(async move {
            match signal::ctrl_c().await {
                Ok(()) => {
                    info!("🛑 Received Ctrl+C. Initiating graceful shutdown...");
                    cloned_token.cancel();
                }
                Err(err) => {
                    error!("Unable to listen for shutdown signal: {}", err);
                }
            }
        });

        token
    }

    /// Calls `update` with an increasing update index, then waits for the
    /// interval. An error from one update is logged and the loop carries on.
    /// Returns the number of updates that ran.
    pub async fn run<F, Fut>(&self, token: CancellationToken, mut update: F) -> u64
    where
        F: FnMut(u64) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let start_time = Instant::now();
        let mut update_index: u64 = 0;
        let mut failed: u64 = 0;

        info!(
            "{} polling every {}s",
            self.name,
            self.interval.as_secs_f64()
        );

        loop {
            if token.is_cancelled() {
                break;
            }

            let span = tracing::info_span!("update", index = update_index);
            let outcome = tokio::select! {
                _ = token.cancelled() => break,
                outcome = update(update_index).instrument(span) => outcome,
            };

            if let Err(e) = outcome {
                failed += 1;
                error!("[{} update {}] FAILED: {:#}", self.name, update_index, e);
            }
            update_index += 1;

            if self.max_updates.is_some_and(|max| update_index >= max) {
                break;
            }

            info!(
                "Waiting {}s before next poll...",
                self.interval.as_secs_f64()
            );
            tokio::select! {
                _ = token.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        info!(
            "🛑 {} stopped after {} updates ({} failed) in {:.1}s",
            self.name,
            update_index,
            failed,
            start_time.elapsed().as_secs_f64()
        );

        update_index
    }
}
