//! Periodic task runner.
//!
//! Each task is its own tokio task with its own interval, so a failing or
//! slow task never delays another. A tick body runs inline in its loop and
//! missed ticks are skipped, so at most one run per task is in flight.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Spawn `tick` every `interval` until `cancellation` fires.
///
/// The first run happens one interval after spawning. Errors and panics in
/// `tick` are logged and the next run proceeds on schedule.
pub fn spawn_periodic<F>(
    name: &'static str,
    interval: Duration,
    cancellation: CancellationToken,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> anyhow::Result<()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // Skip the first immediate tick
        ticker.tick().await;

        log::info!(
            "SCHEDULED_TASK_START task={} interval_ms={}",
            name,
            interval.as_millis()
        );

        loop {
            tokio::select! {
                biased;

                _ = cancellation.cancelled() => {
                    log::info!("SCHEDULED_TASK_STOP task={}", name);
                    break;
                }

                _ = ticker.tick() => {
                    match catch_unwind(AssertUnwindSafe(&mut tick)) {
                        Ok(Ok(())) => log::debug!("SCHEDULED_TASK_TICK task={}", name),
                        Ok(Err(e)) => log::error!("SCHEDULED_TASK_FAILED task={} error={:#}", name, e),
                        Err(_) => log::error!("SCHEDULED_TASK_PANICKED task={}", name),
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_task_keeps_running_after_errors() {
        let runs = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let counter = Arc::clone(&runs);
        let handle = spawn_periodic("flaky", Duration::from_secs(10), cancel.clone(), move || {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if n % 2 == 0 {
                anyhow::bail!("tick {} failed", n);
            }
            Ok(())
        });

        tokio::time::sleep(Duration::from_secs(45)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 4);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_survives_panic() {
        let runs = Arc::new(AtomicUsize::new(0));
        let cancel = CancellationToken::new();

        let counter = Arc::clone(&runs);
        let handle = spawn_periodic("panicky", Duration::from_secs(5), cancel.clone(), move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("first tick blows up");
            }
            Ok(())
        });

        tokio::time::sleep(Duration::from_secs(16)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        cancel.cancel();
        handle.await.unwrap();
    }
}
