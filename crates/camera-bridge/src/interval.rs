//! Photo interval worker
//!
//! A task on the driver runtime that fires a tick immediately and then once
//! per period. A tick that overruns the period delays the next one rather
//! than bunching them up. Stopping wins over a pending tick, so no tick
//! starts once `stop` returns.

use crate::executor::DriverExecutor;
use std::future::Future;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

/// Handle of a running interval task
pub struct IntervalWorker {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl IntervalWorker {
    /// Spawn the worker on the executor's runtime. `tick` runs immediately
    /// and then once per `period` until it yields false or the worker is
    /// stopped.
    pub fn spawn<F, Fut>(executor: &DriverExecutor, period: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = executor.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => {}
                }
                if !tick().await {
                    debug!("Photo interval ended by tick");
                    break;
                }
            }
        });

        Self { stop_tx, task }
    }

    /// Signal the worker and wait up to `wait` for its task to finish.
    ///
    /// Returns false when the in-flight tick outlived `wait`. The task still
    /// exits once that tick returns.
    pub fn stop(self, executor: &DriverExecutor, wait: Duration) -> bool {
        let _ = self.stop_tx.send(());
        let task = self.task;

        match executor.block_on(async move { tokio::time::timeout(wait, task).await }) {
            Ok(_) => true,
            Err(_) => {
                warn!("Photo interval tick still running after {:?}", wait);
                false
            }
        }
    }

    /// Signal the worker without waiting for it
    pub fn cancel(self) {
        let _ = self.stop_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_driver::SimulatedDriver;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn executor() -> DriverExecutor {
        DriverExecutor::new(Arc::new(SimulatedDriver::new()), 2, Duration::from_millis(500))
            .unwrap()
    }

    fn counting(ticks: &Arc<AtomicUsize>, limit: usize) -> impl FnMut() -> std::future::Ready<bool> {
        let counter = ticks.clone();
        move || std::future::ready(counter.fetch_add(1, Ordering::SeqCst) < limit)
    }

    #[test]
    fn test_ticks_until_stopped() {
        let executor = executor();
        let ticks = Arc::new(AtomicUsize::new(0));
        let worker =
            IntervalWorker::spawn(&executor, Duration::from_millis(20), counting(&ticks, usize::MAX));

        std::thread::sleep(Duration::from_millis(110));
        assert!(worker.stop(&executor, Duration::from_secs(1)));

        let after_stop = ticks.load(Ordering::SeqCst);
        assert!(after_stop >= 2);
        std::thread::sleep(Duration::from_millis(60));
        assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
    }

    #[test]
    fn test_tick_can_end_worker() {
        let executor = executor();
        let ticks = Arc::new(AtomicUsize::new(0));
        let worker = IntervalWorker::spawn(&executor, Duration::from_millis(5), counting(&ticks, 2));

        std::thread::sleep(Duration::from_millis(100));
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
        assert!(worker.stop(&executor, Duration::from_secs(1)));
    }

    #[test]
    fn test_stop_wakes_long_period() {
        let executor = executor();
        let ticks = Arc::new(AtomicUsize::new(0));
        let worker =
            IntervalWorker::spawn(&executor, Duration::from_secs(60), counting(&ticks, usize::MAX));

        let started = std::time::Instant::now();
        assert!(worker.stop(&executor, Duration::from_secs(1)));
        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(ticks.load(Ordering::SeqCst) <= 1);
    }

    #[test]
    fn test_stop_gives_up_on_stuck_tick() {
        let executor = executor();
        let worker = IntervalWorker::spawn(&executor, Duration::from_millis(10), || async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            true
        });

        std::thread::sleep(Duration::from_millis(30));
        assert!(!worker.stop(&executor, Duration::from_millis(50)));
    }
}
