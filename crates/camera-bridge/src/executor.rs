//! Driver call executor
//!
//! Runs blocking driver calls on a private runtime's blocking pool and waits
//! for them with a bounded timeout. Callers stay synchronous, and may be
//! running inside a runtime of their own.

use crate::error::CameraError;
use camera_driver::{CameraDriver, DriverResult, DriverStatus};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Handle, Runtime, RuntimeFlavor};
use tokio::task::JoinHandle;
use tracing::{error, warn};

/// Executes driver calls with a bounded wait
pub struct DriverExecutor {
    runtime: Option<Runtime>,
    handle: Handle,
    driver: Arc<dyn CameraDriver>,
    timeout: Duration,
}

impl DriverExecutor {
    /// Create an executor with `threads` blocking threads.
    pub fn new(
        driver: Arc<dyn CameraDriver>,
        threads: usize,
        timeout: Duration,
    ) -> Result<Self, CameraError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(1)
            .max_blocking_threads(threads.max(1))
            .thread_name("camera-driver")
            .enable_time()
            .build()
            .map_err(|e| {
                error!("Failed to create driver runtime: {}", e);
                CameraError::InitializationFailed(DriverStatus::Failed)
            })?;

        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
            driver,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start `call` on the blocking pool; the returned future resolves when
    /// it finishes or the timeout expires.
    fn bounded<T, F>(
        &self,
        operation: &'static str,
        call: F,
    ) -> impl Future<Output = Result<DriverResult<T>, CameraError>> + Send + 'static
    where
        T: Send + 'static,
        F: FnOnce(&dyn CameraDriver) -> DriverResult<T> + Send + 'static,
    {
        let driver = Arc::clone(&self.driver);
        let task = self.handle.spawn_blocking(move || call(driver.as_ref()));
        let timeout = self.timeout;

        async move {
            match tokio::time::timeout(timeout, task).await {
                Ok(Ok(result)) => Ok(result),
                Ok(Err(e)) => {
                    error!("Driver call {} panicked: {}", operation, e);
                    Ok(Err(DriverStatus::Failed))
                }
                Err(_) => {
                    warn!("Driver call {} timed out after {:?}", operation, timeout);
                    Err(CameraError::Timeout)
                }
            }
        }
    }

    /// Drive `future` to completion from synchronous code.
    ///
    /// Outside any runtime this is a plain `block_on`. On a multi-thread
    /// runtime worker the wait is moved off the worker with `block_in_place`.
    /// A current-thread runtime cannot give its thread away, so the wait runs
    /// on a scoped helper thread while the caller blocks on it.
    pub fn block_on<F>(&self, future: F) -> F::Output
    where
        F: Future + Send,
        F::Output: Send,
    {
        match Handle::try_current().map(|h| h.runtime_flavor()) {
            Err(_) => self.handle.block_on(future),
            Ok(RuntimeFlavor::MultiThread) => {
                tokio::task::block_in_place(|| self.handle.block_on(future))
            }
            Ok(_) => std::thread::scope(|scope| {
                scope
                    .spawn(|| self.handle.block_on(future))
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
            }),
        }
    }

    /// Run a task on the driver runtime
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.handle.spawn(future)
    }

    /// Run `call` and return the raw driver result. Only expiry of the wait
    /// is reported as an error.
    pub fn run<T, F>(&self, operation: &'static str, call: F) -> Result<DriverResult<T>, CameraError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn CameraDriver) -> DriverResult<T> + Send + 'static,
    {
        if self.runtime.is_none() {
            return Err(CameraError::NotConnected);
        }
        self.block_on(self.bounded(operation, call))
    }

    /// Run `call`, mapping driver statuses to bridge errors
    pub fn call<T, F>(&self, operation: &'static str, call: F) -> Result<T, CameraError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn CameraDriver) -> DriverResult<T> + Send + 'static,
    {
        map_status(operation, self.run(operation, call)?)
    }

    /// [`DriverExecutor::call`] for tasks already running on the driver runtime
    pub async fn call_async<T, F>(&self, operation: &'static str, call: F) -> Result<T, CameraError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn CameraDriver) -> DriverResult<T> + Send + 'static,
    {
        map_status(operation, self.bounded(operation, call).await?)
    }

    /// Driver handle, for calls that never block
    pub fn driver(&self) -> &dyn CameraDriver {
        self.driver.as_ref()
    }
}

fn map_status<T>(operation: &'static str, result: DriverResult<T>) -> Result<T, CameraError> {
    result.map_err(|status| {
        warn!("Driver call {} failed: {}", operation, status);
        CameraError::from(status)
    })
}

impl Drop for DriverExecutor {
    fn drop(&mut self) {
        // Calls stuck past their timeout must not hold up teardown.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_driver::SimulatedDriver;

    fn executor(sim: &SimulatedDriver, timeout_ms: u64) -> DriverExecutor {
        DriverExecutor::new(Arc::new(sim.clone()), 2, Duration::from_millis(timeout_ms)).unwrap()
    }

    #[test]
    fn test_call_succeeds() {
        let sim = SimulatedDriver::new();
        let executor = executor(&sim, 500);
        executor.call("open", |d| d.open()).unwrap();
        assert!(executor.call("take_photo", |d| d.take_photo()).is_ok());
        assert_eq!(sim.calls("take_photo"), 1);
    }

    #[test]
    fn test_status_is_mapped() {
        let sim = SimulatedDriver::new();
        let executor = executor(&sim, 500);
        executor.call("open", |d| d.open()).unwrap();
        sim.fail("take_photo", DriverStatus::Busy);
        assert_eq!(
            executor.call("take_photo", |d| d.take_photo()),
            Err(CameraError::Busy("driver busy"))
        );
        assert_eq!(
            executor.run("take_photo", |d| d.take_photo()),
            Ok(Err(DriverStatus::Busy))
        );
    }

    #[test]
    fn test_slow_call_times_out() {
        let sim = SimulatedDriver::new();
        let executor = executor(&sim, 50);
        executor.call("open", |d| d.open()).unwrap();
        sim.delay("take_photo", Duration::from_millis(400));
        assert_eq!(
            executor.call("take_photo", |d| d.take_photo()),
            Err(CameraError::Timeout)
        );
    }

    #[test]
    fn test_call_async_on_driver_runtime() {
        let sim = SimulatedDriver::new();
        let executor = Arc::new(executor(&sim, 500));
        executor.call("open", |d| d.open()).unwrap();

        let remote = Arc::clone(&executor);
        let task = executor
            .spawn(async move { remote.call_async("take_photo", |d| d.take_photo()).await });
        assert_eq!(executor.block_on(task).unwrap(), Ok(()));
        assert_eq!(sim.calls("take_photo"), 1);
    }

    #[tokio::test]
    async fn test_call_from_current_thread_runtime() {
        let sim = SimulatedDriver::new();
        let executor = executor(&sim, 500);
        executor.call("open", |d| d.open()).unwrap();
        assert!(executor.call("take_photo", |d| d.take_photo()).is_ok());
        drop(executor);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_call_from_multi_thread_runtime() {
        let sim = SimulatedDriver::new();
        let executor = executor(&sim, 50);
        executor.call("open", |d| d.open()).unwrap();
        sim.delay("take_photo", Duration::from_millis(400));
        assert_eq!(
            executor.call("take_photo", |d| d.take_photo()),
            Err(CameraError::Timeout)
        );
        drop(executor);
    }
}
