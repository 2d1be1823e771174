//! Cancellable fixed-period background job.

use std::{future::Future, ops::ControlFlow, time::Duration};

use tokio::{
    sync::oneshot,
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tracing::{debug, warn};

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Runs a job right away and then once per period until cancelled, dropped,
/// or until the job returns [`ControlFlow::Break`].
///
/// A run always finishes (or is cancelled) before the next one starts, so
/// runs of one task never overlap. Ticks missed while a run is slow are
/// delayed rather than fired back to back.
pub struct PeriodicTask {
    name: &'static str,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ControlFlow<()>> + Send + 'static,
    {
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let period = period.max(MIN_PERIOD);

        let handle = tokio::spawn(async move {
            let mut ticker = time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut runs: u64 = 0;

            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    _ = ticker.tick() => {}
                }
                runs += 1;
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    flow = job() => {
                        if flow.is_break() {
                            debug!(task = name, runs, "periodic task finished on its own");
                            return;
                        }
                    }
                }
            }
            debug!(task = name, runs, "periodic task cancelled");
        });

        Self {
            name,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stops the task and waits until it has terminated. An in-flight run is
    /// dropped at its next await point.
    pub async fn cancel(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                if !err.is_cancelled() {
                    warn!(task = self.name, "periodic task ended abnormally: {err}");
                }
            }
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;

    fn counting_job(
        counter: Arc<AtomicUsize>,
        stop_after: Option<usize>,
    ) -> impl FnMut() -> std::pin::Pin<Box<dyn Future<Output = ControlFlow<()>> + Send>> {
        move || {
            let counter = counter.clone();
            Box::pin(async move {
                let runs = counter.fetch_add(1, Ordering::SeqCst) + 1;
                match stop_after {
                    Some(limit) if runs >= limit => ControlFlow::Break(()),
                    _ => ControlFlow::Continue(()),
                }
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn runs_immediately_then_once_per_period() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = PeriodicTask::spawn(
            "test",
            Duration::from_secs(7),
            counting_job(counter.clone(), None),
        );

        time::sleep(Duration::from_millis(10)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        time::sleep(Duration::from_secs(14)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        task.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_waits_for_termination_and_stops_runs() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = PeriodicTask::spawn(
            "test",
            Duration::from_secs(1),
            counting_job(counter.clone(), None),
        );
        time::sleep(Duration::from_millis(1500)).await;

        task.cancel().await;
        let after_cancel = counter.load(Ordering::SeqCst);
        time::sleep(Duration::from_secs(10)).await;

        assert_eq!(counter.load(Ordering::SeqCst), after_cancel);
    }

    #[tokio::test(start_paused = true)]
    async fn break_ends_the_task() {
        let counter = Arc::new(AtomicUsize::new(0));
        let task = PeriodicTask::spawn(
            "test",
            Duration::from_secs(1),
            counting_job(counter.clone(), Some(2)),
        );

        time::sleep(Duration::from_secs(10)).await;

        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(task.is_finished());
        task.cancel().await;
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_a_run_in_flight() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));
        let (s, f) = (started.clone(), finished.clone());
        let task = PeriodicTask::spawn("slow", Duration::from_secs(1), move || {
            let (s, f) = (s.clone(), f.clone());
            async move {
                s.fetch_add(1, Ordering::SeqCst);
                time::sleep(Duration::from_secs(60)).await;
                f.fetch_add(1, Ordering::SeqCst);
                ControlFlow::Continue(())
            }
        });

        time::sleep(Duration::from_millis(10)).await;
        task.cancel().await;

        assert_eq!(started.load(Ordering::SeqCst), 1);
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }
}
