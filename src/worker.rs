use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, warn};

use crate::errors::FetchError;
use crate::metrics::{ADMISSION_WAIT, ADMISSIONS_TOTAL, QUEUE_DEPTH};
use crate::rate_limit::RateWindow;

type Job = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

// Queued work item - the deferred call plus when it was handed in
struct WorkItem {
    run: Job,
    submitted_at: Instant,
}

/// Quota settings for the scheduler.
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Max admissions inside any rolling `window`.
    pub quota: u32,
    pub window: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            quota: 60,
            window: Duration::from_secs(60),
        }
    }
}

/// Handle to the single background worker that runs submitted work.
///
/// Work runs one item at a time, in submission order, and never more than
/// `quota` items are started inside any rolling `window`. Cloning the handle
/// shares the same worker.
#[derive(Clone)]
pub struct Scheduler {
    queue_tx: mpsc::UnboundedSender<WorkItem>,
    pending: Arc<AtomicUsize>,
}

impl Scheduler {
    /// Spawns the worker task. Must be called from inside a tokio runtime.
    pub fn new(config: SchedulerConfig) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicUsize::new(0));

        let window = RateWindow::new(config.quota, config.window);
        tokio::spawn(run_worker(queue_rx, window, Arc::clone(&pending)));

        debug!(
            "Scheduler started: {} admissions per {:?}, concurrency 1",
            config.quota, config.window
        );

        Self { queue_tx, pending }
    }

    /// Enqueue `work` right away and return a future for its result.
    ///
    /// The item's place in the queue is fixed when `submit` is called, not
    /// when the returned future is first polled. Errors raised by `work` are
    /// handed back unchanged, only to this caller.
    pub fn submit<T, F, Fut>(
        &self,
        work: F,
    ) -> impl Future<Output = Result<T, FetchError>> + Send + 'static + use<T, F, Fut>
    where
        T: Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let (response_tx, response_rx) = oneshot::channel();

        let item = WorkItem {
            run: Box::new(move || -> Pin<Box<dyn Future<Output = ()> + Send>> {
                Box::pin(async move {
                    // caller may have gone away, nothing to do then
                    let _ = response_tx.send(work().await);
                })
            }),
            submitted_at: Instant::now(),
        };

        let depth = self.pending.fetch_add(1, Ordering::SeqCst) + 1;
        let queued = match self.queue_tx.send(item) {
            Ok(()) => {
                QUEUE_DEPTH.set(depth as i64);
                true
            }
            Err(_) => {
                self.pending.fetch_sub(1, Ordering::SeqCst);
                false
            }
        };

        async move {
            if !queued {
                return Err(FetchError::SchedulerClosed);
            }
            response_rx.await.map_err(|_| FetchError::WorkerGone)?
        }
    }

    /// Items submitted but not yet finished (including the running one).
    pub fn queued(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

// Background worker -> admits items from the queue one by one
async fn run_worker(
    mut queue_rx: mpsc::UnboundedReceiver<WorkItem>,
    mut window: RateWindow,
    pending: Arc<AtomicUsize>,
) {
    while let Some(item) = queue_rx.recv().await {
        // window full? park until the oldest admission rolls off
        while let Some(slot) = window.next_slot(Instant::now()) {
            debug!(
                "Quota reached, next admission in {:?}",
                slot.saturating_duration_since(Instant::now())
            );
            sleep_until(slot).await;
        }

        let admitted_at = Instant::now();
        window.record(admitted_at);
        ADMISSIONS_TOTAL.inc();
        ADMISSION_WAIT.observe(
            admitted_at
                .saturating_duration_since(item.submitted_at)
                .as_secs_f64(),
        );

        // own task so a panicking item cannot take the worker down with it
        if let Err(e) = tokio::spawn((item.run)()).await {
            warn!("Work item aborted: {}", e);
        }

        let depth = pending.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        QUEUE_DEPTH.set(depth as i64);
    }

    debug!("Scheduler queue closed, worker exiting");
}
