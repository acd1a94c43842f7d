use super::engine::CleanupReport;
use crate::error::RetentionError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub type JobFuture<'a> =
    Pin<Box<dyn Future<Output = Result<CleanupReport, RetentionError>> + Send + 'a>>;

/// A unit of periodic retention work.
pub trait RetentionJob: Send + Sync {
    fn name(&self) -> &str;

    fn run(&self, now: DateTime<Utc>) -> JobFuture<'_>;
}

/// Run `job` once against `now`, abandoning it after `deadline`.
///
/// Abandoning drops the job future. For the cleanup engine that drops its open
/// transaction, so nothing from the partial run is committed.
pub async fn run_with_timeout(
    job: &dyn RetentionJob,
    now: DateTime<Utc>,
    deadline: Duration,
) -> Result<CleanupReport, RetentionError> {
    match time::timeout(deadline, job.run(now)).await {
        Ok(result) => result,
        Err(_) => Err(RetentionError::Timeout(deadline)),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Stopped,
    Running,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    pub runs_started: u64,
    pub runs_succeeded: u64,
    pub runs_failed: u64,
    pub runs_timed_out: u64,
    /// Ticks that fired while a previous run was still in flight.
    pub ticks_skipped: u64,
    pub last_run_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub last_report: Option<CleanupReport>,
}

struct Shared {
    job: Arc<dyn RetentionJob>,
    run_timeout: Duration,
    in_flight: AtomicBool,
    metrics: Mutex<SchedulerMetrics>,
}

impl Shared {
    fn update(&self, f: impl FnOnce(&mut SchedulerMetrics)) {
        let mut metrics = self.metrics.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut metrics);
    }

    fn on_tick(self: &Arc<Self>) {
        let Some(slot) = InFlightSlot::acquire(Arc::clone(self)) else {
            self.update(|m| m.ticks_skipped += 1);
            tracing::warn!(
                job = self.job.name(),
                "previous retention run still in progress, skipping tick"
            );
            return;
        };

        tokio::spawn(async move {
            slot.shared().run_once().await;
            drop(slot);
        });
    }

    async fn run_once(&self) {
        let now = Utc::now();
        self.update(|m| {
            m.runs_started += 1;
            m.last_run_at = Some(now);
        });

        match run_with_timeout(self.job.as_ref(), now, self.run_timeout).await {
            Ok(report) => self.update(|m| {
                m.runs_succeeded += 1;
                m.last_error = None;
                m.last_report = Some(report);
            }),
            Err(err) => {
                tracing::warn!(job = self.job.name(), "retention run failed: {err}");
                let timed_out = err.is_timeout();
                self.update(|m| {
                    if timed_out {
                        m.runs_timed_out += 1;
                    } else {
                        m.runs_failed += 1;
                    }
                    m.last_error = Some(err.to_string());
                });
            }
        }
    }
}

/// Single-slot in-flight marker. Released on drop, including when the run
/// task panics.
struct InFlightSlot(Arc<Shared>);

impl InFlightSlot {
    fn acquire(shared: Arc<Shared>) -> Option<Self> {
        shared
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()?;
        Some(Self(shared))
    }

    fn shared(&self) -> &Shared {
        &self.0
    }
}

impl Drop for InFlightSlot {
    fn drop(&mut self) {
        self.0.in_flight.store(false, Ordering::Release);
    }
}

struct Ticker {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Fixed-period trigger for a [`RetentionJob`].
///
/// The first run happens one full period after `start()`. Runs never
/// overlap: a tick that fires while a run is in flight is skipped. `stop()`
/// cancels future ticks without interrupting a run already in progress.
/// Dropping the scheduler stops it.
pub struct Scheduler {
    shared: Arc<Shared>,
    interval: Duration,
    ticker: Mutex<Option<Ticker>>,
}

impl Scheduler {
    pub fn new(job: Arc<dyn RetentionJob>, interval: Duration, run_timeout: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                job,
                run_timeout,
                in_flight: AtomicBool::new(false),
                metrics: Mutex::new(SchedulerMetrics::default()),
            }),
            interval: interval.max(Duration::from_millis(1)),
            ticker: Mutex::new(None),
        }
    }

    /// Begin ticking. Returns `false` (and does nothing) when already running.
    /// Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        let mut ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if ticker.is_some() {
            tracing::debug!(job = self.shared.job.name(), "scheduler already running");
            return false;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(tick_loop(
            Arc::clone(&self.shared),
            self.interval,
            cancel.clone(),
        ));
        *ticker = Some(Ticker { cancel, handle });

        tracing::info!(
            job = self.shared.job.name(),
            interval_secs = self.interval.as_secs(),
            run_timeout_secs = self.shared.run_timeout.as_secs(),
            "retention scheduler started"
        );
        true
    }

    /// Cancel future ticks. Returns `false` (and does nothing) when not running.
    pub fn stop(&self) -> bool {
        let Some(ticker) = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            tracing::debug!(job = self.shared.job.name(), "scheduler not running");
            return false;
        };

        ticker.cancel.cancel();
        tracing::info!(job = self.shared.job.name(), "retention scheduler stopped");
        true
    }

    /// Stop ticking and wait for the tick loop task to exit.
    pub async fn shutdown(&self) {
        let ticker = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(ticker) = ticker {
            ticker.cancel.cancel();
            if let Err(e) = ticker.handle.await {
                tracing::warn!("retention tick loop ended abnormally: {e}");
            }
            tracing::info!(job = self.shared.job.name(), "retention scheduler stopped");
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
        {
            SchedulerState::Running
        } else {
            SchedulerState::Stopped
        }
    }

    pub fn is_run_in_flight(&self) -> bool {
        self.shared.in_flight.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> SchedulerMetrics {
        self.shared
            .metrics
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        let ticker = self
            .ticker
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(ticker) = ticker {
            ticker.cancel.cancel();
        }
    }
}

async fn tick_loop(shared: Arc<Shared>, period: Duration, cancel: CancellationToken) {
    let mut interval = time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => shared.on_tick(),
        }
    }
}
