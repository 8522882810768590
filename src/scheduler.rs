//! Fixed-rate background work.
//!
//! [`Ticker`] runs a closure on its own named thread at a fixed period until
//! stopped. [`Poller`] builds on it to read a [`SnapshotSource`] and forward
//! every snapshot to a sink.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, trace, warn};

use crate::error::{GlowError, Result};
use crate::sensing::SnapshotSource;
use crate::snapshot::Snapshot;

/// Shortest allowed poll period.
pub const MIN_POLL_PERIOD: Duration = Duration::from_millis(30);

/// Shortest period any [`Ticker`] runs at.
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// Poll period used when none is configured.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_millis(100);

/// A closure running on a dedicated thread at a fixed rate.
///
/// Dropping or stopping the ticker signals the thread without waiting for
/// it; a tick already in progress finishes on its own.
#[derive(Debug)]
pub struct Ticker {
    name: String,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Ticker {
    /// Spawn the worker thread.
    ///
    /// With `immediate`, the first tick runs right away; otherwise after one
    /// period. When a tick overruns, the schedule restarts from the end of
    /// that tick instead of firing a burst of catch-up ticks. Periods shorter
    /// than [`MIN_TICK_PERIOD`] are raised to it.
    pub fn spawn<F>(name: &str, period: Duration, immediate: bool, mut tick: F) -> Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let period = period.max(MIN_TICK_PERIOD);
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread_name = name.to_string();

        let handle = thread::Builder::new()
            .name(thread_name.clone())
            .spawn(move || {
                debug!(thread = %thread_name, ?period, "Ticker started");
                let mut next = if immediate {
                    Instant::now()
                } else {
                    Instant::now() + period
                };
                loop {
                    let wait = next.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                    tick();
                    next += period;
                    let now = Instant::now();
                    if next < now {
                        next = now;
                    }
                }
                debug!(thread = %thread_name, "Ticker stopped");
            })?;

        Ok(Self {
            name: name.to_string(),
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Cancel future ticks. Does not wait for an in-flight tick.
    pub fn stop(&mut self) {
        if self.stop_tx.take().is_some() {
            trace!(ticker = %self.name, "Stop requested");
        }
    }

    pub fn is_running(&self) -> bool {
        self.stop_tx.is_some() && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stop and wait for the worker thread to exit.
    pub fn join(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                error!(ticker = %self.name, "Ticker thread panicked");
            }
        }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Receives snapshots from the poller.
pub type SnapshotSink = Box<dyn FnMut(Snapshot) -> Result<()> + Send>;

/// Result of [`Poller::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

struct PollJob {
    source: Box<dyn SnapshotSource>,
    sink: SnapshotSink,
}

impl PollJob {
    fn run_once(&mut self) -> Result<()> {
        match self.source.read() {
            Some(snapshot) => {
                trace!(%snapshot, "Snapshot read");
                (self.sink)(snapshot)
            }
            None => {
                trace!("No reliable snapshot this tick");
                Ok(())
            }
        }
    }
}

/// Polls a sensing source at a fixed rate on a single worker thread.
pub struct Poller {
    period: Duration,
    job: Arc<Mutex<PollJob>>,
    ticker: Option<Ticker>,
    shut_down: bool,
}

impl Poller {
    /// Create a stopped poller. `period` is raised to [`MIN_POLL_PERIOD`] if shorter.
    pub fn new(source: Box<dyn SnapshotSource>, sink: SnapshotSink, period: Duration) -> Self {
        Self {
            period: period.max(MIN_POLL_PERIOD),
            job: Arc::new(Mutex::new(PollJob { source, sink })),
            ticker: None,
            shut_down: false,
        }
    }

    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Begin polling; the first read happens immediately.
    pub fn start(&mut self) -> Result<StartOutcome> {
        if self.shut_down {
            return Err(GlowError::SchedulerShutDown);
        }
        if self.is_running() {
            info!("Poller already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        let job = Arc::clone(&self.job);
        let ticker = Ticker::spawn("ocr-poller", self.period, true, move || {
            // The job mutex is held for the whole tick, so ticks never overlap,
            // even with a late tick from a previous start.
            let mut job = job.lock().unwrap_or_else(PoisonError::into_inner);
            match panic::catch_unwind(AssertUnwindSafe(|| job.run_once())) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Poll tick failed"),
                Err(payload) => error!(panic = %panic_message(&*payload), "Poll tick panicked"),
            }
        })?;

        info!(period_ms = self.period.as_millis() as u64, "Poller started");
        self.ticker = Some(ticker);
        Ok(StartOutcome::Started)
    }

    /// Cancel future ticks without waiting for an in-flight one.
    pub fn stop(&mut self) {
        if let Some(mut ticker) = self.ticker.take() {
            ticker.stop();
            info!("Poller stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.ticker.as_ref().is_some_and(Ticker::is_running)
    }

    /// Stop for good; later `start` calls fail.
    pub fn shutdown(&mut self) {
        self.stop();
        self.shut_down = true;
    }

    pub const fn is_shut_down(&self) -> bool {
        self.shut_down
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
