//! Fixed-rate driver shared by the coordinator and the enemy engine.
//!
//! The loop runs on the tokio runtime that called [`TickScheduler::start`].
//! Wake-ups are anchored to the loop start, so a slow tick is followed by
//! catch-up ticks instead of shifting every later tick.
//!
//! Each tick runs on tokio's blocking pool, off the runtime's workers. A tick
//! that returns an error or panics is logged and skipped; the loop keeps
//! running. Shutdown is cooperative: the stop signal is seen before the next
//! tick starts, and [`TickScheduler::stop`] aborts the task if it does not
//! finish within the grace period. An abandoned tick finishes in the
//! background but its result is dropped.

use log::{error, info, warn};
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::{spawn_blocking, JoinHandle};
use tokio::time::{interval, timeout, MissedTickBehavior};

/// Something that can be advanced by one fixed step.
pub trait Tickable: Send + Sync + 'static {
    type Error: fmt::Display;

    /// Short name used in log lines.
    fn name(&self) -> &str;

    fn tick(&self, dt: Duration) -> Result<(), Self::Error>;
}

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("no tokio runtime is available to run the tick loop")]
    NoRuntime,
    #[error("tick period must be greater than zero")]
    ZeroPeriod,
}

/// How a call to [`TickScheduler::stop`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    NotRunning,
    /// The loop exited on its own within the grace period.
    Graceful,
    /// The grace period ran out and the task was aborted.
    Forced,
}

struct RunningLoop {
    shutdown: Arc<Notify>,
    handle: JoinHandle<()>,
}

// Aborts the loop task if the stop future is dropped mid-wait
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct TickScheduler<T: Tickable> {
    target: Arc<T>,
    period: Duration,
    grace: Duration,
    running: Mutex<Option<RunningLoop>>,
}

impl<T: Tickable> TickScheduler<T> {
    pub fn new(target: Arc<T>, period: Duration, grace: Duration) -> Self {
        Self {
            target,
            period,
            grace,
            running: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Starts the loop. Returns `Ok(false)` if it was already running.
    pub fn start(&self) -> Result<bool, SchedulerError> {
        if self.period.is_zero() {
            return Err(SchedulerError::ZeroPeriod);
        }
        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;

        let mut running = self.running.lock();
        if let Some(current) = running.as_ref() {
            if !current.handle.is_finished() {
                return Ok(false);
            }
        }

        let shutdown = Arc::new(Notify::new());
        let handle = runtime.spawn(run_loop(
            Arc::clone(&self.target),
            self.period,
            Arc::clone(&shutdown),
        ));
        info!(
            "{} loop started ({} ms period)",
            self.target.name(),
            self.period.as_millis()
        );

        *running = Some(RunningLoop { shutdown, handle });
        Ok(true)
    }

    /// Signals the loop to stop and waits up to the grace period for it.
    pub async fn stop(&self) -> StopOutcome {
        let Some(running) = self.running.lock().take() else {
            return StopOutcome::NotRunning;
        };

        running.shutdown.notify_one();
        let mut guard = AbortOnDrop(running.handle);

        match timeout(self.grace, &mut guard.0).await {
            Ok(Ok(())) => {
                info!("{} loop stopped", self.target.name());
                StopOutcome::Graceful
            }
            Ok(Err(e)) => {
                warn!("{} loop ended abnormally: {}", self.target.name(), e);
                StopOutcome::Graceful
            }
            Err(_) => {
                warn!(
                    "{} loop did not stop within {:?}, aborting",
                    self.target.name(),
                    self.grace
                );
                StopOutcome::Forced
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .map_or(false, |running| !running.handle.is_finished())
    }
}

impl<T: Tickable> Drop for TickScheduler<T> {
    fn drop(&mut self) {
        if let Some(running) = self.running.get_mut().take() {
            running.shutdown.notify_one();
            running.handle.abort();
        }
    }
}

async fn run_loop<T: Tickable>(target: Arc<T>, period: Duration, shutdown: Arc<Notify>) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.notified() => break,
            _ = ticker.tick() => {}
        }

        // Off the runtime workers; an aborted loop stops waiting for it
        let started = Instant::now();
        let job = Arc::clone(&target);
        let outcome = spawn_blocking(move || run_tick(job.as_ref(), period)).await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(message)) => error!("{} {}", target.name(), message),
            Err(e) => error!("{} tick could not run: {}", target.name(), e),
        }

        let elapsed = started.elapsed();
        if elapsed > period {
            warn!(
                "{} tick took {:.1} ms, longer than the {} ms period",
                target.name(),
                elapsed.as_secs_f64() * 1000.0,
                period.as_millis()
            );
        }
    }
}

/// Runs one tick, turning errors and panics into a log message.
fn run_tick<T: Tickable>(target: &T, period: Duration) -> Result<(), String> {
    match catch_unwind(AssertUnwindSafe(|| target.tick(period))) {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(format!("tick failed: {}", e)),
        Err(panic) => Err(format!(
            "tick panicked: {}",
            panic_message(panic.as_ref())
        )),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
