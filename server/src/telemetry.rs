//! Lock-free performance counters for the enemy engine.

use crate::utils::signed_millis;
use parking_lot::Mutex;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters updated from the engine tick and read from anywhere.
#[derive(Debug)]
pub struct EngineTelemetry {
    expected_period: Duration,
    created: AtomicU64,
    removed: AtomicU64,
    ticks: AtomicU64,
    lagged_ticks: AtomicU64,
    total_tick_micros: AtomicU64,
    last_tick_micros: AtomicU64,
    /// f64 bits of the last deviation from the expected period, in ms.
    last_deviation_ms: AtomicU64,
    started_at: Mutex<Instant>,
}

impl EngineTelemetry {
    pub fn new(expected_period: Duration) -> Self {
        Self {
            expected_period,
            created: AtomicU64::new(0),
            removed: AtomicU64::new(0),
            ticks: AtomicU64::new(0),
            lagged_ticks: AtomicU64::new(0),
            total_tick_micros: AtomicU64::new(0),
            last_tick_micros: AtomicU64::new(0),
            last_deviation_ms: AtomicU64::new(0f64.to_bits()),
            started_at: Mutex::new(Instant::now()),
        }
    }

    pub fn record_created(&self) {
        self.created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_removed(&self, count: u64) {
        self.removed.fetch_add(count, Ordering::Relaxed);
    }

    /// Records one tick. Returns true when the tick ran longer than the
    /// expected period.
    pub fn record_tick(&self, duration: Duration) -> bool {
        let micros = duration.as_micros().min(u64::MAX as u128) as u64;
        self.ticks.fetch_add(1, Ordering::Relaxed);
        self.total_tick_micros.fetch_add(micros, Ordering::Relaxed);
        self.last_tick_micros.store(micros, Ordering::Relaxed);

        let deviation = signed_millis(duration, self.expected_period);
        self.last_deviation_ms
            .store(deviation.to_bits(), Ordering::Relaxed);

        let lagged = duration > self.expected_period;
        if lagged {
            self.lagged_ticks.fetch_add(1, Ordering::Relaxed);
        }
        lagged
    }

    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    pub fn removed(&self) -> u64 {
        self.removed.load(Ordering::Relaxed)
    }

    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    pub fn lagged_ticks(&self) -> u64 {
        self.lagged_ticks.load(Ordering::Relaxed)
    }

    pub fn average_tick_ms(&self) -> f64 {
        let ticks = self.ticks();
        if ticks == 0 {
            return 0.0;
        }
        self.total_tick_micros.load(Ordering::Relaxed) as f64 / ticks as f64 / 1000.0
    }

    pub fn uptime(&self) -> Duration {
        self.started_at.lock().elapsed()
    }

    pub fn ticks_per_second(&self) -> f64 {
        let secs = self.uptime().as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        self.ticks() as f64 / secs
    }

    pub fn reset(&self) {
        for counter in [
            &self.created,
            &self.removed,
            &self.ticks,
            &self.lagged_ticks,
            &self.total_tick_micros,
            &self.last_tick_micros,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
        self.last_deviation_ms
            .store(0f64.to_bits(), Ordering::Relaxed);
        *self.started_at.lock() = Instant::now();
    }

    pub fn report(&self) -> TelemetryReport {
        TelemetryReport {
            created: self.created(),
            removed: self.removed(),
            ticks: self.ticks(),
            lagged_ticks: self.lagged_ticks(),
            total_tick_ms: self.total_tick_micros.load(Ordering::Relaxed) as f64 / 1000.0,
            last_tick_ms: self.last_tick_micros.load(Ordering::Relaxed) as f64 / 1000.0,
            last_deviation_ms: f64::from_bits(self.last_deviation_ms.load(Ordering::Relaxed)),
            average_tick_ms: self.average_tick_ms(),
            expected_period_ms: self.expected_period.as_secs_f64() * 1000.0,
            uptime_secs: self.uptime().as_secs_f64(),
            ticks_per_second: self.ticks_per_second(),
        }
    }
}

/// Plain copy of the counters at one instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TelemetryReport {
    pub created: u64,
    pub removed: u64,
    pub ticks: u64,
    pub lagged_ticks: u64,
    pub total_tick_ms: f64,
    pub last_tick_ms: f64,
    pub last_deviation_ms: f64,
    pub average_tick_ms: f64,
    pub expected_period_ms: f64,
    pub uptime_secs: f64,
    pub ticks_per_second: f64,
}

impl fmt::Display for TelemetryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Enemy engine telemetry")?;
        writeln!(f, "  enemies created:   {}", self.created)?;
        writeln!(f, "  enemies removed:   {}", self.removed)?;
        writeln!(f, "  ticks executed:    {}", self.ticks)?;
        writeln!(f, "  lagged ticks:      {}", self.lagged_ticks)?;
        writeln!(
            f,
            "  tick time:         last {:.3} ms, avg {:.3} ms (expected {:.1} ms)",
            self.last_tick_ms, self.average_tick_ms, self.expected_period_ms
        )?;
        writeln!(f, "  last deviation:    {:+.3} ms", self.last_deviation_ms)?;
        write!(
            f,
            "  uptime:            {:.1} s ({:.2} ticks/s)",
            self.uptime_secs, self.ticks_per_second
        )
    }
}
