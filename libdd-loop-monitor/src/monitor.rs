// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::config::MonitorConfig;
use crate::histogram::LinearHistogram;
use crate::profiler::{ContinuousProfiler, ProfilerBackend};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

/// Monotonic milliseconds, as seen by the host loop.
pub trait Clock {
    fn now_ms(&self) -> u64;
}

/// Milliseconds elapsed since the clock was created.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Loop latency summary since the previous read. Statistics with no samples
/// behind them are NaN.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoopStats {
    pub count: u64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub avg_ms: f64,
    pub max_ms: f64,
}

/// What a tick did beyond recording its latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// First tick seen by a monitor built with [`LoopMonitor::new`]; it only
    /// sets the baseline the next tick is measured from.
    Baseline,
    Recorded,
    /// The profiling session was handed off and its snapshot discarded.
    Pulsed,
    /// The tick stalled; the samples it covered were queued for writing.
    StallLogged { lines: usize },
}

/// Watches one event loop. The host calls [`LoopMonitor::on_tick`] once per
/// iteration; everything else is driven from there.
///
/// The timestamps passed to `on_tick` are the monitor's only timeline: tick
/// deltas, session ages and stall windows are all measured against them.
#[derive(Debug)]
pub struct LoopMonitor<B: ProfilerBackend, C: Clock = MonotonicClock> {
    config: MonitorConfig,
    clock: C,
    histogram: LinearHistogram,
    profiler: ContinuousProfiler<B>,
    last_tick_ms: Option<u64>,
}

impl<B: ProfilerBackend> LoopMonitor<B> {
    /// For hosts that pass their own monotonic timestamps to
    /// [`LoopMonitor::on_tick`]. The first tick only sets the baseline.
    pub fn new(config: MonitorConfig, backend: B, runtime: Handle) -> anyhow::Result<Self> {
        let mut monitor = Self::with_clock(config, backend, runtime, MonotonicClock::new())?;
        monitor.last_tick_ms = None;
        Ok(monitor)
    }
}

impl<B: ProfilerBackend, C: Clock> LoopMonitor<B, C> {
    /// `runtime` carries the background writes of stall dumps. `clock` must
    /// share the epoch of every timestamp given to [`LoopMonitor::on_tick`];
    /// the first tick is measured from construction time on that clock.
    pub fn with_clock(
        config: MonitorConfig,
        backend: B,
        runtime: Handle,
        clock: C,
    ) -> anyhow::Result<Self> {
        config.validate()?;
        let histogram = LinearHistogram::with_layout(config.histogram_layout()?);
        let profiler = ContinuousProfiler::new(backend, config.sampling_interval_ms, runtime);
        let last_tick_ms = Some(clock.now_ms());
        Ok(Self {
            config,
            clock,
            histogram,
            profiler,
            last_tick_ms,
        })
    }

    /// Tick using the monitor's own clock.
    pub fn tick(&mut self) -> TickOutcome {
        let now_ms = self.clock.now_ms();
        self.on_tick(now_ms)
    }

    pub fn on_tick(&mut self, now_ms: u64) -> TickOutcome {
        let Some(last_tick_ms) = self.last_tick_ms.replace(now_ms) else {
            // A session started before the baseline is aged from it.
            self.profiler.reset_duration(now_ms);
            return TickOutcome::Baseline;
        };
        let tick_delta_ms = now_ms.saturating_sub(last_tick_ms);
        self.histogram.sample(tick_delta_ms as f64);

        let mut outcome = TickOutcome::Recorded;
        if self.profiler.is_profiling() {
            let stalled = tick_delta_ms > self.config.stall_threshold_ms;
            let expired = self.profiler.profiling_duration_ms(now_ms) > self.config.max_session_ms;
            if stalled || expired {
                outcome = TickOutcome::Pulsed;
                if let Some(snapshot) = self.profiler.pulse(now_ms) {
                    if stalled {
                        let lines =
                            self.profiler
                                .log_filtered_profile(&snapshot, now_ms, last_tick_ms);
                        debug!(tick_delta_ms, lines, "Event loop stalled");
                        outcome = TickOutcome::StallLogged { lines };
                    }
                }
            }
        }

        outcome
    }

    /// Summarizes the latencies recorded since the previous call, then
    /// clears them.
    pub fn read_and_reset_stats(&mut self) -> LoopStats {
        let stats = LoopStats {
            count: self.histogram.sample_count(),
            p50_ms: self.histogram.approximate_percentile(50.0),
            p95_ms: self.histogram.approximate_percentile(95.0),
            p99_ms: self.histogram.approximate_percentile(99.0),
            avg_ms: self.histogram.average(),
            max_ms: self.histogram.maximum(),
        };
        self.histogram.reset();
        stats
    }

    /// Starts profiling into `destination`, appending to it if it exists.
    /// Does nothing while already profiling.
    ///
    /// The session is aged from the most recent tick, or from the first tick
    /// when none has been seen yet.
    pub fn start_profiling(&mut self, destination: impl AsRef<Path>) {
        let now_ms = self.last_tick_ms.unwrap_or_default();
        self.profiler.start(destination, now_ms);
    }

    /// See [`ContinuousProfiler::stop`].
    pub fn stop_profiling(&mut self) -> Option<JoinHandle<()>> {
        self.profiler.stop()
    }

    pub fn is_profiling(&self) -> bool {
        self.profiler.is_profiling()
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn histogram(&self) -> &LinearHistogram {
        &self.histogram
    }

    pub fn profiler(&self) -> &ContinuousProfiler<B> {
        &self.profiler
    }

    pub fn profiler_mut(&mut self) -> &mut ContinuousProfiler<B> {
        &mut self.profiler
    }
}
