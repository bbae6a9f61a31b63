// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

mod common;

use common::{ManualClock, SimulatedBackend};
use libdd_loop_monitor::commands::{handle_json, CommandError};
use libdd_loop_monitor::monitor::TickOutcome;
use libdd_loop_monitor::{Clock, LoopMonitor, MonitorConfig};
use tempfile::TempDir;
use tokio::runtime::Handle;

fn monitor(clock: &ManualClock) -> LoopMonitor<SimulatedBackend, ManualClock> {
    LoopMonitor::with_clock(
        MonitorConfig::default(),
        SimulatedBackend::default(),
        Handle::current(),
        clock.clone(),
    )
    .unwrap()
}

/// Ticks every 5ms for `ticks` iterations while the loop is idle.
fn healthy_ticks<C: Clock>(
    monitor: &mut LoopMonitor<SimulatedBackend, C>,
    now_ms: &mut u64,
    ticks: usize,
) {
    for _ in 0..ticks {
        *now_ms += 5;
        monitor
            .profiler_mut()
            .backend_mut()
            .sample(&["(idle)"], *now_ms * 1000);
        assert_eq!(monitor.on_tick(*now_ms), TickOutcome::Recorded);
    }
}

/// Blocks the loop in `stack` for `duration_ms`, sampling every 10ms, then
/// ticks.
fn stall<C: Clock>(
    monitor: &mut LoopMonitor<SimulatedBackend, C>,
    now_ms: &mut u64,
    stack: &[&str],
    duration_ms: u64,
) -> TickOutcome {
    let start = *now_ms;
    let backend = monitor.profiler_mut().backend_mut();
    for t in (start + 10..=start + duration_ms).step_by(10) {
        backend.sample(stack, t * 1000);
    }
    *now_ms += duration_ms;
    monitor.on_tick(*now_ms)
}

#[tokio::test]
async fn stalls_append_collapsed_stacks() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stalls.log");
    let clock = ManualClock::default();
    let mut monitor = monitor(&clock);
    let mut now_ms = 0;

    monitor.start_profiling(&path);
    assert_eq!(monitor.profiler().backend().interval_us, 10_000);

    healthy_ticks(&mut monitor, &mut now_ms, 10);
    assert_eq!(
        stall(&mut monitor, &mut now_ms, &["main", "parse"], 300),
        TickOutcome::StallLogged { lines: 1 }
    );

    healthy_ticks(&mut monitor, &mut now_ms, 10);
    assert_eq!(
        stall(&mut monitor, &mut now_ms, &["main", "render", "layout"], 150),
        TickOutcome::StallLogged { lines: 1 }
    );

    // The sampler ran continuously across both handoffs.
    assert_eq!(monitor.profiler().backend().sampler_starts, 1);
    assert_eq!(monitor.profiler().backend().running_sessions(), 1);

    monitor.stop_profiling().unwrap().await.unwrap();
    assert_eq!(monitor.profiler().backend().running_sessions(), 0);

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(
        contents,
        "parse(app.js:5);main(app.js:4) 300\n\
         layout(app.js:6);render(app.js:6);main(app.js:4) 150\n"
    );

    let stats = monitor.read_and_reset_stats();
    assert_eq!(stats.count, 22);
    assert_eq!(stats.p50_ms, 5.0);
    assert_eq!(stats.max_ms, 300.0);
    // Rank 21 of 22 is the 150ms stall, rank 22 the 300ms one.
    assert_eq!(stats.p95_ms, 150.0);
    assert_eq!(stats.p99_ms, 300.0);
}

#[tokio::test]
async fn long_healthy_sessions_are_recycled() {
    let dir = TempDir::new().unwrap();
    let clock = ManualClock::default();
    let mut monitor = monitor(&clock);
    let mut now_ms = 0;

    monitor.start_profiling(dir.path().join("stalls.log"));
    let mut pulses = 0;
    for _ in 0..2_500 {
        now_ms += 10;
        if monitor.on_tick(now_ms) == TickOutcome::Pulsed {
            pulses += 1;
        }
    }
    // 25 seconds of ticks, each session lives just over 10 seconds.
    assert_eq!(pulses, 2);
    assert_eq!(monitor.profiler().backend().sampler_starts, 1);

    monitor.stop_profiling().unwrap().await.unwrap();
    let contents = std::fs::read_to_string(dir.path().join("stalls.log")).unwrap();
    assert!(contents.is_empty());
}

#[tokio::test]
async fn stall_without_profiling_only_records_latency() {
    let clock = ManualClock::default();
    let mut monitor = monitor(&clock);
    let mut now_ms = 0;
    assert_eq!(
        stall(&mut monitor, &mut now_ms, &["main"], 500),
        TickOutcome::Recorded
    );
    assert_eq!(monitor.profiler().backend().sampler_starts, 0);
    assert_eq!(monitor.read_and_reset_stats().max_ms, 500.0);
}

#[tokio::test]
async fn json_commands_drive_the_monitor() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stalls.log");
    let clock = ManualClock::default();
    let mut monitor = monitor(&clock);

    assert!(matches!(
        handle_json(&mut monitor, r#"{"command": "start_profiling"}"#),
        Err(CommandError::MissingDestination)
    ));

    let start = serde_json::json!({"command": "start_profiling", "destination": &path});
    handle_json(&mut monitor, &start.to_string()).unwrap();
    // A second start is ignored.
    handle_json(&mut monitor, &start.to_string()).unwrap();
    assert_eq!(monitor.profiler().backend().sampler_starts, 1);

    let mut now_ms = 0;
    stall(&mut monitor, &mut now_ms, &["main", "spin"], 200);
    handle_json(&mut monitor, r#"{"command": "stop_profiling"}"#).unwrap();

    let data: serde_json::Value =
        serde_json::from_str(&handle_json(&mut monitor, r#"{"command": "get_data"}"#).unwrap())
            .unwrap();
    assert_eq!(data["count"], 1);
    assert_eq!(data["max_ms"], 200.0);
}

#[tokio::test]
async fn host_timestamps_drive_a_default_monitor() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stalls.log");
    let mut monitor = LoopMonitor::new(
        MonitorConfig::default(),
        SimulatedBackend::default(),
        Handle::current(),
    )
    .unwrap();

    // An hour into the host's own clock.
    let mut now_ms = 3_600_000;
    assert_eq!(monitor.on_tick(now_ms), TickOutcome::Baseline);
    monitor.start_profiling(&path);
    healthy_ticks(&mut monitor, &mut now_ms, 1);
    assert_eq!(monitor.profiler().backend().running_sessions(), 1);

    assert_eq!(
        stall(&mut monitor, &mut now_ms, &["main", "parse"], 200),
        TickOutcome::StallLogged { lines: 1 }
    );
    monitor.stop_profiling().unwrap().await.unwrap();
    assert_eq!(
        std::fs::read_to_string(&path).unwrap(),
        "parse(app.js:5);main(app.js:4) 200\n"
    );

    let stats = monitor.read_and_reset_stats();
    assert_eq!(stats.count, 2);
    assert_eq!(stats.p50_ms, 5.0);
    assert_eq!(stats.max_ms, 200.0);
}
