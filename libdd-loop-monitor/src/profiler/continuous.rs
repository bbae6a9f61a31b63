// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::session::{SessionColor, SessionHandoff};
use super::{collapse_stacks, filter_hits, ProfileSnapshot, ProfilerBackend};
use crate::writer::AsyncAppender;
use std::path::Path;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Keeps a backend session running for as long as profiling is enabled.
///
/// [`ContinuousProfiler::pulse`] finalizes the running session and returns its
/// snapshot while a fresh session has already taken over, so samples are
/// collected without gaps and the backend never has to restart its sampler.
#[derive(Debug)]
pub struct ContinuousProfiler<B: ProfilerBackend> {
    backend: B,
    sampling_interval_ms: u64,
    handoff: SessionHandoff,
    runtime: Handle,
    active: Option<ActiveProfile>,
}

#[derive(Debug)]
struct ActiveProfile {
    started_at_ms: u64,
    log: AsyncAppender,
}

impl<B: ProfilerBackend> ContinuousProfiler<B> {
    /// `runtime` runs the background writes to the destination log.
    pub fn new(backend: B, sampling_interval_ms: u64, runtime: Handle) -> Self {
        Self {
            backend,
            sampling_interval_ms,
            handoff: SessionHandoff::default(),
            runtime,
            active: None,
        }
    }

    pub fn is_profiling(&self) -> bool {
        self.active.is_some()
    }

    /// Color of the session receiving new samples.
    pub fn active_color(&self) -> SessionColor {
        self.handoff.active()
    }

    pub fn sampling_interval_ms(&self) -> u64 {
        self.sampling_interval_ms
    }

    /// Whether the destination of the running session was opened. `None`
    /// when not profiling.
    pub fn has_valid_destination(&self) -> Option<bool> {
        self.active.as_ref().map(|active| active.log.is_valid())
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Opens `destination` for appending and starts sampling. Does nothing if
    /// already profiling. A destination that cannot be opened is logged and
    /// profiling continues without output.
    pub fn start(&mut self, destination: impl AsRef<Path>, now_ms: u64) {
        if self.active.is_some() {
            return;
        }
        let log = AsyncAppender::open(destination, &self.runtime);
        self.backend
            .set_sampling_interval(self.sampling_interval_ms.saturating_mul(1000));
        self.handoff.open(&mut self.backend);
        info!(
            destination = %log.path().display(),
            session = self.handoff.active().label(),
            sampling_interval_ms = self.sampling_interval_ms,
            "Started continuous profiling"
        );
        self.active = Some(ActiveProfile {
            started_at_ms: now_ms,
            log,
        });
    }

    /// Hands sampling over to the other session and returns what the
    /// previous one captured. Returns `None` without side effects when not
    /// profiling.
    pub fn pulse(&mut self, now_ms: u64) -> Option<ProfileSnapshot> {
        let active = self.active.as_mut()?;
        let snapshot = self.handoff.handoff(&mut self.backend);
        active.started_at_ms = now_ms;
        debug!(
            session = self.handoff.active().label(),
            captured = snapshot.is_some(),
            "Profiling session handed off"
        );
        snapshot
    }

    /// Stops the running session and closes the destination. The returned
    /// handle resolves once pending writes have been flushed; dropping it
    /// lets them finish in the background.
    pub fn stop(&mut self) -> Option<JoinHandle<()>> {
        let active = self.active.take()?;
        // Whatever the last session captured was never asked for.
        drop(self.handoff.close(&mut self.backend));
        info!(destination = %active.log.path().display(), "Stopped continuous profiling");
        active.log.close()
    }

    /// Ages the running session from `now_ms` without touching the backend.
    /// Does nothing when not profiling.
    pub fn reset_duration(&mut self, now_ms: u64) {
        if let Some(active) = &mut self.active {
            active.started_at_ms = now_ms;
        }
    }

    /// Time since the running session started, zero when not profiling.
    pub fn profiling_duration_ms(&self, now_ms: u64) -> u64 {
        self.active
            .as_ref()
            .map_or(0, |active| now_ms.saturating_sub(active.started_at_ms))
    }

    /// Appends the collapsed stacks of the samples in
    /// `(window_start_ms, window_end_ms]` to the destination. Returns the
    /// number of lines queued for writing.
    pub fn log_filtered_profile(
        &self,
        snapshot: &ProfileSnapshot,
        window_end_ms: u64,
        window_start_ms: u64,
    ) -> usize {
        let Some(active) = &self.active else {
            return 0;
        };
        let hits = filter_hits(
            snapshot,
            window_end_ms,
            window_start_ms,
            self.sampling_interval_ms,
        );
        let stacks = collapse_stacks(snapshot, &hits, self.sampling_interval_ms);
        let lines = stacks.lines().count();
        active.log.append(stacks);
        lines
    }
}

impl<B: ProfilerBackend> Drop for ContinuousProfiler<B> {
    fn drop(&mut self) {
        drop(self.stop());
    }
}
