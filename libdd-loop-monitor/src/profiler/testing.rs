// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::{Frame, ProfileSnapshot, ProfilerBackend, SnapshotBuilder};
use std::collections::VecDeque;

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BackendCall {
    SetInterval(u64),
    Start(String),
    Stop(String),
}

/// Records every call and tracks which sessions are running. Stopping a
/// running session yields the next queued snapshot, or an empty one.
#[derive(Debug)]
pub struct RecordingBackend {
    pub calls: Vec<BackendCall>,
    pub active: Vec<String>,
    pub snapshots: VecDeque<ProfileSnapshot>,
    /// Fewest sessions left running by any stop, `usize::MAX` until the first
    /// stop.
    pub min_active_after_first_start: usize,
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self {
            calls: Vec::new(),
            active: Vec::new(),
            snapshots: VecDeque::new(),
            min_active_after_first_start: usize::MAX,
        }
    }
}

impl ProfilerBackend for RecordingBackend {
    fn set_sampling_interval(&mut self, interval_us: u64) {
        self.calls.push(BackendCall::SetInterval(interval_us));
    }

    fn start_session(&mut self, label: &str) {
        self.calls.push(BackendCall::Start(label.to_string()));
        self.active.push(label.to_string());
    }

    fn stop_session(&mut self, label: &str) -> Option<ProfileSnapshot> {
        self.calls.push(BackendCall::Stop(label.to_string()));
        let position = self.active.iter().position(|l| l == label)?;
        self.active.remove(position);
        self.min_active_after_first_start =
            self.min_active_after_first_start.min(self.active.len());
        Some(
            self.snapshots
                .pop_front()
                .unwrap_or_else(|| SnapshotBuilder::new(Frame::new("(root)", "", None)).build(0)),
        )
    }
}

/// `(root) -> mid -> leaf` with five leaf samples 10ms apart; the session
/// ends on the last sample.
pub fn stack_snapshot() -> ProfileSnapshot {
    let mut builder = SnapshotBuilder::new(Frame::new("(root)", "", None));
    let root = builder.root();
    let mid = builder
        .add_child(root, Frame::new("mid", "mid.js", Some(2)))
        .unwrap();
    let leaf = builder
        .add_child(mid, Frame::new("leaf", "leaf.js", Some(3)))
        .unwrap();
    for i in 0..5 {
        builder.add_sample(leaf, 1_000_000 + i * 10_000).unwrap();
    }
    builder.build(1_040_000)
}
