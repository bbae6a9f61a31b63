// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use libdd_loop_monitor::profiler::{
    Frame, NodeId, ProfileSnapshot, ProfilerBackend, SnapshotBuilder,
};
use libdd_loop_monitor::Clock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct ManualClock(Arc<AtomicU64>);

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

pub fn frame(name: &str) -> Frame {
    Frame::new(name, "app.js", Some(name.len() as u32))
}

/// Backend that shares one sampler between all running sessions, starting it
/// with the first session and tearing it down with the last.
#[derive(Default)]
pub struct SimulatedBackend {
    pub interval_us: u64,
    pub now_us: u64,
    pub sampler_starts: usize,
    sessions: HashMap<String, Vec<(Vec<Frame>, u64)>>,
}

impl SimulatedBackend {
    pub fn running_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Records one sample into every running session. `stack` is listed from
    /// the outermost frame to the leaf.
    pub fn sample(&mut self, stack: &[&str], timestamp_us: u64) {
        let frames: Vec<Frame> = stack.iter().map(|name| frame(name)).collect();
        for samples in self.sessions.values_mut() {
            samples.push((frames.clone(), timestamp_us));
        }
        self.now_us = self.now_us.max(timestamp_us);
    }
}

impl ProfilerBackend for SimulatedBackend {
    fn set_sampling_interval(&mut self, interval_us: u64) {
        self.interval_us = interval_us;
    }

    fn start_session(&mut self, label: &str) {
        if self.sessions.is_empty() {
            self.sampler_starts += 1;
        }
        self.sessions.entry(label.to_string()).or_default();
    }

    fn stop_session(&mut self, label: &str) -> Option<ProfileSnapshot> {
        let samples = self.sessions.remove(label)?;
        let mut builder = SnapshotBuilder::new(Frame::new("(root)", "", None));
        let mut children: HashMap<(NodeId, String), NodeId> = HashMap::new();
        for (stack, timestamp_us) in samples {
            let mut node = builder.root();
            for frame in stack {
                let key = (node, frame.function_name.clone());
                node = match children.get(&key) {
                    Some(&child) => child,
                    None => {
                        let child = builder.add_child(node, frame).ok()?;
                        children.insert(key, child);
                        child
                    }
                };
            }
            builder.add_sample(node, timestamp_us).ok()?;
        }
        Some(builder.build(self.now_us))
    }
}
