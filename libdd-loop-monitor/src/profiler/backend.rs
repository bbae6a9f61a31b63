// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::ProfileSnapshot;

/// A CPU sampler that can run several named sessions at once.
///
/// Implementations typically run their sampler on a separate thread and tear
/// it down when the last session stops. All methods are called from the loop
/// thread.
pub trait ProfilerBackend {
    /// Applies to sessions started after the call.
    fn set_sampling_interval(&mut self, interval_us: u64);

    fn start_session(&mut self, label: &str);

    /// Stops the session and returns what it captured, or `None` when no
    /// session with that label is running.
    fn stop_session(&mut self, label: &str) -> Option<ProfileSnapshot>;
}

impl<B: ProfilerBackend + ?Sized> ProfilerBackend for Box<B> {
    fn set_sampling_interval(&mut self, interval_us: u64) {
        (**self).set_sampling_interval(interval_us)
    }

    fn start_session(&mut self, label: &str) {
        (**self).start_session(label)
    }

    fn stop_session(&mut self, label: &str) -> Option<ProfileSnapshot> {
        (**self).stop_session(label)
    }
}
