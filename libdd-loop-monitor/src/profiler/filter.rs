// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::{NodeId, ProfileSnapshot};
use std::collections::BTreeMap;

/// Sample counts per leaf node for one time window of one snapshot.
pub type FilteredHits = BTreeMap<NodeId, u64>;

/// Counts the samples of `snapshot` that fall in the wall-clock window
/// `(window_start_ms, window_end_ms]`.
///
/// Sample timestamps live in the backend's own clock, so the window end is
/// assumed to coincide with [`ProfileSnapshot::end_time_us`]. Each sample is
/// placed at `window_end_ms - (end_time_us - timestamp_us) / 1000` and kept if
/// that lands strictly after `window_start_ms`.
///
/// Samples are time-ordered and the window is usually a small suffix of the
/// session, so the scan starts an estimated number of sampling intervals
/// before the end. The estimate rounds towards scanning more samples.
pub fn filter_hits(
    snapshot: &ProfileSnapshot,
    window_end_ms: u64,
    window_start_ms: u64,
    sampling_interval_ms: u64,
) -> FilteredHits {
    let samples = snapshot.samples();
    let first = scan_start(
        samples.len(),
        window_end_ms.saturating_sub(window_start_ms),
        sampling_interval_ms,
    );

    let mut hits = FilteredHits::new();
    for sample in &samples[first..] {
        let age_ms = snapshot.end_time_us().saturating_sub(sample.timestamp_us) / 1000;
        let inside = window_end_ms
            .checked_sub(age_ms)
            .is_some_and(|wall_ms| wall_ms > window_start_ms);
        if inside {
            *hits.entry(sample.node).or_default() += 1;
        }
    }
    hits
}

fn scan_start(samples_len: usize, window_ms: u64, sampling_interval_ms: u64) -> usize {
    if sampling_interval_ms == 0 {
        return 0;
    }
    let expected = window_ms.div_ceil(sampling_interval_ms);
    let expected = usize::try_from(expected).unwrap_or(usize::MAX);
    samples_len.saturating_sub(expected)
}
