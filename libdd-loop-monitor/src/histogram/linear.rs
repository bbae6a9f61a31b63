// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::BucketLayout;

/// Equal-width buckets covering `[min, max]`, followed by one overflow slot
/// (values above `max`) and one underflow slot (values below `min`).
///
/// The overflow slot sits directly after the last in-range bucket, so a value
/// landing exactly on `max` when `(max - min) / step` is integral shares it.
/// The underflow slot is last, which means percentile scans visit underflowed
/// samples after everything else.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearBuckets {
    min: f64,
    max: f64,
    step: f64,
    count: usize,
}

impl LinearBuckets {
    pub fn new(min: f64, max: f64, step: f64) -> anyhow::Result<Self> {
        anyhow::ensure!(
            min.is_finite() && max.is_finite(),
            "histogram bounds must be finite, got [{min}, {max}]"
        );
        anyhow::ensure!(max > min, "histogram max ({max}) must exceed min ({min})");
        anyhow::ensure!(
            step.is_finite() && step > 0.0,
            "histogram step must be positive, got {step}"
        );
        let in_range = ((max - min) / step).ceil();
        anyhow::ensure!(
            in_range <= u32::MAX as f64,
            "histogram [{min}, {max}] with step {step} needs too many buckets"
        );
        Ok(Self {
            min,
            max,
            step,
            count: in_range as usize + 2,
        })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn overflow_index(&self) -> usize {
        self.count - 2
    }

    pub fn underflow_index(&self) -> usize {
        self.count - 1
    }
}

impl BucketLayout for LinearBuckets {
    fn bucket_count(&self) -> usize {
        self.count
    }

    /// NaN compares neither above `max` nor within range and is filed as
    /// underflow.
    fn bucket_index(&self, value: f64) -> usize {
        if value > self.max {
            self.overflow_index()
        } else if value >= self.min {
            // value <= max here, so the quotient is at most the in-range count.
            (((value - self.min) / self.step) as usize).min(self.overflow_index())
        } else {
            self.underflow_index()
        }
    }
}
