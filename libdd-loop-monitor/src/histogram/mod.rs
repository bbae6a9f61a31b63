// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Fixed-bucket histograms with approximate percentiles.
//!
//! Buckets are allocated once at construction, so [`Histogram::sample`] never
//! allocates. Percentiles are approximated by the mean of the bucket that
//! contains the requested rank rather than the true order statistic.

mod linear;
mod log2;

pub use linear::LinearBuckets;
pub use log2::Log2Buckets;

/// Decides which bucket a value falls into. The number of buckets is fixed
/// for the lifetime of the layout.
pub trait BucketLayout {
    /// Total number of buckets, including any overflow/underflow slots.
    fn bucket_count(&self) -> usize;

    /// Index of the bucket for `value`. Must be `< bucket_count()` for every
    /// input, including NaN and infinities.
    fn bucket_index(&self, value: f64) -> usize;
}

pub type LinearHistogram = Histogram<LinearBuckets>;
pub type Log2Histogram = Histogram<Log2Buckets>;

#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Bucket {
    pub sum: f64,
    pub count: u64,
}

impl Bucket {
    /// Mean of the samples in this bucket, NaN when empty.
    fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

#[derive(Clone, Debug)]
pub struct Histogram<L: BucketLayout> {
    layout: L,
    buckets: Vec<Bucket>,
    sample_sum: f64,
    sample_count: u64,
    sample_min: f64,
    sample_max: f64,
}

impl<L: BucketLayout> Histogram<L> {
    pub fn with_layout(layout: L) -> Self {
        let buckets = vec![Bucket::default(); layout.bucket_count()];
        Self {
            layout,
            buckets,
            sample_sum: 0.0,
            sample_count: 0,
            sample_min: f64::NAN,
            sample_max: f64::NAN,
        }
    }

    /// Zeroes every accumulator and bucket. The layout is kept.
    pub fn reset(&mut self) {
        self.sample_sum = 0.0;
        self.sample_count = 0;
        self.sample_min = f64::NAN;
        self.sample_max = f64::NAN;
        self.buckets.fill(Bucket::default());
    }

    pub fn sample(&mut self, value: f64) {
        let index = self.layout.bucket_index(value);
        // Layouts are required to stay in range; the guard keeps a faulty
        // layout from panicking on the loop thread.
        let Some(bucket) = self.buckets.get_mut(index) else {
            return;
        };
        bucket.sum += value;
        bucket.count += 1;

        self.sample_sum += value;
        self.sample_count += 1;
        if self.sample_count == 1 {
            self.sample_min = value;
            self.sample_max = value;
        } else {
            // f64::min/max ignore a NaN operand, so a NaN sample never
            // displaces a real extreme.
            self.sample_min = self.sample_min.min(value);
            self.sample_max = self.sample_max.max(value);
        }
    }

    /// Mean of the bucket holding the sample of rank `ceil(percentile/100 * count)`.
    ///
    /// Returns NaN when the histogram is empty, or when `percentile > 100`
    /// asks for more samples than were recorded.
    pub fn approximate_percentile(&self, percentile: f64) -> f64 {
        // Negative and NaN percentiles saturate to zero in the cast.
        let needed = (percentile / 100.0 * self.sample_count as f64).ceil() as u64;
        let mut seen = 0u64;
        for bucket in &self.buckets {
            seen += bucket.count;
            if seen >= needed {
                return bucket.mean();
            }
        }
        f64::NAN
    }

    pub fn average(&self) -> f64 {
        if self.sample_count == 0 {
            f64::NAN
        } else {
            self.sample_sum / self.sample_count as f64
        }
    }

    /// Largest sample since the last reset, NaN when empty.
    pub fn maximum(&self) -> f64 {
        self.sample_max
    }

    /// Smallest sample since the last reset, NaN when empty.
    pub fn minimum(&self) -> f64 {
        self.sample_min
    }

    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn layout(&self) -> &L {
        &self.layout
    }
}

impl LinearHistogram {
    /// See [`LinearBuckets::new`].
    pub fn linear(min: f64, max: f64, step: f64) -> anyhow::Result<Self> {
        Ok(Self::with_layout(LinearBuckets::new(min, max, step)?))
    }
}

impl Log2Histogram {
    /// See [`Log2Buckets::new`].
    pub fn log2(num_buckets: usize) -> anyhow::Result<Self> {
        Ok(Self::with_layout(Log2Buckets::new(num_buckets)?))
    }
}
