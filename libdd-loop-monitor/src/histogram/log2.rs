// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::BucketLayout;

/// Power-of-two buckets: bucket `i` holds values in `[2^i, 2^(i+1))`.
///
/// Values below 2, including zero, negatives and NaN, go to bucket 0. Values
/// at or above `2^(num_buckets - 1)`, including +inf, go to the last bucket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log2Buckets {
    num_buckets: usize,
}

impl Log2Buckets {
    pub fn new(num_buckets: usize) -> anyhow::Result<Self> {
        anyhow::ensure!(num_buckets > 0, "log2 histogram needs at least one bucket");
        Ok(Self { num_buckets })
    }
}

impl BucketLayout for Log2Buckets {
    fn bucket_count(&self) -> usize {
        self.num_buckets
    }

    fn bucket_index(&self, value: f64) -> usize {
        let last = self.num_buckets - 1;
        if value.is_nan() || value <= 0.0 {
            return 0;
        }
        // log2 of (0, 1) is negative; the float-to-int cast saturates it to 0.
        (value.log2().floor() as usize).min(last)
    }
}
