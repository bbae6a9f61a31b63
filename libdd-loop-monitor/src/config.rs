// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::histogram::LinearBuckets;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub histogram_min_ms: f64,
    pub histogram_max_ms: f64,
    pub histogram_step_ms: f64,
    /// How often the backend samples, and the weight of one hit in the
    /// collapsed-stack output.
    pub sampling_interval_ms: u64,
    /// Ticks longer than this dump the samples they contain.
    pub stall_threshold_ms: u64,
    /// Sessions older than this are handed off even without a stall, which
    /// bounds how much the backend accumulates.
    pub max_session_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            histogram_min_ms: 0.0,
            histogram_max_ms: 1000.0,
            histogram_step_ms: 10.0,
            sampling_interval_ms: 10,
            stall_threshold_ms: 100,
            max_session_ms: 10_000,
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.histogram_layout()?;
        anyhow::ensure!(
            self.sampling_interval_ms > 0,
            "sampling_interval_ms must be positive"
        );
        anyhow::ensure!(
            self.stall_threshold_ms > 0,
            "stall_threshold_ms must be positive"
        );
        Ok(())
    }

    pub fn histogram_layout(&self) -> anyhow::Result<LinearBuckets> {
        LinearBuckets::new(
            self.histogram_min_ms,
            self.histogram_max_ms,
            self.histogram_step_ms,
        )
    }

    /// Parses a JSON object; missing fields take their defaults.
    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}
