// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0
#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

//! Measures the latency of a single-threaded event loop and captures CPU
//! samples when the loop stalls.
//!
//! The host loop calls [`LoopMonitor::on_tick`] (or [`LoopMonitor::tick`]) once
//! per iteration. Each inter-tick delta is recorded into a bucketing
//! [`histogram`]. While profiling is enabled, the [`profiler`] keeps a
//! sampling session open at all times by handing off between two alternating
//! sessions; when a tick exceeds the stall threshold the samples that fell
//! inside that tick are collapsed into flame-graph lines and appended to the
//! destination file.

pub mod commands;
pub mod config;
pub mod histogram;
pub mod log;
pub mod monitor;
pub mod profiler;
pub mod writer;

pub use config::MonitorConfig;
pub use monitor::{Clock, LoopMonitor, LoopStats, MonotonicClock};
