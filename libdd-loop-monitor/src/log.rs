// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Optional `tracing` subscriber for hosts that don't install their own.
//!
//! The library only emits events; nothing is printed unless a subscriber is
//! installed, either by the host or through [`init_global`].

use std::io;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// Log level for filtering log events.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Trace,
    /// Session handoffs and stall dumps.
    Debug,
    /// Profiling started/stopped.
    Info,
    /// Destination files that could not be opened.
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

/// `RUST_LOG` wins when set; otherwise everything at `level` and above.
fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(LevelFilter::from(level).to_string().to_lowercase()))
}

fn subscriber<W>(level: LogLevel, writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = fmt::layer()
        .with_writer(writer)
        .with_thread_names(true)
        .with_target(true)
        .with_ansi(false);
    Registry::default().with(env_filter(level)).with(layer)
}

/// Installs a stderr subscriber for the whole process. Fails if another
/// global subscriber is already set.
pub fn init_global(level: LogLevel) -> anyhow::Result<()> {
    tracing::subscriber::set_global_default(subscriber(level, io::stderr))
        .map_err(|e| anyhow::anyhow!("Failed to set global default subscriber: {e}"))
}

/// Installs a subscriber for the current thread until the guard is dropped.
pub fn init_scoped<W>(level: LogLevel, writer: W) -> DefaultGuard
where
    W: for<'w> fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    tracing::subscriber::set_default(subscriber(level, writer))
}
