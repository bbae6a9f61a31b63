// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! JSON control surface for a [`LoopMonitor`]:
//!
//! ```json
//! {"command": "get_data"}
//! {"command": "start_profiling", "destination": "/tmp/stalls.log"}
//! {"command": "stop_profiling"}
//! ```

use crate::monitor::{Clock, LoopMonitor, LoopStats};
use crate::profiler::ProfilerBackend;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    /// Returns the loop statistics and resets them.
    GetData,
    /// `destination` is kept untyped so a wrong type is reported as a
    /// command error rather than a parse error.
    StartProfiling {
        #[serde(default)]
        destination: Option<serde_json::Value>,
    },
    StopProfiling,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Response {
    Stats(LoopStats),
    Done,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Malformed command")]
    Malformed(#[from] serde_json::Error),

    #[error("Expected start_profiling(destination): no destination given")]
    MissingDestination,

    #[error("Expected start_profiling(destination): destination must be a non-empty string")]
    InvalidDestination,
}

impl Command {
    pub fn parse(json: &str) -> Result<Self, CommandError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Runs `command` against `monitor`. Only argument errors are reported; the
/// operations themselves never fail.
pub fn execute<B: ProfilerBackend, C: Clock>(
    monitor: &mut LoopMonitor<B, C>,
    command: Command,
) -> Result<Response, CommandError> {
    match command {
        Command::GetData => Ok(Response::Stats(monitor.read_and_reset_stats())),
        Command::StartProfiling { destination } => {
            let destination = match destination {
                None | Some(serde_json::Value::Null) => {
                    return Err(CommandError::MissingDestination)
                }
                Some(serde_json::Value::String(path)) if !path.is_empty() => path,
                Some(_) => return Err(CommandError::InvalidDestination),
            };
            monitor.start_profiling(destination);
            Ok(Response::Done)
        }
        Command::StopProfiling => {
            // Pending writes finish in the background.
            drop(monitor.stop_profiling());
            Ok(Response::Done)
        }
    }
}

/// Parses and executes a JSON command, returning the JSON response.
pub fn handle_json<B: ProfilerBackend, C: Clock>(
    monitor: &mut LoopMonitor<B, C>,
    json: &str,
) -> Result<String, CommandError> {
    let response = execute(monitor, Command::parse(json)?)?;
    Ok(serde_json::to_string(&response)?)
}
