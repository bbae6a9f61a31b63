// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Gap-free CPU profiling around a pluggable sampling backend, and the
//! conversion of captured samples into collapsed stacks.

mod backend;
mod collapse;
mod continuous;
mod filter;
mod session;
mod snapshot;
#[cfg(test)]
pub(crate) mod testing;

pub use backend::*;
pub use collapse::*;
pub use continuous::*;
pub use filter::*;
pub use session::SessionColor;
pub use snapshot::*;
