// Copyright 2021-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use super::{ProfileSnapshot, ProfilerBackend};

/// Which of the two alternating sessions a label refers to.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum SessionColor {
    #[default]
    A,
    B,
}

impl SessionColor {
    pub fn label(self) -> &'static str {
        match self {
            Self::A => "loop-monitor-a",
            Self::B => "loop-monitor-b",
        }
    }

    pub fn other(self) -> Self {
        match self {
            Self::A => Self::B,
            Self::B => Self::A,
        }
    }
}

/// Tracks the color of the session currently collecting samples.
///
/// The only way to change the active color is [`SessionHandoff::handoff`],
/// which opens the next session before closing the current one. The backend
/// therefore never sees zero running sessions between the two calls and
/// keeps its sampler thread alive.
#[derive(Debug, Default)]
pub(crate) struct SessionHandoff {
    active: SessionColor,
}

impl SessionHandoff {
    pub fn active(&self) -> SessionColor {
        self.active
    }

    pub fn open<B: ProfilerBackend + ?Sized>(&self, backend: &mut B) {
        backend.start_session(self.active.label());
    }

    pub fn close<B: ProfilerBackend + ?Sized>(&self, backend: &mut B) -> Option<ProfileSnapshot> {
        backend.stop_session(self.active.label())
    }

    /// Starts the other color, then stops and returns the previous one.
    pub fn handoff<B: ProfilerBackend + ?Sized>(
        &mut self,
        backend: &mut B,
    ) -> Option<ProfileSnapshot> {
        let next = self.active.other();
        backend.start_session(next.label());
        let previous = std::mem::replace(&mut self.active, next);
        backend.stop_session(previous.label())
    }
}
