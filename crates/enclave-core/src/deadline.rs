// Copyright (C) 2026 The Enclave Authors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

//! Deadline monitor: a monotonic-clock deadline plus an expired
//! flag, consulted from inside the interpreter's instruction-dispatch loop
//! every `STRIDE` instructions rather than on every single one, to keep the
//! `Instant::now()` syscall off the hot path.
//!
//! Cancellation here is strictly cooperative — there is no native-thread
//! preemption. The interpreter can only be stopped at an
//! instruction boundary, when its own progress hook calls back into us.

use std::time::{Duration, Instant};

/// How many interpreter instructions elapse between clock reads.
pub const STRIDE: u64 = 1024;

pub struct DeadlineMonitor {
    deadline: Option<Instant>,
    expired: bool,
}

impl DeadlineMonitor {
    pub fn new() -> Self {
        DeadlineMonitor {
            deadline: None,
            expired: false,
        }
    }

    /// Arm the monitor for `timeout`. `None` (or a non-positive duration)
    /// disarms it — the hook should not be installed at all in that case.
    pub fn arm(&mut self, timeout: Option<Duration>) {
        self.expired = false;
        self.deadline = match timeout {
            Some(d) if d > Duration::ZERO => Some(Instant::now() + d),
            _ => None,
        };
    }

    pub fn disarm(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn expired(&self) -> bool {
        self.expired
    }

    /// Checks the clock unconditionally. Callers should gate calls to this
    /// to every [`STRIDE`] instructions (see [`should_sample`]) rather than
    /// calling it from every progress-hook invocation, to keep the
    /// `Instant::now()` syscall off the hot path.
    pub fn poll(&mut self) -> bool {
        match self.deadline {
            None => true,
            Some(deadline) => {
                if Instant::now() >= deadline {
                    self.expired = true;
                    false
                } else {
                    true
                }
            }
        }
    }
}

impl Default for DeadlineMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `instructions_run` lands on a `STRIDE` boundary, i.e. whether the
/// progress hook should actually read the clock / allocator this call rather
/// than just returning "keep going".
pub fn should_sample(instructions_run: u64) -> bool {
    instructions_run % STRIDE == 0
}
