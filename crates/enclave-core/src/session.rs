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

//! Session core: the eval algorithm, tying together the
//! output buffer, tracking allocator, deadline monitor, tool registry and
//! trampoline around a single persistent [`SteelEngine`].
//!
//! The per-instruction hook installed during `eval` serves two purposes at
//! once: the wall-clock deadline check, and a cooperative sample
//! of the tracking allocator's `exceeded` flag (see `alloc`'s module doc
//! for why memory enforcement has to be cooperative here rather than a
//! hard allocator rejection). Both are sampled from the same hook so a
//! session with only a memory limit and no timeout still gets the hook
//! installed. The hook itself is called on (approximately) every
//! instruction; the actual clock read is gated to every `STRIDE`
//! instructions via `deadline::should_sample`, for the stated
//! reason for striding at all (keeping `Instant::now()` off the hot path).

use std::alloc::System;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use crate::alloc::TrackingAllocator;
use crate::deadline::{should_sample, DeadlineMonitor};
use crate::engine::{RunOutcome, ScriptEngine, SteelEngine};
use crate::output::OutputBuffer;
use crate::registry::{TooManyFunctions, ToolRegistry};
use crate::result::{ErrorKind, EvalResult};
use crate::trampoline::{HostCallback, Trampoline};

/// Message used for the timeout error kind.
const TIMEOUT_MESSAGE: &str = "execution timeout exceeded";

/// Message used for the memory-limit error kind. Used both when the limit
/// is caught at a progress-hook instruction boundary (an interpreter
/// exception is raised there and its own inspect text is available) and
/// when it's only detected after a successful `run` that happened to
/// complete without ever hitting an instruction boundary — the latter case
/// has no interpreter exception text to report, so the message is fixed.
const MEMORY_LIMIT_MESSAGE: &str = "memory limit exceeded";

/// Raised by any session operation other than `close`/`is_closed` once the
/// session has been closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosedSession;

impl fmt::Display for ClosedSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation attempted on a closed session")
    }
}

impl std::error::Error for ClosedSession {}

/// A persistent, isolated script-interpreter instance.
///
/// Owns everything the interpreter touches exclusively: the engine, output
/// buffer, allocator activation, deadline monitor, registered-name list,
/// limits and trampoline. A `Session` is not `Send`/`Sync` — it is built on
/// `Rc`/`RefCell` throughout, matching a single-threaded-per-session model;
/// callers sharing one across threads must serialize externally, same as
/// the source this is modeled on.
pub struct Session {
    engine: Option<SteelEngine>,
    output: OutputBuffer,
    registry: ToolRegistry,
    trampoline: Trampoline,
    allocator: &'static TrackingAllocator<System>,
    deadline: Rc<RefCell<DeadlineMonitor>>,
    timeout: Option<Duration>,
    memory_limit: usize,
    closed: bool,
}

impl Session {
    /// `timeout` of `None` and `memory_limit` of `0` both mean unlimited.
    /// The allocator starts armed-but-unlimited so every allocation the
    /// engine makes during construction bears a size header.
    pub fn new(
        allocator: &'static TrackingAllocator<System>,
        timeout: Option<Duration>,
        memory_limit: usize,
    ) -> Self {
        allocator.arm(0);
        let output = OutputBuffer::new();
        let mut engine = SteelEngine::new(output.clone());
        engine.reset_last_result();
        Session {
            engine: Some(engine),
            output,
            registry: ToolRegistry::new(),
            trampoline: Trampoline::new(),
            allocator,
            deadline: Rc::new(RefCell::new(DeadlineMonitor::new())),
            timeout,
            memory_limit,
            closed: false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Idempotent. Drops the engine and output buffer; every
    /// later operation except `close`/`is_closed` fails with
    /// [`ClosedSession`].
    pub fn close(&mut self) {
        self.closed = true;
        self.engine = None;
    }

    pub fn set_callback(&mut self, callback: HostCallback) -> Result<(), ClosedSession> {
        self.ensure_open()?;
        self.trampoline.set_callback(callback);
        Ok(())
    }

    /// Adds a sandbox-visible function named `name`, persisting it across
    /// future resets. Idempotent for an already-registered name.
    pub fn define_function(&mut self, name: &str) -> Result<(), DefineFunctionError> {
        self.ensure_open().map_err(DefineFunctionError::Closed)?;
        self.registry
            .register(name)
            .map_err(DefineFunctionError::TooManyFunctions)?;
        self.engine
            .as_mut()
            .expect("open session always has an engine")
            .define_function(name, self.trampoline.clone());
        Ok(())
    }

    /// Destroys and rebuilds the interpreter in place.
    /// Preserves limits, the callback and the registered-name list;
    /// everything the user defined in prior evals is gone.
    pub fn reset(&mut self) -> Result<(), ClosedSession> {
        self.ensure_open()?;
        self.output.reset();
        self.deadline.borrow_mut().disarm();

        let mut engine = SteelEngine::new(self.output.clone());
        for name in self.registry.names().to_vec() {
            engine.define_function(&name, self.trampoline.clone());
        }
        engine.reset_last_result();
        self.engine = Some(engine);
        Ok(())
    }

    /// Runs `code` against the persistent interpreter. Never fails with a
    /// host-language error of its own — every sandbox-originating outcome,
    /// success or failure, comes back as an [`EvalResult`].
    pub fn eval(&mut self, code: &str) -> Result<EvalResult, ClosedSession> {
        self.ensure_open()?;
        let engine = self
            .engine
            .as_mut()
            .expect("open session always has an engine");

        self.output.reset();
        self.allocator.arm(self.memory_limit);
        self.allocator.clear_exceeded();
        self.deadline.borrow_mut().arm(self.timeout);

        let hook_needed = self.deadline.borrow().is_armed() || self.memory_limit > 0;
        if hook_needed {
            let deadline = Rc::clone(&self.deadline);
            let allocator = self.allocator;
            let hook: Box<dyn FnMut(u64) -> bool> = Box::new(move |instructions_run| {
                if !should_sample(instructions_run) {
                    return true;
                }
                let time_ok = deadline.borrow_mut().poll();
                let mem_ok = !allocator.exceeded();
                time_ok && mem_ok
            });
            engine.set_progress_hook(Some(hook));
        }

        let outcome = engine.run(code);

        engine.set_progress_hook(None);
        self.allocator.disarm();
        let output = self.output.snapshot();

        let result = match outcome {
            RunOutcome::Value(inspected) => {
                if self.deadline.borrow().expired() {
                    EvalResult::failure(ErrorKind::Timeout, TIMEOUT_MESSAGE.to_string(), output)
                } else if self.allocator.exceeded() {
                    EvalResult::failure(
                        ErrorKind::MemoryLimit,
                        MEMORY_LIMIT_MESSAGE.to_string(),
                        output,
                    )
                } else {
                    EvalResult::success(inspected, output)
                }
            }
            RunOutcome::Exception(message) => {
                let kind = if self.deadline.borrow().expired() {
                    ErrorKind::Timeout
                } else if self.allocator.exceeded() {
                    ErrorKind::MemoryLimit
                } else {
                    ErrorKind::Runtime
                };
                let message = match kind {
                    ErrorKind::Timeout => TIMEOUT_MESSAGE.to_string(),
                    ErrorKind::MemoryLimit => MEMORY_LIMIT_MESSAGE.to_string(),
                    ErrorKind::Runtime | ErrorKind::None => message,
                };
                EvalResult::failure(kind, message, output)
            }
        };
        Ok(result)
    }

    fn ensure_open(&self) -> Result<(), ClosedSession> {
        if self.closed {
            Err(ClosedSession)
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefineFunctionError {
    Closed(ClosedSession),
    TooManyFunctions(TooManyFunctions),
}

impl fmt::Display for DefineFunctionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefineFunctionError::Closed(e) => write!(f, "{e}"),
            DefineFunctionError::TooManyFunctions(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DefineFunctionError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::sync::Arc;

    fn new_session() -> Session {
        Session::new(&crate::ALLOCATOR, None, 0)
    }

    #[test]
    fn basic_arithmetic_round_trips() {
        let mut session = new_session();
        let result = session.eval("(+ 1 1)").unwrap();
        assert_eq!(result.value.as_deref(), Some("2"));
        assert!(!result.is_error());
    }

    #[test]
    fn locals_persist_across_evals() {
        let mut session = new_session();
        session.eval("(define x 42)").unwrap();
        let result = session.eval("(* x 2)").unwrap();
        assert_eq!(result.value.as_deref(), Some("84"));
    }

    #[test]
    fn output_is_truncated_at_the_start_of_each_eval() {
        let mut session = new_session();
        session.eval(r#"(displayln "first")"#).unwrap();
        let second = session.eval(r#"(displayln "second")"#).unwrap();
        assert_eq!(second.output, "second\n");
    }

    #[test]
    fn reset_undefines_user_locals_but_keeps_tool_functions() {
        let mut session = new_session();
        session
            .set_callback(Arc::new(|_, args| match args.as_slice() {
                [Value::Int(n)] => Ok(Value::Int(n * 2)),
                _ => Err("bad args".to_string()),
            }))
            .unwrap();
        session.define_function("double").unwrap();

        session.eval("(define x 1)").unwrap();
        session.reset().unwrap();

        let forgot_x = session.eval("(* x 2)").unwrap();
        assert!(forgot_x.is_error());

        let still_has_double = session.eval("(double (list 21))").unwrap();
        assert_eq!(still_has_double.value.as_deref(), Some("42"));
    }

    #[test]
    fn close_is_idempotent_and_blocks_further_use() {
        let mut session = new_session();
        session.close();
        session.close();
        assert!(session.is_closed());
        assert_eq!(session.eval("1").unwrap_err(), ClosedSession);
        assert_eq!(session.reset().unwrap_err(), ClosedSession);
    }

    #[test]
    fn tool_call_round_trips_through_the_trampoline() {
        let mut session = new_session();
        session
            .set_callback(Arc::new(|method, args| match (method, args.as_slice()) {
                ("double", [Value::Int(n)]) => Ok(Value::Int(n * 2)),
                _ => Err("unexpected call".to_string()),
            }))
            .unwrap();
        session.define_function("double").unwrap();

        let result = session.eval("(double (list (double (list 5))))").unwrap();
        assert_eq!(result.value.as_deref(), Some("20"));
    }

    #[test]
    fn memory_limit_failure_leaves_the_session_usable() {
        let mut session = Session::new(&crate::ALLOCATOR, None, 1024);
        let blown = session.eval(r#"(make-list 10000000 0)"#).unwrap();
        assert_eq!(blown.kind, ErrorKind::MemoryLimit);

        let still_alive = session.eval("(+ 1 1)").unwrap();
        assert_eq!(still_alive.value.as_deref(), Some("2"));
    }
}
