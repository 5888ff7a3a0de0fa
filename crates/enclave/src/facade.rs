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

//! Host-side facade: the type a host actually holds onto.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use enclave_core::{ErrorKind, EvalResult, Session, ALLOCATOR};

use crate::error::SandboxError;
use crate::tool::{combined_callback, ToolModule};

static DEFAULT_TIMEOUT_MILLIS: AtomicU64 = AtomicU64::new(0);
static DEFAULT_MEMORY_LIMIT_BYTES: AtomicU64 = AtomicU64::new(0);

/// Process-wide default timeout for sandboxes constructed without one
/// (`set_default_timeout`). `None` means unlimited.
pub fn set_default_timeout(timeout: Option<Duration>) {
    DEFAULT_TIMEOUT_MILLIS.store(
        timeout.map(|d| d.as_millis() as u64).unwrap_or(0),
        Ordering::Relaxed,
    );
}

/// Process-wide default memory limit for sandboxes constructed without
/// one (`set_default_memory_limit`). `0`/`None` means unlimited.
pub fn set_default_memory_limit(limit_bytes: Option<u64>) {
    DEFAULT_MEMORY_LIMIT_BYTES.store(limit_bytes.unwrap_or(0), Ordering::Relaxed);
}

fn default_timeout() -> Option<Duration> {
    match DEFAULT_TIMEOUT_MILLIS.load(Ordering::Relaxed) {
        0 => None,
        ms => Some(Duration::from_millis(ms)),
    }
}

fn default_memory_limit() -> usize {
    DEFAULT_MEMORY_LIMIT_BYTES.load(Ordering::Relaxed) as usize
}

/// The object a host holds onto: a session plus the bookkeeping the facade
/// (rather than the core) owns — the exposed tool modules and the
/// effective limits.
pub struct Sandbox {
    session: Session,
    modules: Mutex<Vec<Arc<dyn ToolModule>>>,
    timeout: Option<Duration>,
    memory_limit: usize,
}

impl Sandbox {
    /// `timeout`/`memory_limit` of `None` fall back to the process-wide
    /// defaults set via [`set_default_timeout`]/[`set_default_memory_limit`],
    /// which themselves default to unlimited. `memory_limit` of `Some(0)`
    /// is also treated as unlimited, the same as `None` — zero bytes is not
    /// a usable cap, so the core's "0 means unlimited" convention applies
    /// to an explicit zero too, not just an absent limit.
    pub fn new<M: ToolModule + 'static>(
        tools: Option<M>,
        timeout: Option<Duration>,
        memory_limit: Option<u64>,
    ) -> Self {
        let timeout = timeout.or_else(default_timeout);
        let memory_limit = memory_limit.map(|b| b as usize).unwrap_or_else(default_memory_limit);

        let mut sandbox = Sandbox {
            session: Session::new(&ALLOCATOR, timeout, memory_limit),
            modules: Mutex::new(Vec::new()),
            timeout,
            memory_limit,
        };
        if let Some(tools) = tools {
            sandbox
                .expose(tools)
                .expect("a freshly constructed sandbox cannot already be closed or full");
        }
        sandbox
    }

    pub fn effective_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn effective_memory_limit(&self) -> Option<u64> {
        (self.memory_limit != 0).then_some(self.memory_limit as u64)
    }

    /// Evaluate `code`. The resource-limit error kinds are re-raised as
    /// typed [`SandboxError`]s; every other outcome, success or
    /// sandbox-side failure, comes back as the `EvalResult` directly.
    pub fn eval(&mut self, code: &str) -> Result<EvalResult, SandboxError> {
        let result = self.session.eval(code)?;
        match result.kind {
            ErrorKind::Timeout => Err(SandboxError::Timeout),
            ErrorKind::MemoryLimit => Err(SandboxError::MemoryLimit),
            ErrorKind::None | ErrorKind::Runtime => Ok(result),
        }
    }

    pub fn reset(&mut self) -> Result<(), SandboxError> {
        Ok(self.session.reset()?)
    }

    pub fn close(&mut self) {
        self.session.close();
    }

    pub fn is_closed(&self) -> bool {
        self.session.is_closed()
    }

    /// Adds another tool module's functions to this session, re-combining
    /// the dispatcher over every module exposed so far.
    pub fn expose<M: ToolModule + 'static>(&mut self, module: M) -> Result<(), SandboxError> {
        let module: Arc<dyn ToolModule> = Arc::new(module);
        let names = module.function_names();

        let mut modules = self.modules.lock().expect("tool module list poisoned");
        modules.push(module);
        self.session.set_callback(combined_callback(modules.clone()))?;
        drop(modules);

        for name in names {
            self.session.define_function(&name)?;
        }
        Ok(())
    }

    /// Run `body` against a freshly constructed sandbox, guaranteeing
    /// `close` on the way out regardless of how `body` returns.
    pub fn with_open<M: ToolModule + 'static, T>(
        tools: Option<M>,
        timeout: Option<Duration>,
        memory_limit: Option<u64>,
        body: impl FnOnce(&mut Sandbox) -> T,
    ) -> T {
        let mut sandbox = Sandbox::new(tools, timeout, memory_limit);
        let result = body(&mut sandbox);
        sandbox.close();
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::FnModule;
    use enclave_core::Value;

    #[test]
    fn eval_round_trips_a_tool_call() {
        let tools = FnModule::new().with_fn("double", |args| match args.as_slice() {
            [Value::Int(n)] => Ok(Value::Int(n * 2)),
            _ => Err("expected one int".to_string()),
        });
        let mut sandbox = Sandbox::new(Some(tools), None, None);

        let result = sandbox.eval("(double (list 21))").unwrap();
        assert_eq!(result.value.as_deref(), Some("42"));
    }

    #[test]
    fn plain_eval_renders_a_success_result() {
        let mut sandbox = Sandbox::new(None::<FnModule>, None, None);
        let result = sandbox.eval("(+ 1 1)").unwrap();
        assert_eq!(result.to_display_string(), "=> 2");
    }

    #[test]
    fn with_open_closes_even_if_body_does_not() {
        let closed = Sandbox::with_open(None::<FnModule>, None, None, |sandbox| {
            sandbox.eval("(+ 1 1)").unwrap();
            sandbox.is_closed()
        });
        assert!(!closed);
    }

    #[test]
    fn timeout_is_reraised_as_a_typed_error() {
        let mut sandbox =
            Sandbox::new(None::<FnModule>, Some(Duration::from_millis(100)), None);
        let err = sandbox
            .eval("(define (spin) (spin)) (spin)")
            .unwrap_err();
        assert!(matches!(err, SandboxError::Timeout));
    }

    #[test]
    fn expose_after_construction_adds_another_module() {
        let mut sandbox = Sandbox::new(None::<FnModule>, None, None);
        sandbox
            .expose(FnModule::new().with_fn("triple", |args| match args.as_slice() {
                [Value::Int(n)] => Ok(Value::Int(n * 3)),
                _ => Err("expected one int".to_string()),
            }))
            .unwrap();

        let result = sandbox.eval("(triple (list 10))").unwrap();
        assert_eq!(result.value.as_deref(), Some("30"));
    }
}
