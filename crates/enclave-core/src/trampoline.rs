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

//! Trampoline: every registered tool name dispatches to this
//! single callback. It resolves the method name, hands marshalled
//! arguments to the host callback, and marshals the result (or error) back.
//!
//! Marshalling argument/return values in and out of the concrete embedded
//! interpreter is the `engine` module's job (it owns the sandbox-language
//! value type); this module is deliberately engine-agnostic so the contract
//! the trampoline's contract reads the same regardless of which `ScriptEngine` is
//! plugged in.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::value::Value;

/// The host dispatcher signature: `(method_name, args[],
/// userdata) -> (value, error?)`. `userdata` is folded into whatever the
/// closure captures, which is the idiomatic Rust equivalent of a `void*`.
pub type HostCallback = Arc<dyn Fn(&str, Vec<Value>) -> Result<Value, String> + Send + Sync>;

/// Every interpreter-side closure registered via `define_function` holds a
/// clone of the `Trampoline` that registered it, and those clones can
/// outlive the `set_callback` call that supplies the dispatcher (a session
/// may register tool names before `set_callback` is ever called, or
/// re-register them across a `reset`). The callback cell is therefore
/// shared (`Rc<RefCell<_>>`, single-threaded like the rest of a session)
/// rather than copied per clone, so every registered closure and the
/// session agree on the current callback.
#[derive(Clone, Default)]
pub struct Trampoline {
    callback: Rc<RefCell<Option<HostCallback>>>,
}

impl Trampoline {
    pub fn new() -> Self {
        Trampoline {
            callback: Rc::new(RefCell::new(None)),
        }
    }

    pub fn set_callback(&self, callback: HostCallback) {
        *self.callback.borrow_mut() = Some(callback);
    }

    pub fn has_callback(&self) -> bool {
        self.callback.borrow().is_some()
    }

    /// Dispatch a sandbox-side call to `method` with already-marshalled
    /// `args`. Returns the host error string verbatim on failure (spec
    /// §4.4 step 4); the caller is responsible for raising it as a runtime
    /// error inside the interpreter.
    pub fn dispatch(&self, method: &str, args: Vec<Value>) -> Result<Value, String> {
        match self.callback.borrow().as_ref() {
            Some(cb) => cb(method, args),
            None => Err(format!(
                "no host callback registered; tool call to `{method}` cannot be dispatched"
            )),
        }
    }
}
