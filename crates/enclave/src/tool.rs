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

//! Tool exposure.
//!
//! Spec describes `expose(obj)` introspecting a host object's public
//! methods at runtime — workable in a language with method reflection,
//! not in Rust. The equivalent here is a trait a host type implements
//! once: [`ToolModule`] names its own functions and dispatches calls to
//! itself, which is exactly what the Ruby-side reflection would have
//! produced, just written down instead of discovered.
//!
//! [`FnModule`] is the "module of free functions" half of `expose`, for
//! the common case where the host doesn't want to define a whole type just
//! to offer a handful of named closures.

use std::collections::HashMap;
use std::sync::Arc;

use enclave_core::Value;

/// A host-side bundle of sandbox-callable functions. One `Sandbox` may
/// have several modules exposed at once; names must not collide across modules registered
/// on the same session, since the registry below can't tell which module
/// a duplicate name came from.
pub trait ToolModule: Send + Sync {
    /// Names this module wants registered as sandbox-visible functions.
    fn function_names(&self) -> Vec<String>;

    /// Dispatch a call to one of this module's functions.
    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, String>;
}

type BoxedFn = Box<dyn Fn(Vec<Value>) -> Result<Value, String> + Send + Sync>;

/// A [`ToolModule`] built from a list of `(name, closure)` pairs — the
/// facade-level equivalent of exposing "a module of free functions"
/// without defining a dedicated type.
#[derive(Default)]
pub struct FnModule {
    functions: HashMap<String, BoxedFn>,
}

impl FnModule {
    pub fn new() -> Self {
        FnModule {
            functions: HashMap::new(),
        }
    }

    /// Register `name` as a function calling `f` with the marshalled
    /// argument vector.
    pub fn with_fn(
        mut self,
        name: impl Into<String>,
        f: impl Fn(Vec<Value>) -> Result<Value, String> + Send + Sync + 'static,
    ) -> Self {
        self.functions.insert(name.into(), Box::new(f));
        self
    }
}

impl ToolModule for FnModule {
    fn function_names(&self) -> Vec<String> {
        self.functions.keys().cloned().collect()
    }

    fn call(&self, method: &str, args: Vec<Value>) -> Result<Value, String> {
        match self.functions.get(method) {
            Some(f) => f(args),
            None => Err(format!("no such tool function: {method}")),
        }
    }
}

/// Builds the single combined dispatcher a `Session` needs from the full
/// set of modules exposed so far, routing each call to whichever module
/// claims the method name.
pub(crate) fn combined_callback(
    modules: Vec<Arc<dyn ToolModule>>,
) -> enclave_core::HostCallback {
    Arc::new(move |method, args| {
        for module in &modules {
            if module.function_names().iter().any(|n| n == method) {
                return module.call(method, args);
            }
        }
        Err(format!("no tool module exposes `{method}`"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fn_module_dispatches_by_name() {
        let module = FnModule::new().with_fn("double", |args| match args.as_slice() {
            [Value::Int(n)] => Ok(Value::Int(n * 2)),
            _ => Err("expected one int".to_string()),
        });
        assert_eq!(module.call("double", vec![Value::Int(21)]), Ok(Value::Int(42)));
    }

    #[test]
    fn fn_module_reports_unknown_functions() {
        let module = FnModule::new();
        assert!(module.call("missing", vec![]).is_err());
    }

    #[test]
    fn combined_callback_routes_to_the_owning_module() {
        let a: Arc<dyn ToolModule> =
            Arc::new(FnModule::new().with_fn("a_fn", |_| Ok(Value::Int(1))));
        let b: Arc<dyn ToolModule> =
            Arc::new(FnModule::new().with_fn("b_fn", |_| Ok(Value::Int(2))));

        let dispatch = combined_callback(vec![a, b]);
        assert_eq!(dispatch("b_fn", vec![]), Ok(Value::Int(2)));
        assert!(dispatch("unknown", vec![]).is_err());
    }
}
