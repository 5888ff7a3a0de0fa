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

//! The embedded script interpreter boundary.
//!
//! The concrete interpreter is treated as an external, swappable
//! dependency described only at its contract: parse, compile, run, inspect,
//! raise an exception, and two hook points (an allocator hook and a
//! per-instruction hook). [`ScriptEngine`] is that contract as a Rust
//! trait; [`SteelEngine`] is the one implementation this crate ships,
//! backed by `steel-core`. A different embedded language is a different
//! `ScriptEngine` impl — the rest of `enclave-core` never names
//! `steel-core` directly.
//!
//! `steel-core` is an interpreter already suited to embedding Steel/Scheme
//! in-process, which is why it's the natural pick here.

use steel::rvals::SteelVal;
use steel::steel_vm::engine::Engine;
use steel::SteelErr;

use crate::output::OutputBuffer;
use crate::trampoline::Trampoline;
use crate::value::{ConversionError, Value, ValueMap};

/// Outcome of a single `run` on the interpreter: either the last value
/// produced (as its inspect form, and as `()`  if the script produced no
/// value) or a pending interpreter exception, inspected to a message.
pub enum RunOutcome {
    Value(Option<String>),
    Exception(String),
}

/// The contract the embedded interpreter must satisfy. Everything
/// above this trait (session, registry, trampoline, allocator, deadline)
/// is interpreter-agnostic.
pub trait ScriptEngine {
    /// Parse, compile and run `source` against the persistent top-level
    /// environment, returning the last value's inspect form on success or
    /// the pending exception's inspect form on failure. On success, also
    /// binds the sandbox-visible `_` to the actual last value (not just its
    /// inspect string), so a later eval can keep computing with it.
    fn run(&mut self, source: &str) -> RunOutcome;

    /// Bind the sandbox-visible `_` to unit. Used on session construction
    /// and reset, where there is no previous value to carry forward.
    fn reset_last_result(&mut self);

    /// Register `name` as a sandbox-callable function that routes through
    /// `trampoline` on every call, passing its own name as the method.
    fn define_function(&mut self, name: &str, trampoline: Trampoline);

    /// Install (or remove, with `None`) the per-instruction resource check.
    /// `hook` is called on (approximately) every interpreter instruction
    /// with the cumulative instruction count, and should return `true` to
    /// keep running, `false` to stop at that instruction boundary. Session
    /// owns what the closure actually samples (deadline, allocator, or
    /// both — see `session` module doc) and gates its own clock reads to
    /// every `STRIDE` instructions.
    fn set_progress_hook(&mut self, hook: Option<Box<dyn FnMut(u64) -> bool>>);
}

/// `steel-core`-backed [`ScriptEngine`]. Owns a persistent [`Engine`], so
/// top-level defines, method definitions and locals survive across `run`
/// calls the same way a REPL's global environment does — this is exactly
/// persistence across evals for free, from Steel's own design.
pub struct SteelEngine {
    vm: Engine,
    output: OutputBuffer,
}

/// Sandbox-facing calling convention for tool functions: because arity
/// varies per tool and `steel-core`'s native-function registration is
/// arity-typed, every trampoline-backed function takes exactly one
/// argument — a Steel list of the real arguments — so sandbox code calls
/// `(double (list 21))` rather than `(double 21)`. Documented here because
/// it's the one place `enclave-core` asks something of the sandboxed
/// script author that a hypothetical `double(21)` call syntax
/// doesn't show directly (see DESIGN.md).
fn unpack_call_args(arg: SteelVal) -> Result<Vec<Value>, SteelErr> {
    match steel_to_value(&arg)? {
        Value::List(items) => Ok(items),
        other => Ok(vec![other]),
    }
}

impl SteelEngine {
    pub fn new(output: OutputBuffer) -> Self {
        let mut vm = Engine::new();
        install_print_overrides(&mut vm, output.clone());
        SteelEngine { vm, output }
    }

    pub fn output(&self) -> &OutputBuffer {
        &self.output
    }
}

impl ScriptEngine for SteelEngine {
    fn run(&mut self, source: &str) -> RunOutcome {
        match self.vm.run(source) {
            Ok(values) => {
                let last = values.last().cloned().unwrap_or(SteelVal::Void);
                let inspected = steel_inspect(&last);
                self.vm.register_value("_", last);
                RunOutcome::Value(Some(inspected))
            }
            Err(err) => RunOutcome::Exception(format!("{err}")),
        }
    }

    fn reset_last_result(&mut self) {
        self.vm.register_value("_", SteelVal::Void);
    }

    fn define_function(&mut self, name: &str, trampoline: Trampoline) {
        let method = name.to_string();
        self.vm.register_fn(name, move |arg: SteelVal| -> Result<SteelVal, SteelErr> {
            let args = unpack_call_args(arg)?;
            match trampoline.dispatch(&method, args) {
                Ok(value) => value_to_steel(&value),
                Err(message) => Err(SteelErr::new(
                    steel::rerrs::ErrorKind::Generic,
                    message,
                )),
            }
        });
    }

    fn set_progress_hook(&mut self, hook: Option<Box<dyn FnMut(u64) -> bool>>) {
        match hook {
            Some(mut hook) => {
                self.vm.on_progress(move |instructions_run| hook(instructions_run));
            }
            None => self.vm.clear_progress_hook(),
        }
    }
}

/// Override `display`, `displayln` and a `p`-style inspecting print so the
/// interpreter's print-family primitives write into the session's output
/// buffer instead of the process's real stdout.
fn install_print_overrides(vm: &mut Engine, output: OutputBuffer) {
    let out = output.clone();
    vm.register_fn("display", move |v: SteelVal| {
        out.write_str(&steel_display(&v));
        SteelVal::Void
    });

    let out = output.clone();
    vm.register_fn("displayln", move |v: SteelVal| {
        out.write_line(&steel_display(&v));
        SteelVal::Void
    });

    let out = output;
    vm.register_fn("p", move |v: SteelVal| {
        out.write_line(&steel_inspect(&v));
        v
    });
}

fn steel_display(v: &SteelVal) -> String {
    match v {
        SteelVal::StringV(s) => s.to_string(),
        other => steel_inspect(other),
    }
}

fn steel_inspect(v: &SteelVal) -> String {
    format!("{v}")
}

/// Convert a sandbox-side `SteelVal` into the marshal lattice.
///
/// Mappings are not carried as Steel's native hash map: that type (like
/// most persistent hash maps) makes no insertion-order guarantee, and spec
/// §4.5 requires mappings to round-trip in insertion order. Instead a
/// `Value::Map` marshals out as a Steel vector of two-element lists,
/// `#((k1 v1) (k2 v2) ...)` — a vector's index order is exactly insertion
/// order. Coming back, a vector where every element is a two-element list
/// is read as a map; anything else (including a vector built directly by
/// script code with `vector`) degrades to a plain `Value::List` rather
/// than erroring, since the lattice has no vector/list distinction to
/// preserve there anyway.
pub fn steel_to_value(v: &SteelVal) -> Result<Value, SteelErr> {
    let value = match v {
        SteelVal::Void => Value::Unit,
        SteelVal::BoolV(b) => Value::Bool(*b),
        SteelVal::IntV(i) => Value::Int(*i as i64),
        SteelVal::NumV(f) => Value::Float(*f),
        SteelVal::StringV(s) => Value::string(s.to_string()),
        SteelVal::SymbolV(s) => Value::string(s.to_string()),
        SteelVal::CharV(c) => Value::string(c.to_string()),
        SteelVal::ListV(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items.iter() {
                out.push(steel_to_value(item)?);
            }
            Value::List(out)
        }
        SteelVal::VectorV(items) => {
            if let Some(map) = try_read_as_map(items)? {
                Value::Map(map)
            } else {
                let mut out = Vec::with_capacity(items.len());
                for item in items.iter() {
                    out.push(steel_to_value(item)?);
                }
                Value::List(out)
            }
        }
        other => {
            return Err(SteelErr::new(
                steel::rerrs::ErrorKind::ConversionError,
                ConversionError::new(steel_type_name(other)).message(),
            ));
        }
    };
    Ok(value)
}

fn try_read_as_map(items: &[SteelVal]) -> Result<Option<ValueMap>, SteelErr> {
    let mut map = ValueMap::new();
    for item in items {
        let SteelVal::ListV(pair) = item else {
            return Ok(None);
        };
        let pair: Vec<&SteelVal> = pair.iter().collect();
        let [key, val] = pair.as_slice() else {
            return Ok(None);
        };
        map.insert(steel_to_value(key)?, steel_to_value(val)?);
    }
    Ok(Some(map))
}

/// Convert a lattice value into a sandbox-side `SteelVal`. See
/// [`steel_to_value`] for why maps go out as a vector of pairs.
pub fn value_to_steel(v: &Value) -> Result<SteelVal, SteelErr> {
    let value = match v {
        Value::Unit => SteelVal::Void,
        Value::Bool(b) => SteelVal::BoolV(*b),
        Value::Int(i) => SteelVal::IntV(*i as isize),
        Value::Float(f) => SteelVal::NumV(*f),
        Value::Bytes(b) => SteelVal::StringV(String::from_utf8_lossy(b).into_owned().into()),
        Value::List(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(value_to_steel(item)?);
            }
            SteelVal::ListV(out.into())
        }
        Value::Map(map) => {
            let mut pairs = Vec::with_capacity(map.len());
            for (k, val) in map.iter() {
                let pair = vec![value_to_steel(k)?, value_to_steel(val)?];
                pairs.push(SteelVal::ListV(pair.into()));
            }
            SteelVal::VectorV(pairs.into())
        }
    };
    Ok(value)
}

fn steel_type_name(v: &SteelVal) -> String {
    match v {
        SteelVal::FuncV(_) | SteelVal::BoxedFunction(_) | SteelVal::Closure(_) => {
            "Procedure".to_string()
        }
        SteelVal::Custom(c) => c.borrow().name().to_string(),
        other => format!("{other:?}")
            .split('(')
            .next()
            .unwrap_or("Unknown")
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_scalars_through_the_lattice() {
        for value in [
            Value::Unit,
            Value::Bool(true),
            Value::Int(-42),
            Value::Float(1.5),
            Value::string("hello"),
        ] {
            let steel = value_to_steel(&value).unwrap();
            let back = steel_to_value(&steel).unwrap();
            assert_eq!(value, back);
        }
    }

    #[test]
    fn round_trips_a_nested_list() {
        let value = Value::List(vec![Value::Int(1), Value::string("two"), Value::Bool(false)]);
        let steel = value_to_steel(&value).unwrap();
        let back = steel_to_value(&steel).unwrap();
        assert_eq!(value, back);
    }

    #[test]
    fn round_trips_a_map_preserving_order() {
        let mut map = ValueMap::new();
        map.insert(Value::string("a"), Value::Int(1));
        map.insert(Value::string("b"), Value::Int(2));
        let value = Value::Map(map);

        let steel = value_to_steel(&value).unwrap();
        let back = steel_to_value(&steel).unwrap();
        assert_eq!(value, back);
    }
}
