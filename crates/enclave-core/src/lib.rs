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

//! Sandbox runtime core.
//!
//! A persistent, embedded-interpreter session that a host process can
//! `eval` strings against, with a bounded set of host-registered callable
//! functions, a wall-clock deadline, and a heap-bytes ceiling. Everything
//! a host needs to build a friendlier facade on top (construction
//! defaults, a scoped-use helper, a typed error hierarchy) lives in the
//! `enclave` crate; this crate is the part that actually owns the
//! interpreter.

pub mod alloc;
pub mod deadline;
pub mod engine;
pub mod output;
pub mod registry;
pub mod result;
pub mod session;
pub mod trampoline;
pub mod value;

pub use engine::{RunOutcome, ScriptEngine, SteelEngine};
pub use output::OutputBuffer;
pub use registry::{ToolRegistry, TooManyFunctions, MAX_FUNCTIONS};
pub use result::{ErrorKind, EvalResult};
pub use session::{ClosedSession, DefineFunctionError, Session};
pub use trampoline::{HostCallback, Trampoline};
pub use value::{ConversionError, Value, ValueMap};

/// The process-wide global allocator. Every allocation
/// made anywhere in the process — not just inside a session's interpreter
/// — passes through this shim, which is what lets the accounting header
/// be present unconditionally; a session only ever `arm`s/`disarm`s the
/// *limit*, never the instrumentation itself.
#[global_allocator]
pub static ALLOCATOR: alloc::TrackingAllocator<std::alloc::System> =
    alloc::TrackingAllocator::system();
