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

//! Host-facing facade over [`enclave_core`].
//!
//! This is the crate a host application actually depends on: a
//! constructor with class-level defaults, `eval`/`reset`/`close`, tool
//! exposure, a scoped-use helper, and a typed error hierarchy for the two
//! resource-limit kinds a host must be able to catch specifically.

mod error;
mod facade;
mod tool;

pub use error::SandboxError;
pub use facade::{set_default_memory_limit, set_default_timeout, Sandbox};
pub use tool::{FnModule, ToolModule};

pub use enclave_core::{ErrorKind, EvalResult, Value, ValueMap};
