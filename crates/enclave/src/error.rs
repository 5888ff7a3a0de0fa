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

//! Host-facing error hierarchy.
//!
//! The core's `eval` never raises a host-level error for a sandbox
//! failure — it always returns an `EvalResult`. This facade is the layer
//! that decides which of those results are worth re-raising: the two
//! resource-limit kinds represent a host-policy violation the caller must
//! be able to catch specifically, so `eval` here turns `ErrorKind::Timeout`
//! / `ErrorKind::MemoryLimit` into `SandboxError::Timeout` /
//! `SandboxError::MemoryLimit`. A plain runtime or syntax error in the
//! sandboxed script is left alone in the returned `EvalResult` — that's
//! the user's program misbehaving, not the host's limits firing.

use enclave_core::{ClosedSession, DefineFunctionError, TooManyFunctions};

/// `SandboxError` ⊃ `{Timeout, MemoryLimit}` ⊃ nothing further;
/// modeled as one enum rather than a trait-object subtype chain, since
/// that's the idiomatic Rust shape for a closed, small error taxonomy.
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// A wall-clock deadline was
    /// reached during `eval`.
    #[error("execution timeout exceeded")]
    Timeout,

    /// The heap-bytes ceiling was
    /// exceeded during `eval`.
    #[error("memory limit exceeded")]
    MemoryLimit,

    /// API misuse, not sandbox execution: an operation was attempted on a
    /// session that had already been closed.
    #[error("operation attempted on a closed session")]
    Closed,

    /// API misuse: `expose` tried to register more than
    /// [`enclave_core::MAX_FUNCTIONS`] tool functions on one session.
    #[error("too many tool functions registered on this session")]
    TooManyFunctions,
}

impl From<ClosedSession> for SandboxError {
    fn from(_: ClosedSession) -> Self {
        SandboxError::Closed
    }
}

impl From<TooManyFunctions> for SandboxError {
    fn from(_: TooManyFunctions) -> Self {
        SandboxError::TooManyFunctions
    }
}

impl From<DefineFunctionError> for SandboxError {
    fn from(e: DefineFunctionError) -> Self {
        match e {
            DefineFunctionError::Closed(e) => e.into(),
            DefineFunctionError::TooManyFunctions(e) => e.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_session_converts_to_sandbox_error() {
        let err: SandboxError = ClosedSession.into();
        assert!(matches!(err, SandboxError::Closed));
    }

    #[test]
    fn too_many_functions_converts_to_sandbox_error() {
        let mut registry = enclave_core::ToolRegistry::new();
        for i in 0..enclave_core::MAX_FUNCTIONS {
            registry.register(format!("fn{i}")).unwrap();
        }
        let overflow = registry.register("one_too_many").unwrap_err();
        let err: SandboxError = overflow.into();
        assert!(matches!(err, SandboxError::TooManyFunctions));
    }
}
