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

//! Tool registry: the bounded list of sandbox-visible
//! function names. Membership in this list is the sole source of truth for
//! what tool functions exist in a session; it survives `reset` and is replayed into each freshly-built interpreter.

/// Fixed cap on registered tool functions per session.
pub const MAX_FUNCTIONS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TooManyFunctions;

impl std::fmt::Display for TooManyFunctions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "cannot register more than {MAX_FUNCTIONS} sandbox functions in one session"
        )
    }
}

impl std::error::Error for TooManyFunctions {}

/// The session's list of registered tool-function names.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    names: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        ToolRegistry { names: Vec::new() }
    }

    /// Register `name`, failing if the registry is already at capacity.
    /// Re-registering an existing name is a no-op success (idempotent,
    /// matching `define_function`'s use from both `expose` and `reset`).
    pub fn register(&mut self, name: impl Into<String>) -> Result<(), TooManyFunctions> {
        let name = name.into();
        if self.names.iter().any(|n| n == &name) {
            return Ok(());
        }
        if self.names.len() >= MAX_FUNCTIONS {
            return Err(TooManyFunctions);
        }
        self.names.push(name);
        Ok(())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_up_to_the_cap() {
        let mut reg = ToolRegistry::new();
        for i in 0..MAX_FUNCTIONS {
            reg.register(format!("fn{i}")).unwrap();
        }
        assert_eq!(reg.len(), MAX_FUNCTIONS);
        assert_eq!(
            reg.register("one_too_many"),
            Err(TooManyFunctions)
        );
    }

    #[test]
    fn re_registering_same_name_is_idempotent() {
        let mut reg = ToolRegistry::new();
        reg.register("double").unwrap();
        reg.register("double").unwrap();
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn names_preserve_registration_order() {
        let mut reg = ToolRegistry::new();
        reg.register("b").unwrap();
        reg.register("a").unwrap();
        assert_eq!(reg.names(), &["b".to_string(), "a".to_string()]);
    }
}
