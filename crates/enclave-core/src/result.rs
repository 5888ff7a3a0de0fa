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

//! Result record and error taxonomy.

/// Why an eval failed, or that it didn't.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    None,
    Runtime,
    Timeout,
    MemoryLimit,
}

/// The four-field record every `eval` returns. Never a host-language error
/// in its own right — sandbox-originating failures live in `error`/`kind`.
#[derive(Debug, Clone, PartialEq)]
pub struct EvalResult {
    pub value: Option<String>,
    pub output: String,
    pub error: Option<String>,
    pub kind: ErrorKind,
}

impl EvalResult {
    pub fn success(value: Option<String>, output: String) -> Self {
        EvalResult {
            value,
            output,
            error: None,
            kind: ErrorKind::None,
        }
    }

    pub fn failure(kind: ErrorKind, message: String, output: String) -> Self {
        EvalResult {
            value: None,
            output,
            error: Some(message),
            kind,
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The host-facing rendering rule: captured output first, then
    /// either `"=> <value>"` or `"Error: <message>"`.
    pub fn to_display_string(&self) -> String {
        let mut s = self.output.clone();
        match &self.error {
            Some(message) => s.push_str(&format!("Error: {message}")),
            None => {
                let value = self.value.as_deref().unwrap_or("(unprintable)");
                s.push_str(&format!("=> {value}"));
            }
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_renders_output_then_arrow_value() {
        let r = EvalResult::success(Some("42".to_string()), "hi\n".to_string());
        assert_eq!(r.to_display_string(), "hi\n=> 42");
        assert!(!r.is_error());
    }

    #[test]
    fn bare_success_has_no_output_prefix() {
        let r = EvalResult::success(Some("2".to_string()), String::new());
        assert_eq!(r.to_display_string(), "=> 2");
    }

    #[test]
    fn failure_renders_error_prefix() {
        let r = EvalResult::failure(ErrorKind::Timeout, "execution timeout exceeded".to_string(), String::new());
        assert_eq!(r.to_display_string(), "Error: execution timeout exceeded");
        assert!(r.is_error());
    }
}
