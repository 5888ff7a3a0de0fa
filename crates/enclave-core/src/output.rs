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

//! Output buffer: a growable byte buffer fed by the
//! interpreter's print-family primitives, truncated to zero length at the
//! start of every eval (not at reset — reset builds a fresh interpreter
//! whose print overrides point at a newly-constructed, already-empty
//! buffer).

use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Default)]
pub struct OutputBuffer(Rc<RefCell<Vec<u8>>>);

impl OutputBuffer {
    pub fn new() -> Self {
        OutputBuffer(Rc::new(RefCell::new(Vec::new())))
    }

    pub fn write_str(&self, s: &str) {
        self.0.borrow_mut().extend_from_slice(s.as_bytes());
    }

    /// Append `s`, followed by a newline unless `s` already ends in one —
    /// the `puts`-style rule: a written line always ends in a newline.
    pub fn write_line(&self, s: &str) {
        self.write_str(s);
        if !s.ends_with('\n') {
            self.0.borrow_mut().push(b'\n');
        }
    }

    pub fn reset(&self) {
        self.0.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot the buffer's current contents as a UTF-8 string, lossily
    /// replacing any invalid sequences (the buffer only needs
    /// to hold bytes written by print primitives; sandbox-visible text is
    /// expected, not guaranteed, to be UTF-8).
    pub fn snapshot(&self) -> String {
        String::from_utf8_lossy(&self.0.borrow()).into_owned()
    }
}
