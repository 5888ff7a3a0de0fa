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

//! Behavioral properties exercised against a real `Session`.

use std::time::Duration;

use enclave_core::{ErrorKind, Session, ALLOCATOR};

fn new_session() -> Session {
    Session::new(&ALLOCATOR, None, 0)
}

#[test]
fn isolation_between_two_fresh_sessions() {
    let mut a = new_session();
    let mut b = new_session();

    a.eval("(define x 10)").unwrap();
    let result = b.eval("x").unwrap();
    assert!(result.is_error());
}

#[test]
fn persistence_across_evals_until_reset() {
    let mut session = new_session();
    session.eval("(define x 1)").unwrap();
    session.eval("(define (inc n) (+ n 1))").unwrap();
    let result = session.eval("(inc x)").unwrap();
    assert_eq!(result.value.as_deref(), Some("2"));
}

#[test]
fn last_result_binding_survives_to_the_next_eval() {
    let mut session = new_session();
    session.eval("42").unwrap();
    let result = session.eval("(+ _ 1)").unwrap();
    assert_eq!(result.value.as_deref(), Some("43"));
}

#[test]
fn syntax_errors_are_reported_not_raised() {
    let mut session = new_session();
    let result = session.eval("(display").unwrap();
    assert!(result.is_error());
    assert_eq!(result.kind, ErrorKind::Runtime);

    let recovered = session.eval("(+ 1 1)").unwrap();
    assert_eq!(recovered.value.as_deref(), Some("2"));
}

#[test]
fn division_by_zero_is_a_runtime_error_and_session_recovers() {
    let mut session = new_session();
    let result = session.eval("(/ 1 0)").unwrap();
    assert!(result.is_error());

    let recovered = session.eval("(+ 1 1)").unwrap();
    assert_eq!(recovered.value.as_deref(), Some("2"));
}

#[test]
fn safety_negatives_have_no_filesystem_network_or_process_primitives() {
    // Steel's standard prelude has no file, socket, process, signal or
    // environment primitives to begin with — this just pins that down so a
    // future dependency bump can't silently reintroduce one.
    let mut session = new_session();
    for name in [
        "open-input-file",
        "open-output-file",
        "tcp-connect",
        "current-environment-variables",
        "command-line",
    ] {
        let result = session.eval(name).unwrap();
        assert!(result.is_error(), "{name} unexpectedly resolved");
    }
}

#[test]
fn timeout_fires_within_bounded_wall_time_and_session_recovers() {
    let mut session = Session::new(&ALLOCATOR, Some(Duration::from_millis(200)), 0);
    let start = std::time::Instant::now();
    let result = session.eval("(define (spin) (spin)) (spin)").unwrap();
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(result.kind, ErrorKind::Timeout);

    let recovered = session.eval("(+ 1 1)").unwrap();
    assert_eq!(recovered.value.as_deref(), Some("2"));
}

#[test]
fn unlimited_when_both_limits_absent() {
    let mut session = Session::new(&ALLOCATOR, None, 0);
    let result = session.eval("(+ 1 1)").unwrap();
    assert!(!result.is_error());
}
