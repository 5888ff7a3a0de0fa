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

//! Round-trip marshal property: host -> sandbox -> host is the
//! identity for every lattice shape, up to the documented symbol/string
//! coercion.

use enclave_core::engine::{steel_to_value, value_to_steel};
use enclave_core::{Value, ValueMap};
use proptest::prelude::*;

fn leaf_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Unit),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|i| Value::Int(i as i64)),
        (-1e9..1e9f64).prop_map(Value::Float),
        "[a-zA-Z0-9 _-]{0,16}".prop_map(Value::string),
    ]
}

fn value_tree() -> impl Strategy<Value = Value> {
    leaf_value().prop_recursive(3, 16, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            prop::collection::vec((inner.clone(), inner), 0..4).prop_map(|pairs| {
                let mut map = ValueMap::new();
                for (k, v) in pairs {
                    map.insert(k, v);
                }
                Value::Map(map)
            }),
        ]
    })
}

proptest! {
    #[test]
    fn host_to_sandbox_to_host_is_the_identity(value in value_tree()) {
        let steel = value_to_steel(&value).expect("every lattice value must marshal into steel");
        let back = steel_to_value(&steel).expect("every steel value produced above must marshal back");
        prop_assert_eq!(value, back);
    }
}
