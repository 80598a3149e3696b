// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The object this binary's daemon hosts: a minimal counter. Real
//! deployments replace this module with their own `Dispatch` and swap the
//! factory passed to [`singleton_daemon::lifecycle::startup`].

use serde_json::{json, Value};
use singleton_core::{Dispatch, DispatchError, ObjectFactory};

#[derive(Default)]
pub struct Counter {
    value: i64,
}

impl Dispatch for Counter {
    fn call(&mut self, method: &str, _args: Value, _kwargs: Value) -> Result<Value, DispatchError> {
        match method {
            "inc" => {
                self.value += 1;
                Ok(json!(self.value))
            }
            "get" => Ok(json!(self.value)),
            "reset" => {
                self.value = 0;
                Ok(json!(self.value))
            }
            "fail" => Err(DispatchError::new("RuntimeError", "nope")),
            other => Err(DispatchError::unknown_method(other)),
        }
    }
}

pub struct CounterFactory;

impl ObjectFactory for CounterFactory {
    fn create(&self) -> Result<Box<dyn Dispatch>, DispatchError> {
        Ok(Box::new(Counter::default()))
    }
}
