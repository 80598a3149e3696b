// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dynamic dispatch to method names and the object-factory contract,
//! reduced to Rust trait objects.
//!
//! There is no runtime-reflection equivalent in Rust for resolving a
//! method or constructor by name; a binary embedding this crate implements
//! [`ObjectFactory`] for its own singleton type at compile time instead.

use serde_json::Value;
use thiserror::Error;

/// A method-invocation failure, shaped the way the daemon converts it into
/// a `REMOTE_ERROR` frame.
#[derive(Debug, Clone, Error)]
#[error("{kind_tag}: {message}")]
pub struct DispatchError {
    pub kind_tag: String,
    pub message: String,
    pub traceback_text: String,
}

impl DispatchError {
    pub fn new(kind_tag: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind_tag: kind_tag.into(),
            message: message.into(),
            traceback_text: String::new(),
        }
    }

    pub fn unknown_method(method: &str) -> Self {
        Self::new("UnknownMethod", format!("no such method: {method}"))
    }
}

/// Given the object and a method name, produce a result or a typed
/// failure. Implemented once per embedding application for its own
/// singleton type; invoked exclusively from the sequential executor so no
/// two invocations ever overlap.
pub trait Dispatch: Send {
    fn call(&mut self, method: &str, args: Value, kwargs: Value) -> Result<Value, DispatchError>;
}

/// Produces the singleton instance once at daemon startup. Only invoked
/// once per daemon process lifetime.
pub trait ObjectFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn Dispatch>, DispatchError>;
}

/// Wrap a plain closure as an [`ObjectFactory`], for embedding apps that
/// don't want to name a type.
pub struct FnFactory<F>(pub F)
where
    F: Fn() -> Result<Box<dyn Dispatch>, DispatchError> + Send + Sync;

impl<F> ObjectFactory for FnFactory<F>
where
    F: Fn() -> Result<Box<dyn Dispatch>, DispatchError> + Send + Sync,
{
    fn create(&self) -> Result<Box<dyn Dispatch>, DispatchError> {
        (self.0)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Counter {
        value: i64,
    }

    impl Dispatch for Counter {
        fn call(&mut self, method: &str, _args: Value, _kwargs: Value) -> Result<Value, DispatchError> {
            match method {
                "inc" => {
                    self.value += 1;
                    Ok(json!(self.value))
                }
                "boom" => Err(DispatchError::new("RuntimeError", "nope")),
                other => Err(DispatchError::unknown_method(other)),
            }
        }
    }

    #[test]
    fn dispatch_routes_by_method_name() {
        let mut counter = Counter { value: 0 };
        assert_eq!(
            counter.call("inc", Value::Null, Value::Null).unwrap(),
            json!(1)
        );
        assert_eq!(
            counter.call("inc", Value::Null, Value::Null).unwrap(),
            json!(2)
        );
    }

    #[test]
    fn dispatch_surfaces_method_errors() {
        let mut counter = Counter { value: 0 };
        let err = counter.call("boom", Value::Null, Value::Null).unwrap_err();
        assert_eq!(err.kind_tag, "RuntimeError");
        assert_eq!(err.message, "nope");
    }

    #[test]
    fn unknown_method_is_a_distinct_error_kind() {
        let mut counter = Counter { value: 0 };
        let err = counter
            .call("frobnicate", Value::Null, Value::Null)
            .unwrap_err();
        assert_eq!(err.kind_tag, "UnknownMethod");
    }

    #[test]
    fn fn_factory_wraps_a_closure() {
        let factory = FnFactory(|| -> Result<Box<dyn Dispatch>, DispatchError> {
            Ok(Box::new(Counter { value: 10 }))
        });
        let mut obj = factory.create().unwrap();
        assert_eq!(obj.call("inc", Value::Null, Value::Null).unwrap(), json!(11));
    }
}
