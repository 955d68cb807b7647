// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Script values exchanged between modules
//!
//! The module system never inspects exports beyond identity: an exports value
//! is whatever the module body (or a mock) produced. Objects, functions and
//! host values are reference types, so clones alias the same underlying value
//! and compare equal only to themselves.

use crate::error::{BoxError, ModuleError, Result};
use parking_lot::RwLock;
use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A script value
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// undefined
    #[default]
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String
    String(String),
    /// Array (by value)
    Array(Vec<Value>),
    /// Object reference
    Object(ObjectRef),
    /// Native function
    Function(NativeFunction),
    /// Opaque host object passed through untouched
    Host(HostValue),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            // NaN is never equal to itself
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Host(a), Value::Host(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl Value {
    /// Create a new empty object value
    pub fn object() -> Self {
        Value::Object(ObjectRef::new())
    }

    /// Wrap a Rust closure as a callable value
    pub fn function<F>(func: F) -> Self
    where
        F: Fn(&[Value]) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        Value::Function(NativeFunction::new(func))
    }

    /// Wrap an arbitrary host object
    pub fn host<T: Any + Send + Sync>(value: T) -> Self {
        Value::Host(HostValue::new(value))
    }

    /// Reference identity for objects, functions and host values; value
    /// equality for everything else.
    pub fn same(&self, other: &Value) -> bool {
        self == other
    }

    /// Returns true if this value is undefined.
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns true if this value is a function.
    pub fn is_function(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    /// Borrow the string contents, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the object reference, if this is an object
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Read a property; `Undefined` for missing keys and non-objects
    pub fn get(&self, key: &str) -> Value {
        self.as_object()
            .and_then(|obj| obj.get(key))
            .unwrap_or_default()
    }

    /// Call this value as a function
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        match self {
            Value::Function(func) => func.call(args),
            other => Err(ModuleError::type_error(format!(
                "{} is not a function",
                other.type_of()
            ))),
        }
    }

    /// Call the function stored under `key` on this object
    pub fn call_method(&self, key: &str, args: &[Value]) -> Result<Value> {
        match self.get(key) {
            Value::Function(func) => func.call(args),
            _ => Err(ModuleError::type_error(format!("{} is not a function", key))),
        }
    }

    /// Returns the type of this value as a string.
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) | Value::Object(_) | Value::Host(_) => "object",
            Value::Function(_) => "function",
        }
    }

    /// Convert a parsed JSON document into a value
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s.clone()),
            serde_json::Value::Array(arr) => Value::Array(arr.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(map) => {
                let obj = ObjectRef::new();
                for (key, value) in map {
                    obj.set(key.clone(), Value::from_json(value));
                }
                Value::Object(obj)
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Array(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
            Value::Object(_) => write!(f, "[object Object]"),
            Value::Function(_) => write!(f, "[Function (native)]"),
            Value::Host(_) => write!(f, "[object HostObject]"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

/// Shared, mutable property map
#[derive(Clone, Default)]
pub struct ObjectRef(Arc<RwLock<HashMap<String, Value>>>);

impl ObjectRef {
    /// Create a new empty object
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a property
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.read().get(key).cloned()
    }

    /// Set a property, returning the previous value
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.write().insert(key.into(), value.into())
    }

    /// Remove a property
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.0.write().remove(key)
    }

    /// Check if a property exists
    pub fn has(&self, key: &str) -> bool {
        self.0.read().contains_key(key)
    }

    /// Property names, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.0.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.0.read().len()
    }

    /// Check if the object has no properties
    pub fn is_empty(&self) -> bool {
        self.0.read().is_empty()
    }

    /// Whether both handles point at the same object
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectRef").field("keys", &self.keys()).finish()
    }
}

type NativeFn = dyn Fn(&[Value]) -> std::result::Result<Value, BoxError> + Send + Sync;

/// A function implemented in Rust
#[derive(Clone)]
pub struct NativeFunction(Arc<NativeFn>);

impl NativeFunction {
    /// Wrap a closure
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&[Value]) -> std::result::Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self(Arc::new(func))
    }

    /// Invoke the function
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        (self.0)(args).map_err(ModuleError::Call)
    }

    /// Whether both handles point at the same function
    pub fn ptr_eq(&self, other: &NativeFunction) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeFunction")
    }
}

/// Opaque host object (bridge value)
#[derive(Clone)]
pub struct HostValue(Arc<dyn Any + Send + Sync>);

impl HostValue {
    /// Wrap a host object
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    /// Borrow the host object as a concrete type
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Whether both handles point at the same host object
    pub fn ptr_eq(&self, other: &HostValue) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostValue")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_objects_compare_by_reference() {
        let a = ObjectRef::new();
        let b = ObjectRef::new();
        assert_eq!(Value::Object(a.clone()), Value::Object(a.clone()));
        assert_ne!(Value::Object(a), Value::Object(b));
    }

    #[test]
    fn test_object_clones_alias() {
        let obj = ObjectRef::new();
        let alias = obj.clone();
        alias.set("answer", 42.0);
        assert_eq!(obj.get("answer"), Some(Value::Number(42.0)));
        assert_eq!(obj.keys(), vec!["answer".to_string()]);
    }

    #[test]
    fn test_nan_is_not_equal() {
        assert_ne!(Value::Number(f64::NAN), Value::Number(f64::NAN));
    }

    #[test]
    fn test_call_method() {
        let obj = ObjectRef::new();
        obj.set("hello", Value::function(|_| Ok(Value::from("Hello World"))));
        let value = Value::Object(obj);

        let result = value.call_method("hello", &[]).unwrap();
        assert_eq!(result.as_str(), Some("Hello World"));
    }

    #[test]
    fn test_call_non_function() {
        let err = Value::from("nope").call(&[]).unwrap_err();
        assert!(matches!(err, ModuleError::TypeError(_)));
        assert_eq!(err.to_string(), "TypeError: string is not a function");
    }

    #[test]
    fn test_native_function_error() {
        let value = Value::function(|_| Err("boom".into()));
        let err = value.call(&[]).unwrap_err();
        assert!(matches!(err, ModuleError::Call(_)));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_from_json() {
        let json: serde_json::Value =
            serde_json::from_str(r#"{"name": "purple", "tags": ["a", "b"], "n": 3}"#).unwrap();
        let value = Value::from_json(&json);

        assert_eq!(value.get("name").as_str(), Some("purple"));
        assert_eq!(value.get("n"), Value::Number(3.0));
        assert_eq!(
            value.get("tags"),
            Value::Array(vec![Value::from("a"), Value::from("b")])
        );
        assert!(value.get("missing").is_undefined());
    }

    #[test]
    fn test_host_value_roundtrip() {
        let value = Value::host(String::from("bean"));
        match &value {
            Value::Host(host) => assert_eq!(host.downcast_ref::<String>().unwrap(), "bean"),
            _ => panic!("expected host value"),
        }
        assert_eq!(value.type_of(), "object");
    }
}
