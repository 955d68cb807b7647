// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Shared test harness: module bodies written as Rust closures.
//!
//! A module's source text names the body to run, e.g. a resource containing
//! `library` runs the body registered under `"library"`.

#![allow(dead_code)]

use parking_lot::Mutex;
use purple_core::host::{MemoryResources, ModuleSource, ScriptEvaluator};
use purple_core::module_system::{ModuleIdentity, ModuleScope};
use purple_core::{BoxError, ModuleLoader, Value};
use std::collections::HashMap;
use std::sync::Arc;

type Body = Arc<dyn Fn(&ModuleScope) -> Result<(), BoxError> + Send + Sync>;

/// Named module bodies plus a per-identity evaluation counter
#[derive(Clone, Default)]
pub struct Scripts {
    bodies: Arc<Mutex<HashMap<String, Body>>>,
    runs: Arc<Mutex<HashMap<String, usize>>>,
}

impl Scripts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define<F>(&self, name: &str, body: F) -> &Self
    where
        F: Fn(&ModuleScope) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.bodies.lock().insert(name.to_string(), Arc::new(body));
        self
    }

    /// How many times the module at `path` has been evaluated
    pub fn runs(&self, path: &str) -> usize {
        self.runs.lock().get(path).copied().unwrap_or(0)
    }

    pub fn evaluator(&self) -> Arc<dyn ScriptEvaluator> {
        let scripts = self.clone();
        Arc::new(
            move |source: &ModuleSource, scope: &ModuleScope| -> Result<(), BoxError> {
                *scripts
                    .runs
                    .lock()
                    .entry(source.identity.to_string())
                    .or_insert(0) += 1;
                let body = scripts.bodies.lock().get(source.text.trim()).cloned();
                match body {
                    Some(body) => body(scope),
                    None => Err(format!("SyntaxError: unknown script '{}'", source.text).into()),
                }
            },
        )
    }
}

pub fn resources(files: &[(&str, &str)]) -> Arc<MemoryResources> {
    let resources = MemoryResources::new();
    for (path, source) in files {
        resources.insert(path, *source).unwrap();
    }
    Arc::new(resources)
}

pub fn loader(files: &[(&str, &str)], scripts: &Scripts) -> ModuleLoader {
    ModuleLoader::new(resources(files), scripts.evaluator()).unwrap()
}

pub fn id(path: &str) -> ModuleIdentity {
    ModuleIdentity::parse(path).unwrap()
}

/// `{ hello: () => greeting }`
pub fn greeter(greeting: &'static str) -> Value {
    let exports = Value::object();
    exports
        .as_object()
        .unwrap()
        .set("hello", Value::function(move |_| Ok(Value::from(greeting))));
    exports
}

pub fn hello(exports: &Value) -> String {
    exports
        .call_method("hello", &[])
        .unwrap()
        .as_str()
        .unwrap()
        .to_string()
}
