// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # purple-core
//!
//! Module resolution, caching and mock overrides for the Purple scripting
//! runtime.
//!
//! The crate owns the `require()` machinery only. Reading module sources and
//! running module bodies are host capabilities passed in at construction
//! time (see [`host`]).
//!
//! ## Quick Start
//!
//! ```rust
//! use purple_core::host::{MemoryResources, ModuleSource};
//! use purple_core::module_system::{ModuleIdentity, ModuleLoader, ModuleScope};
//! use purple_core::{BoxError, Value};
//! use std::sync::Arc;
//!
//! let resources = MemoryResources::new()
//!     .with("/app/mock/library.js", "library")
//!     .unwrap();
//!
//! let evaluator = |_: &ModuleSource, scope: &ModuleScope| -> Result<(), BoxError> {
//!     scope.export("hello", Value::function(|_| Ok(Value::from("Hello World"))))?;
//!     Ok(())
//! };
//!
//! let loader = ModuleLoader::new(Arc::new(resources), Arc::new(evaluator)).unwrap();
//! let caller = ModuleIdentity::parse("/app/mock/mock-test.js").unwrap();
//!
//! let lib = loader.require("./library", &caller).unwrap();
//! assert_eq!(lib.call_method("hello", &[]).unwrap().as_str(), Some("Hello World"));
//!
//! let mock = Value::object();
//! mock.as_object().unwrap().set("hello", Value::function(|_| Ok(Value::from("Hello Mock"))));
//! loader.register_mock("/app/mock/library.js", mock).unwrap();
//!
//! let lib = loader.require("./library", &caller).unwrap();
//! assert_eq!(lib.call_method("hello", &[]).unwrap().as_str(), Some("Hello Mock"));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod host;
pub mod module_system;
pub mod value;

// Re-exports
pub use config::LoaderConfig;
pub use error::{BoxError, ModuleError, Result};
pub use module_system::{ModuleIdentity, ModuleLoader, MockRegistry};
pub use value::{ObjectRef, Value};

/// Version of purple-core
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
