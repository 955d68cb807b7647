// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module system
//!
//! `require(specifier)` flow:
//!
//! 1. resolve the specifier to a canonical [`ModuleIdentity`],
//! 2. return the registered mock for that identity, if any,
//! 3. return the cached exports if the module is loaded,
//! 4. return the partial exports if the module is loading on this thread,
//! 5. otherwise evaluate the module once and cache its exports.
//!
//! A module whose evaluation fails is purged from the cache, so the next
//! require tries again.

mod cache;
pub mod identity;
mod loader;
mod mock;
mod require;
mod resolver;

pub use cache::{CachedModule, LoadLatch, Module, ModuleCache, ModuleState};
pub use identity::{canonicalize, ModuleIdentity, SpecifierKind};
pub use loader::{ExportOrigin, LoaderBuilder, ModuleLoader, Required};
pub use mock::{MockEntry, MockRegistry};
pub use require::{MockHelper, ModuleScope, Require};
pub use resolver::{ModuleKind, ModuleResolver, ResolveResult};
