// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Mock registry - test overrides consulted before the module cache

use crate::error::Result;
use crate::module_system::identity::{ModuleIdentity, SpecifierKind};
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// A registered override
#[derive(Debug, Clone)]
pub struct MockEntry {
    /// Identity being overridden
    pub identity: ModuleIdentity,
    /// Exports returned instead of the real module
    pub exports: Value,
}

/// Table of module overrides
///
/// Mocks never touch the module cache: a real module that was loaded before
/// a mock was registered is served again, without reloading, once the mock
/// is removed.
pub struct MockRegistry {
    /// Root that non-absolute specifiers are anchored at
    root: ModuleIdentity,
    entries: RwLock<HashMap<ModuleIdentity, MockEntry>>,
}

impl MockRegistry {
    /// Create an empty registry anchored at `/`
    pub fn new() -> Self {
        Self::with_root(ModuleIdentity::root())
    }

    /// Create an empty registry anchored at `root`
    pub fn with_root(root: ModuleIdentity) -> Self {
        Self {
            root,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Root that non-absolute specifiers are anchored at
    pub fn root(&self) -> &ModuleIdentity {
        &self.root
    }

    /// Canonicalize a mock specifier against the registry root
    pub fn canonicalize(&self, specifier: &str) -> Result<ModuleIdentity> {
        match SpecifierKind::of(specifier) {
            SpecifierKind::Absolute => ModuleIdentity::parse(specifier),
            SpecifierKind::Relative | SpecifierKind::Bare => self.root.join(specifier),
        }
    }

    /// Install or replace the override for `specifier`
    #[instrument(level = "debug", skip(self, exports))]
    pub fn register_mock(&self, specifier: &str, exports: Value) -> Result<ModuleIdentity> {
        let identity = self.canonicalize(specifier)?;
        let entry = MockEntry {
            identity: identity.clone(),
            exports,
        };
        let replaced = self.entries.write().insert(identity.clone(), entry).is_some();
        debug!(%identity, replaced, "Registered mock");
        Ok(identity)
    }

    /// Remove the override for `specifier`, returning its exports
    pub fn unregister_mock(&self, specifier: &str) -> Result<Option<Value>> {
        let identity = self.canonicalize(specifier)?;
        let removed = self.entries.write().remove(&identity).map(|entry| entry.exports);
        debug!(%identity, removed = removed.is_some(), "Unregistered mock");
        Ok(removed)
    }

    /// Remove every override
    pub fn reset(&self) {
        let mut entries = self.entries.write();
        debug!(count = entries.len(), "Resetting mock registry");
        entries.clear();
    }

    /// Exports registered for `identity`
    pub fn lookup(&self, identity: &ModuleIdentity) -> Option<Value> {
        self.entries.read().get(identity).map(|entry| entry.exports.clone())
    }

    /// Whether `identity` is overridden
    pub fn contains(&self, identity: &ModuleIdentity) -> bool {
        self.entries.read().contains_key(identity)
    }

    /// All overridden identities, sorted
    pub fn identities(&self) -> Vec<ModuleIdentity> {
        let mut ids: Vec<_> = self.entries.read().keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of overrides
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if there are no overrides
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for MockRegistry {
    fn default() -> Self {
        Self::new()
    }
}
