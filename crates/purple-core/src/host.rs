// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host capabilities consumed by the module system
//!
//! The loader never reads files or runs scripts itself. It is handed:
//!
//! - a [`ResourceLoader`] that maps identities to source bytes,
//! - a [`ScriptEvaluator`] that runs a module body against a [`ModuleScope`],
//! - optionally, [`NativeModule`]s implemented in Rust.

use crate::error::BoxError;
use crate::module_system::{ModuleIdentity, ModuleScope};
use dashmap::DashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Source of module bytes
pub trait ResourceLoader: Send + Sync {
    /// Whether a resource exists at `identity`
    fn exists(&self, identity: &ModuleIdentity) -> bool;

    /// Read the resource; `io::ErrorKind::NotFound` if it is missing
    fn load(&self, identity: &ModuleIdentity) -> io::Result<Vec<u8>>;
}

/// Module source text handed to a [`ScriptEvaluator`]
#[derive(Debug, Clone)]
pub struct ModuleSource {
    /// Module being evaluated
    pub identity: ModuleIdentity,
    /// Decoded source text
    pub text: String,
}

/// Runs a module body
///
/// The evaluator populates `scope.exports()` (or replaces it through
/// [`ModuleScope::set_exports`]) and may call `scope.require()` re-entrantly.
pub trait ScriptEvaluator: Send + Sync {
    /// Evaluate `source` with the given scope bound
    fn evaluate(&self, source: &ModuleSource, scope: &ModuleScope) -> Result<(), BoxError>;
}

impl<F> ScriptEvaluator for F
where
    F: Fn(&ModuleSource, &ModuleScope) -> Result<(), BoxError> + Send + Sync,
{
    fn evaluate(&self, source: &ModuleSource, scope: &ModuleScope) -> Result<(), BoxError> {
        self(source, scope)
    }
}

/// A module implemented by the host
pub trait NativeModule: Send + Sync {
    /// Populate the module's exports
    fn init(&self, scope: &ModuleScope) -> Result<(), BoxError>;
}

impl<F> NativeModule for F
where
    F: Fn(&ModuleScope) -> Result<(), BoxError> + Send + Sync,
{
    fn init(&self, scope: &ModuleScope) -> Result<(), BoxError> {
        self(scope)
    }
}

/// In-memory resources keyed by identity
#[derive(Default)]
pub struct MemoryResources {
    files: DashMap<ModuleIdentity, Vec<u8>>,
}

impl MemoryResources {
    /// Create an empty set of resources
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a resource at an absolute path
    pub fn insert(&self, path: &str, contents: impl Into<Vec<u8>>) -> crate::Result<ModuleIdentity> {
        let identity = ModuleIdentity::parse(path)?;
        self.files.insert(identity.clone(), contents.into());
        Ok(identity)
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(self, path: &str, contents: impl Into<Vec<u8>>) -> crate::Result<Self> {
        self.insert(path, contents)?;
        Ok(self)
    }

    /// Remove a resource
    pub fn remove(&self, identity: &ModuleIdentity) -> bool {
        self.files.remove(identity).is_some()
    }

    /// Number of resources
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if there are no resources
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ResourceLoader for MemoryResources {
    fn exists(&self, identity: &ModuleIdentity) -> bool {
        self.files.contains_key(identity)
    }

    fn load(&self, identity: &ModuleIdentity) -> io::Result<Vec<u8>> {
        self.files
            .get(identity)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("Module '{}' not found", identity),
                )
            })
    }
}

/// Resources read from a directory; `/a/b.js` maps to `<root>/a/b.js`
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    root: PathBuf,
}

impl DirectoryResources {
    /// Serve modules from `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory modules are served from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path for an identity
    pub fn path_of(&self, identity: &ModuleIdentity) -> PathBuf {
        identity
            .as_str()
            .split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }
}

impl ResourceLoader for DirectoryResources {
    fn exists(&self, identity: &ModuleIdentity) -> bool {
        self.path_of(identity).is_file()
    }

    fn load(&self, identity: &ModuleIdentity) -> io::Result<Vec<u8>> {
        let path = self.path_of(identity);
        if !path.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Module '{}' not found", identity),
            ));
        }
        std::fs::read(path)
    }
}
