// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module path resolution
//!
//! A specifier is first rewritten through aliases, then anchored:
//! relative specifiers at the caller's directory, absolute ones at the root,
//! bare ones at each search path in turn. For each anchored path the
//! candidates are tried in order:
//!
//! 1. the exact path,
//! 2. the path with each configured extension appended,
//! 3. `<path>/<index><ext>` for each index name and extension.
//!
//! A candidate is a hit if a mock, a native module or a resource exists there.

use crate::config::LoaderConfig;
use crate::error::{ModuleError, Result};
use crate::host::{NativeModule, ResourceLoader};
use crate::module_system::identity::{ModuleIdentity, SpecifierKind};
use crate::module_system::mock::MockRegistry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::trace;

/// What backs a resolved identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// Script evaluated by the host evaluator
    Script,
    /// JSON document parsed into the exports value
    Json,
    /// Host-provided module
    Native,
    /// Only a mock exists at this identity
    Synthetic,
}

impl ModuleKind {
    /// Human-readable name
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleKind::Script => "script",
            ModuleKind::Json => "json",
            ModuleKind::Native => "native",
            ModuleKind::Synthetic => "synthetic",
        }
    }
}

/// Result of module resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveResult {
    /// Canonical identity
    pub identity: ModuleIdentity,
    /// What backs it
    pub kind: ModuleKind,
}

/// Module resolver
pub struct ModuleResolver {
    config: LoaderConfig,
    search_roots: Vec<ModuleIdentity>,
    resources: Arc<dyn ResourceLoader>,
    natives: DashMap<ModuleIdentity, Arc<dyn NativeModule>>,
}

impl ModuleResolver {
    /// Create a resolver over `resources`
    pub fn new(config: LoaderConfig, resources: Arc<dyn ResourceLoader>) -> Result<Self> {
        config.validate()?;
        let search_roots = config.search_roots()?;
        Ok(Self {
            config,
            search_roots,
            resources,
            natives: DashMap::new(),
        })
    }

    /// Active configuration
    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Resource loader modules are read from
    pub fn resources(&self) -> &Arc<dyn ResourceLoader> {
        &self.resources
    }

    /// Register a host module at an absolute path
    pub fn register_native(&self, path: &str, module: Arc<dyn NativeModule>) -> Result<ModuleIdentity> {
        let identity = ModuleIdentity::parse(path)?;
        self.natives.insert(identity.clone(), module);
        Ok(identity)
    }

    /// Host module registered at `identity`
    pub fn native(&self, identity: &ModuleIdentity) -> Option<Arc<dyn NativeModule>> {
        self.natives.get(identity).map(|entry| Arc::clone(entry.value()))
    }

    /// Anchor a specifier without probing for candidates.
    ///
    /// Returns one base path per search root for bare specifiers.
    pub fn anchor(&self, specifier: &str, caller: &ModuleIdentity) -> Result<Vec<ModuleIdentity>> {
        if specifier.is_empty() {
            return Err(ModuleError::invalid_specifier(specifier, "empty specifier"));
        }

        let rewritten = self.config.apply_alias(specifier);
        let specifier = rewritten.as_deref().unwrap_or(specifier);

        match SpecifierKind::of(specifier) {
            SpecifierKind::Relative => Ok(vec![caller.dirname().join(specifier)?]),
            SpecifierKind::Absolute => Ok(vec![ModuleIdentity::parse(specifier)?]),
            SpecifierKind::Bare => self
                .search_roots
                .iter()
                .map(|root| root.join(specifier))
                .collect(),
        }
    }

    /// Candidate identities for an anchored path, in probe order
    pub fn candidates(&self, base: &ModuleIdentity) -> Vec<ModuleIdentity> {
        let mut candidates = vec![base.clone()];
        candidates.extend(self.config.extensions.iter().map(|ext| base.with_suffix(ext)));
        for index in &self.config.index_names {
            for ext in &self.config.extensions {
                candidates.push(base.child(&format!("{}{}", index, ext)));
            }
        }
        candidates
    }

    /// Resolve a module specifier
    pub fn resolve(
        &self,
        specifier: &str,
        caller: &ModuleIdentity,
        mocks: &MockRegistry,
    ) -> Result<ResolveResult> {
        for base in self.anchor(specifier, caller)? {
            for candidate in self.candidates(&base) {
                if let Some(kind) = self.probe(&candidate, mocks) {
                    trace!(specifier, %candidate, kind = kind.as_str(), "Resolved module");
                    return Ok(ResolveResult {
                        identity: candidate,
                        kind,
                    });
                }
            }
        }

        Err(ModuleError::not_found(specifier, caller))
    }

    /// Classify a single candidate, `None` if nothing backs it
    fn probe(&self, candidate: &ModuleIdentity, mocks: &MockRegistry) -> Option<ModuleKind> {
        if self.natives.contains_key(candidate) {
            Some(ModuleKind::Native)
        } else if self.resources.exists(candidate) {
            Some(self.categorize(candidate))
        } else if mocks.contains(candidate) {
            Some(ModuleKind::Synthetic)
        } else {
            None
        }
    }

    /// Categorize a resource by extension
    fn categorize(&self, identity: &ModuleIdentity) -> ModuleKind {
        match identity.extension() {
            Some("json") => ModuleKind::Json,
            _ => ModuleKind::Script,
        }
    }
}
