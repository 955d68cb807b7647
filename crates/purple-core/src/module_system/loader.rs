// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module loader - resolves, evaluates and caches modules

use crate::config::LoaderConfig;
use crate::error::{ModuleError, Result};
use crate::host::{ModuleSource, NativeModule, ResourceLoader, ScriptEvaluator};
use crate::module_system::cache::{LoadSlot, Module, ModuleCache, PendingLoad};
use crate::module_system::identity::ModuleIdentity;
use crate::module_system::mock::MockRegistry;
use crate::module_system::require::ModuleScope;
use crate::module_system::resolver::{ModuleKind, ModuleResolver, ResolveResult};
use crate::value::Value;
use std::io;
use std::sync::{Arc, Weak};
use tracing::{debug, instrument, trace, warn};

/// Where the exports returned by a require came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOrigin {
    /// A registered mock
    Mock,
    /// A previously loaded module
    Cached,
    /// A module still being evaluated on this thread, or by a thread
    /// blocked on this one (partial exports)
    Circular,
    /// Evaluated by this call
    Evaluated,
}

/// Outcome of [`ModuleLoader::require_traced`]
#[derive(Debug, Clone)]
pub struct Required {
    /// Canonical identity
    pub identity: ModuleIdentity,
    /// Exports value
    pub exports: Value,
    /// Where the exports came from
    pub origin: ExportOrigin,
}

struct LoaderInner {
    resolver: ModuleResolver,
    cache: Arc<ModuleCache>,
    mocks: Arc<MockRegistry>,
    evaluator: Arc<dyn ScriptEvaluator>,
}

/// Module loader
///
/// Cheap to clone; clones share the cache, the mock registry and the host
/// capabilities.
///
/// A `require` for an identity that another thread is still evaluating
/// blocks until that evaluation settles. A `require` on the evaluating thread
/// itself (a circular require) returns the partial exports instead, as does
/// one whose wait would close a cycle of threads blocked on each other.
#[derive(Clone)]
pub struct ModuleLoader {
    inner: Arc<LoaderInner>,
}

/// Non-owning handle to a [`ModuleLoader`], held by module scopes so that
/// exports capturing `require` do not keep the cache alive.
#[derive(Clone)]
pub(crate) struct WeakLoader(Weak<LoaderInner>);

impl WeakLoader {
    pub(crate) fn upgrade(&self) -> Option<ModuleLoader> {
        self.0.upgrade().map(|inner| ModuleLoader { inner })
    }
}

/// Builder for [`ModuleLoader`]
pub struct LoaderBuilder {
    config: LoaderConfig,
    resources: Arc<dyn ResourceLoader>,
    evaluator: Arc<dyn ScriptEvaluator>,
    mocks: Option<Arc<MockRegistry>>,
    cache: Option<Arc<ModuleCache>>,
    natives: Vec<(String, Arc<dyn NativeModule>)>,
}

impl LoaderBuilder {
    /// Use this configuration
    pub fn config(mut self, config: LoaderConfig) -> Self {
        self.config = config;
        self
    }

    /// Share an existing mock registry
    pub fn mocks(mut self, mocks: Arc<MockRegistry>) -> Self {
        self.mocks = Some(mocks);
        self
    }

    /// Share an existing module cache
    pub fn cache(mut self, cache: Arc<ModuleCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Register a host module at an absolute path
    pub fn native(mut self, path: impl Into<String>, module: impl NativeModule + 'static) -> Self {
        self.natives.push((path.into(), Arc::new(module)));
        self
    }

    /// Build the loader
    pub fn build(self) -> Result<ModuleLoader> {
        let mocks = match self.mocks {
            Some(mocks) => mocks,
            None => Arc::new(MockRegistry::with_root(self.config.mock_root()?)),
        };
        let resolver = ModuleResolver::new(self.config, self.resources)?;
        for (path, module) in self.natives {
            resolver.register_native(&path, module)?;
        }

        Ok(ModuleLoader {
            inner: Arc::new(LoaderInner {
                resolver,
                cache: self.cache.unwrap_or_default(),
                mocks,
                evaluator: self.evaluator,
            }),
        })
    }
}

impl ModuleLoader {
    /// Start building a loader over the given host capabilities
    pub fn builder(
        resources: Arc<dyn ResourceLoader>,
        evaluator: Arc<dyn ScriptEvaluator>,
    ) -> LoaderBuilder {
        LoaderBuilder {
            config: LoaderConfig::default(),
            resources,
            evaluator,
            mocks: None,
            cache: None,
            natives: Vec::new(),
        }
    }

    /// Create a loader with the default configuration
    pub fn new(
        resources: Arc<dyn ResourceLoader>,
        evaluator: Arc<dyn ScriptEvaluator>,
    ) -> Result<Self> {
        Self::builder(resources, evaluator).build()
    }

    /// Resolve a specifier to its canonical identity without loading it
    pub fn resolve(&self, specifier: &str, caller: &ModuleIdentity) -> Result<ModuleIdentity> {
        self.inner
            .resolver
            .resolve(specifier, caller, &self.inner.mocks)
            .map(|resolved| resolved.identity)
    }

    /// Load a module and return its exports
    pub fn require(&self, specifier: &str, caller: &ModuleIdentity) -> Result<Value> {
        self.require_traced(specifier, caller).map(|required| required.exports)
    }

    /// Load a module, reporting where its exports came from
    #[instrument(level = "debug", skip(self, caller), fields(caller = %caller))]
    pub fn require_traced(&self, specifier: &str, caller: &ModuleIdentity) -> Result<Required> {
        let resolved = self
            .inner
            .resolver
            .resolve(specifier, caller, &self.inner.mocks)?;
        let required = self.load_resolved(resolved, caller)?;
        // Mocks never enter the cache, so they stay out of the graph too
        if required.origin != ExportOrigin::Mock {
            self.inner.cache.add_child(caller, &required.identity);
        }
        Ok(required)
    }

    /// Run an entry module given by absolute path
    pub fn require_main(&self, path: &str) -> Result<Value> {
        self.require(path, &ModuleIdentity::root())
    }

    fn load_resolved(&self, resolved: ResolveResult, caller: &ModuleIdentity) -> Result<Required> {
        let identity = resolved.identity;

        loop {
            if let Some(exports) = self.inner.mocks.lookup(&identity) {
                debug!(%identity, "Serving mock");
                return Ok(Required {
                    identity,
                    exports,
                    origin: ExportOrigin::Mock,
                });
            }

            match self.inner.cache.begin_load(&identity, Some(caller)) {
                LoadSlot::Ready(module) => {
                    trace!(%identity, "Cache hit");
                    return Ok(Required {
                        identity,
                        exports: module.exports(),
                        origin: ExportOrigin::Cached,
                    });
                }
                LoadSlot::Circular(module) => {
                    debug!(%identity, "Circular require observed, returning partial exports");
                    return Ok(Required {
                        identity,
                        exports: module.exports(),
                        origin: ExportOrigin::Circular,
                    });
                }
                LoadSlot::Pending(wait) => {
                    trace!(%identity, "Waiting for module loading on another thread");
                    wait.wait();
                }
                LoadSlot::Started(pending) => {
                    let exports = self.evaluate(resolved.kind, pending)?;
                    return Ok(Required {
                        identity,
                        exports,
                        origin: ExportOrigin::Evaluated,
                    });
                }
            }
        }
    }

    /// Evaluate a claimed module; on error the pending record is dropped,
    /// which purges it from the cache.
    fn evaluate(&self, kind: ModuleKind, pending: PendingLoad) -> Result<Value> {
        let module = Arc::clone(pending.module());
        let identity = module.identity().clone();
        debug!(%identity, kind = kind.as_str(), "Evaluating module");

        if let Err(err) = self.evaluate_body(kind, &module) {
            warn!(%identity, error = %err, "Module evaluation failed");
            return Err(err);
        }

        pending.commit();
        debug!(%identity, "Module loaded");
        Ok(module.exports())
    }

    fn evaluate_body(&self, kind: ModuleKind, module: &Arc<Module>) -> Result<()> {
        let identity = module.identity();
        match kind {
            ModuleKind::Native => {
                let native = self
                    .inner
                    .resolver
                    .native(identity)
                    .ok_or_else(|| ModuleError::not_found(identity.as_str(), identity))?;
                native
                    .init(&self.scope(module))
                    .map_err(|e| ModuleError::evaluation(identity, e))
            }
            ModuleKind::Json => {
                let bytes = self.read(identity)?;
                let json: serde_json::Value = serde_json::from_slice(&bytes)
                    .map_err(|e| ModuleError::evaluation(identity, e))?;
                module.set_exports(Value::from_json(&json));
                Ok(())
            }
            ModuleKind::Script => {
                let bytes = self.read(identity)?;
                let text = String::from_utf8(bytes).map_err(|e| ModuleError::Resource {
                    identity: identity.clone(),
                    source: io::Error::new(io::ErrorKind::InvalidData, e),
                })?;
                let source = ModuleSource {
                    identity: identity.clone(),
                    text,
                };
                self.inner
                    .evaluator
                    .evaluate(&source, &self.scope(module))
                    .map_err(|e| ModuleError::evaluation(identity, e))
            }
            // The mock that made this identity resolvable is gone.
            ModuleKind::Synthetic => Err(ModuleError::not_found(identity.as_str(), identity)),
        }
    }

    fn read(&self, identity: &ModuleIdentity) -> Result<Vec<u8>> {
        self.inner
            .resolver
            .resources()
            .load(identity)
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => ModuleError::not_found(identity.as_str(), identity),
                _ => ModuleError::Resource {
                    identity: identity.clone(),
                    source,
                },
            })
    }

    fn scope(&self, module: &Arc<Module>) -> ModuleScope {
        ModuleScope::new(self, Arc::clone(module))
    }

    /// Install or replace a mock
    pub fn register_mock(&self, specifier: &str, exports: Value) -> Result<ModuleIdentity> {
        self.inner.mocks.register_mock(specifier, exports)
    }

    /// Remove a mock
    pub fn unregister_mock(&self, specifier: &str) -> Result<Option<Value>> {
        self.inner.mocks.unregister_mock(specifier)
    }

    /// Remove every mock
    pub fn reset_mocks(&self) {
        self.inner.mocks.reset();
    }

    /// Register a host module at an absolute path
    pub fn register_native(&self, path: &str, module: impl NativeModule + 'static) -> Result<ModuleIdentity> {
        self.inner.resolver.register_native(path, Arc::new(module))
    }

    pub(crate) fn downgrade(&self) -> WeakLoader {
        WeakLoader(Arc::downgrade(&self.inner))
    }

    /// Get the mock registry
    pub fn mocks(&self) -> &Arc<MockRegistry> {
        &self.inner.mocks
    }

    /// Get the module cache
    pub fn cache(&self) -> &Arc<ModuleCache> {
        &self.inner.cache
    }

    /// Get the resolver
    pub fn resolver(&self) -> &ModuleResolver {
        &self.inner.resolver
    }

    /// Drop one module from the cache so the next require re-evaluates it
    pub fn invalidate(&self, identity: &ModuleIdentity) -> bool {
        self.inner.cache.delete(identity).is_some()
    }

    /// Clear the module cache
    pub fn clear_cache(&self) {
        self.inner.cache.clear();
    }
}
