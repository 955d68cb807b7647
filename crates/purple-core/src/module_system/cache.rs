// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module cache for require()

use crate::module_system::identity::ModuleIdentity;
use crate::value::Value;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use tracing::{debug, trace};

/// A module instance: identity plus its (mutable) exports
#[derive(Debug)]
pub struct Module {
    identity: ModuleIdentity,
    exports: RwLock<Value>,
}

impl Module {
    /// Create a module with an empty exports object
    pub fn new(identity: ModuleIdentity) -> Self {
        Self {
            identity,
            exports: RwLock::new(Value::object()),
        }
    }

    /// The module's identity
    pub fn identity(&self) -> &ModuleIdentity {
        &self.identity
    }

    /// Current exports
    pub fn exports(&self) -> Value {
        self.exports.read().clone()
    }

    /// Replace the exports value
    pub fn set_exports(&self, exports: Value) {
        *self.exports.write() = exports;
    }
}

/// Signals waiters once a Loading record settles
#[derive(Debug, Default)]
pub struct LoadLatch {
    done: Mutex<bool>,
    cond: Condvar,
}

impl LoadLatch {
    /// Block until [`release`](Self::release) is called
    pub fn wait(&self) {
        let mut done = self.done.lock();
        while !*done {
            self.cond.wait(&mut done);
        }
    }

    /// Wake every waiter
    pub fn release(&self) {
        *self.done.lock() = true;
        self.cond.notify_all();
    }
}

/// Load state of a cached module
#[derive(Debug, Clone)]
pub enum ModuleState {
    /// Being evaluated by `owner`
    Loading {
        /// Thread evaluating the module body
        owner: ThreadId,
        /// Released when evaluation settles
        latch: Arc<LoadLatch>,
    },
    /// Evaluation finished
    Loaded,
}

#[derive(Debug)]
struct ModuleRecord {
    module: Arc<Module>,
    state: ModuleState,
    parent: Option<ModuleIdentity>,
    children: Vec<ModuleIdentity>,
}

/// Snapshot of a cache entry
#[derive(Debug, Clone)]
pub struct CachedModule {
    /// The module's identity
    pub identity: ModuleIdentity,
    /// The module's exports
    pub exports: Value,
    /// Whether the module has finished loading
    pub loaded: bool,
    /// Modules required by this one
    pub children: Vec<ModuleIdentity>,
    /// Module that first required this one
    pub parent: Option<ModuleIdentity>,
}

/// Outcome of trying to claim an identity for loading
pub(crate) enum LoadSlot {
    /// Already loaded
    Ready(Arc<Module>),
    /// Loading on this thread, or on a thread that is itself waiting on
    /// this one (circular require)
    Circular(Arc<Module>),
    /// Loading on another thread
    Pending(LoadWait),
    /// Claimed; the caller must evaluate and settle it
    Started(PendingLoad),
}

/// A blocked thread and the load it waits on
struct WaitEdge {
    owner: ThreadId,
    latch: Arc<LoadLatch>,
}

/// Thread-safe module cache
#[derive(Default)]
pub struct ModuleCache {
    /// Cache mapping identities to module records
    cache: DashMap<ModuleIdentity, ModuleRecord>,
    /// Which owner each blocked thread waits for; a thread has at most one
    /// outgoing edge.
    waits: Mutex<HashMap<ThreadId, WaitEdge>>,
}

impl ModuleCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of a cached module
    pub fn get(&self, identity: &ModuleIdentity) -> Option<CachedModule> {
        self.cache.get(identity).map(|record| CachedModule {
            identity: identity.clone(),
            exports: record.module.exports(),
            loaded: matches!(record.state, ModuleState::Loaded),
            children: record.children.clone(),
            parent: record.parent.clone(),
        })
    }

    /// Check if a module is cached (loading or loaded)
    pub fn has(&self, identity: &ModuleIdentity) -> bool {
        self.cache.contains_key(identity)
    }

    /// Remove a module from the cache
    pub fn delete(&self, identity: &ModuleIdentity) -> Option<CachedModule> {
        let snapshot = self.get(identity)?;
        self.cache.remove(identity);
        debug!(%identity, "Removed module from cache");
        Some(snapshot)
    }

    /// Clear the entire cache
    pub fn clear(&self) {
        debug!(count = self.cache.len(), "Clearing module cache");
        self.cache.clear();
    }

    /// Get all cached identities, sorted
    pub fn keys(&self) -> Vec<ModuleIdentity> {
        let mut keys: Vec<_> = self.cache.iter().map(|entry| entry.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Get the number of cached modules
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    /// Record that `parent` required `child`
    pub(crate) fn add_child(&self, parent: &ModuleIdentity, child: &ModuleIdentity) {
        if let Some(mut record) = self.cache.get_mut(parent) {
            if !record.children.contains(child) {
                record.children.push(child.clone());
            }
        }
    }

    /// Look up `identity`, inserting a Loading record if it is absent.
    ///
    /// Waiting on a record whose owner is (transitively) waiting on this
    /// thread would never finish, so that case is reported as Circular.
    pub(crate) fn begin_load(
        self: &Arc<Self>,
        identity: &ModuleIdentity,
        parent: Option<&ModuleIdentity>,
    ) -> LoadSlot {
        let current = thread::current().id();
        // Lock order: `waits` before any cache shard.
        let mut waits = self.waits.lock();

        match self.cache.entry(identity.clone()) {
            Entry::Occupied(entry) => {
                let record = entry.get();
                match &record.state {
                    ModuleState::Loaded => LoadSlot::Ready(Arc::clone(&record.module)),
                    ModuleState::Loading { owner, .. } if *owner == current => {
                        LoadSlot::Circular(Arc::clone(&record.module))
                    }
                    ModuleState::Loading { owner, .. } if waits_for(&waits, *owner, current) => {
                        debug!(%identity, "Require cycle spans threads");
                        LoadSlot::Circular(Arc::clone(&record.module))
                    }
                    ModuleState::Loading { owner, latch } => {
                        waits.insert(
                            current,
                            WaitEdge {
                                owner: *owner,
                                latch: Arc::clone(latch),
                            },
                        );
                        LoadSlot::Pending(LoadWait {
                            cache: Arc::clone(self),
                            latch: Arc::clone(latch),
                        })
                    }
                }
            }
            Entry::Vacant(entry) => {
                let module = Arc::new(Module::new(identity.clone()));
                let latch = Arc::new(LoadLatch::default());
                entry.insert(ModuleRecord {
                    module: Arc::clone(&module),
                    state: ModuleState::Loading {
                        owner: current,
                        latch: Arc::clone(&latch),
                    },
                    parent: parent.filter(|p| !p.is_root()).cloned(),
                    children: Vec::new(),
                });
                trace!(%identity, "Claimed module for loading");
                LoadSlot::Started(PendingLoad {
                    cache: Arc::clone(self),
                    module,
                    latch,
                    settled: false,
                })
            }
        }
    }

    /// Drop every wait edge on `latch`; its waiters are about to wake
    fn forget_waiters(&self, latch: &Arc<LoadLatch>) {
        self.waits
            .lock()
            .retain(|_, edge| !Arc::ptr_eq(&edge.latch, latch));
    }

    /// Mark `module` Loaded, or purge it; no-op if the cache has since
    /// been cleared or the identity claimed by another load.
    fn settle(&self, module: &Arc<Module>, loaded: bool) {
        let identity = module.identity();
        if loaded {
            if let Some(mut record) = self.cache.get_mut(identity) {
                if Arc::ptr_eq(&record.module, module) {
                    record.state = ModuleState::Loaded;
                }
            }
        } else {
            let removed = self
                .cache
                .remove_if(identity, |_, record| Arc::ptr_eq(&record.module, module));
            if removed.is_some() {
                debug!(%identity, "Purged failed module from cache");
            }
        }
    }
}

/// A claimed Loading record
///
/// Dropping it without [`commit`](Self::commit) purges the record, so a
/// failed or panicking evaluation never leaves the identity stuck in
/// Loading.
pub(crate) struct PendingLoad {
    cache: Arc<ModuleCache>,
    module: Arc<Module>,
    latch: Arc<LoadLatch>,
    settled: bool,
}

impl PendingLoad {
    pub(crate) fn module(&self) -> &Arc<Module> {
        &self.module
    }

    /// Mark the module Loaded and wake waiters
    pub(crate) fn commit(mut self) {
        self.cache.settle(&self.module, true);
        self.settled = true;
        self.cache.forget_waiters(&self.latch);
        self.latch.release();
    }
}

impl Drop for PendingLoad {
    fn drop(&mut self) {
        if !self.settled {
            self.cache.settle(&self.module, false);
            self.cache.forget_waiters(&self.latch);
            self.latch.release();
        }
    }
}

/// A registered wait on another thread's load
pub(crate) struct LoadWait {
    cache: Arc<ModuleCache>,
    latch: Arc<LoadLatch>,
}

impl LoadWait {
    /// Block until the owning load settles
    pub(crate) fn wait(self) {
        self.latch.wait();
    }
}

impl Drop for LoadWait {
    fn drop(&mut self) {
        let current = thread::current().id();
        let mut waits = self.cache.waits.lock();
        if waits
            .get(&current)
            .is_some_and(|edge| Arc::ptr_eq(&edge.latch, &self.latch))
        {
            waits.remove(&current);
        }
    }
}

/// Whether following wait edges from `owner` leads back to `current`
fn waits_for(waits: &HashMap<ThreadId, WaitEdge>, owner: ThreadId, current: ThreadId) -> bool {
    let mut next = owner;
    for _ in 0..=waits.len() {
        if next == current {
            return true;
        }
        match waits.get(&next) {
            Some(edge) => next = edge.owner,
            None => return false,
        }
    }
    false
}
