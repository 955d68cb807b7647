// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bindings handed to a module body: `exports`, `module`, `require`,
//! `resolve`, `__filename`, `__dirname` and the `__` test helper.

use crate::error::{ModuleError, Result};
use crate::module_system::cache::Module;
use crate::module_system::identity::{self, ModuleIdentity};
use crate::module_system::loader::{ModuleLoader, Required, WeakLoader};
use crate::value::Value;
use std::sync::Arc;

/// The require() function bound to a calling module
///
/// Holds the loader weakly: once every [`ModuleLoader`] handle is dropped,
/// calls fail with [`ModuleError::LoaderDropped`].
#[derive(Clone)]
pub struct Require {
    loader: WeakLoader,
    caller: ModuleIdentity,
}

impl Require {
    /// Bind `require` to `caller`
    pub fn new(loader: &ModuleLoader, caller: ModuleIdentity) -> Self {
        Self {
            loader: loader.downgrade(),
            caller,
        }
    }

    fn loader(&self, specifier: &str) -> Result<ModuleLoader> {
        self.loader.upgrade().ok_or_else(|| ModuleError::LoaderDropped {
            specifier: specifier.to_string(),
            caller: self.caller.to_string(),
        })
    }

    /// require(specifier)
    pub fn call(&self, specifier: &str) -> Result<Value> {
        self.loader(specifier)?.require(specifier, &self.caller)
    }

    /// require(specifier), reporting where the exports came from
    pub fn call_traced(&self, specifier: &str) -> Result<Required> {
        self.loader(specifier)?.require_traced(specifier, &self.caller)
    }

    /// require.resolve(specifier) - the identity without loading
    pub fn resolve(&self, specifier: &str) -> Result<ModuleIdentity> {
        self.loader(specifier)?.resolve(specifier, &self.caller)
    }

    /// Identity this require is bound to
    pub fn caller(&self) -> &ModuleIdentity {
        &self.caller
    }
}

/// The `__` helper object: mock registration from inside scripts
#[derive(Clone)]
pub struct MockHelper {
    require: Require,
}

impl MockHelper {
    /// __.registerMock(path, exports)
    pub fn register_mock(&self, specifier: &str, exports: Value) -> Result<ModuleIdentity> {
        self.require.loader(specifier)?.register_mock(specifier, exports)
    }

    /// __.unregisterMock(path)
    pub fn unregister_mock(&self, specifier: &str) -> Result<Option<Value>> {
        self.require.loader(specifier)?.unregister_mock(specifier)
    }

    /// __.reset(); nothing to clear once the loader is gone
    pub fn reset(&self) {
        if let Some(loader) = self.require.loader.upgrade() {
            loader.reset_mocks();
        }
    }
}

/// Everything a module body can see
pub struct ModuleScope {
    module: Arc<Module>,
    require: Require,
    helper: MockHelper,
}

impl ModuleScope {
    pub(crate) fn new(loader: &ModuleLoader, module: Arc<Module>) -> Self {
        let require = Require::new(loader, module.identity().clone());
        let helper = MockHelper {
            require: require.clone(),
        };
        Self {
            module,
            require,
            helper,
        }
    }

    /// The module's identity
    pub fn identity(&self) -> &ModuleIdentity {
        self.module.identity()
    }

    /// __filename
    pub fn filename(&self) -> &str {
        self.module.identity().as_str()
    }

    /// __dirname
    pub fn dirname(&self) -> ModuleIdentity {
        self.module.identity().dirname()
    }

    /// exports
    pub fn exports(&self) -> Value {
        self.module.exports()
    }

    /// module.exports = value
    pub fn set_exports(&self, exports: Value) {
        self.module.set_exports(exports);
    }

    /// exports[name] = value
    pub fn export(&self, name: &str, value: impl Into<Value>) -> Result<()> {
        match self.module.exports() {
            Value::Object(obj) => {
                obj.set(name, value);
                Ok(())
            }
            other => Err(ModuleError::type_error(format!(
                "cannot set '{}' on exports of type {}",
                name,
                other.type_of()
            ))),
        }
    }

    /// require
    pub fn require(&self) -> &Require {
        &self.require
    }

    /// resolve(path) - a path relative to this module, not probed
    pub fn resolve(&self, path: &str) -> Result<ModuleIdentity> {
        match identity::SpecifierKind::of(path) {
            identity::SpecifierKind::Bare => self.dirname().join(path),
            _ => identity::canonicalize(path, self.identity()),
        }
    }

    /// __
    pub fn helper(&self) -> &MockHelper {
        &self.helper
    }
}
