// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Canonical module identities
//!
//! Identities are absolute, `/`-separated paths with no `.` or `..`
//! segments, e.g. `/app/mock/library.js`. Canonicalization is purely
//! lexical; it never touches a resource loader.

use crate::error::{ModuleError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical key of a module
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModuleIdentity(String);

/// How a specifier is anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecifierKind {
    /// `./x` or `../x`, resolved against the caller's directory
    Relative,
    /// `/x`, resolved against the root
    Absolute,
    /// `x`, resolved through search paths
    Bare,
}

impl SpecifierKind {
    /// Classify a specifier
    pub fn of(specifier: &str) -> Self {
        if specifier == "." || specifier == ".." || specifier.starts_with("./") || specifier.starts_with("../") {
            SpecifierKind::Relative
        } else if specifier.starts_with('/') {
            SpecifierKind::Absolute
        } else {
            SpecifierKind::Bare
        }
    }
}

impl ModuleIdentity {
    /// The root identity `/`
    pub fn root() -> Self {
        Self("/".to_string())
    }

    /// Parse an absolute path into an identity
    pub fn parse(path: &str) -> Result<Self> {
        let path = path.replace('\\', "/");
        if !path.starts_with('/') {
            return Err(ModuleError::invalid_specifier(path, "identity must be absolute"));
        }
        normalize(&path).map(Self)
    }

    /// Borrow the identity as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the root identity
    pub fn is_root(&self) -> bool {
        self.0 == "/"
    }

    /// Directory containing this module; the root is its own directory
    pub fn dirname(&self) -> ModuleIdentity {
        match self.0.rfind('/') {
            Some(0) | None => Self::root(),
            Some(idx) => Self(self.0[..idx].to_string()),
        }
    }

    /// Last path segment
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.rsplit('/').next()
    }

    /// Extension of the last segment, without the dot
    pub fn extension(&self) -> Option<&str> {
        let name = self.file_name()?;
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }

    /// Resolve `path` against this identity taken as a directory
    pub fn join(&self, path: &str) -> Result<ModuleIdentity> {
        let path = path.replace('\\', "/");
        if path.starts_with('/') {
            return Self::parse(&path);
        }
        normalize(&format!("{}/{}", self.0, path)).map(Self)
    }

    /// Append a suffix to the last segment (`/a/b` + `.js` = `/a/b.js`)
    pub fn with_suffix(&self, suffix: &str) -> ModuleIdentity {
        Self(format!("{}{}", self.0, suffix))
    }

    /// Append a child segment (`/a/b` + `index.js` = `/a/b/index.js`)
    pub fn child(&self, name: &str) -> ModuleIdentity {
        if self.is_root() {
            Self(format!("/{}", name))
        } else {
            Self(format!("{}/{}", self.0, name))
        }
    }
}

impl fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModuleIdentity {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ModuleIdentity {
    type Error = ModuleError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ModuleIdentity> for String {
    fn from(identity: ModuleIdentity) -> Self {
        identity.0
    }
}

/// Canonicalize `specifier` against the module `base`.
///
/// Relative specifiers are taken from the directory of `base`; absolute
/// specifiers ignore it. Bare specifiers are not handled here.
pub fn canonicalize(specifier: &str, base: &ModuleIdentity) -> Result<ModuleIdentity> {
    match SpecifierKind::of(specifier) {
        SpecifierKind::Relative => base.dirname().join(specifier),
        SpecifierKind::Absolute => ModuleIdentity::parse(specifier),
        SpecifierKind::Bare => Err(ModuleError::invalid_specifier(
            specifier,
            "bare specifiers need a search path",
        )),
    }
}

/// Lexically normalize an absolute `/`-separated path
fn normalize(path: &str) -> Result<String> {
    let mut components: Vec<&str> = Vec::new();

    for component in path.split('/') {
        match component {
            "" | "." => continue,
            ".." => {
                if components.pop().is_none() {
                    return Err(ModuleError::invalid_specifier(path, "path escapes the module root"));
                }
            }
            c => components.push(c),
        }
    }

    Ok(format!("/{}", components.join("/")))
}
