// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for module loading

use crate::module_system::ModuleIdentity;
use thiserror::Error;

/// Error type produced by host capabilities (evaluators, native functions)
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for module system operations
pub type Result<T> = std::result::Result<T, ModuleError>;

/// Errors that can occur while resolving, loading or evaluating modules
#[derive(Debug, Error)]
pub enum ModuleError {
    /// No resource, native module or mock matched the specifier
    #[error("Cannot find module '{specifier}' from '{caller}'")]
    NotFound {
        /// Specifier as written by the caller
        specifier: String,
        /// Identity of the requiring module
        caller: String,
    },

    /// Specifier is malformed or points outside the module root
    #[error("Invalid module specifier '{specifier}': {reason}")]
    InvalidSpecifier {
        /// Specifier as written by the caller
        specifier: String,
        /// Reason for failure
        reason: String,
    },

    /// Module body raised while being evaluated
    #[error("Error evaluating module '{identity}': {source}")]
    Evaluation {
        /// Module that failed
        identity: ModuleIdentity,
        /// Underlying cause
        #[source]
        source: BoxError,
    },

    /// Resource loader failed to read an existing module
    #[error("Error reading module '{identity}': {source}")]
    Resource {
        /// Module being read
        identity: ModuleIdentity,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Configuration is invalid
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// File system error
    #[error("File system error: {0}")]
    Io(#[from] std::io::Error),

    /// Type error (calling a non-function, exporting onto a non-object)
    #[error("TypeError: {0}")]
    TypeError(String),

    /// `require` was called after its loader had been dropped
    #[error("Cannot require '{specifier}' from '{caller}': the module loader has been dropped")]
    LoaderDropped {
        /// Specifier as written by the caller
        specifier: String,
        /// Identity of the requiring module
        caller: String,
    },

    /// A native function returned an error
    #[error("{0}")]
    Call(BoxError),
}

impl ModuleError {
    /// Create a module not found error
    pub fn not_found(specifier: impl Into<String>, caller: &ModuleIdentity) -> Self {
        Self::NotFound {
            specifier: specifier.into(),
            caller: caller.to_string(),
        }
    }

    /// Create an invalid specifier error
    pub fn invalid_specifier(specifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSpecifier {
            specifier: specifier.into(),
            reason: reason.into(),
        }
    }

    /// Create a new TypeError
    pub fn type_error(msg: impl Into<String>) -> Self {
        Self::TypeError(msg.into())
    }

    /// Wrap a failure raised by a module body
    pub fn evaluation(identity: &ModuleIdentity, source: impl Into<BoxError>) -> Self {
        Self::Evaluation {
            identity: identity.clone(),
            source: source.into(),
        }
    }

    /// Whether this is a resolution failure
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::InvalidSpecifier { .. })
    }

    /// Whether this is an evaluation failure
    pub fn is_evaluation(&self) -> bool {
        matches!(self, Self::Evaluation { .. })
    }
}
