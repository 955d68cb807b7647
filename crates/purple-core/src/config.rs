// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Loader configuration
//!
//! Read from `purple.toml`:
//!
//! ```toml
//! extensions = [".js", ".json"]
//! index_names = ["index"]
//! search_paths = ["/lib"]
//! mock_root = "/"
//!
//! [aliases]
//! "@app" = "/app"
//! ```

use crate::error::{ModuleError, Result};
use crate::module_system::ModuleIdentity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Default configuration file name
pub const CONFIG_FILE: &str = "purple.toml";

/// Prefix for environment overrides (`PURPLE_SEARCH_PATHS=/lib,/vendor`)
const ENV_PREFIX: &str = "PURPLE_";

/// Module resolution settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Extensions probed after the exact path, in order
    pub extensions: Vec<String>,

    /// File stems probed inside a directory-like path
    pub index_names: Vec<String>,

    /// Absolute roots searched for bare specifiers, in order
    pub search_paths: Vec<String>,

    /// Leading-segment rewrites applied before resolution
    pub aliases: BTreeMap<String, String>,

    /// Root that relative mock registrations are anchored at
    pub mock_root: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            extensions: vec![".js".to_string(), ".json".to_string()],
            index_names: vec!["index".to_string()],
            search_paths: vec!["/lib".to_string()],
            aliases: BTreeMap::new(),
            mock_root: "/".to_string(),
        }
    }
}

impl LoaderConfig {
    /// Load configuration: defaults, then `path` if given, then environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading loader config from {}", path.display());
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `PURPLE_*` environment variables
    fn load_from_env(&mut self) {
        self.apply_env(std::env::vars());
    }

    /// Apply `PURPLE_*` variables from `vars`.
    ///
    /// `PURPLE_SEARCH_PATHS` sets `search-paths`. For aliases only the
    /// `ALIAS_` prefix is rewritten, so `PURPLE_ALIAS_MY_LIB` names the
    /// alias `my_lib`.
    pub fn apply_env<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(name) = key.strip_prefix(ENV_PREFIX) {
                let config_key = match name.strip_prefix("ALIAS_") {
                    Some(alias) => format!("alias-{}", alias.to_lowercase()),
                    None => name.to_lowercase().replace('_', "-"),
                };
                debug!(key = %key, "Applying environment override");
                self.set(&config_key, &value);
            }
        }
    }

    /// Set a configuration value from its string form. Lists are
    /// comma-separated; unknown keys are ignored.
    pub fn set(&mut self, key: &str, value: &str) {
        let list = || {
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect::<Vec<_>>()
        };

        match key {
            "extensions" => self.extensions = list(),
            "index-names" => self.index_names = list(),
            "search-paths" => self.search_paths = list(),
            "mock-root" => self.mock_root = value.to_string(),
            _ => {
                if let Some(alias) = key.strip_prefix("alias-") {
                    self.aliases.insert(alias.to_string(), value.to_string());
                }
            }
        }
    }

    /// Check that every path setting is usable
    pub fn validate(&self) -> Result<()> {
        for ext in &self.extensions {
            if !ext.starts_with('.') || ext.len() < 2 || ext.contains('/') {
                return Err(ModuleError::Config(format!("extension '{}' must look like '.js'", ext)));
            }
        }
        for name in &self.index_names {
            if name.is_empty() || name.contains('/') {
                return Err(ModuleError::Config(format!("index name '{}' must be a single segment", name)));
            }
        }
        for path in &self.search_paths {
            absolute(path, "search path")?;
        }
        for (alias, target) in &self.aliases {
            if alias.is_empty() || alias.starts_with('.') || alias.starts_with('/') {
                return Err(ModuleError::Config(format!("alias '{}' must be a bare name", alias)));
            }
            absolute(target, "alias target")?;
        }
        absolute(&self.mock_root, "mock root")?;
        Ok(())
    }

    /// Parsed search paths
    pub fn search_roots(&self) -> Result<Vec<ModuleIdentity>> {
        self.search_paths
            .iter()
            .map(|path| absolute(path, "search path"))
            .collect()
    }

    /// Parsed mock root
    pub fn mock_root(&self) -> Result<ModuleIdentity> {
        absolute(&self.mock_root, "mock root")
    }

    /// Rewrite the leading segment of `specifier` if it names an alias
    pub fn apply_alias(&self, specifier: &str) -> Option<String> {
        self.aliases.iter().find_map(|(alias, target)| {
            if specifier == alias {
                Some(target.clone())
            } else {
                specifier
                    .strip_prefix(alias.as_str())
                    .and_then(|rest| rest.strip_prefix('/'))
                    .map(|rest| format!("{}/{}", target.trim_end_matches('/'), rest))
            }
        })
    }
}

fn absolute(path: &str, what: &str) -> Result<ModuleIdentity> {
    if !path.starts_with('/') {
        return Err(ModuleError::Config(format!("{} '{}' must be absolute", what, path)));
    }
    ModuleIdentity::parse(path).map_err(|e| ModuleError::Config(format!("{} '{}': {}", what, path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = LoaderConfig::default();
        config.validate().unwrap();
        assert_eq!(config.extensions, vec![".js", ".json"]);
        assert_eq!(config.mock_root().unwrap(), ModuleIdentity::root());
    }

    #[test]
    fn test_from_toml() {
        let config = LoaderConfig::from_toml_str(
            r#"
            extensions = [".js"]
            search_paths = ["/lib", "/vendor"]

            [aliases]
            "@app" = "/app"
            "#,
        )
        .unwrap();

        assert_eq!(config.extensions, vec![".js"]);
        assert_eq!(config.index_names, vec!["index"]);
        assert_eq!(config.search_roots().unwrap().len(), 2);
        assert_eq!(config.aliases.get("@app").map(String::as_str), Some("/app"));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(LoaderConfig::from_toml_str(r#"extensions = ["js"]"#).is_err());
        assert!(LoaderConfig::from_toml_str(r#"search_paths = ["lib"]"#).is_err());
        assert!(LoaderConfig::from_toml_str(r#"mock_root = "/../x""#).is_err());
        assert!(matches!(
            LoaderConfig::from_toml_str("extensions = 3"),
            Err(ModuleError::Toml(_))
        ));

        let mut config = LoaderConfig::default();
        config.aliases.insert("app".to_string(), "relative".to_string());
        assert!(matches!(config.validate(), Err(ModuleError::Config(_))));
    }

    #[test]
    fn test_set() {
        let mut config = LoaderConfig::default();
        config.set("search-paths", "/lib, /vendor");
        config.set("mock-root", "/test");
        config.set("alias-core", "/lib/core");
        config.set("unknown", "ignored");

        assert_eq!(config.search_paths, vec!["/lib", "/vendor"]);
        assert_eq!(config.mock_root, "/test");
        assert_eq!(config.aliases.get("core").map(String::as_str), Some("/lib/core"));
    }

    #[test]
    fn test_apply_alias() {
        let mut config = LoaderConfig::default();
        config.aliases.insert("@app".to_string(), "/app/".to_string());

        assert_eq!(config.apply_alias("@app").as_deref(), Some("/app/"));
        assert_eq!(config.apply_alias("@app/lib/x").as_deref(), Some("/app/lib/x"));
        assert_eq!(config.apply_alias("@application"), None);
        assert_eq!(config.apply_alias("./@app"), None);
    }

    #[test]
    fn test_apply_env() {
        let vars = [
            ("PURPLE_SEARCH_PATHS", "/lib,/vendor"),
            ("PURPLE_INDEX_NAMES", "main"),
            ("PURPLE_ALIAS_MY_LIB", "/lib/mine"),
            ("HOME", "/root"),
        ];
        let mut config = LoaderConfig::default();
        config.apply_env(vars.iter().map(|(k, v)| (k.to_string(), v.to_string())));

        assert_eq!(config.search_paths, vec!["/lib", "/vendor"]);
        assert_eq!(config.index_names, vec!["main"]);
        assert_eq!(config.aliases.get("my_lib").map(String::as_str), Some("/lib/mine"));
        assert_eq!(config.aliases.len(), 1);
        assert_eq!(config.apply_alias("my_lib/x").as_deref(), Some("/lib/mine/x"));
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "index_names = [\"main\"]\n").unwrap();

        let config = LoaderConfig::from_file(&path).unwrap();
        assert_eq!(config.index_names, vec!["main"]);
    }
}
