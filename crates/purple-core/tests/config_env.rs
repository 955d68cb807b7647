// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Environment overrides; kept in its own test binary since it mutates the
//! process environment.

use purple_core::config::CONFIG_FILE;
use purple_core::{LoaderConfig, ModuleIdentity};

#[test]
fn test_load_applies_environment_after_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(CONFIG_FILE);
    std::fs::write(&path, "search_paths = [\"/from-file\"]\nmock_root = \"/app\"\n").unwrap();

    // SAFETY: the only test in this binary, so no other thread reads the
    // environment concurrently.
    unsafe {
        std::env::set_var("PURPLE_SEARCH_PATHS", "/lib, /vendor");
        std::env::set_var("PURPLE_ALIAS_MY_LIB", "/lib/mine");
    }

    let config = LoaderConfig::load(Some(&path)).unwrap();
    assert_eq!(config.search_paths, vec!["/lib", "/vendor"]);
    assert_eq!(config.mock_root, "/app");
    assert_eq!(config.aliases.get("my_lib").map(String::as_str), Some("/lib/mine"));
    assert_eq!(
        config.search_roots().unwrap(),
        vec![
            ModuleIdentity::parse("/lib").unwrap(),
            ModuleIdentity::parse("/vendor").unwrap()
        ]
    );

    unsafe {
        std::env::set_var("PURPLE_MOCK_ROOT", "relative");
    }
    assert!(LoaderConfig::load(Some(&path)).is_err());
}
