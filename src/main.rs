// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! purple CLI - inspect how module specifiers resolve

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use purple_core::config::CONFIG_FILE;
use purple_core::host::DirectoryResources;
use purple_core::module_system::ModuleResolver;
use purple_core::{LoaderConfig, MockRegistry, ModuleIdentity, Value, VERSION};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

#[derive(Parser)]
#[command(
    name = "purple",
    about = "Module tooling for the Purple scripting runtime",
    version = VERSION,
    author = "Pegasus Heavy Industries"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve specifiers to module identities
    Resolve(ResolveArgs),
}

#[derive(Args)]
struct ResolveArgs {
    /// Specifiers to resolve
    #[arg(required = true)]
    specifiers: Vec<String>,

    /// Identity of the requiring module
    #[arg(long, default_value = "/")]
    from: String,

    /// Directory module identities are served from
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Loader configuration (defaults to purple.toml under --root, if present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Register a mock at this identity before resolving
    #[arg(long = "mock", value_name = "ID")]
    mocks: Vec<String>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

/// Outcome for one specifier
#[derive(Debug, Serialize)]
struct Resolution {
    specifier: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    identity: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl Resolution {
    fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("purple=debug,purple_core=debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter("purple=warn,purple_core=warn")
            .with_writer(std::io::stderr)
            .init();
    }

    match cli.command {
        Command::Resolve(args) => {
            let results = resolve_all(&args)?;
            print_results(&results, args.json)?;
            if !results.iter().all(Resolution::is_ok) {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn load_config(args: &ResolveArgs) -> anyhow::Result<LoaderConfig> {
    let default_file = args.root.join(CONFIG_FILE);
    let path: Option<&Path> = match &args.config {
        Some(path) => Some(path),
        None if default_file.is_file() => Some(&default_file),
        None => None,
    };
    debug!(config = ?path, root = %args.root.display(), "Loading loader configuration");
    LoaderConfig::load(path).context("failed to load loader configuration")
}

fn resolve_all(args: &ResolveArgs) -> anyhow::Result<Vec<Resolution>> {
    let config = load_config(args)?;
    let mocks = MockRegistry::with_root(config.mock_root()?);
    for mock in &args.mocks {
        mocks
            .register_mock(mock, Value::Undefined)
            .with_context(|| format!("invalid mock identity '{}'", mock))?;
    }

    let caller = ModuleIdentity::parse(&args.from)
        .with_context(|| format!("invalid --from identity '{}'", args.from))?;
    let resources = Arc::new(DirectoryResources::new(&args.root));
    let resolver = ModuleResolver::new(config, resources)?;
    debug!(caller = %caller, mocks = mocks.len(), "Resolving {} specifier(s)", args.specifiers.len());

    let results = args
        .specifiers
        .iter()
        .map(|specifier| match resolver.resolve(specifier, &caller, &mocks) {
            Ok(resolved) => Resolution {
                specifier: specifier.clone(),
                identity: Some(resolved.identity.to_string()),
                kind: Some(resolved.kind.as_str()),
                error: None,
            },
            Err(e) => Resolution {
                specifier: specifier.clone(),
                identity: None,
                kind: None,
                error: Some(e.to_string()),
            },
        })
        .collect();
    Ok(results)
}

fn print_results(results: &[Resolution], json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }

    for result in results {
        match (&result.identity, result.kind, &result.error) {
            (Some(identity), Some(kind), _) => {
                println!(
                    "{} {} {} {}",
                    result.specifier.cyan(),
                    "->".dimmed(),
                    identity.green(),
                    format!("({})", kind).dimmed()
                );
            }
            (_, _, Some(error)) => {
                eprintln!("{}: {}", "Error".red().bold(), error);
            }
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn args(root: &Path, specifiers: &[&str]) -> ResolveArgs {
        ResolveArgs {
            specifiers: specifiers.iter().map(|s| s.to_string()).collect(),
            from: "/app/main.js".to_string(),
            root: root.to_path_buf(),
            config: None,
            mocks: Vec::new(),
            json: false,
        }
    }

    #[test]
    fn test_cli_parses_resolve() {
        let cli = Cli::try_parse_from([
            "purple", "resolve", "./a", "./b", "--from", "/app/x.js", "--mock", "/m.js", "--json",
        ])
        .unwrap();
        let Command::Resolve(args) = cli.command;
        assert_eq!(args.specifiers, vec!["./a", "./b"]);
        assert_eq!(args.from, "/app/x.js");
        assert_eq!(args.mocks, vec!["/m.js"]);
        assert!(args.json);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_resolve_against_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("app/util")).unwrap();
        fs::write(dir.path().join("app/library.js"), "").unwrap();
        fs::write(dir.path().join("app/data.json"), "{}").unwrap();
        fs::write(dir.path().join("app/util/index.js"), "").unwrap();

        let results =
            resolve_all(&args(dir.path(), &["./library", "./data", "./util", "./missing"])).unwrap();

        assert_eq!(results[0].identity.as_deref(), Some("/app/library.js"));
        assert_eq!(results[0].kind, Some("script"));
        assert_eq!(results[1].identity.as_deref(), Some("/app/data.json"));
        assert_eq!(results[1].kind, Some("json"));
        assert_eq!(results[2].identity.as_deref(), Some("/app/util/index.js"));
        assert!(!results[3].is_ok());
        assert!(results[3].error.as_deref().unwrap().contains("Cannot find module"));
    }

    #[test]
    fn test_mocks_and_config_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            "mock_root = \"/app\"\nsearch_paths = [\"/vendor\"]\n",
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("vendor")).unwrap();
        fs::write(dir.path().join("vendor/left-pad.js"), "").unwrap();

        let mut args = args(dir.path(), &["./fake", "left-pad"]);
        args.mocks = vec!["./fake.js".to_string()];
        let results = resolve_all(&args).unwrap();

        assert_eq!(results[0].identity.as_deref(), Some("/app/fake.js"));
        assert_eq!(results[0].kind, Some("synthetic"));
        assert_eq!(results[1].identity.as_deref(), Some("/vendor/left-pad.js"));
    }
}
