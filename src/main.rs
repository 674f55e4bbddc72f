//! `license-probe`: find the projects in a directory tree and resolve the
//! licenses of their dependencies.
//!
//! # Flow
//! 1. Parse CLI arguments ([`cli`]) and load config ([`config::load_config`]).
//! 2. Find the project roots to scan ([`project_finder::ProjectFinder`]).
//! 3. List each active package manager's packages ([`package_manager`]).
//! 4. Resolve every package's licenses ([`package`], [`license`]).
//! 5. Classify risk, apply policy ([`config::apply_policy`]) and render the report ([`report`]).
//! 6. Exit `0` (clean) or `1` (no project found, or at least one [`models::PolicyVerdict::Error`]).

mod cli;
mod config;
mod error;
mod license;
mod models;
mod package;
mod package_manager;
mod project_finder;
mod report;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;

use cli::{Cli, ReportFormat};
use config::{apply_policy, load_config, Config};
use license::classifier::classify_set;
use license::spdx::Catalog;
use models::{Dependency, PolicyVerdict};
use package::{Licensed, LogLicenseLogger, Resolver};
use package_manager::{package_managers, PackageManagerFactory};
use project_finder::{ProjectFinder, ProjectFinderOptions};

fn initialize_logger(debug: bool) -> Result<()> {
    let filter = if debug {
        simplelog::LevelFilter::Debug
    } else {
        simplelog::LevelFilter::Info
    };

    let config = simplelog::ConfigBuilder::new()
        .add_filter_allow_str("license_probe")
        .build();

    simplelog::TermLogger::init(
        filter,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_logger(cli.debug)?;

    let config = load_config(&cli.path, cli.config.as_deref())?;

    let factories: Vec<PackageManagerFactory> = package_managers()
        .into_iter()
        .filter(|f| !cli.exclude.iter().any(|e| e.name() == f.name))
        .collect();

    let aggregate_paths = if cli.aggregate_paths.is_empty() {
        config
            .scan
            .aggregate_paths
            .iter()
            .map(|p| cli.path.join(p))
            .collect()
    } else {
        cli.aggregate_paths.clone()
    };

    let finder = ProjectFinder::new(
        ProjectFinderOptions {
            project_path: Some(cli.path.clone()),
            aggregate_paths,
            recursive: cli.recursive || config.scan.recursive,
        },
        factories.clone(),
    )?;
    let projects = finder.paths_to_scan()?;
    log::info!("scanning {} project(s)", projects.len());

    let catalog = Catalog::new();
    let resolver = Resolver::new(&catalog, &LogLicenseLogger);

    let mut all_deps = Vec::new();
    let mut any_active = false;
    for project in &projects {
        let (active, deps) = scan_project(project, &factories, &resolver, &config)?;
        any_active |= active;
        all_deps.extend(deps);
    }

    if !any_active {
        eprintln!(
            "No supported project manifests found in {}",
            finder.main_project_path().display()
        );
        std::process::exit(1);
    }

    match cli.report {
        ReportFormat::Terminal => {
            report::terminal::render(&all_deps, &projects, cli.verbose, cli.quiet)?;
        }
        ReportFormat::Json => {
            report::json::render(&all_deps, &mut std::io::stdout().lock())?;
        }
    }

    if all_deps.iter().any(|d| d.verdict == PolicyVerdict::Error) {
        std::process::exit(1);
    }

    Ok(())
}

/// Resolve every package of every package manager active in `project`.
///
/// Returns whether any package manager was active, and the dependencies found.
fn scan_project(
    project: &Path,
    factories: &[PackageManagerFactory],
    resolver: &Resolver<'_>,
    config: &Config,
) -> Result<(bool, Vec<Dependency>)> {
    let mut active = false;
    let mut deps = Vec::new();

    for factory in factories {
        let package_manager = factory.create(project);
        if !package_manager.active()? {
            continue;
        }
        active = true;

        let packages = package_manager.current_packages()?;
        log::info!(
            "{} {}: {} packages",
            project.display(),
            package_manager.name(),
            packages.len()
        );

        for package in packages {
            let licensed = Licensed::new(package);
            let licenses = licensed.licenses(resolver);
            let pkg = licensed.package();

            deps.push(Dependency {
                name: pkg.name().to_string(),
                version: pkg.version().to_string(),
                package_manager: package_manager.name().to_string(),
                licenses: licenses.iter().cloned().collect(),
                groups: pkg.groups().iter().cloned().collect(),
                summary: pkg.summary().to_string(),
                description: pkg.description().to_string(),
                homepage: pkg.homepage().to_string(),
                children: pkg.children().to_vec(),
                project: PathBuf::from(project),
                risk: classify_set(licenses),
                verdict: apply_policy(config, licenses),
            });
        }
    }

    Ok((active, deps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::License;
    use crate::models::LicenseRisk;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scan_project_resolves_and_judges_packages() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        fs::write(
            dir.path().join("package-lock.json"),
            r#"{"packages": {
                "node_modules/left-pad": {
                    "version": "1.3.0",
                    "license": "WTFPL",
                    "dependencies": {"pad-core": "^1.0.0"}
                },
                "node_modules/gpl-thing": {"version": "2.0.0", "license": "GPL-3.0"},
                "node_modules/mystery": {"version": "0.1.0", "dev": true}
            }}"#,
        )
        .unwrap();
        let left_pad = dir.path().join("node_modules").join("left-pad");
        fs::create_dir_all(&left_pad).unwrap();
        fs::write(
            left_pad.join("package.json"),
            r#"{"name": "left-pad", "version": "1.3.0", "license": "WTFPL",
                "description": "String left pad", "homepage": "https://github.com/left-pad/left-pad"}"#,
        )
        .unwrap();

        let resolver = Resolver::new(&Catalog, &LogLicenseLogger);
        let (active, deps) =
            scan_project(dir.path(), &package_managers(), &resolver, &Config::default()).unwrap();

        assert!(active);
        assert_eq!(deps.len(), 3);

        let left_pad = deps.iter().find(|d| d.name == "left-pad").unwrap();
        assert_eq!(left_pad.licenses, vec![License::new("WTFPL")]);
        assert_eq!(left_pad.description, "String left pad");
        assert_eq!(left_pad.homepage, "https://github.com/left-pad/left-pad");
        assert_eq!(left_pad.children, vec!["pad-core".to_string()]);

        let gpl = deps.iter().find(|d| d.name == "gpl-thing").unwrap();
        assert_eq!(gpl.licenses, vec![License::new("GPL-3.0")]);
        assert_eq!(gpl.risk, LicenseRisk::StrongCopyleft);
        assert_eq!(gpl.verdict, PolicyVerdict::Error);

        let mystery = deps.iter().find(|d| d.name == "mystery").unwrap();
        assert_eq!(mystery.licenses, vec![License::new("unknown")]);
        assert_eq!(mystery.groups, vec!["development".to_string()]);
        assert_eq!(mystery.verdict, PolicyVerdict::Warn);
    }

    #[test]
    fn test_scan_project_without_package_managers() {
        let dir = TempDir::new().unwrap();
        let resolver = Resolver::new(&Catalog, &LogLicenseLogger);
        let (active, deps) =
            scan_project(dir.path(), &package_managers(), &resolver, &Config::default()).unwrap();

        assert!(!active);
        assert!(deps.is_empty());
    }
}
