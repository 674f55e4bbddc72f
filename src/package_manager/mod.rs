use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::package::Package;

pub mod cargo;
pub mod maven;
pub mod npm;
pub mod pip;

/// A package manager looked at from one project directory.
pub trait PackageManager {
    /// Short, user-facing name (`npm`, `cargo`, ...).
    fn name(&self) -> &'static str;

    fn project_path(&self) -> &Path;

    /// Files whose presence in the project directory marks a project of this kind.
    fn markers(&self) -> &'static [&'static str];

    /// Whether the project directory is managed by this package manager.
    fn active(&self) -> Result<bool> {
        for marker in self.markers() {
            if self.project_path().join(marker).try_exists()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Every package this package manager reports for the project.
    fn current_packages(&self) -> Result<Vec<Box<dyn Package>>>;
}

/// Builds a [`PackageManager`] for a given project directory.
#[derive(Clone, Copy)]
pub struct PackageManagerFactory {
    pub name: &'static str,
    pub build: fn(&Path) -> Box<dyn PackageManager>,
}

impl PackageManagerFactory {
    pub fn create(&self, project_path: &Path) -> Box<dyn PackageManager> {
        (self.build)(project_path)
    }
}

impl std::fmt::Debug for PackageManagerFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PackageManagerFactory")
            .field("name", &self.name)
            .finish()
    }
}

/// Every package manager this tool knows about.
pub fn package_managers() -> Vec<PackageManagerFactory> {
    vec![
        PackageManagerFactory {
            name: "cargo",
            build: cargo::Cargo::build,
        },
        PackageManagerFactory {
            name: "maven",
            build: maven::Maven::build,
        },
        PackageManagerFactory {
            name: "npm",
            build: npm::Npm::build,
        },
        PackageManagerFactory {
            name: "pip",
            build: pip::Pip::build,
        },
    ]
}

/// Split an SPDX-style expression such as `(MIT OR Apache-2.0)` into its
/// license names. `WITH` exceptions are dropped.
pub fn split_license_expression(expr: &str) -> Vec<String> {
    let cleaned = expr.replace(['(', ')'], " ");
    let mut names = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut skip_exception = false;

    for token in cleaned.split_whitespace() {
        if skip_exception {
            skip_exception = false;
            continue;
        }
        match token {
            "OR" | "AND" => {
                if !current.is_empty() {
                    names.push(current.join(" "));
                    current.clear();
                }
            }
            "WITH" => skip_exception = true,
            _ => current.push(token),
        }
    }
    if !current.is_empty() {
        names.push(current.join(" "));
    }
    names
}

/// A directory inside `root` if it exists.
fn existing_dir(root: &Path, relative: impl AsRef<Path>) -> Option<PathBuf> {
    let path = root.join(relative);
    path.is_dir().then_some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_split_single() {
        assert_eq!(split_license_expression("MIT"), vec!["MIT"]);
        assert_eq!(
            split_license_expression("Apache License, Version 2.0"),
            vec!["Apache License, Version 2.0"]
        );
    }

    #[test]
    fn test_split_compound() {
        assert_eq!(
            split_license_expression("(MIT OR Apache-2.0) AND BSD-3-Clause"),
            vec!["MIT", "Apache-2.0", "BSD-3-Clause"]
        );
        assert_eq!(
            split_license_expression("GPL-2.0 WITH Classpath-exception-2.0 OR MIT"),
            vec!["GPL-2.0", "MIT"]
        );
    }

    #[test]
    fn test_registry_names_match_adapters() {
        let dir = TempDir::new().unwrap();
        for factory in package_managers() {
            assert_eq!(factory.create(dir.path()).name(), factory.name);
        }
    }

    #[test]
    fn test_active_by_marker() {
        let dir = TempDir::new().unwrap();
        let pm = npm::Npm::new(dir.path());
        assert!(!pm.active().unwrap());
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        assert!(pm.active().unwrap());
    }
}
