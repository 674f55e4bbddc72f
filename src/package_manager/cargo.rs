use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use super::{split_license_expression, PackageManager};
use crate::package::Package;

#[derive(Debug, Deserialize)]
struct CargoLock {
    #[serde(default)]
    package: Vec<CargoLockPackage>,
}

#[derive(Debug, Deserialize)]
struct CargoLockPackage {
    name: String,
    version: String,
    /// Packages without a `source` field are local workspace members.
    source: Option<String>,
    /// Entries look like `name`, `name version` or `name version (source)`.
    #[serde(default)]
    dependencies: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct CargoManifest {
    package: Option<CargoManifestPackage>,
}

#[derive(Debug, Default, Deserialize)]
struct CargoManifestPackage {
    description: Option<String>,
    homepage: Option<String>,
    repository: Option<String>,
    license: Option<String>,
}

/// Rust projects: `Cargo.toml`, resolved through `Cargo.lock` and the local
/// registry source cache.
pub struct Cargo {
    project_path: PathBuf,
}

impl Cargo {
    pub fn new(project_path: &Path) -> Self {
        Self {
            project_path: project_path.to_path_buf(),
        }
    }

    pub fn build(project_path: &Path) -> Box<dyn PackageManager> {
        Box::new(Self::new(project_path))
    }
}

impl PackageManager for Cargo {
    fn name(&self) -> &'static str {
        "cargo"
    }

    fn project_path(&self) -> &Path {
        &self.project_path
    }

    fn markers(&self) -> &'static [&'static str] {
        &["Cargo.toml"]
    }

    fn current_packages(&self) -> Result<Vec<Box<dyn Package>>> {
        let lock_path = self.project_path.join("Cargo.lock");
        if !lock_path.exists() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&lock_path)?;
        let lock: CargoLock = toml::from_str(&content)?;
        let sources = registry_source_dirs(cargo_home().as_deref());

        Ok(lock
            .package
            .into_iter()
            .filter(|p| p.source.is_some())
            .map(|p| Box::new(CargoPackage::from_lock(p, &sources)) as Box<dyn Package>)
            .collect())
    }
}

pub struct CargoPackage {
    name: String,
    version: String,
    description: String,
    homepage: String,
    groups: BTreeSet<String>,
    children: Vec<String>,
    install_path: Option<PathBuf>,
    license: Option<String>,
}

impl CargoPackage {
    fn from_lock(locked: CargoLockPackage, sources: &[PathBuf]) -> Self {
        let dir_name = format!("{}-{}", locked.name, locked.version);
        let install_path = sources
            .iter()
            .map(|src| src.join(&dir_name))
            .find(|dir| dir.is_dir());
        let manifest = install_path
            .as_deref()
            .and_then(read_manifest)
            .and_then(|m| m.package)
            .unwrap_or_default();

        let children = locked
            .dependencies
            .iter()
            .filter_map(|d| d.split_whitespace().next())
            .map(str::to_string)
            .collect();

        Self {
            name: locked.name,
            version: locked.version,
            description: manifest.description.unwrap_or_default(),
            homepage: manifest
                .homepage
                .or(manifest.repository)
                .unwrap_or_default(),
            groups: BTreeSet::new(),
            children,
            install_path,
            license: manifest.license,
        }
    }
}

impl Package for CargoPackage {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn summary(&self) -> &str {
        ""
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn homepage(&self) -> &str {
        &self.homepage
    }

    fn groups(&self) -> &BTreeSet<String> {
        &self.groups
    }

    fn children(&self) -> &[String] {
        &self.children
    }

    fn install_path(&self) -> Option<&Path> {
        self.install_path.as_deref()
    }

    fn license_names_from_spec(&self) -> Vec<String> {
        // older crates use `MIT/Apache-2.0`
        self.license
            .as_deref()
            .map(|l| split_license_expression(&l.replace('/', " OR ")))
            .unwrap_or_default()
    }
}

fn read_manifest(dir: &Path) -> Option<CargoManifest> {
    let content = std::fs::read_to_string(dir.join("Cargo.toml")).ok()?;
    toml::from_str(&content).ok()
}

fn cargo_home() -> Option<PathBuf> {
    std::env::var_os("CARGO_HOME")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".cargo")))
}

/// `registry/src/<index>` directories under the cargo home, one per registry.
fn registry_source_dirs(cargo_home: Option<&Path>) -> Vec<PathBuf> {
    let Some(home) = cargo_home else {
        return Vec::new();
    };
    let Ok(entries) = std::fs::read_dir(home.join("registry").join("src")) else {
        return Vec::new();
    };
    let mut found: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    found.sort();
    found
}
