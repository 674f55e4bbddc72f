use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde_json::Value;

use super::{existing_dir, split_license_expression, PackageManager};
use crate::package::{license_names_from_standard_spec, Package};

/// npm projects: `package.json`, resolved through `package-lock.json` and
/// the installed `node_modules` tree.
pub struct Npm {
    project_path: PathBuf,
}

impl Npm {
    pub fn new(project_path: &Path) -> Self {
        Self {
            project_path: project_path.to_path_buf(),
        }
    }

    pub fn build(project_path: &Path) -> Box<dyn PackageManager> {
        Box::new(Self::new(project_path))
    }
}

impl PackageManager for Npm {
    fn name(&self) -> &'static str {
        "npm"
    }

    fn project_path(&self) -> &Path {
        &self.project_path
    }

    fn markers(&self) -> &'static [&'static str] {
        &["package.json"]
    }

    fn current_packages(&self) -> Result<Vec<Box<dyn Package>>> {
        let lock = self.project_path.join("package-lock.json");
        let packages = if lock.exists() {
            parse_package_lock_json(&lock, &self.project_path)?
        } else {
            let manifest = self.project_path.join("package.json");
            if !manifest.exists() {
                return Ok(Vec::new());
            }
            parse_package_json(&manifest, &self.project_path)?
        };

        Ok(packages
            .into_iter()
            .map(|p| Box::new(p) as Box<dyn Package>)
            .collect())
    }
}

pub struct NpmPackage {
    name: String,
    version: String,
    description: String,
    homepage: String,
    groups: BTreeSet<String>,
    children: Vec<String>,
    install_path: Option<PathBuf>,
    /// The installed `package.json`, when the package is installed.
    spec: Option<Value>,
    /// License recorded in the lockfile entry.
    lock_license: Option<String>,
}

impl NpmPackage {
    fn new(name: String, version: String, install_path: Option<PathBuf>) -> Self {
        let spec = install_path
            .as_deref()
            .and_then(|dir| read_json(&dir.join("package.json")));
        let field = |key: &str| {
            spec.as_ref()
                .and_then(|s| s.get(key))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        Self {
            description: field("description"),
            homepage: field("homepage"),
            name,
            version,
            groups: BTreeSet::new(),
            children: Vec::new(),
            install_path,
            spec,
            lock_license: None,
        }
    }
}

impl Package for NpmPackage {
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
        let raw = match &self.spec {
            Some(spec) => license_names_from_standard_spec(spec),
            None => self.lock_license.iter().cloned().collect(),
        };
        raw.iter()
            .flat_map(|name| split_license_expression(name))
            .collect()
    }
}

fn read_json(path: &Path) -> Option<Value> {
    let content = std::fs::read_to_string(path).ok()?;
    serde_json::from_str(&content).ok()
}

fn object_keys(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_object)
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}

/// Parse `package-lock.json` v2/v3 (the `packages` map).
fn parse_package_lock_json(lock_path: &Path, project_root: &Path) -> Result<Vec<NpmPackage>> {
    let content = std::fs::read_to_string(lock_path)?;
    let json: Value = serde_json::from_str(&content)?;
    let mut packages = Vec::new();

    let Some(entries) = json.get("packages").and_then(Value::as_object) else {
        return Ok(packages);
    };

    for (pkg_path, info) in entries {
        // "" is the root project, paths without node_modules are workspace members
        let Some(idx) = pkg_path.rfind("node_modules/") else {
            continue;
        };
        let name = pkg_path[idx + "node_modules/".len()..].to_string();

        let version = info
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or("*")
            .to_string();

        let mut package = NpmPackage::new(name, version, existing_dir(project_root, pkg_path));
        package.lock_license = info
            .get("license")
            .and_then(Value::as_str)
            .map(str::to_string);
        package.children = object_keys(info.get("dependencies"));
        if info.get("dev").and_then(Value::as_bool).unwrap_or(false) {
            package.groups.insert("development".to_string());
        }
        if info.get("optional").and_then(Value::as_bool).unwrap_or(false) {
            package.groups.insert("optional".to_string());
        }

        packages.push(package);
    }

    Ok(packages)
}

/// Parse `package.json` when there is no lockfile; versions come from the
/// installed copy when there is one, otherwise from the declared range.
fn parse_package_json(path: &Path, project_root: &Path) -> Result<Vec<NpmPackage>> {
    let content = std::fs::read_to_string(path)?;
    let json: Value = serde_json::from_str(&content)?;
    let mut packages = Vec::new();

    for (section, group) in [("dependencies", None), ("devDependencies", Some("development"))] {
        let Some(deps) = json.get(section).and_then(Value::as_object) else {
            continue;
        };
        for (name, range) in deps {
            let install_path = existing_dir(project_root, Path::new("node_modules").join(name));
            let declared = range.as_str().unwrap_or("*").to_string();
            let mut package = NpmPackage::new(name.clone(), declared, install_path);

            if let Some(installed) = package
                .spec
                .as_ref()
                .and_then(|s| s.get("version"))
                .and_then(Value::as_str)
            {
                package.version = installed.to_string();
            }
            package.children = object_keys(package.spec.as_ref().and_then(|s| s.get("dependencies")));
            if let Some(group) = group {
                package.groups.insert(group.to_string());
            }

            packages.push(package);
        }
    }

    Ok(packages)
}
