use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Result;
use regex::Regex;
use serde::Deserialize;

use super::{split_license_expression, PackageManager};
use crate::package::Package;

/// Python projects. Packages are listed from `Pipfile.lock`, then
/// `requirements.txt`, then `pyproject.toml`; installed metadata is read from
/// a project-local virtualenv (`.venv` or `venv`) when there is one.
pub struct Pip {
    project_path: PathBuf,
}

impl Pip {
    pub fn new(project_path: &Path) -> Self {
        Self {
            project_path: project_path.to_path_buf(),
        }
    }

    pub fn build(project_path: &Path) -> Box<dyn PackageManager> {
        Box::new(Self::new(project_path))
    }
}

impl PackageManager for Pip {
    fn name(&self) -> &'static str {
        "pip"
    }

    fn project_path(&self) -> &Path {
        &self.project_path
    }

    fn markers(&self) -> &'static [&'static str] {
        &["requirements.txt", "Pipfile.lock", "pyproject.toml"]
    }

    fn current_packages(&self) -> Result<Vec<Box<dyn Package>>> {
        let mut requirements: Vec<Requirement> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        let pipfile_lock = self.project_path.join("Pipfile.lock");
        let requirements_txt = self.project_path.join("requirements.txt");
        let pyproject = self.project_path.join("pyproject.toml");

        let parsed = if pipfile_lock.exists() {
            parse_pipfile_lock(&pipfile_lock)?
        } else if requirements_txt.exists() {
            parse_requirements_txt(&requirements_txt)?
        } else if pyproject.exists() {
            parse_pyproject_toml(&pyproject)?
        } else {
            Vec::new()
        };

        for req in parsed {
            if seen.insert(normalize_name(&req.name)) {
                requirements.push(req);
            }
        }

        let site_packages = site_packages_dirs(&self.project_path);
        Ok(requirements
            .into_iter()
            .map(|req| Box::new(PipPackage::new(req, &site_packages)) as Box<dyn Package>)
            .collect())
    }
}

/// A requirement as listed by the project, before looking at installed metadata.
#[derive(Debug, Clone, PartialEq)]
struct Requirement {
    name: String,
    /// Pinned version, or empty when the project does not pin one.
    version: String,
    development: bool,
}

/// Fields read from a `.dist-info/METADATA` file.
#[derive(Debug, Default)]
struct Metadata {
    version: String,
    summary: String,
    homepage: String,
    license: Option<String>,
    license_expression: Option<String>,
    classifiers: Vec<String>,
    requires: Vec<String>,
}

pub struct PipPackage {
    name: String,
    version: String,
    summary: String,
    homepage: String,
    groups: BTreeSet<String>,
    children: Vec<String>,
    install_path: Option<PathBuf>,
    license_names: Vec<String>,
}

impl PipPackage {
    fn new(req: Requirement, site_packages: &[PathBuf]) -> Self {
        let install_path = site_packages
            .iter()
            .find_map(|dir| find_dist_info(dir, &req.name, &req.version));
        let metadata = install_path
            .as_deref()
            .and_then(|dir| std::fs::read_to_string(dir.join("METADATA")).ok())
            .map(|content| parse_metadata(&content))
            .unwrap_or_default();

        let license_names = match &metadata.license_expression {
            Some(expr) => split_license_expression(expr),
            None => metadata
                .license
                .iter()
                .chain(metadata.classifiers.iter())
                .cloned()
                .collect(),
        };

        let mut groups = BTreeSet::new();
        if req.development {
            groups.insert("development".to_string());
        }

        Self {
            version: if req.version.is_empty() {
                metadata.version
            } else {
                req.version
            },
            name: req.name,
            summary: metadata.summary,
            homepage: metadata.homepage,
            groups,
            children: metadata.requires,
            install_path,
            license_names,
        }
    }
}

impl Package for PipPackage {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn summary(&self) -> &str {
        &self.summary
    }

    fn description(&self) -> &str {
        &self.summary
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
        self.license_names.clone()
    }
}

/// PEP 503 normalization, with `_` as the separator used by dist-info names.
fn normalize_name(name: &str) -> String {
    name.to_lowercase().replace(['-', '.'], "_")
}

fn site_packages_dirs(project: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    for venv in [".venv", "venv"] {
        let venv = project.join(venv);
        let windows = venv.join("Lib").join("site-packages");
        if windows.is_dir() {
            found.push(windows);
        }
        let Ok(entries) = std::fs::read_dir(venv.join("lib")) else {
            continue;
        };
        let mut pythons: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().starts_with("python"))
            .map(|e| e.path().join("site-packages"))
            .filter(|p| p.is_dir())
            .collect();
        pythons.sort();
        found.extend(pythons);
    }
    found
}

/// The `<name>-<version>.dist-info` directory for a requirement. An empty
/// `version` matches any installed version.
fn find_dist_info(site_packages: &Path, name: &str, version: &str) -> Option<PathBuf> {
    let wanted = normalize_name(name);
    let entries = std::fs::read_dir(site_packages).ok()?;
    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    candidates.sort();

    candidates.into_iter().find(|path| {
        let Some(stem) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_suffix(".dist-info"))
        else {
            return false;
        };
        let Some((dist_name, dist_version)) = stem.rsplit_once('-') else {
            return false;
        };
        normalize_name(dist_name) == wanted && (version.is_empty() || dist_version == version)
    })
}

/// Parse the header block of a core-metadata file.
fn parse_metadata(content: &str) -> Metadata {
    let mut metadata = Metadata::default();

    for line in content.lines() {
        if line.is_empty() {
            // the body (long description) starts after the first blank line
            break;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        match key {
            "Version" => metadata.version = value.to_string(),
            "Summary" => metadata.summary = value.to_string(),
            "Home-page" => metadata.homepage = value.to_string(),
            "Project-URL" if metadata.homepage.is_empty() => {
                if let Some((label, url)) = value.split_once(',') {
                    if label.trim().eq_ignore_ascii_case("homepage") {
                        metadata.homepage = url.trim().to_string();
                    }
                }
            }
            "License" if !value.is_empty() && value != "UNKNOWN" => {
                metadata.license = Some(value.to_string());
            }
            "License-Expression" if !value.is_empty() => {
                metadata.license_expression = Some(value.to_string());
            }
            "Classifier" if value.starts_with("License ::") => {
                if let Some(last) = value.rsplit(" :: ").next() {
                    if last != "OSI Approved" {
                        metadata.classifiers.push(last.to_string());
                    }
                }
            }
            "Requires-Dist" => {
                let name: String = value
                    .chars()
                    .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
                    .collect();
                if !name.is_empty() {
                    metadata.requires.push(name);
                }
            }
            _ => {}
        }
    }

    metadata
}

/// Parse `requirements.txt`. Pinned (`==`) lines keep their version, other
/// requirement lines are listed without one.
fn parse_requirements_txt(path: &Path) -> Result<Vec<Requirement>> {
    let content = std::fs::read_to_string(path)?;
    let re = Regex::new(r"^([A-Za-z0-9_\-\.]+)(?:\[[^\]]*\])?\s*(?:==\s*([^\s;#]+))?")?;
    let mut reqs = Vec::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
            continue;
        }
        if let Some(caps) = re.captures(line) {
            reqs.push(Requirement {
                name: caps[1].to_string(),
                version: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
                development: false,
            });
        }
    }

    Ok(reqs)
}

/// Parse `Pipfile.lock`: JSON with `default` and `develop` sections.
fn parse_pipfile_lock(path: &Path) -> Result<Vec<Requirement>> {
    let content = std::fs::read_to_string(path)?;
    let json: serde_json::Value = serde_json::from_str(&content)?;
    let mut reqs = Vec::new();

    for (section, development) in [("default", false), ("develop", true)] {
        if let Some(pkgs) = json.get(section).and_then(|v| v.as_object()) {
            for (name, info) in pkgs {
                let version = info
                    .get("version")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .trim_start_matches("==")
                    .to_string();
                reqs.push(Requirement {
                    name: name.clone(),
                    version,
                    development,
                });
            }
        }
    }

    Ok(reqs)
}

#[derive(Debug, Deserialize)]
struct Pyproject {
    project: Option<PyprojectProject>,
}

#[derive(Debug, Deserialize)]
struct PyprojectProject {
    #[serde(default)]
    dependencies: Vec<String>,
}

/// Parse `pyproject.toml`: extract `[project].dependencies`.
fn parse_pyproject_toml(path: &Path) -> Result<Vec<Requirement>> {
    let content = std::fs::read_to_string(path)?;
    let pyproject: Pyproject = toml::from_str(&content)?;

    let re = Regex::new(r"^([A-Za-z0-9_\-\.]+)(?:\[[^\]]*\])?\s*(?:==\s*([^\s;,]+))?")?;
    let mut reqs = Vec::new();

    if let Some(project) = pyproject.project {
        for dep_str in &project.dependencies {
            if let Some(caps) = re.captures(dep_str.trim()) {
                reqs.push(Requirement {
                    name: caps[1].to_string(),
                    version: caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
                    development: false,
                });
            }
        }
    }

    Ok(reqs)
}
