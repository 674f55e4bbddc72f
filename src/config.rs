use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Deserialize;

use crate::license::LicenseSet;
use crate::models::PolicyVerdict;

/// Root configuration structure, deserialized from `.license-probe/config.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// License policy rules.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Project discovery defaults.
    #[serde(default)]
    pub scan: ScanConfig,
}

/// Defines how licenses are evaluated.
#[derive(Debug, Deserialize)]
pub struct PolicyConfig {
    /// Verdict applied to any license not explicitly listed in `licenses`.
    /// Defaults to `warn`.
    #[serde(default = "default_policy_action")]
    pub default: PolicyAction,
    /// Per-license overrides keyed by license name (e.g. `"MIT"`, `"GPL-3.0"`).
    #[serde(default)]
    pub licenses: HashMap<String, PolicyAction>,
}

/// Defaults for project discovery; command-line flags take precedence.
#[derive(Debug, Default, Deserialize)]
pub struct ScanConfig {
    #[serde(default)]
    pub recursive: bool,
    /// Project directories to scan instead of discovering them, relative to
    /// the scanned root unless absolute.
    #[serde(default)]
    pub aggregate_paths: Vec<PathBuf>,
}

fn default_policy_action() -> PolicyAction {
    PolicyAction::Warn
}

/// The action to take when a dependency's license matches a policy rule.
#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
    /// Dependency is compliant; no action needed.
    Pass,
    /// Dependency warrants review but does not fail the scan.
    Warn,
    /// Dependency violates policy; the CLI exits with code 1.
    Error,
}

impl PolicyAction {
    /// Convert to the corresponding [`PolicyVerdict`].
    pub fn to_verdict(&self) -> PolicyVerdict {
        match self {
            PolicyAction::Pass => PolicyVerdict::Pass,
            PolicyAction::Warn => PolicyVerdict::Warn,
            PolicyAction::Error => PolicyVerdict::Error,
        }
    }
}

impl Default for PolicyConfig {
    /// Built-in default policy used when no config file is found.
    ///
    /// Permissive licenses pass, weak-copyleft licenses warn, and strong-copyleft
    /// licenses (GPL, AGPL) produce an error.
    fn default() -> Self {
        let licenses = [
            ("MIT", PolicyAction::Pass),
            ("Apache-2.0", PolicyAction::Pass),
            ("BSD-2-Clause", PolicyAction::Pass),
            ("BSD-3-Clause", PolicyAction::Pass),
            ("ISC", PolicyAction::Pass),
            ("0BSD", PolicyAction::Pass),
            ("Unlicense", PolicyAction::Pass),
            ("Zlib", PolicyAction::Pass),
            ("LGPL-2.1", PolicyAction::Warn),
            ("LGPL-3.0", PolicyAction::Warn),
            ("MPL-2.0", PolicyAction::Warn),
            ("GPL-2.0", PolicyAction::Error),
            ("GPL-3.0", PolicyAction::Error),
            ("AGPL-3.0", PolicyAction::Error),
            ("unknown", PolicyAction::Warn),
        ]
        .into_iter()
        .map(|(name, action)| (name.to_string(), action))
        .collect();

        PolicyConfig {
            default: PolicyAction::Warn,
            licenses,
        }
    }
}

/// Load the configuration, searching in order:
///
/// 1. `config_override`: path passed via `--config`
/// 2. `<project_path>/.license-probe/config.toml`
/// 3. `~/.config/license-probe/config.toml`
/// 4. Built-in [`Config::default`]
pub fn load_config(project_path: &Path, config_override: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_override {
        return read_config(path);
    }

    let project_config = project_path.join(".license-probe").join("config.toml");
    if project_config.exists() {
        return read_config(&project_config);
    }

    if let Some(home) = dirs::home_dir() {
        let home_config = home.join(".config").join("license-probe").join("config.toml");
        if home_config.exists() {
            return read_config(&home_config);
        }
    }

    log::debug!("no config file found, using built-in policy");
    Ok(Config::default())
}

fn read_config(path: &Path) -> Result<Config> {
    log::debug!("loading config from {}", path.display());
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Determine the verdict for a package offered under `licenses`.
///
/// The package may be used under any one of its licenses, so the most
/// permissive verdict wins. An empty set is judged as `unknown`.
pub fn apply_policy(config: &Config, licenses: &LicenseSet) -> PolicyVerdict {
    licenses
        .iter()
        .map(|license| verdict_for(config, license.name()))
        .reduce(verdict_or)
        .unwrap_or_else(|| verdict_for(config, crate::license::UNKNOWN))
}

/// Look up a single license name in the policy map.
fn verdict_for(config: &Config, name: &str) -> PolicyVerdict {
    match config.policy.licenses.get(name) {
        Some(action) => action.to_verdict(),
        None => config.policy.default.to_verdict(),
    }
}

/// Most permissive (least severe) of two verdicts.
/// Pass < Warn < Error
fn verdict_or(a: PolicyVerdict, b: PolicyVerdict) -> PolicyVerdict {
    match (a, b) {
        (PolicyVerdict::Pass, _) | (_, PolicyVerdict::Pass) => PolicyVerdict::Pass,
        (PolicyVerdict::Warn, _) | (_, PolicyVerdict::Warn) => PolicyVerdict::Warn,
        _ => PolicyVerdict::Error,
    }
}
