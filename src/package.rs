//! The package abstraction every package-manager adapter implements, and the
//! license resolution shared by all of them.
//!
//! Adapters usually implement [`Package::license_names_from_spec`] and
//! [`Package::install_path`] and leave [`Package::determine_license`] alone:
//!
//! 1. licenses named in the package metadata win outright;
//! 2. otherwise licenses identified from license files under the install path;
//! 3. otherwise the catalog's fallback (`unknown`) license.
//!
//! An adapter with its own notion of licensing can override
//! `determine_license` instead.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::OnceLock;

use serde_json::Value;

use crate::license::files::{LicenseFile, PossibleLicenseFiles};
use crate::license::{LicenseLookup, LicenseSet};

/// Receives an event for every license resolved for a package.
///
/// Implementations must not fail; resolution never looks at what the sink does.
pub trait LicenseLogger {
    fn license(&self, source: &str, package: &str, license: &str, provenance: &str);
}

/// Forwards license events to the `log` facade at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogLicenseLogger;

impl LicenseLogger for LogLicenseLogger {
    fn license(&self, source: &str, package: &str, license: &str, provenance: &str) {
        log::debug!("{}: {} license: {} ({})", source, package, license, provenance);
    }
}

/// Collaborators consulted while resolving licenses.
#[derive(Clone, Copy)]
pub struct Resolver<'a> {
    pub lookup: &'a dyn LicenseLookup,
    pub logger: &'a dyn LicenseLogger,
}

impl<'a> Resolver<'a> {
    pub fn new(lookup: &'a dyn LicenseLookup, logger: &'a dyn LicenseLogger) -> Self {
        Self { lookup, logger }
    }
}

/// A dependency reported by a package manager.
pub trait Package {
    fn name(&self) -> &str;
    fn version(&self) -> &str;
    fn summary(&self) -> &str;
    fn description(&self) -> &str;
    fn homepage(&self) -> &str;
    /// Tags such as `development` or `test`.
    fn groups(&self) -> &BTreeSet<String>;
    /// Names of the packages this one depends on.
    fn children(&self) -> &[String];

    /// Short name of the implementing type, used in log events.
    fn source(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }

    /// Directory holding the package's files, if they are installed locally.
    fn install_path(&self) -> Option<&Path> {
        None
    }

    /// Raw license names declared in the package's own metadata.
    fn license_names_from_spec(&self) -> Vec<String> {
        Vec::new()
    }

    fn license_files(&self) -> Vec<LicenseFile> {
        PossibleLicenseFiles::find(self.install_path())
    }

    fn licenses_from_spec(&self, resolver: &Resolver<'_>) -> LicenseSet {
        self.license_names_from_spec()
            .iter()
            .filter_map(|name| resolver.lookup.find_by_name(Some(name)))
            .inspect(|license| {
                resolver
                    .logger
                    .license(self.source(), self.name(), license.name(), "from spec")
            })
            .collect()
    }

    fn licenses_from_files(&self, resolver: &Resolver<'_>) -> LicenseSet {
        let mut licenses = LicenseSet::new();
        for file in self.license_files() {
            if let Some(license) = file.license(resolver.lookup) {
                resolver.logger.license(
                    self.source(),
                    self.name(),
                    license.name(),
                    &format!("from file '{}'", file.path().display()),
                );
                licenses.insert(license.clone());
            }
        }
        licenses
    }

    fn determine_license(&self, resolver: &Resolver<'_>) -> LicenseSet {
        let from_spec = self.licenses_from_spec(resolver);
        if !from_spec.is_empty() {
            return from_spec;
        }

        let from_files = self.licenses_from_files(resolver);
        if !from_files.is_empty() {
            return from_files;
        }

        LicenseSet::from([resolver.lookup.fallback()])
    }
}

/// A package together with its license set, computed once on first access.
pub struct Licensed {
    package: Box<dyn Package>,
    licenses: OnceLock<LicenseSet>,
}

impl Licensed {
    pub fn new(package: Box<dyn Package>) -> Self {
        Self {
            package,
            licenses: OnceLock::new(),
        }
    }

    pub fn package(&self) -> &dyn Package {
        self.package.as_ref()
    }

    /// The package's licenses. Never empty.
    pub fn licenses(&self, resolver: &Resolver<'_>) -> &LicenseSet {
        self.licenses
            .get_or_init(|| self.package.determine_license(resolver))
    }
}

/// Extract license names from package metadata in the common shape used by
/// npm, bower, composer and friends.
///
/// A `licenses` field (array, or a single value) takes precedence over a
/// `license` field. Entries may be plain strings or objects with a `type`.
pub fn license_names_from_standard_spec(spec: &Value) -> Vec<String> {
    let entries: Vec<&Value> = match spec.get("licenses").filter(|v| !v.is_null()) {
        Some(Value::Array(items)) => items.iter().collect(),
        Some(single) => vec![single],
        None => spec.get("license").filter(|v| !v.is_null()).into_iter().collect(),
    };

    entries
        .into_iter()
        .filter_map(|entry| match entry {
            Value::Object(map) => map.get("type").and_then(Value::as_str).map(str::to_string),
            Value::String(name) => Some(name.clone()),
            _ => None,
        })
        .collect()
}
