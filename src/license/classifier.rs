use crate::license::spdx::definition;
use crate::license::{License, LicenseSet};
use crate::models::LicenseRisk;

/// Classify a resolved license into a risk level.
///
/// Licenses outside the catalog are `Proprietary` when their name says so and
/// `Unknown` otherwise.
pub fn classify(license: &License) -> LicenseRisk {
    if license.is_unknown() {
        return LicenseRisk::Unknown;
    }

    if let Some(def) = definition(license.name()) {
        return def.risk.clone();
    }

    let lower = license.name().to_lowercase();
    if lower.contains("proprietary") || lower.contains("commercial") {
        return LicenseRisk::Proprietary;
    }

    LicenseRisk::Unknown
}

/// Classify a package offered under every license in `licenses`.
///
/// The user may pick any of them, so the least restrictive one wins.
pub fn classify_set(licenses: &LicenseSet) -> LicenseRisk {
    most_permissive(licenses.iter().map(classify).collect())
}

fn most_permissive(risks: Vec<LicenseRisk>) -> LicenseRisk {
    [
        LicenseRisk::Permissive,
        LicenseRisk::WeakCopyleft,
        LicenseRisk::StrongCopyleft,
        LicenseRisk::Proprietary,
    ]
    .into_iter()
    .find(|r| risks.contains(r))
    .unwrap_or(LicenseRisk::Unknown)
}
