//! License values, the built-in catalog and license-file discovery.
//!
//! - [`spdx`]: the built-in [`Catalog`](spdx::Catalog): canonical licenses,
//!   their common aliases and the phrases that identify their full text.
//! - [`files`]: locates candidate license files inside an install directory.
//! - [`classifier`]: maps resolved licenses to a [`LicenseRisk`](crate::models::LicenseRisk).

pub mod classifier;
pub mod files;
pub mod spdx;

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

/// Name of the license returned when nothing more specific is known.
pub const UNKNOWN: &str = "unknown";

/// A resolved license. Two licenses are the same license when their names are equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct License {
    name: String,
}

impl License {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_unknown(&self) -> bool {
        self.name == UNKNOWN
    }
}

impl fmt::Display for License {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Licenses deduplicated by name, iterated in name order.
pub type LicenseSet = BTreeSet<License>;

/// Resolves license names and license texts to known licenses.
pub trait LicenseLookup {
    /// Look up a license by name or alias. `None` yields the unknown license.
    fn find_by_name(&self, name: Option<&str>) -> Option<License>;

    /// Identify the license whose text `text` contains.
    fn find_by_text(&self, text: &str) -> Option<License>;

    /// The license used when neither metadata nor files name one.
    fn fallback(&self) -> License {
        self.find_by_name(None)
            .unwrap_or_else(|| License::new(UNKNOWN))
    }
}
