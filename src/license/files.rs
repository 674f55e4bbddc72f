use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use walkdir::{DirEntry, WalkDir};

use crate::license::{License, LicenseLookup};

/// File name fragments (lowercase) that mark a file as a possible license file.
const CANDIDATE_NAMES: &[&str] = &["license", "licence", "copying", "readme", "notice"];

/// Directories never searched for license files: they hold other packages.
const SKIPPED_DIRS: &[&str] = &["node_modules"];

/// A file that may contain license text.
///
/// The license is matched the first time [`LicenseFile::license`] is called
/// and cached afterwards.
#[derive(Debug)]
pub struct LicenseFile {
    path: PathBuf,
    license: OnceLock<Option<License>>,
}

impl LicenseFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            license: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The file contents, or `None` if the file cannot be read.
    pub fn text(&self) -> Option<String> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(err) => {
                log::debug!("could not read {}: {}", self.path.display(), err);
                None
            }
        }
    }

    /// The license this file's text identifies, if any.
    pub fn license(&self, lookup: &dyn LicenseLookup) -> Option<&License> {
        self.license
            .get_or_init(|| self.text().and_then(|text| lookup.find_by_text(&text)))
            .as_ref()
    }
}

/// Locates candidate license files under a package's install directory.
pub struct PossibleLicenseFiles;

impl PossibleLicenseFiles {
    /// Find every candidate license file under `install_path`.
    ///
    /// Files are candidates when their name contains `license`, `licence`,
    /// `copying`, `readme` or `notice` (any case). A directory with such a name
    /// contributes every file directly inside it. Hidden directories are not
    /// searched. A missing or unreadable directory yields no candidates.
    pub fn find(install_path: Option<&Path>) -> Vec<LicenseFile> {
        let Some(root) = install_path else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut files = Vec::new();

        let walker = WalkDir::new(root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    log::debug!("skipping unreadable entry under {}: {}", root.display(), err);
                    continue;
                }
            };
            if entry.depth() == 0 || !is_candidate_name(&entry.file_name().to_string_lossy()) {
                continue;
            }

            if entry.file_type().is_dir() {
                for path in files_in_dir(entry.path()) {
                    if seen.insert(path.clone()) {
                        files.push(LicenseFile::new(path));
                    }
                }
            } else if entry.file_type().is_file() && seen.insert(entry.path().to_path_buf()) {
                files.push(LicenseFile::new(entry.path()));
            }
        }

        log::debug!(
            "found {} possible license file(s) under {}",
            files.len(),
            root.display()
        );
        files
    }
}

fn is_candidate_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    CANDIDATE_NAMES.iter().any(|c| lower.contains(c))
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    if !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || SKIPPED_DIRS.contains(&name.as_ref())
}

fn files_in_dir(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    paths.sort();
    paths
}
