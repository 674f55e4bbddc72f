//! Discovery of the project roots to scan under a directory.

use std::collections::VecDeque;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::ScanError;
use crate::package_manager::PackageManagerFactory;

/// How the caller wants projects to be found.
#[derive(Debug, Default, Clone)]
pub struct ProjectFinderOptions {
    /// Root to scan; the current directory when `None`.
    pub project_path: Option<PathBuf>,
    /// Projects already known to the caller. When non-empty these are
    /// scanned as given and nothing is discovered.
    pub aggregate_paths: Vec<PathBuf>,
    /// Look for projects in every directory below the root.
    pub recursive: bool,
}

pub struct ProjectFinder {
    main_project_path: PathBuf,
    aggregate_paths: Vec<PathBuf>,
    recursive: bool,
    package_managers: Vec<PackageManagerFactory>,
}

impl ProjectFinder {
    pub fn new(
        options: ProjectFinderOptions,
        package_managers: Vec<PackageManagerFactory>,
    ) -> Result<Self, ScanError> {
        let requested = match options.project_path {
            Some(path) => path,
            None => std::env::current_dir().map_err(|source| ScanError::ProjectPath {
                path: PathBuf::from("."),
                source,
            })?,
        };

        Ok(Self {
            main_project_path: full_path(&requested)?,
            aggregate_paths: options.aggregate_paths,
            recursive: options.recursive,
            package_managers,
        })
    }

    /// The absolute root this finder scans.
    pub fn main_project_path(&self) -> &Path {
        &self.main_project_path
    }

    /// The project directories to scan.
    ///
    /// Explicit aggregate paths are returned verbatim. Otherwise, in recursive
    /// mode, the discovered projects are returned when there are any. In every
    /// other case the root itself is the only path.
    pub fn paths_to_scan(&self) -> Result<Vec<PathBuf>, ScanError> {
        if !self.aggregate_paths.is_empty() {
            return Ok(self.aggregate_paths.clone());
        }

        if self.recursive {
            let found = self.find_projects()?;
            if !found.is_empty() {
                return Ok(found);
            }
        }

        Ok(vec![self.main_project_path.clone()])
    }

    /// Every active project under the root, ancestors first.
    ///
    /// An active project hides the directories below it, except for the root:
    /// projects nested directly under an active root are still reported.
    pub fn find_projects(&self) -> Result<Vec<PathBuf>, ScanError> {
        let mut remaining: VecDeque<PathBuf> = self.find_all_paths()?.into();
        let mut projects = Vec::new();

        while let Some(candidate) = remaining.pop_front() {
            if !self.is_active(&candidate)? {
                continue;
            }

            if candidate != self.main_project_path {
                remaining.retain(|path| !is_nested(path, &candidate));
            }

            log::debug!("found project at {}", candidate.display());
            projects.push(candidate);
        }

        Ok(projects)
    }

    /// Every directory under the root (the root included), depth first and
    /// sorted by name, so a directory always comes before its descendants.
    /// Hidden directories below the root are skipped.
    fn find_all_paths(&self) -> Result<Vec<PathBuf>, ScanError> {
        let walker = WalkDir::new(&self.main_project_path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

        let mut paths = Vec::new();
        for entry in walker {
            match entry {
                Ok(entry) if entry.file_type().is_dir() => paths.push(entry.into_path()),
                Ok(_) => {}
                Err(err) if err.io_error().map(|e| e.kind()) == Some(ErrorKind::NotFound) => {
                    log::debug!("skipping vanished path: {}", err);
                }
                Err(source) => {
                    return Err(ScanError::Traversal {
                        path: source
                            .path()
                            .map(Path::to_path_buf)
                            .unwrap_or_else(|| self.main_project_path.clone()),
                        source,
                    });
                }
            }
        }

        Ok(paths)
    }

    /// Whether any package manager recognizes `path` as one of its projects.
    /// Every package manager is asked, so a failing one is never hidden by
    /// another that answered first.
    fn is_active(&self, path: &Path) -> Result<bool, ScanError> {
        let mut active = false;
        for factory in &self.package_managers {
            let package_manager = factory.create(path);
            let is_active = package_manager
                .active()
                .map_err(|source| ScanError::Detection {
                    package_manager: factory.name,
                    path: path.to_path_buf(),
                    source,
                })?;
            if is_active {
                log::debug!("{} is active in {}", factory.name, path.display());
                active = true;
            }
        }
        Ok(active)
    }
}

/// `path` lies strictly below `ancestor`.
fn is_nested(path: &Path, ancestor: &Path) -> bool {
    path != ancestor && path.starts_with(ancestor)
}

/// `path` made absolute, with symlinks resolved when it exists.
fn full_path(path: &Path) -> Result<PathBuf, ScanError> {
    path.canonicalize()
        .or_else(|_| std::path::absolute(path))
        .map_err(|source| ScanError::ProjectPath {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::Package;
    use crate::package_manager::PackageManager;
    use std::fs;
    use tempfile::TempDir;

    /// Active wherever a file named `marker` exists.
    struct MarkerManager {
        project_path: PathBuf,
    }

    impl PackageManager for MarkerManager {
        fn name(&self) -> &'static str {
            "marker"
        }
        fn project_path(&self) -> &Path {
            &self.project_path
        }
        fn markers(&self) -> &'static [&'static str] {
            &["marker"]
        }
        fn current_packages(&self) -> anyhow::Result<Vec<Box<dyn Package>>> {
            Ok(Vec::new())
        }
    }

    /// Fails whenever it is asked about a directory named `broken`.
    struct BrokenManager {
        project_path: PathBuf,
    }

    impl PackageManager for BrokenManager {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn project_path(&self) -> &Path {
            &self.project_path
        }
        fn markers(&self) -> &'static [&'static str] {
            &[]
        }
        fn active(&self) -> anyhow::Result<bool> {
            if self.project_path.ends_with("broken") {
                anyhow::bail!("cannot read manifest");
            }
            Ok(false)
        }
        fn current_packages(&self) -> anyhow::Result<Vec<Box<dyn Package>>> {
            Ok(Vec::new())
        }
    }

    fn marker_factory() -> PackageManagerFactory {
        PackageManagerFactory {
            name: "marker",
            build: |path| {
                Box::new(MarkerManager {
                    project_path: path.to_path_buf(),
                })
            },
        }
    }

    fn broken_factory() -> PackageManagerFactory {
        PackageManagerFactory {
            name: "broken",
            build: |path| {
                Box::new(BrokenManager {
                    project_path: path.to_path_buf(),
                })
            },
        }
    }

    /// Create `dirs` under a fresh root, with a marker in each of `active`.
    fn tree(dirs: &[&str], active: &[&str]) -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().canonicalize().unwrap();
        for dir in dirs {
            fs::create_dir_all(root.join(dir)).unwrap();
        }
        for dir in active {
            fs::write(root.join(dir).join("marker"), "").unwrap();
        }
        (tmp, root)
    }

    fn finder(root: &Path, recursive: bool, aggregate_paths: Vec<PathBuf>) -> ProjectFinder {
        ProjectFinder::new(
            ProjectFinderOptions {
                project_path: Some(root.to_path_buf()),
                aggregate_paths,
                recursive,
            },
            vec![marker_factory()],
        )
        .unwrap()
    }

    #[test]
    fn test_active_root_keeps_nested_projects_but_prunes_below_them() {
        let (_tmp, root) = tree(&["a/b", "c"], &["", "a", "a/b"]);

        let found = finder(&root, true, Vec::new()).find_projects().unwrap();

        assert_eq!(found, vec![root.clone(), root.join("a")]);
    }

    #[test]
    fn test_inactive_root_is_not_reported() {
        let (_tmp, root) = tree(&["x", "y"], &["x", "y"]);

        let found = finder(&root, true, Vec::new()).find_projects().unwrap();

        assert_eq!(found, vec![root.join("x"), root.join("y")]);
    }

    #[test]
    fn test_pruning_is_by_path_component_not_string_prefix() {
        let (_tmp, root) = tree(&["a/inner", "ab"], &["a", "a/inner", "ab"]);

        let found = finder(&root, true, Vec::new()).find_projects().unwrap();

        assert_eq!(found, vec![root.join("a"), root.join("ab")]);
    }

    #[test]
    fn test_hidden_directories_are_skipped() {
        let (_tmp, root) = tree(&[".cache/pkg", "app"], &[".cache/pkg", "app"]);

        let found = finder(&root, true, Vec::new()).find_projects().unwrap();

        assert_eq!(found, vec![root.join("app")]);
    }

    #[test]
    fn test_no_projects_found() {
        let (_tmp, root) = tree(&["a", "b"], &[]);
        assert!(finder(&root, true, Vec::new()).find_projects().unwrap().is_empty());
    }

    #[test]
    fn test_paths_to_scan_explicit_aggregate_paths_verbatim() {
        let (_tmp, root) = tree(&["x"], &["x"]);
        let explicit = vec![PathBuf::from("relative/one"), PathBuf::from("/elsewhere/two")];

        assert_eq!(finder(&root, false, explicit.clone()).paths_to_scan().unwrap(), explicit);
        assert_eq!(finder(&root, true, explicit.clone()).paths_to_scan().unwrap(), explicit);
    }

    #[test]
    fn test_paths_to_scan_not_recursive_is_root() {
        let (_tmp, root) = tree(&["x"], &["x"]);
        assert_eq!(finder(&root, false, Vec::new()).paths_to_scan().unwrap(), vec![root]);
    }

    #[test]
    fn test_paths_to_scan_recursive_uses_discovery() {
        let (_tmp, root) = tree(&["x", "y"], &["y"]);
        assert_eq!(
            finder(&root, true, Vec::new()).paths_to_scan().unwrap(),
            vec![root.join("y")]
        );
    }

    #[test]
    fn test_paths_to_scan_recursive_without_projects_falls_back_to_root() {
        let (_tmp, root) = tree(&["x"], &[]);
        assert_eq!(finder(&root, true, Vec::new()).paths_to_scan().unwrap(), vec![root]);
    }

    #[test]
    fn test_root_is_made_absolute() {
        let (_tmp, root) = tree(&["x"], &[]);
        let dotted = root.join("x").join("..");
        let finder = finder(&dotted, false, Vec::new());
        assert_eq!(finder.main_project_path(), root.as_path());
    }

    #[test]
    fn test_adapter_failure_is_reported() {
        let (_tmp, root) = tree(&["broken", "ok"], &["ok"]);
        let finder = ProjectFinder::new(
            ProjectFinderOptions {
                project_path: Some(root.clone()),
                aggregate_paths: Vec::new(),
                recursive: true,
            },
            vec![marker_factory(), broken_factory()],
        )
        .unwrap();

        match finder.find_projects() {
            Err(ScanError::Detection {
                package_manager,
                path,
                ..
            }) => {
                assert_eq!(package_manager, "broken");
                assert_eq!(path, root.join("broken"));
            }
            other => panic!("expected detection error, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_a_traversal_error() {
        use std::os::unix::fs::PermissionsExt;

        let (_tmp, root) = tree(&["locked/inner", "ok"], &["ok"]);
        let locked = root.join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not apply to root.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let result = finder(&root, true, Vec::new()).find_projects();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        match result {
            Err(ScanError::Traversal { path, .. }) => assert_eq!(path, locked),
            other => panic!("expected traversal error, got {:?}", other),
        }
    }
}
