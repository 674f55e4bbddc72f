//! Errors raised while discovering projects.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Cannot resolve project path {path}: {source}")]
    ProjectPath {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to walk {path}: {source}")]
    Traversal {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("{package_manager} failed to inspect {path}: {source}")]
    Detection {
        package_manager: &'static str,
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}
