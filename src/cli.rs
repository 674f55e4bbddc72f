use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "license-probe",
    about = "Discover projects and resolve the licenses of their dependencies",
    version
)]
pub struct Cli {
    /// Project path to scan
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Find every project below the path instead of scanning the path itself
    #[arg(short, long)]
    pub recursive: bool,

    /// Scan exactly these project directories (skips discovery)
    #[arg(long = "aggregate-paths", value_name = "PATH", num_args = 1..)]
    pub aggregate_paths: Vec<PathBuf>,

    /// Config file [default: ./.license-probe/config.toml, fallback ~/.config/license-probe/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(long, default_value = "terminal", value_name = "FORMAT")]
    pub report: ReportFormat,

    /// Exclude a package manager from scanning (repeatable)
    #[arg(long = "exclude", value_name = "MANAGER")]
    pub exclude: Vec<PackageManagerArg>,

    /// Show all dependencies (not just warnings/errors)
    #[arg(short, long)]
    pub verbose: bool,

    /// Only print summary line
    #[arg(short, long)]
    pub quiet: bool,

    /// Log how each license was resolved
    #[arg(long)]
    pub debug: bool,
}

#[derive(Debug, Clone, clap::ValueEnum)]
pub enum ReportFormat {
    Terminal,
    Json,
}

#[derive(Debug, Clone, PartialEq, clap::ValueEnum)]
pub enum PackageManagerArg {
    Cargo,
    Maven,
    Npm,
    Pip,
}

impl PackageManagerArg {
    /// The name the package manager registers under.
    pub fn name(&self) -> &'static str {
        match self {
            PackageManagerArg::Cargo => "cargo",
            PackageManagerArg::Maven => "maven",
            PackageManagerArg::Npm => "npm",
            PackageManagerArg::Pip => "pip",
        }
    }
}
