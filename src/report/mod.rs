//! Report renderers for license scan results.
//!
//! - [`terminal`]: colored, tabular output with summary box; respects `--verbose` / `--quiet`.
//! - [`json`]: the dependency list as pretty-printed JSON.

pub mod json;
pub mod terminal;
