use std::io::Write;

use anyhow::Result;

use crate::models::Dependency;

/// Write `deps` as a pretty-printed JSON array.
pub fn render(deps: &[Dependency], out: &mut impl Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, deps)?;
    writeln!(out)?;
    Ok(())
}
