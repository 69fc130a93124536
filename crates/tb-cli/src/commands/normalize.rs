//! Normalize command: clock time to minutes since midnight.

use std::io::Write;

use anyhow::{Context, Result};

pub fn run<W: Write>(writer: &mut W, time: &str) -> Result<()> {
    let minutes = tb_core::normalize(time).with_context(|| format!("cannot normalize {time:?}"))?;
    writeln!(writer, "{minutes}")?;
    Ok(())
}
