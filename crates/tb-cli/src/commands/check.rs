//! Check command: validate a stored candidate timetable.

use std::io::Write;

use anyhow::Result;
use tb_core::CandidateTimetable;

use super::util::{load_request, read_json};
use crate::{CheckArgs, Config};

/// Runs the check command and returns whether the candidate is valid.
pub fn run<W: Write>(writer: &mut W, args: &CheckArgs, config: &Config) -> Result<bool> {
    let request = load_request(&args.request)?;
    let candidate: CandidateTimetable = read_json(&args.candidate)?;

    let report = tb_core::check(&candidate, &request.courses, &config.checker());
    match &report.detail {
        Some(violation) => tracing::info!(%violation, "candidate rejected"),
        None => tracing::info!(blocks = candidate.classes.len(), "candidate passed"),
    }

    writeln!(writer, "{}", serde_json::to_string_pretty(&report)?)?;
    Ok(report.valid)
}
