//! Prompt command: show the problem description without calling the generator.

use std::io::Write;

use anyhow::{Context, Result};
use tb_core::{FileCatalog, ProblemDescription, ScheduleRequest, build_problem};

use super::util::load_request;
use crate::PromptArgs;

pub fn run<W: Write>(writer: &mut W, args: &PromptArgs) -> Result<()> {
    let (_request, problem) = load_problem(&args.request, &args.catalog)?;
    write!(writer, "{problem}")?;
    Ok(())
}

/// Load a request and catalog and build the problem description.
pub(crate) fn load_problem(
    request_path: &std::path::Path,
    catalog_path: &std::path::Path,
) -> Result<(ScheduleRequest, ProblemDescription)> {
    let request = load_request(request_path)?;
    let catalog = FileCatalog::open(catalog_path).context("failed to load section catalog")?;
    let problem = build_problem(&request, &catalog).context("failed to build problem description")?;
    Ok((request, problem))
}
