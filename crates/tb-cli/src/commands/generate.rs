//! Generate command: ask the LLM for a timetable and verify it.

use std::io::Write;

use anyhow::{Context, Result};
use tb_core::{
    ProblemDescription, RetryPolicy, ScheduleGenerator, ScheduleOutcome, ScheduleRequest,
    generate_valid_schedule,
};
use tb_llm::{BlockingGenerator, Client};

use super::prompt::load_problem;
use crate::{Config, GenerateArgs};

pub fn run<W: Write>(writer: &mut W, args: &GenerateArgs, config: &Config) -> Result<()> {
    let api_key = config.api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "missing Claude API key (set ANTHROPIC_API_KEY, TB_API_KEY or api_key in config.toml)"
        )
    })?;

    let (request, problem) = load_problem(&args.request, &args.catalog)?;

    // One generator per request; nothing is shared between runs.
    let client = Client::new(api_key, config.request_timeout()).context("failed to create LLM client")?;
    let mut generator = BlockingGenerator::new(client, config.model.clone(), config.max_tokens)
        .context("failed to create generator")?;

    let policy = config.retry_policy(args.max_attempts);
    generate_with(writer, &mut generator, &request, &problem, &policy)?;
    Ok(())
}

/// Runs the retry loop with any generator and prints the resulting timetable.
pub fn generate_with<W: Write, G: ScheduleGenerator + ?Sized>(
    writer: &mut W,
    generator: &mut G,
    request: &ScheduleRequest,
    problem: &ProblemDescription,
    policy: &RetryPolicy,
) -> Result<ScheduleOutcome> {
    tracing::debug!(
        courses = request.courses.len(),
        max_attempts = policy.max_attempts,
        "generating timetable"
    );
    let outcome = generate_valid_schedule(generator, problem, &request.courses, policy);
    tracing::info!(
        resolution = ?outcome.resolution,
        attempts = outcome.attempts,
        "generation finished"
    );

    writeln!(writer, "{}", serde_json::to_string_pretty(&outcome.timetable)?)?;
    Ok(outcome)
}
