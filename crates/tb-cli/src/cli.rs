//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Conflict-free class timetable generator.
///
/// Asks an LLM for a weekly timetable covering the required courses and
/// independently verifies every candidate before accepting it.
#[derive(Debug, Parser)]
#[command(name = "tb", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Generate a verified timetable for a request.
    Generate(GenerateArgs),

    /// Check a stored candidate timetable against a request.
    Check(CheckArgs),

    /// Print the problem description that would be sent to the generator.
    Prompt(PromptArgs),

    /// Convert a clock time to minutes since midnight.
    Normalize {
        /// Time such as 9:30AM, "10:00 AM" or 14:15.
        time: String,
    },
}

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Schedule request JSON (term, courses, preferences).
    #[arg(long)]
    pub request: PathBuf,

    /// Section catalog JSON keyed by term.
    #[arg(long)]
    pub catalog: PathBuf,

    /// Override the configured number of generator calls.
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Schedule request JSON (term, courses, preferences).
    #[arg(long)]
    pub request: PathBuf,

    /// Candidate timetable JSON with a `classes` array.
    #[arg(long)]
    pub candidate: PathBuf,
}

#[derive(Debug, Args)]
pub struct PromptArgs {
    /// Schedule request JSON (term, courses, preferences).
    #[arg(long)]
    pub request: PathBuf,

    /// Section catalog JSON keyed by term.
    #[arg(long)]
    pub catalog: PathBuf,
}
