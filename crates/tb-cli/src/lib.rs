//! Timetable generator CLI library.
//!
//! This crate provides the CLI interface for the timetable generator.

mod cli;
pub mod commands;
mod config;

pub use cli::{CheckArgs, Cli, Commands, GenerateArgs, PromptArgs};
pub use config::Config;
