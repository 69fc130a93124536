//! CLI subcommand implementations.

pub mod check;
pub mod generate;
pub mod normalize;
pub mod prompt;
mod util;
