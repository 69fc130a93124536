//! Shared utilities for CLI commands.

use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use tb_core::ScheduleRequest;

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Read a schedule request and reject empty or duplicate courses.
pub fn load_request(path: &Path) -> Result<ScheduleRequest> {
    let request: ScheduleRequest = read_json(path)?;
    request
        .validate()
        .with_context(|| format!("invalid request in {}", path.display()))?;
    Ok(request)
}
