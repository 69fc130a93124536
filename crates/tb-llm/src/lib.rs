//! Claude API integration for timetable generation.
//!
//! Provides:
//! - An async [`Client`] for the Anthropic Messages API
//! - [`BlockingGenerator`], which plugs the client into the synchronous
//!   retry loop in `tb-core`

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tb_core::{NO_SCHEDULE_SENTINEL, ProblemDescription, ScheduleGenerator};
use thiserror::Error;

/// Default request timeout for API calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const SCHEDULE_TEMPERATURE: f32 = 0.4;

/// LLM client errors.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provided API key was invalid.
    #[error("invalid API key: {reason}")]
    InvalidApiKey { reason: &'static str },
    /// Failed to build HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
    /// Failed to start the runtime used for blocking calls.
    #[error("failed to initialize tokio runtime: {0}")]
    Runtime(#[source] std::io::Error),
    /// HTTP request failed.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// API returned an error response.
    #[error("API error: {message}")]
    Api { message: String },
    /// Failed to parse response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Claude API client.
///
/// # Thread Safety
///
/// The client is safe to clone and share across threads. Each clone shares
/// the underlying HTTP connection pool.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    api_key: String,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Creates a new client with the given API key and request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or whitespace-only, or if
    /// the HTTP client fails to build.
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self, LlmError> {
        let api_key = api_key.into();

        // Validate API key
        if api_key.is_empty() {
            return Err(LlmError::InvalidApiKey {
                reason: "API key cannot be empty",
            });
        }
        if api_key.trim().is_empty() {
            return Err(LlmError::InvalidApiKey {
                reason: "API key cannot be whitespace-only",
            });
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(LlmError::ClientBuild)?;

        Ok(Self { http, api_key })
    }

    /// Asks the model for one candidate timetable and returns its raw text.
    ///
    /// The text is not validated here; callers classify it.
    pub async fn generate_schedule(
        &self,
        model: &str,
        max_tokens: u32,
        problem: &ProblemDescription,
    ) -> Result<String, LlmError> {
        let request = build_request(model, max_tokens, problem);

        let response = self
            .http
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(parse_api_error(&body).unwrap_or_else(|| LlmError::Api {
                message: format!("status {status}: {body}"),
            }));
        }

        let payload: MessageResponse = serde_json::from_str(&body)
            .map_err(|err| LlmError::InvalidResponse(err.to_string()))?;
        if let Some(usage) = &payload.usage {
            tracing::debug!(
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "token usage"
            );
        }
        extract_text(payload.content)
    }
}

/// Synchronous [`ScheduleGenerator`] backed by a [`Client`].
///
/// Owns a current-thread runtime so each generation call blocks until the
/// response arrives or the client's timeout fires.
pub struct BlockingGenerator {
    client: Client,
    runtime: tokio::runtime::Runtime,
    model: String,
    max_tokens: u32,
}

impl fmt::Debug for BlockingGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingGenerator")
            .field("client", &self.client)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl BlockingGenerator {
    pub fn new(client: Client, model: impl Into<String>, max_tokens: u32) -> Result<Self, LlmError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(LlmError::Runtime)?;
        Ok(Self {
            client,
            runtime,
            model: model.into(),
            max_tokens,
        })
    }
}

impl ScheduleGenerator for BlockingGenerator {
    type Error = LlmError;

    fn generate(&mut self, problem: &ProblemDescription) -> Result<String, LlmError> {
        self.runtime.block_on(
            self.client
                .generate_schedule(&self.model, self.max_tokens, problem),
        )
    }
}

#[derive(Debug, Serialize)]
struct MessageRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    system: String,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
}

fn build_request(model: &str, max_tokens: u32, problem: &ProblemDescription) -> MessageRequest {
    MessageRequest {
        model: model.to_string(),
        max_tokens,
        temperature: SCHEDULE_TEMPERATURE,
        system: system_prompt(),
        messages: vec![Message {
            role: "user",
            content: problem.to_string(),
        }],
    }
}

fn extract_text(blocks: Vec<ContentBlock>) -> Result<String, LlmError> {
    let mut pieces = Vec::new();
    for block in blocks {
        let ContentBlock::Text { text } = block;
        pieces.push(text);
    }
    if pieces.is_empty() {
        return Err(LlmError::InvalidResponse(
            "missing text content".to_string(),
        ));
    }
    Ok(pieces.join("\n"))
}

fn parse_api_error(body: &str) -> Option<LlmError> {
    #[derive(Deserialize)]
    struct ErrorPayload {
        error: ErrorDetails,
    }

    #[derive(Deserialize)]
    struct ErrorDetails {
        message: String,
    }

    serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| LlmError::Api {
            message: payload.error.message,
        })
}

/// JSON schema every candidate timetable must follow.
pub fn output_schema() -> serde_json::Value {
    let string = serde_json::json!({ "type": "string" });
    serde_json::json!({
        "type": "object",
        "required": ["classes"],
        "properties": {
            "classes": {
                "type": "array",
                "items": {
                    "type": "object",
                    "required": [
                        "crn", "courseNumber", "courseName", "professorName",
                        "days", "time", "location"
                    ],
                    "properties": {
                        "crn": string,
                        "courseNumber": string,
                        "courseName": string,
                        "professorName": string,
                        "days": string,
                        "time": string,
                        "location": string
                    }
                }
            }
        }
    })
}

fn system_prompt() -> String {
    let schema = serde_json::to_string_pretty(&output_schema()).unwrap_or_default();
    let mut lines = vec![
        "You are a virtual timetable generator.".to_string(),
        String::new(),
        "Input:".to_string(),
        "- <preferences_by_user>: free-text preferences.".to_string(),
        "- For each required course: <course_number>, <professor_preference>, and a CSV table of"
            .to_string(),
        "  available sections (CRN, course, title, schedule type, instructor, days, begin and end time, location)."
            .to_string(),
        String::new(),
        "Strict rules:".to_string(),
        "1. Select exactly one section (CRN) per required course.".to_string(),
        "2. A CRN may have several rows (lecture + lab, additional times). Include all of them or none."
            .to_string(),
        "3. No two classes may overlap on the same day, even by one minute. A class ending at 10:00AM conflicts with one starting at 10:00AM."
            .to_string(),
        "4. Leave at least a 5-minute gap between consecutive classes on the same day.".to_string(),
        "5. Never return a partial schedule.".to_string(),
        format!(
            "6. If no combination satisfies every rule, reply with exactly {NO_SCHEDULE_SENTINEL}."
        ),
        String::new(),
        "Preferences apply only after every strict rule holds: preferred professors, morning or afternoon classes, fewer blocks."
            .to_string(),
        String::new(),
        "Output format:".to_string(),
        "- Reply with JSON only, no prose and no code fences, matching this schema:".to_string(),
        schema,
        "- One entry per meeting row of each selected CRN.".to_string(),
        "- courseNumber is department and number with no separator, e.g. CS2114 (never CS-2114)."
            .to_string(),
        "- days is a contiguous string of weekday letters (M, T, W, R, F, S, U), e.g. MWF.".to_string(),
        "- time is \"START - END\" in 12-hour clock, e.g. 9:30AM - 10:45AM.".to_string(),
    ];
    lines.push(String::new());
    lines.push("Check every day for overlaps and gaps before answering.".to_string());
    lines.join("\n")
}
