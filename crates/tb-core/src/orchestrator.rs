//! Retry loop around the timetable generator.
//!
//! Each attempt is a full, independent generator call with the same problem
//! description. Candidates are never repaired: a candidate is returned as
//! produced once it passes [`check`], otherwise another attempt is made
//! until the budget runs out.

use std::fmt;

use serde::Serialize;

use crate::check::{CheckerConfig, check};
use crate::problem::ProblemDescription;
use crate::types::{CandidateTimetable, RequiredCourse};

/// Default number of generator calls per request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Text a generator emits when it declares that no valid schedule exists.
pub const NO_SCHEDULE_SENTINEL: &str = "NO_VALID_SCHEDULE_FOUND";

/// Longest response excerpt included in log lines.
const LOG_EXCERPT_CHARS: usize = 200;

/// Produces raw candidate timetables from a problem description.
///
/// Implementations are constructed per request and own whatever client state
/// they need; nothing is shared between concurrent orchestrations.
pub trait ScheduleGenerator {
    type Error: fmt::Display;

    /// Makes one blocking generation call and returns the raw response text.
    fn generate(&mut self, problem: &ProblemDescription) -> Result<String, Self::Error>;
}

/// Classification of a raw generator response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorReply {
    /// Parsed into a non-empty candidate timetable.
    WellFormed(CandidateTimetable),
    /// Could not be parsed; carries the raw text.
    Malformed(String),
    /// The generator declared that no valid schedule exists.
    ExplicitNoSchedule,
}

/// Classifies untrusted generator output.
///
/// Accepts bare JSON or JSON wrapped in a Markdown code fence. A reply that
/// is nothing but the sentinel (bare, quoted, or as the single value of a JSON
/// object) and an empty `classes` array both count as an explicit
/// "no schedule" answer. Any other text that fails to parse is malformed,
/// even when it mentions the sentinel.
pub fn classify(raw: &str) -> GeneratorReply {
    let body = strip_code_fence(raw.trim());
    if is_sentinel_only(body) {
        return GeneratorReply::ExplicitNoSchedule;
    }

    match serde_json::from_str::<CandidateTimetable>(body) {
        Ok(candidate) if candidate.is_empty() => GeneratorReply::ExplicitNoSchedule,
        Ok(candidate) => GeneratorReply::WellFormed(candidate),
        Err(_) => GeneratorReply::Malformed(raw.to_string()),
    }
}

fn is_sentinel_only(body: &str) -> bool {
    if body == NO_SCHEDULE_SENTINEL {
        return true;
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::String(text)) => text.trim() == NO_SCHEDULE_SENTINEL,
        Ok(serde_json::Value::Object(map)) if map.len() == 1 => map
            .values()
            .all(|value| value.as_str().map(str::trim) == Some(NO_SCHEDULE_SENTINEL)),
        _ => false,
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    // Drop the language tag on the opening line, e.g. ```json
    rest.split_once('\n').map_or(rest, |(_, body)| body).trim()
}

/// Retry budget and checker settings for one orchestration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub checker: CheckerConfig,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            checker: CheckerConfig::default(),
        }
    }
}

/// How an orchestration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// A candidate passed every check.
    Accepted,
    /// The generator declared that no valid schedule exists.
    NoScheduleDeclared,
    /// Every attempt produced an unusable candidate.
    Exhausted,
}

/// Final result of [`generate_valid_schedule`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleOutcome {
    /// The accepted candidate, or an empty timetable.
    pub timetable: CandidateTimetable,
    pub resolution: Resolution,
    /// Number of generator calls made.
    pub attempts: u32,
}

impl ScheduleOutcome {
    fn empty(resolution: Resolution, attempts: u32) -> Self {
        Self {
            timetable: CandidateTimetable::empty(),
            resolution,
            attempts,
        }
    }
}

/// Calls the generator until a candidate passes [`check`], the generator
/// declares that no schedule exists, or `policy.max_attempts` calls were made.
///
/// Generator failures and malformed responses consume an attempt. This never
/// fails: an exhausted budget yields an empty timetable.
pub fn generate_valid_schedule<G: ScheduleGenerator + ?Sized>(
    generator: &mut G,
    problem: &ProblemDescription,
    required: &[RequiredCourse],
    policy: &RetryPolicy,
) -> ScheduleOutcome {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempts = 0;

    while attempts < max_attempts {
        attempts += 1;

        let raw = match generator.generate(problem) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::warn!(attempt = attempts, error = %err, "generator call failed, retrying");
                continue;
            }
        };

        match classify(&raw) {
            GeneratorReply::ExplicitNoSchedule => {
                tracing::info!(attempt = attempts, "generator reported no valid schedule");
                return ScheduleOutcome::empty(Resolution::NoScheduleDeclared, attempts);
            }
            GeneratorReply::Malformed(raw) => {
                tracing::warn!(
                    attempt = attempts,
                    excerpt = %excerpt(&raw),
                    "malformed generator response, retrying"
                );
            }
            GeneratorReply::WellFormed(candidate) => {
                let report = check(&candidate, required, &policy.checker);
                if report.valid {
                    tracing::info!(
                        attempt = attempts,
                        blocks = candidate.classes.len(),
                        "accepted candidate timetable"
                    );
                    return ScheduleOutcome {
                        timetable: candidate,
                        resolution: Resolution::Accepted,
                        attempts,
                    };
                }
                if let Some(violation) = &report.detail {
                    tracing::warn!(attempt = attempts, %violation, "candidate rejected, retrying");
                }
            }
        }
    }

    tracing::warn!(attempts, "retry budget exhausted without a valid schedule");
    ScheduleOutcome::empty(Resolution::Exhausted, attempts)
}

fn excerpt(raw: &str) -> String {
    let mut chars = raw.chars();
    let head: String = chars.by_ref().take(LOG_EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    const VALID: &str = r#"{"classes": [
        {"crn": "11111", "courseNumber": "CS2114", "courseName": "Software Design",
         "professorName": "Smith", "days": "MWF", "time": "9:05AM - 9:55AM", "location": "MCB 100"},
        {"crn": "22222", "courseNumber": "ENGL1106", "courseName": "First-Year Writing",
         "professorName": "Jones", "days": "TR", "time": "9:30AM - 10:45AM", "location": "SHAN 300"}
    ]}"#;

    const INCOMPLETE: &str = r#"{"classes": [
        {"crn": "11111", "courseNumber": "CS2114", "courseName": "Software Design",
         "professorName": "Smith", "days": "MWF", "time": "9:05AM - 9:55AM", "location": "MCB 100"}
    ]}"#;

    const OVERLAPPING: &str = r#"{"classes": [
        {"crn": "11111", "courseNumber": "CS2114", "courseName": "Software Design",
         "professorName": "Smith", "days": "TR", "time": "9:00AM - 10:00AM", "location": "MCB 100"},
        {"crn": "22222", "courseNumber": "ENGL1106", "courseName": "First-Year Writing",
         "professorName": "Jones", "days": "TR", "time": "9:30AM - 10:45AM", "location": "SHAN 300"}
    ]}"#;

    /// Replays canned responses and counts calls.
    struct Scripted {
        responses: VecDeque<Result<String, String>>,
        calls: u32,
    }

    impl Scripted {
        fn new(responses: &[Result<&str, &str>]) -> Self {
            Self {
                responses: responses
                    .iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
                calls: 0,
            }
        }

        fn repeating(response: &str, times: usize) -> Self {
            Self::new(&vec![Ok(response); times])
        }
    }

    impl ScheduleGenerator for Scripted {
        type Error = String;

        fn generate(&mut self, _problem: &ProblemDescription) -> Result<String, String> {
            self.calls += 1;
            self.responses
                .pop_front()
                .unwrap_or_else(|| Err("script exhausted".to_string()))
        }
    }

    fn problem() -> ProblemDescription {
        crate::problem::render_problem("", &[])
    }

    fn required() -> Vec<RequiredCourse> {
        vec![
            RequiredCourse::new("CS", "2114").unwrap(),
            RequiredCourse::new("ENGL", "1106").unwrap(),
        ]
    }

    #[test]
    fn classify_accepts_bare_json() {
        assert!(matches!(classify(VALID), GeneratorReply::WellFormed(c) if c.classes.len() == 2));
    }

    #[test]
    fn classify_accepts_fenced_json() {
        let fenced = format!("```json\n{VALID}\n```");
        assert!(matches!(classify(&fenced), GeneratorReply::WellFormed(_)));
    }

    #[test]
    fn classify_detects_sentinel() {
        assert_eq!(
            classify("NO_VALID_SCHEDULE_FOUND"),
            GeneratorReply::ExplicitNoSchedule
        );
        assert_eq!(
            classify("\"NO_VALID_SCHEDULE_FOUND\""),
            GeneratorReply::ExplicitNoSchedule
        );
        assert_eq!(
            classify(r#"{"result": "NO_VALID_SCHEDULE_FOUND"}"#),
            GeneratorReply::ExplicitNoSchedule
        );
    }

    #[test]
    fn classify_ignores_sentinel_inside_broken_replies() {
        let truncated = r#"Unlike NO_VALID_SCHEDULE_FOUND, here is one: {"classes": ["#;
        assert_eq!(
            classify(truncated),
            GeneratorReply::Malformed(truncated.to_string())
        );

        let missing_time = r#"{"classes": [{"crn": "1", "courseNumber": "CS2114",
            "courseName": "not NO_VALID_SCHEDULE_FOUND", "days": "MWF"}]}"#;
        assert!(matches!(classify(missing_time), GeneratorReply::Malformed(_)));

        assert!(matches!(
            classify("NO_VALID_SCHEDULE_FOUND because of conflicts"),
            GeneratorReply::Malformed(_)
        ));
    }

    #[test]
    fn sentinel_inside_broken_reply_consumes_an_attempt() {
        let broken = r#"Unlike NO_VALID_SCHEDULE_FOUND, here is one: {"classes": ["#;
        let mut generator = Scripted::new(&[Ok(broken), Ok(VALID)]);
        let outcome =
            generate_valid_schedule(&mut generator, &problem(), &required(), &RetryPolicy::default());

        assert_eq!(outcome.resolution, Resolution::Accepted);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(generator.calls, 2);
    }

    #[test]
    fn classify_treats_empty_classes_as_no_schedule() {
        assert_eq!(
            classify(r#"{"classes": []}"#),
            GeneratorReply::ExplicitNoSchedule
        );
    }

    #[test]
    fn classify_flags_malformed_text() {
        assert_eq!(
            classify("Here is your schedule!"),
            GeneratorReply::Malformed("Here is your schedule!".to_string())
        );
        assert!(matches!(
            classify(r#"{"classes": [{"crn": "1"}]}"#),
            GeneratorReply::Malformed(_)
        ));
    }

    #[test]
    fn first_valid_response_is_returned_without_retry() {
        let mut generator = Scripted::repeating(VALID, 5);
        let outcome =
            generate_valid_schedule(&mut generator, &problem(), &required(), &RetryPolicy::default());

        assert_eq!(outcome.resolution, Resolution::Accepted);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(generator.calls, 1);
        assert_eq!(
            outcome.timetable,
            serde_json::from_str::<CandidateTimetable>(VALID).unwrap()
        );
    }

    #[test]
    fn malformed_responses_exhaust_after_exactly_five_calls() {
        let mut generator = Scripted::repeating("not json", 10);
        let outcome =
            generate_valid_schedule(&mut generator, &problem(), &required(), &RetryPolicy::default());

        assert_eq!(outcome.resolution, Resolution::Exhausted);
        assert_eq!(outcome.attempts, 5);
        assert_eq!(generator.calls, 5);
        assert!(outcome.timetable.is_empty());
        assert_eq!(
            serde_json::to_string(&outcome.timetable).unwrap(),
            r#"{"classes":[]}"#
        );
    }

    #[test]
    fn incomplete_candidate_triggers_retry() {
        let mut generator = Scripted::new(&[Ok(INCOMPLETE), Ok(VALID)]);
        let outcome =
            generate_valid_schedule(&mut generator, &problem(), &required(), &RetryPolicy::default());

        assert_eq!(outcome.resolution, Resolution::Accepted);
        assert_eq!(outcome.attempts, 2);
    }

    #[test]
    fn overlapping_candidate_triggers_retry() {
        let mut generator = Scripted::new(&[Ok(OVERLAPPING), Ok("garbage"), Ok(VALID)]);
        let outcome =
            generate_valid_schedule(&mut generator, &problem(), &required(), &RetryPolicy::default());

        assert_eq!(outcome.resolution, Resolution::Accepted);
        assert_eq!(outcome.attempts, 3);
    }

    #[test]
    fn explicit_no_schedule_stops_immediately() {
        let mut generator = Scripted::new(&[Ok("garbage"), Ok(NO_SCHEDULE_SENTINEL), Ok(VALID)]);
        let outcome =
            generate_valid_schedule(&mut generator, &problem(), &required(), &RetryPolicy::default());

        assert_eq!(outcome.resolution, Resolution::NoScheduleDeclared);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(generator.calls, 2);
        assert!(outcome.timetable.is_empty());
    }

    #[test]
    fn generator_errors_consume_attempts() {
        let mut generator = Scripted::new(&[Err("timeout"), Err("503"), Ok(VALID)]);
        let policy = RetryPolicy {
            max_attempts: 3,
            ..RetryPolicy::default()
        };
        let outcome = generate_valid_schedule(&mut generator, &problem(), &required(), &policy);

        assert_eq!(outcome.resolution, Resolution::Accepted);
        assert_eq!(outcome.attempts, 3);
    }

    #[test]
    fn custom_budget_is_respected() {
        let mut generator = Scripted::repeating(INCOMPLETE, 10);
        let policy = RetryPolicy {
            max_attempts: 2,
            ..RetryPolicy::default()
        };
        let outcome = generate_valid_schedule(&mut generator, &problem(), &required(), &policy);

        assert_eq!(outcome.resolution, Resolution::Exhausted);
        assert_eq!(generator.calls, 2);
    }

    #[test]
    fn zero_budget_still_makes_one_attempt() {
        let mut generator = Scripted::repeating(VALID, 1);
        let policy = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        let outcome = generate_valid_schedule(&mut generator, &problem(), &required(), &policy);

        assert_eq!(outcome.resolution, Resolution::Accepted);
        assert_eq!(generator.calls, 1);
    }

    #[test]
    fn excerpt_truncates_long_responses() {
        let long = "x".repeat(LOG_EXCERPT_CHARS + 10);
        let short = excerpt(&long);
        assert!(short.ends_with("..."));
        assert_eq!(short.len(), LOG_EXCERPT_CHARS + 3);
    }
}
