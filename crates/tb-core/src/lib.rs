//! Core domain logic for the timetable generator.
//!
//! This crate contains:
//! - Time normalization: parsing catalog clock times into minutes
//! - Constraint checking: completeness and same-day spacing of candidates
//! - Retry orchestration: driving an external generator until a candidate passes
//! - Section catalogs and the problem descriptions built from them

pub mod catalog;
pub mod check;
pub mod orchestrator;
pub mod problem;
pub mod time;
mod types;

pub use catalog::{CatalogError, FileCatalog, SectionSource};
pub use check::{
    CheckReport, CheckerConfig, Conflict, NormalizedBlock, Reason, UnparsableTimePolicy,
    Violation, check,
};
pub use orchestrator::{
    DEFAULT_MAX_ATTEMPTS, GeneratorReply, NO_SCHEDULE_SENTINEL, Resolution, RetryPolicy,
    ScheduleGenerator, ScheduleOutcome, classify, generate_valid_schedule,
};
pub use problem::{ProblemDescription, build_problem};
pub use time::{TimeFormatError, normalize};
pub use types::{
    CandidateTimetable, CourseKey, RequiredCourse, ScheduleRequest, SectionOffering, TimeBlock,
    ValidationError, Weekday,
};
