//! Hard-constraint checking for candidate timetables.
//!
//! A candidate is valid when it covers exactly the required courses and no
//! two meetings on the same day overlap or sit closer than the minimum gap.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::time::format_minutes;
use crate::types::{CandidateTimetable, CourseKey, RequiredCourse, TimeBlock, Weekday};

/// Minimum number of free minutes between consecutive meetings on one day.
pub const DEFAULT_MIN_GAP_MINUTES: u16 = 5;

/// Day strings that mark a section with no fixed meeting time.
const ARRANGED_MARKERS: [&str; 4] = ["ARR", "(ARR)", "TBA", "ONLINE"];

/// What to do with a block whose days or times cannot be parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnparsableTimePolicy {
    /// Exclude the block from overlap checking and keep evaluating the candidate.
    Skip,
    /// Treat the whole candidate as invalid.
    #[default]
    Reject,
}

impl UnparsableTimePolicy {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Reject => "reject",
        }
    }
}

impl fmt::Display for UnparsableTimePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for UnparsableTimePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(Self::Skip),
            "reject" => Ok(Self::Reject),
            _ => Err(format!("invalid unparsable time policy: {s}")),
        }
    }
}

/// Tunables for [`check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckerConfig {
    pub min_gap_minutes: u16,
    pub unparsable_times: UnparsableTimePolicy,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            min_gap_minutes: DEFAULT_MIN_GAP_MINUTES,
            unparsable_times: UnparsableTimePolicy::default(),
        }
    }
}

/// A time block expanded to a single weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedBlock {
    pub day: Weekday,
    pub start: u16,
    pub end: u16,
    pub crn: String,
    pub course_number: String,
}

/// A block excluded from overlap checking because it could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedBlock {
    /// Position of the block in the candidate's `classes` list.
    pub index: usize,
    pub crn: String,
    pub course_number: String,
    pub reason: String,
}

/// Result of expanding a candidate's blocks into per-day meetings.
#[derive(Debug, Default)]
pub struct Expansion {
    /// Meetings in candidate order, one per (block, day letter).
    pub meetings: Vec<NormalizedBlock>,
    pub skipped: Vec<SkippedBlock>,
}

impl Expansion {
    /// Groups meetings by weekday, preserving candidate order within a day.
    pub fn by_day(&self) -> BTreeMap<Weekday, Vec<&NormalizedBlock>> {
        let mut days: BTreeMap<Weekday, Vec<&NormalizedBlock>> = BTreeMap::new();
        for meeting in &self.meetings {
            days.entry(meeting.day).or_default().push(meeting);
        }
        days
    }
}

/// Expands every block into one [`NormalizedBlock`] per day letter.
///
/// Blocks with no fixed meeting time (`ARR`, `TBA` or empty days together
/// with a time that has no clock digits) produce no meetings and are not
/// reported. Blocks with unreadable days or times, including a real time
/// range without meeting days, are reported in [`Expansion::skipped`].
pub fn expand(blocks: &[TimeBlock]) -> Expansion {
    let mut expansion = Expansion::default();

    for (index, block) in blocks.iter().enumerate() {
        let skip = |reason: String| SkippedBlock {
            index,
            crn: block.crn.clone(),
            course_number: block.course_number.clone(),
            reason,
        };

        if has_no_meeting_days(&block.days) {
            if has_clock_time(&block.time) {
                expansion.skipped.push(skip(format!(
                    "time {:?} has no meeting days ({:?})",
                    block.time, block.days
                )));
            } else {
                tracing::debug!(crn = %block.crn, days = %block.days, "block has no fixed meeting time");
            }
            continue;
        }

        let days: Result<Vec<Weekday>, char> = block
            .days
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| Weekday::from_letter(c).ok_or(c))
            .collect();
        let days = match days {
            Ok(days) => days,
            Err(letter) => {
                expansion
                    .skipped
                    .push(skip(format!("unknown day letter {letter:?} in {:?}", block.days)));
                continue;
            }
        };

        let (start, end) = match block.minutes() {
            Ok(range) => range,
            Err(err) => {
                expansion.skipped.push(skip(err.to_string()));
                continue;
            }
        };

        tracing::debug!(crn = %block.crn, time = %block.time, start, end, "parsed block");
        expansion
            .meetings
            .extend(days.into_iter().map(|day| NormalizedBlock {
                day,
                start,
                end,
                crn: block.crn.clone(),
                course_number: block.course_number.clone(),
            }));
    }

    expansion
}

fn has_no_meeting_days(days: &str) -> bool {
    let trimmed = days.trim();
    trimmed.is_empty()
        || ARRANGED_MARKERS
            .iter()
            .any(|marker| trimmed.eq_ignore_ascii_case(marker))
}

fn has_clock_time(time: &str) -> bool {
    time.chars().any(|c| c.is_ascii_digit())
}

/// A pair of same-day meetings that violate the spacing constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conflict {
    pub day: Weekday,
    pub first: NormalizedBlock,
    pub second: NormalizedBlock,
}

impl Conflict {
    /// Free minutes between the two meetings; negative when they overlap.
    pub fn gap_minutes(&self) -> i32 {
        i32::from(self.second.start) - i32::from(self.first.end)
    }
}

/// Finds the first pair of meetings on one day that overlap or are closer
/// than `min_gap` minutes apart.
///
/// All meetings must share a day. The input is not reordered.
pub fn find_conflict(meetings: &[&NormalizedBlock], min_gap: u16) -> Option<Conflict> {
    let mut sorted = meetings.to_vec();
    sorted.sort_by_key(|m| (m.start, m.end));

    sorted.windows(2).find_map(|pair| {
        let (current, next) = (pair[0], pair[1]);
        let too_close = u32::from(current.end) + u32::from(min_gap) > u32::from(next.start);
        too_close.then(|| Conflict {
            day: current.day,
            first: current.clone(),
            second: next.clone(),
        })
    })
}

/// Why a candidate was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// The candidate has no blocks.
    Empty,
    /// The scheduled courses differ from the required ones.
    IncompleteOrExtra {
        missing: Vec<CourseKey>,
        unexpected: Vec<CourseKey>,
    },
    /// Some blocks could not be parsed and the policy is to reject.
    UnparsableTime { blocks: Vec<SkippedBlock> },
    /// Two meetings on the same day overlap or lack the minimum gap.
    Overlap(Conflict),
}

impl Violation {
    pub const fn reason(&self) -> Reason {
        match self {
            Self::Empty => Reason::Empty,
            Self::IncompleteOrExtra { .. } => Reason::IncompleteOrExtra,
            Self::UnparsableTime { .. } => Reason::UnparsableTime,
            Self::Overlap(_) => Reason::Overlap,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "candidate has no classes"),
            Self::IncompleteOrExtra {
                missing,
                unexpected,
            } => write!(
                f,
                "course mismatch: missing [{}], unexpected [{}]",
                join_keys(missing),
                join_keys(unexpected)
            ),
            Self::UnparsableTime { blocks } => {
                write!(f, "{} block(s) have unparsable times", blocks.len())
            }
            Self::Overlap(conflict) => write!(
                f,
                "overlap on {} between {} ({}-{}) and {} ({}-{})",
                conflict.day,
                conflict.first.course_number,
                format_minutes(conflict.first.start),
                format_minutes(conflict.first.end),
                conflict.second.course_number,
                format_minutes(conflict.second.start),
                format_minutes(conflict.second.end),
            ),
        }
    }
}

fn join_keys(keys: &[CourseKey]) -> String {
    keys.iter()
        .map(CourseKey::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outcome category of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    Valid,
    Empty,
    IncompleteOrExtra,
    UnparsableTime,
    Overlap,
}

/// Verdict for one candidate, with diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub valid: bool,
    pub reason: Reason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Violation>,
    /// Blocks left out of overlap checking.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedBlock>,
}

impl CheckReport {
    fn pass(skipped: Vec<SkippedBlock>) -> Self {
        Self {
            valid: true,
            reason: Reason::Valid,
            detail: None,
            skipped,
        }
    }

    fn fail(violation: Violation, skipped: Vec<SkippedBlock>) -> Self {
        Self {
            valid: false,
            reason: violation.reason(),
            detail: Some(violation),
            skipped,
        }
    }
}

/// Checks a candidate against completeness and spacing constraints.
pub fn check(
    candidate: &CandidateTimetable,
    required: &[RequiredCourse],
    config: &CheckerConfig,
) -> CheckReport {
    if candidate.is_empty() {
        return CheckReport::fail(Violation::Empty, Vec::new());
    }

    let required_keys: BTreeSet<CourseKey> = required.iter().map(RequiredCourse::key).collect();
    let scheduled_keys = candidate.course_keys();
    if required_keys != scheduled_keys {
        let missing = required_keys.difference(&scheduled_keys).cloned().collect();
        let unexpected = scheduled_keys.difference(&required_keys).cloned().collect();
        return CheckReport::fail(
            Violation::IncompleteOrExtra {
                missing,
                unexpected,
            },
            Vec::new(),
        );
    }

    let expansion = expand(&candidate.classes);
    for skipped in &expansion.skipped {
        tracing::warn!(
            crn = %skipped.crn,
            course = %skipped.course_number,
            reason = %skipped.reason,
            "excluding block from overlap check"
        );
    }
    if !expansion.skipped.is_empty() && config.unparsable_times == UnparsableTimePolicy::Reject {
        let blocks = expansion.skipped.clone();
        return CheckReport::fail(Violation::UnparsableTime { blocks }, expansion.skipped);
    }

    // Stops at the first offending day.
    let conflict = expansion
        .by_day()
        .values()
        .find_map(|meetings| find_conflict(meetings, config.min_gap_minutes));

    match conflict {
        Some(conflict) => CheckReport::fail(Violation::Overlap(conflict), expansion.skipped),
        None => CheckReport::pass(expansion.skipped),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(crn: &str, course: &str, days: &str, time: &str) -> TimeBlock {
        TimeBlock {
            crn: crn.to_string(),
            course_number: course.to_string(),
            course_name: String::new(),
            professor_name: String::new(),
            days: days.to_string(),
            time: time.to_string(),
            location: String::new(),
        }
    }

    fn required(codes: &[(&str, &str)]) -> Vec<RequiredCourse> {
        codes
            .iter()
            .map(|(dept, number)| RequiredCourse::new(*dept, *number).unwrap())
            .collect()
    }

    fn candidate(blocks: Vec<TimeBlock>) -> CandidateTimetable {
        CandidateTimetable { classes: blocks }
    }

    #[test]
    fn empty_candidate_is_invalid() {
        let report = check(
            &CandidateTimetable::empty(),
            &required(&[("CS", "2114")]),
            &CheckerConfig::default(),
        );
        assert!(!report.valid);
        assert_eq!(report.reason, Reason::Empty);
    }

    #[test]
    fn missing_course_is_reported() {
        let courses = required(&[("CS", "2114"), ("ENGL", "1106")]);
        let timetable = candidate(vec![block("1", "CS2114", "MWF", "9:05AM - 9:55AM")]);

        let report = check(&timetable, &courses, &CheckerConfig::default());
        assert_eq!(report.reason, Reason::IncompleteOrExtra);
        assert_eq!(
            report.detail,
            Some(Violation::IncompleteOrExtra {
                missing: vec![CourseKey::normalize("ENGL1106")],
                unexpected: vec![],
            })
        );
    }

    #[test]
    fn extra_course_is_reported() {
        let courses = required(&[("CS", "2114")]);
        let timetable = candidate(vec![
            block("1", "CS2114", "MWF", "9:05AM - 9:55AM"),
            block("2", "MATH1226", "TR", "9:30AM - 10:45AM"),
        ]);

        let report = check(&timetable, &courses, &CheckerConfig::default());
        let Some(Violation::IncompleteOrExtra { missing, unexpected }) = report.detail else {
            panic!("expected course mismatch, got {:?}", report.reason);
        };
        assert!(missing.is_empty());
        assert_eq!(unexpected, vec![CourseKey::normalize("MATH1226")]);
    }

    #[test]
    fn hyphenated_course_numbers_are_tolerated() {
        let courses = required(&[("CS", "2114"), ("ENGL", "1106")]);
        let timetable = candidate(vec![
            block("1", "CS-2114", "MWF", "9:05AM - 9:55AM"),
            block("2", "ENGL-1106", "TR", "9:30AM - 10:45AM"),
        ]);

        assert!(check(&timetable, &courses, &CheckerConfig::default()).valid);
    }

    #[test]
    fn zero_gap_is_a_violation() {
        let courses = required(&[("CS", "2114"), ("ENGL", "1106")]);
        let timetable = candidate(vec![
            block("1", "CS2114", "M", "9:00AM - 10:00AM"),
            block("2", "ENGL1106", "M", "10:00AM - 11:00AM"),
        ]);

        let report = check(&timetable, &courses, &CheckerConfig::default());
        assert_eq!(report.reason, Reason::Overlap);
        let Some(Violation::Overlap(conflict)) = report.detail else {
            panic!("expected overlap");
        };
        assert_eq!(conflict.day, Weekday::Monday);
        assert_eq!(conflict.gap_minutes(), 0);
    }

    #[test]
    fn exact_minimum_gap_is_accepted() {
        let courses = required(&[("CS", "2114"), ("ENGL", "1106")]);
        let timetable = candidate(vec![
            block("1", "CS2114", "M", "9:00AM - 10:00AM"),
            block("2", "ENGL1106", "M", "10:05AM - 11:00AM"),
        ]);

        assert!(check(&timetable, &courses, &CheckerConfig::default()).valid);
    }

    #[test]
    fn four_minute_gap_is_a_violation() {
        let courses = required(&[("CS", "2114"), ("ENGL", "1106")]);
        let timetable = candidate(vec![
            block("1", "CS2114", "W", "9:00AM - 10:00AM"),
            block("2", "ENGL1106", "W", "10:04AM - 11:00AM"),
        ]);

        let report = check(&timetable, &courses, &CheckerConfig::default());
        assert_eq!(report.reason, Reason::Overlap);
    }

    #[test]
    fn overlap_is_found_regardless_of_block_order() {
        let courses = required(&[("CS", "2114"), ("ENGL", "1106")]);
        let timetable = candidate(vec![
            block("2", "ENGL1106", "TR", "10:00AM - 11:15AM"),
            block("1", "CS2114", "MWF", "9:05AM - 9:55AM"),
            block("1", "CS2114", "R", "9:30AM - 10:20AM"),
        ]);

        let report = check(&timetable, &courses, &CheckerConfig::default());
        let Some(Violation::Overlap(conflict)) = report.detail else {
            panic!("expected overlap, got {:?}", report.reason);
        };
        assert_eq!(conflict.day, Weekday::Thursday);
        assert_eq!(conflict.first.course_number, "CS2114");
        assert_eq!(conflict.second.course_number, "ENGL1106");
        assert_eq!(conflict.gap_minutes(), -20);
    }

    #[test]
    fn meetings_on_different_days_do_not_conflict() {
        let courses = required(&[("CS", "2114"), ("ENGL", "1106")]);
        let timetable = candidate(vec![
            block("1", "CS2114", "MWF", "9:00AM - 10:00AM"),
            block("2", "ENGL1106", "TR", "9:00AM - 10:00AM"),
        ]);

        assert!(check(&timetable, &courses, &CheckerConfig::default()).valid);
    }

    #[test]
    fn unparsable_time_rejects_by_default() {
        let courses = required(&[("CS", "2114"), ("ENGL", "1106")]);
        let timetable = candidate(vec![
            block("1", "CS2114", "MWF", "9:00AM - 10:00AM"),
            block("2", "ENGL1106", "TR", "sometime"),
        ]);

        let report = check(&timetable, &courses, &CheckerConfig::default());
        assert_eq!(report.reason, Reason::UnparsableTime);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].index, 1);
    }

    #[test]
    fn unparsable_time_is_skipped_when_configured() {
        let courses = required(&[("CS", "2114"), ("ENGL", "1106")]);
        let timetable = candidate(vec![
            block("1", "CS2114", "MWF", "9:00AM - 10:00AM"),
            block("2", "ENGL1106", "MWF", "9:30AM-10:30AM"),
        ]);
        let config = CheckerConfig {
            unparsable_times: UnparsableTimePolicy::Skip,
            ..CheckerConfig::default()
        };

        let report = check(&timetable, &courses, &config);
        assert!(report.valid);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].crn, "2");
    }

    #[test]
    fn skipped_blocks_still_count_for_completeness() {
        let courses = required(&[("CS", "2114")]);
        let timetable = candidate(vec![block("1", "CS2114", "MWF", "bogus")]);
        let config = CheckerConfig {
            unparsable_times: UnparsableTimePolicy::Skip,
            ..CheckerConfig::default()
        };

        let report = check(&timetable, &courses, &config);
        assert!(report.valid);
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn arranged_blocks_are_not_failures() {
        let courses = required(&[("CS", "2114"), ("ENGL", "1106")]);
        let timetable = candidate(vec![
            block("1", "CS2114", "MWF", "9:00AM - 10:00AM"),
            block("2", "ENGL1106", "(ARR)", "-----"),
        ]);

        let report = check(&timetable, &courses, &CheckerConfig::default());
        assert!(report.valid);
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn timed_block_without_meeting_days_is_rejected() {
        let courses = required(&[("CS", "2114"), ("ENGL", "1106")]);
        for days in ["", "ONLINE", "TBA"] {
            let timetable = candidate(vec![
                block("1", "CS2114", "MWF", "9:00AM - 10:00AM"),
                block("2", "ENGL1106", days, "9:00AM - 10:00AM"),
            ]);

            let report = check(&timetable, &courses, &CheckerConfig::default());
            assert!(!report.valid, "days {days:?} was accepted");
            assert_eq!(report.reason, Reason::UnparsableTime);
            assert_eq!(report.skipped.len(), 1);
            assert_eq!(report.skipped[0].crn, "2");
        }
    }

    #[test]
    fn expand_reports_timed_block_without_meeting_days() {
        let expansion = expand(&[block("2", "ENGL1106", "", "9:00AM - 10:00AM")]);
        assert!(expansion.meetings.is_empty());
        assert_eq!(expansion.skipped.len(), 1);
        assert!(expansion.skipped[0].reason.contains("no meeting days"));
    }

    #[test]
    fn expand_creates_one_meeting_per_day_letter() {
        let expansion = expand(&[block("1", "CS2114", "M W F", "9:05AM - 9:55AM")]);
        let days: Vec<Weekday> = expansion.meetings.iter().map(|m| m.day).collect();
        assert_eq!(
            days,
            vec![Weekday::Monday, Weekday::Wednesday, Weekday::Friday]
        );
        assert!(expansion.meetings.iter().all(|m| m.start == 545 && m.end == 595));
    }

    #[test]
    fn expand_skips_unknown_day_letters() {
        let expansion = expand(&[block("1", "CS2114", "MXF", "9:05AM - 9:55AM")]);
        assert!(expansion.meetings.is_empty());
        assert_eq!(expansion.skipped.len(), 1);
        assert!(expansion.skipped[0].reason.contains("'X'"));
    }

    #[test]
    fn find_conflict_respects_custom_gap() {
        let first = NormalizedBlock {
            day: Weekday::Monday,
            start: 540,
            end: 600,
            crn: "1".to_string(),
            course_number: "CS2114".to_string(),
        };
        let second = NormalizedBlock {
            start: 610,
            end: 660,
            crn: "2".to_string(),
            ..first.clone()
        };

        assert!(find_conflict(&[&first, &second], 10).is_none());
        assert!(find_conflict(&[&first, &second], 11).is_some());
    }

    #[test]
    fn violation_display_names_both_courses() {
        let courses = required(&[("CS", "2114"), ("ENGL", "1106")]);
        let timetable = candidate(vec![
            block("1", "CS2114", "M", "9:00AM - 10:00AM"),
            block("2", "ENGL1106", "M", "9:30AM - 10:30AM"),
        ]);

        let report = check(&timetable, &courses, &CheckerConfig::default());
        assert_eq!(
            report.detail.unwrap().to_string(),
            "overlap on M between CS2114 (9:00AM-10:00AM) and ENGL1106 (9:30AM-10:30AM)"
        );
    }

    #[test]
    fn report_serializes_reason_and_detail() {
        let report = check(
            &CandidateTimetable::empty(),
            &required(&[("CS", "2114")]),
            &CheckerConfig::default(),
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["valid"], false);
        assert_eq!(json["reason"], "empty");
        assert_eq!(json["detail"]["kind"], "empty");
    }
}
