//! Core type definitions with validation.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::time::{self, TimeFormatError};

/// Validation errors for inbound requests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// The same course was requested more than once.
    #[error("course {key} is listed more than once")]
    DuplicateCourse { key: CourseKey },
}

/// Normalized identity of a course: department and number with separators
/// stripped and letters upper-cased (e.g. `CS-2114` becomes `CS2114`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseKey(String);

impl CourseKey {
    /// Builds the key for a department and course number.
    pub fn new(department: &str, number: &str) -> Self {
        let mut key = Self::normalize(department);
        key.0.push_str(Self::normalize(number).as_str());
        key
    }

    /// Normalizes a free-form course code such as `ENGL-1106` or `cs 2114`.
    pub fn normalize(raw: &str) -> Self {
        Self(
            raw.chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_uppercase)
                .collect(),
        )
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CourseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CourseKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A course the student must take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredCourse {
    /// Department code, e.g. `CS`.
    pub department: String,
    /// Course number within the department, e.g. `2114`.
    pub number: String,
    /// Preferred instructor, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub professor: Option<String>,
}

impl RequiredCourse {
    /// Creates a required course after validation.
    pub fn new(
        department: impl Into<String>,
        number: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let course = Self {
            department: department.into(),
            number: number.into(),
            professor: None,
        };
        course.validate()?;
        Ok(course)
    }

    /// Sets the preferred instructor.
    #[must_use]
    pub fn with_professor(mut self, professor: impl Into<String>) -> Self {
        self.professor = Some(professor.into());
        self
    }

    /// Identity key used to match this course against scheduled blocks.
    pub fn key(&self) -> CourseKey {
        CourseKey::new(&self.department, &self.number)
    }

    /// Preferred instructor with blank values treated as absent.
    pub fn preferred_professor(&self) -> Option<&str> {
        self.professor
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.department.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "department",
            });
        }
        if self.number.trim().is_empty() {
            return Err(ValidationError::Empty {
                field: "course number",
            });
        }
        Ok(())
    }
}

/// A request for one conflict-free timetable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRequest {
    /// Term identifier understood by the section catalog (e.g. `202501`).
    #[serde(alias = "term_year")]
    pub term: String,
    /// Courses that must all appear in the timetable.
    pub courses: Vec<RequiredCourse>,
    /// Free-text preferences forwarded to the generator.
    #[serde(default)]
    pub preferences: String,
}

impl ScheduleRequest {
    /// Checks that the request names a term and a non-empty set of distinct courses.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.term.trim().is_empty() {
            return Err(ValidationError::Empty { field: "term" });
        }
        if self.courses.is_empty() {
            return Err(ValidationError::Empty { field: "courses" });
        }
        let mut seen = HashSet::new();
        for course in &self.courses {
            course.validate()?;
            let key = course.key();
            if !seen.insert(key.clone()) {
                return Err(ValidationError::DuplicateCourse { key });
            }
        }
        Ok(())
    }
}

/// One scheduled meeting row from the section catalog.
///
/// Several rows may share a CRN (lecture + lab, or additional meeting times);
/// together they form one section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SectionOffering {
    pub crn: String,
    pub course: String,
    pub title: String,
    pub schedule_type: String,
    pub instructor: String,
    pub days: String,
    pub begin_time: String,
    pub end_time: String,
    pub location: String,
}

/// One meeting-pattern row of a candidate timetable, as emitted by the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeBlock {
    pub crn: String,
    pub course_number: String,
    #[serde(default)]
    pub course_name: String,
    #[serde(default)]
    pub professor_name: String,
    /// Contiguous weekday letters, e.g. `MWF` or `TR`.
    pub days: String,
    /// `"START - END"` in 12-hour clock, e.g. `9:30AM - 10:45AM`.
    pub time: String,
    #[serde(default)]
    pub location: String,
}

impl TimeBlock {
    /// Identity key of the course this block belongs to.
    pub fn course_key(&self) -> CourseKey {
        CourseKey::normalize(&self.course_number)
    }

    /// Start and end of the block in minutes since midnight.
    pub fn minutes(&self) -> Result<(u16, u16), TimeFormatError> {
        time::parse_range(&self.time)
    }
}

/// A proposed timetable. Produced by the generator and treated as untrusted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateTimetable {
    pub classes: Vec<TimeBlock>,
}

impl CandidateTimetable {
    /// The empty timetable returned when no valid schedule was found.
    pub const fn empty() -> Self {
        Self {
            classes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Distinct course identity keys present in the timetable.
    pub fn course_keys(&self) -> BTreeSet<CourseKey> {
        self.classes.iter().map(TimeBlock::course_key).collect()
    }
}

/// Day of the week, keyed by the single-letter codes used in course catalogs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Weekday {
    #[serde(rename = "M")]
    Monday,
    #[serde(rename = "T")]
    Tuesday,
    #[serde(rename = "W")]
    Wednesday,
    #[serde(rename = "R")]
    Thursday,
    #[serde(rename = "F")]
    Friday,
    #[serde(rename = "S")]
    Saturday,
    #[serde(rename = "U")]
    Sunday,
}

impl Weekday {
    /// Parses a catalog day letter (case-insensitive).
    pub const fn from_letter(letter: char) -> Option<Self> {
        match letter.to_ascii_uppercase() {
            'M' => Some(Self::Monday),
            'T' => Some(Self::Tuesday),
            'W' => Some(Self::Wednesday),
            'R' => Some(Self::Thursday),
            'F' => Some(Self::Friday),
            'S' => Some(Self::Saturday),
            'U' => Some(Self::Sunday),
            _ => None,
        }
    }

    pub const fn letter(self) -> char {
        match self {
            Self::Monday => 'M',
            Self::Tuesday => 'T',
            Self::Wednesday => 'W',
            Self::Thursday => 'R',
            Self::Friday => 'F',
            Self::Saturday => 'S',
            Self::Sunday => 'U',
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}
