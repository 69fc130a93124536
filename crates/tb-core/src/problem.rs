//! Problem descriptions handed to the timetable generator.

use std::fmt;
use std::fmt::Write as _;

use crate::catalog::{CatalogError, SectionSource, render_csv};
use crate::types::{RequiredCourse, ScheduleRequest, SectionOffering};

/// The text describing one scheduling problem: preferences, required
/// courses and every available section of each course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemDescription(String);

impl ProblemDescription {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProblemDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProblemDescription {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Looks up sections for every requested course and renders the problem.
pub fn build_problem<S: SectionSource + ?Sized>(
    request: &ScheduleRequest,
    source: &S,
) -> Result<ProblemDescription, CatalogError> {
    let mut courses = Vec::with_capacity(request.courses.len());
    for course in &request.courses {
        let sections = source.sections(&course.department, &course.number, &request.term)?;
        if sections.is_empty() {
            tracing::warn!(course = %course.key(), term = %request.term, "no sections found");
        } else {
            tracing::debug!(course = %course.key(), rows = sections.len(), "loaded sections");
        }
        courses.push((course, sections));
    }
    Ok(render_problem(&request.preferences, &courses))
}

/// Renders preferences and per-course section tables as tagged text.
pub fn render_problem(
    preferences: &str,
    courses: &[(&RequiredCourse, Vec<SectionOffering>)],
) -> ProblemDescription {
    let mut text = String::new();
    let _ = writeln!(text, "<preferences_by_user>\n{}\n</preferences_by_user>", preferences.trim());
    for (course, sections) in courses {
        let _ = writeln!(text, "<course_number>{}</course_number>", course.key());
        let _ = writeln!(
            text,
            "<professor_preference>{}</professor_preference>",
            course.preferred_professor().unwrap_or_default()
        );
        let _ = write!(
            text,
            "<timetable_of_classes_for_the_course>\n{}</timetable_of_classes_for_the_course>\n",
            render_csv(sections)
        );
    }
    ProblemDescription(text)
}
