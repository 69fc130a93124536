//! Section catalog lookup.
//!
//! The generator needs the list of available sections for every required
//! course. Sections come from a [`SectionSource`]; [`FileCatalog`] reads them
//! from a JSON export keyed by term.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::{CourseKey, SectionOffering};

/// Title used by catalogs for rows that only carry extra meeting times.
const ADDITIONAL_TIMES_MARKER: &str = "Additional Times";

const CSV_HEADER: [&str; 9] = [
    "CRN",
    "Course",
    "Title",
    "Schedule Type",
    "Instructor",
    "Days",
    "Begin Time",
    "End Time",
    "Location",
];

/// Catalog errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog has no sections for term {term}")]
    UnknownTerm { term: String },
}

/// Looks up the scheduled sections of a course.
pub trait SectionSource {
    /// Returns every meeting row of the course in the given term.
    fn sections(
        &self,
        department: &str,
        number: &str,
        term: &str,
    ) -> Result<Vec<SectionOffering>, CatalogError>;
}

/// A section catalog loaded from a JSON file of the form
/// `{"<term>": [<section row>, ...]}`.
#[derive(Debug, Clone, Default)]
pub struct FileCatalog {
    terms: HashMap<String, Vec<SectionOffering>>,
}

impl FileCatalog {
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, CatalogError> {
        let terms: HashMap<String, Vec<SectionOffering>> = serde_json::from_str(content)?;
        Ok(Self::from_terms(terms))
    }

    /// Builds a catalog, attaching additional-time rows to their sections.
    pub fn from_terms(terms: HashMap<String, Vec<SectionOffering>>) -> Self {
        let terms = terms
            .into_iter()
            .map(|(term, rows)| (term, attach_additional_times(rows)))
            .collect();
        Self { terms }
    }
}

impl SectionSource for FileCatalog {
    fn sections(
        &self,
        department: &str,
        number: &str,
        term: &str,
    ) -> Result<Vec<SectionOffering>, CatalogError> {
        let rows = self
            .terms
            .get(term)
            .ok_or_else(|| CatalogError::UnknownTerm {
                term: term.to_string(),
            })?;
        let key = CourseKey::new(department, number);
        Ok(rows
            .iter()
            .filter(|row| CourseKey::normalize(&row.course) == key)
            .cloned()
            .collect())
    }
}

fn is_continuation(row: &SectionOffering) -> bool {
    row.crn.trim().is_empty() || row.title.contains(ADDITIONAL_TIMES_MARKER)
}

/// Fills in section details for rows that only carry extra meeting times.
///
/// Catalogs list a section's additional meeting blocks directly after its
/// main row, with the CRN and course details left blank. Each such row takes
/// the missing details from the closest preceding full row. Rows with no
/// preceding full row are dropped.
pub fn attach_additional_times(rows: Vec<SectionOffering>) -> Vec<SectionOffering> {
    let mut attached = Vec::with_capacity(rows.len());
    let mut parent: Option<SectionOffering> = None;

    for mut row in rows {
        if !is_continuation(&row) {
            parent = Some(row.clone());
            attached.push(row);
            continue;
        }

        let Some(main) = parent.as_ref() else {
            tracing::warn!(days = %row.days, "dropping additional-time row with no section");
            continue;
        };
        fill_blank(&mut row.crn, &main.crn);
        fill_blank(&mut row.course, &main.course);
        fill_blank(&mut row.schedule_type, &main.schedule_type);
        fill_blank(&mut row.instructor, &main.instructor);
        if row.title.contains(ADDITIONAL_TIMES_MARKER) {
            row.title.clear();
        }
        fill_blank(&mut row.title, &main.title);
        attached.push(row);
    }

    attached
}

fn fill_blank(field: &mut String, value: &str) {
    if field.trim().is_empty() {
        *field = value.to_string();
    }
}

/// Renders section rows as CSV with a header line.
pub fn render_csv(rows: &[SectionOffering]) -> String {
    let mut out = String::new();
    push_csv_line(&mut out, &CSV_HEADER);
    for row in rows {
        push_csv_line(
            &mut out,
            &[
                row.crn.as_str(),
                row.course.as_str(),
                row.title.as_str(),
                row.schedule_type.as_str(),
                row.instructor.as_str(),
                row.days.as_str(),
                row.begin_time.as_str(),
                row.end_time.as_str(),
                row.location.as_str(),
            ],
        );
    }
    out
}

fn push_csv_line(out: &mut String, fields: &[&str]) {
    let line = fields
        .iter()
        .map(|field| escape_csv(field))
        .collect::<Vec<_>>()
        .join(",");
    out.push_str(&line);
    out.push('\n');
}

fn escape_csv(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
