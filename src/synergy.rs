use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::aggregator::{SECTION_COLUMN, STUDENT_COLUMN};
use crate::due_dates::{DueDate, DueDateMap, DueDateResolver};
use crate::error::{GradeError, Result};
use crate::models::{Cell, RawTable, RosterEntry};
use crate::roster::Roster;

/// One (student, assignment) row of a Synergy bulk import.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynergyRow {
    #[serde(rename = "STUDENT_PERM_ID")]
    pub student_perm_id: String,
    #[serde(rename = "STUDENT_FIRST_NAME")]
    pub first_name: String,
    #[serde(rename = "STUDENT_LAST_NAME")]
    pub last_name: String,
    #[serde(rename = "ASSIGNMENT_NAME")]
    pub assignment_name: String,
    #[serde(rename = "ASSIGNMENT_DESCRIPTION")]
    pub assignment_description: String,
    #[serde(rename = "OVERALL_SCORE")]
    pub overall_score: String,
    #[serde(rename = "POINTS")]
    pub points: u64,
    #[serde(rename = "ASSIGNMENT_TYPE")]
    pub assignment_type: String,
    #[serde(rename = "ASSIGNMENT_DATE")]
    pub assignment_date: String,
}

/// Category suffix of an aggregate column -> Synergy assignment type.
const ASSIGNMENT_TYPES: &[(&str, &str)] = &[
    ("Assignment", "Assignment"),
    ("Exercises", "Assignment"),
    ("Quiz", "Formative Assessment"),
    ("Quizzes", "Formative Assessment"),
    ("Quiz and assignment", "Formative Assessment"),
    ("Exam", "Summative Assessment"),
    ("Project", "Projects"),
    ("Performance", "Performance task"),
];

/// Everything after the first word of the column name (the unit), or the
/// whole name when there is only one word.
pub fn assignment_type(column: &str) -> Option<&'static str> {
    let column = column.trim();
    let suffix = column
        .split_once(char::is_whitespace)
        .map_or(column, |(_, rest)| rest.trim());
    ASSIGNMENT_TYPES
        .iter()
        .find(|(name, _)| *name == suffix)
        .map(|(_, kind)| *kind)
}

fn whole_number(cell: &Cell) -> Option<u64> {
    let text = cell.to_string();
    let text = text.trim();
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodTable {
    pub period: String,
    pub rows: Vec<SynergyRow>,
}

impl PeriodTable {
    pub fn file_name(&self, course: &str) -> String {
        format!("Synergy bulk import for P{} {course}.csv", self.period)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Reshaped {
    pub course: Option<String>,
    pub tables: Vec<PeriodTable>,
    pub warnings: Vec<String>,
}

/// Denormalize an aggregate table (header row, points-possible row, then one
/// row per student) into per-period Synergy rows.
pub fn reshape(
    aggregate: &RawTable,
    roster: &Roster,
    excluded_courses: &[String],
    due_dates: &mut dyn DueDateResolver,
) -> Result<Reshaped> {
    let table = aggregate.clone().into_headed();
    let student_col = table
        .column_index(STUDENT_COLUMN)
        .ok_or_else(|| GradeError::Other(format!("aggregate table has no {STUDENT_COLUMN} column")))?;
    let first_assignment = table
        .column_index(SECTION_COLUMN)
        .map_or(student_col + 1, |c| c.max(student_col) + 1);
    let assignment_cols: Vec<usize> = (first_assignment..table.headers.len())
        .take_while(|c| !table.headers[*c].trim().is_empty())
        .collect();
    let assignments: Vec<String> = assignment_cols
        .iter()
        .map(|c| table.headers[*c].trim().to_string())
        .collect();

    let mut reshaped = Reshaped::default();
    let mut periods: BTreeMap<String, Vec<SynergyRow>> = BTreeMap::new();
    let mut dates: Option<DueDateMap> = None;

    for row in 1..table.rows.len() {
        let name = table.cell(row, student_col).to_string();
        let Some(student) = roster.get(&name) else {
            reshaped.warnings.push(format!(
                "{} not found in the roster. Skipping them for now; add a row or an Alias entry for them",
                name.trim()
            ));
            continue;
        };
        if excluded_courses.iter().any(|c| *c == student.course) {
            continue;
        }
        let course = reshaped.course.get_or_insert_with(|| student.course.clone());
        if *course != student.course {
            return Err(GradeError::MultipleCourses {
                first: course.clone(),
                second: student.course.clone(),
            });
        }
        if dates.is_none() {
            dates = Some(due_dates.resolve(&student.course, &assignments)?);
        }
        let Some(resolved) = dates.as_ref() else {
            continue;
        };

        for (col, assignment) in assignment_cols.iter().zip(&assignments) {
            if let Some(item) = reshape_item(&table.rows, row, *col, assignment, student, resolved)? {
                periods.entry(student.period.clone()).or_default().push(item);
            }
        }
    }

    reshaped.tables = periods
        .into_iter()
        .map(|(period, rows)| PeriodTable { period, rows })
        .collect();
    Ok(reshaped)
}

fn reshape_item(
    rows: &[Vec<Cell>],
    row: usize,
    col: usize,
    assignment: &str,
    student: &RosterEntry,
    dates: &DueDateMap,
) -> Result<Option<SynergyRow>> {
    let cell = |r: usize| rows.get(r).and_then(|cells| cells.get(col)).cloned().unwrap_or(Cell::Empty);

    let points = whole_number(&cell(row)).ok_or_else(|| GradeError::ScoreValue {
        assignment: assignment.to_string(),
        student: format!("{} {}", student.first_name, student.last_name),
    })?;
    let max_points = whole_number(&cell(0)).ok_or_else(|| GradeError::MaxPoints(assignment.to_string()))?;
    let kind = assignment_type(assignment).ok_or_else(|| GradeError::AssignmentType(assignment.to_string()))?;
    let Some(DueDate::Date(date)) = dates.get(assignment) else {
        return Ok(None);
    };

    Ok(Some(SynergyRow {
        student_perm_id: student.id.clone(),
        first_name: student.first_name.clone(),
        last_name: student.last_name.clone(),
        assignment_name: assignment.to_string(),
        assignment_description: assignment.to_string(),
        overall_score: format!("{points}/{max_points}"),
        points: max_points,
        assignment_type: kind.to_string(),
        assignment_date: date.clone(),
    }))
}

/// Write one CSV per period into `output_dir`; returns the paths written.
pub fn write_period_tables(reshaped: &Reshaped, output_dir: &Path) -> Result<Vec<PathBuf>> {
    let Some(course) = &reshaped.course else {
        return Ok(Vec::new());
    };
    let mut written = Vec::new();
    for table in &reshaped.tables {
        let path = output_dir.join(table.file_name(course));
        let mut wtr = csv::Writer::from_path(&path)?;
        for row in &table.rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        written.push(path);
    }
    Ok(written)
}
