use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::coercer::coerce;
use crate::error::{GradeError, Result};
use crate::models::{Category, Classification, ClassifiedColumn, ColumnLabel, StudentKey};

pub const STUDENT_COLUMN: &str = "Student";
pub const SECTION_COLUMN: &str = "Section";
pub const OVERALL_COLUMN: &str = "Overall grade";
const GRADE_SEPARATOR: &str = "  ";
const OVERALL_SEPARATOR: &str = "   ";

// ---------------------------------------------------------------------------
// Inputs
// ---------------------------------------------------------------------------

/// Minimum share of students with a recorded value for a column to be kept.
/// Keeps a column when `filled / students >= numerator / denominator`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Threshold {
    pub numerator: usize,
    pub denominator: usize,
}

impl Threshold {
    pub const QUARTER: Threshold = Threshold {
        numerator: 1,
        denominator: 4,
    };
    pub const HALF: Threshold = Threshold {
        numerator: 1,
        denominator: 2,
    };

    pub fn keeps(&self, filled: usize, students: usize) -> bool {
        filled * self.denominator >= students * self.numerator
    }
}

/// Where each column's points possible come from.
#[derive(Debug, Clone, PartialEq)]
pub enum MaxRow {
    /// The first row of the table already holds points possible.
    Leading,
    /// Points possible are built while coercing: 1 per column, or the `b` of
    /// the column's first `a/b` assessment cell. The row is inserted first
    /// under `key`.
    Derived { key: StudentKey },
}

#[derive(Debug, Clone)]
pub struct ClassifiedTable {
    pub students: Vec<StudentKey>,
    pub columns: Vec<ClassifiedColumn>,
    pub max_row: MaxRow,
}

#[derive(Debug, Clone, Copy)]
pub struct AggregateOptions {
    pub threshold: Threshold,
    /// Order of the grade columns.
    pub categories: &'static [Category],
    /// Integer percent weights for the overall grade; `None` disables it.
    pub weights: Option<&'static [(Category, u32)]>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnKind {
    Score(ColumnLabel),
    Separator,
    Grade(Category),
    Overall,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateColumn {
    pub name: String,
    pub kind: ColumnKind,
    pub values: Vec<Option<i64>>,
}

/// One row per student, row 0 holding points possible.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateTable {
    pub rows: Vec<StudentKey>,
    pub columns: Vec<AggregateColumn>,
}

impl AggregateTable {
    pub fn column(&self, name: &str) -> Option<&AggregateColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<i64> {
        self.column(column).and_then(|c| c.values.get(row).copied().flatten())
    }

    pub fn headers(&self) -> Vec<String> {
        let mut headers = vec![STUDENT_COLUMN.to_string(), SECTION_COLUMN.to_string()];
        headers.extend(self.columns.iter().map(|c| c.name.clone()));
        headers
    }

    fn record(&self, row: usize) -> Vec<String> {
        let key = &self.rows[row];
        let mut record = vec![key.student.clone(), key.section.clone()];
        record.extend(
            self.columns
                .iter()
                .map(|c| c.values[row].map(|v| v.to_string()).unwrap_or_default()),
        );
        record
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)?;
        wtr.write_record(self.headers())?;
        for row in 0..self.rows.len() {
            wtr.write_record(self.record(row))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Aggregation {
    pub table: AggregateTable,
    pub warnings: Vec<String>,
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// `trunc(0.49 + 100 * earned / possible)`; ties favour the student and a
/// full score never rounds past 100.
pub fn percent_grade(earned: i64, possible: i64) -> i64 {
    if possible <= 0 {
        return 0;
    }
    (0.49 + 100.0 * earned as f64 / possible as f64) as i64
}

struct ColumnMax {
    points: i64,
    seen: bool,
}

fn coerce_column(
    column: &ClassifiedColumn,
    category: Category,
    max_row: &MaxRow,
    warnings: &mut Vec<String>,
) -> Result<Vec<f64>> {
    let mut values = Vec::with_capacity(column.cells.len() + 1);
    let mut max = ColumnMax {
        points: 1,
        seen: false,
    };
    for cell in &column.cells {
        let scored = coerce(cell, category).ok_or_else(|| GradeError::CellValue {
            column: column.header.clone(),
            value: cell.to_string(),
        })?;
        if let Some(possible) = scored.max_points {
            if !max.seen {
                max = ColumnMax {
                    points: possible,
                    seen: true,
                };
            } else if possible != max.points {
                warnings.push(format!(
                    "{}: points possible changes from {} to {possible}; keeping {}",
                    column.header, max.points, max.points
                ));
            }
        }
        values.push(scored.value);
    }
    if matches!(max_row, MaxRow::Derived { .. }) {
        values.insert(0, max.points as f64);
    }
    Ok(values)
}

/// Fold a classified table into one integer column per distinct label, then
/// derive category grades and the overall grade.
pub fn aggregate(table: &ClassifiedTable, options: &AggregateOptions) -> Result<Aggregation> {
    let mut warnings = Vec::new();
    let data_start = match table.max_row {
        MaxRow::Leading => 1,
        MaxRow::Derived { .. } => 0,
    };
    let student_count = table.students.len().saturating_sub(data_start);

    let mut rows = table.students.clone();
    if let MaxRow::Derived { key } = &table.max_row {
        rows.insert(0, key.clone());
    }

    // Group by label in order of first appearance
    let mut order: Vec<ColumnLabel> = Vec::new();
    let mut sums: HashMap<ColumnLabel, Vec<f64>> = HashMap::new();
    for column in &table.columns {
        let label = match &column.classification {
            Classification::Label(label) => label,
            Classification::Drop => continue,
            Classification::Invalid(reason) => {
                warnings.push(format!("can't classify column {}: {reason}. Skipping", column.header));
                continue;
            }
        };
        let filled = column
            .cells
            .iter()
            .skip(data_start)
            .filter(|c| !c.is_empty())
            .count();
        if !options.threshold.keeps(filled, student_count) {
            debug!("dropping {} ({filled} of {student_count} recorded)", column.header);
            continue;
        }

        let values = coerce_column(column, label.category, &table.max_row, &mut warnings)?;
        match sums.get_mut(label) {
            Some(total) => {
                for (t, v) in total.iter_mut().zip(&values) {
                    *t += v;
                }
            }
            None => {
                order.push(label.clone());
                sums.insert(label.clone(), values);
            }
        }
    }

    let mut columns: Vec<AggregateColumn> = order
        .into_iter()
        .map(|label| {
            let values = sums
                .remove(&label)
                .unwrap_or_default()
                .into_iter()
                .map(|v| Some(v as i64))
                .collect();
            AggregateColumn {
                name: label.to_string(),
                kind: ColumnKind::Score(label),
                values,
            }
        })
        .collect();

    let blank = vec![None; rows.len()];
    let mut grades: Vec<AggregateColumn> = Vec::new();
    for category in options.categories {
        let members: Vec<&AggregateColumn> = columns
            .iter()
            .filter(|c| matches!(&c.kind, ColumnKind::Score(l) if l.category == *category))
            .collect();
        if members.is_empty() {
            continue;
        }
        let totals: Vec<i64> = (0..rows.len())
            .map(|r| members.iter().map(|c| c.values[r].unwrap_or(0)).sum())
            .collect();
        let possible = totals.first().copied().unwrap_or(0);
        if possible <= 0 {
            warnings.push(format!("{} grade: no points possible, reporting 0", category.name()));
        }
        grades.push(AggregateColumn {
            name: format!("{} grade", category.name()),
            kind: ColumnKind::Grade(*category),
            values: totals.iter().map(|t| Some(percent_grade(*t, possible))).collect(),
        });
    }

    let overall = options
        .weights
        .and_then(|weights| overall_grade(&grades, weights, rows.len(), &mut warnings));

    if !grades.is_empty() {
        columns.push(AggregateColumn {
            name: GRADE_SEPARATOR.to_string(),
            kind: ColumnKind::Separator,
            values: blank.clone(),
        });
        columns.extend(grades);
    }
    if let Some(values) = overall {
        columns.push(AggregateColumn {
            name: OVERALL_SEPARATOR.to_string(),
            kind: ColumnKind::Separator,
            values: blank,
        });
        columns.push(AggregateColumn {
            name: OVERALL_COLUMN.to_string(),
            kind: ColumnKind::Overall,
            values,
        });
    }

    Ok(Aggregation {
        table: AggregateTable { rows, columns },
        warnings,
    })
}

fn overall_grade(
    grades: &[AggregateColumn],
    weights: &[(Category, u32)],
    row_count: usize,
    warnings: &mut Vec<String>,
) -> Option<Vec<Option<i64>>> {
    let mut weighted = Vec::with_capacity(weights.len());
    for (category, weight) in weights {
        match grades.iter().find(|g| g.kind == ColumnKind::Grade(*category)) {
            Some(column) => weighted.push((column, *weight as i64)),
            None => {
                warnings.push(format!(
                    "Overall grade skipped: no {} columns",
                    category.name()
                ));
                return None;
            }
        }
    }
    Some(
        (0..row_count)
            .map(|r| {
                let total: i64 = weighted
                    .iter()
                    .map(|(c, w)| c.values[r].unwrap_or(0) * w)
                    .sum();
                Some(total / 100)
            })
            .collect(),
    )
}
