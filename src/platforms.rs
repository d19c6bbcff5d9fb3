use std::path::Path;

use regex::Regex;

use crate::aggregator::{aggregate, AggregateOptions, Aggregation, ClassifiedTable, MaxRow, Threshold};
use crate::classifier::{classify_stateless, LessonState, PositionalState, CSA_RULES, CSP_RULES, TSK_CARRY};
use crate::error::{GradeError, Result};
use crate::header::normalize;
use crate::models::{Category, Cell, Classification, ClassifiedColumn, RawTable, StudentKey};
use crate::table::read_table;

// ---------------------------------------------------------------------------
// Flat exports (Project STEM)
// ---------------------------------------------------------------------------

const STEM_ID_COLUMNS: &[&str] = &["ID", "SIS User ID", "SIS Login ID"];
const STEM_SKIP_MARKERS: &[&str] = &["(read only)", "0"];

/// A one-header-row export indexed on Student + Section, with the ID columns
/// and unscored or platform-computed columns already removed.
struct FlatExport {
    students: Vec<StudentKey>,
    columns: Vec<(String, Vec<Cell>)>,
}

fn stem_export(raw: &RawTable) -> Result<FlatExport> {
    let table = raw.clone().into_headed();
    let student_col = table
        .column_index("Student")
        .ok_or_else(|| GradeError::Other("export has no Student column".to_string()))?;
    let section_col = table
        .column_index("Section")
        .ok_or_else(|| GradeError::Other("export has no Section column".to_string()))?;

    let students = (0..table.rows.len())
        .map(|r| {
            StudentKey::new(
                table.cell(r, student_col).to_string().trim(),
                table.cell(r, section_col).to_string().trim(),
            )
        })
        .collect();

    let columns = table
        .headers
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != student_col && *i != section_col)
        .filter(|(_, h)| !STEM_ID_COLUMNS.contains(&h.trim()))
        .filter(|(i, _)| {
            let marker = table.cell(0, *i).to_string();
            !STEM_SKIP_MARKERS.contains(&marker.trim())
        })
        .map(|(i, h)| (h.clone(), table.column(i)))
        .collect();

    Ok(FlatExport { students, columns })
}

fn classify_csa(raw: &RawTable) -> Result<ClassifiedTable> {
    let export = stem_export(raw)?;
    let columns = export
        .columns
        .into_iter()
        .map(|(header, cells)| ClassifiedColumn {
            classification: classify_stateless(&header, &CSA_RULES),
            header,
            cells,
        })
        .collect();
    Ok(ClassifiedTable {
        students: export.students,
        columns,
        max_row: MaxRow::Leading,
    })
}

fn classify_csp(raw: &RawTable) -> Result<ClassifiedTable> {
    let export = stem_export(raw)?;
    let columns = export
        .columns
        .into_iter()
        .scan(PositionalState::default(), |state, (header, cells)| {
            let (next, classification) = state.step(&CSP_RULES, &header);
            *state = next;
            Some(ClassifiedColumn {
                header,
                classification,
                cells,
            })
        })
        .collect();
    Ok(ClassifiedTable {
        students: export.students,
        columns,
        max_row: MaxRow::Leading,
    })
}

// ---------------------------------------------------------------------------
// Multi-row exports (Tech Smart Kids)
// ---------------------------------------------------------------------------

/// Last name, first name, student ID.
const TSK_FIXED_COLUMNS: usize = 3;
pub const TSK_SECTION: &str = "Default";
pub const TSK_MAX_ROW: &str = "Max score";

fn classify_tsk(raw: &RawTable) -> Result<ClassifiedTable> {
    if raw.height() < TSK_CARRY.len() || raw.width() < TSK_FIXED_COLUMNS {
        return Err(GradeError::Other(format!(
            "expected {} header rows and {} name columns, found a {}x{} sheet",
            TSK_CARRY.len(),
            TSK_FIXED_COLUMNS,
            raw.height(),
            raw.width()
        )));
    }
    let split = normalize(raw, TSK_CARRY, TSK_FIXED_COLUMNS);

    let body: Vec<&Vec<Cell>> = split
        .body
        .iter()
        .filter(|row| !(row[0].is_empty() && row[1].is_empty()))
        .collect();
    let students = body
        .iter()
        .map(|row| {
            let last = row[0].to_string();
            let first = row[1].to_string();
            StudentKey::new(format!("{}, {}", last.trim(), first.trim()), TSK_SECTION)
        })
        .collect();

    let columns = split
        .headers
        .iter()
        .scan(LessonState::default(), |state, header| {
            let (next, classification) = state.step(header);
            *state = next;
            Some(ClassifiedColumn {
                header: header.describe(),
                classification,
                cells: body.iter().map(|row| row[header.index].clone()).collect(),
            })
        })
        .collect();

    Ok(ClassifiedTable {
        students,
        columns,
        max_row: MaxRow::Derived {
            key: StudentKey::new(TSK_MAX_ROW, TSK_SECTION),
        },
    })
}

// ---------------------------------------------------------------------------
// Platform kinds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlatformKind {
    Tsk,
    StemCsp,
    StemCsa,
}

pub const ALL_PLATFORMS: &[PlatformKind] = &[PlatformKind::Tsk, PlatformKind::StemCsp, PlatformKind::StemCsa];

impl PlatformKind {
    pub fn key(&self) -> &'static str {
        match self {
            Self::Tsk => "tsk",
            Self::StemCsp => "stem-csp",
            Self::StemCsa => "stem-csa",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Tsk => "Tech Smart Kids",
            Self::StemCsp => "Project STEM AP CS Principles",
            Self::StemCsa => "Project STEM AP CS A",
        }
    }

    /// Download file pattern, as shown to users.
    pub fn glob(&self) -> &'static str {
        match self {
            Self::Tsk => "CS20*.xlsx",
            Self::StemCsp => "<year>*Grades-AP_CS_Principles*.csv",
            Self::StemCsa => "<year>*Grades-AP_CS_A*.csv",
        }
    }

    /// File-name regex for exports from `year`, or from any year when `None`.
    pub fn file_pattern(&self, year: Option<i32>) -> String {
        let year = year.map_or(r"\d{4}".to_string(), |y| y.to_string());
        match self {
            Self::Tsk => r"^CS20.*\.xlsx$".to_string(),
            Self::StemCsp => format!(r"^{year}.*Grades-AP_CS_Principles.*\.csv$"),
            Self::StemCsa => format!(r"^{year}.*Grades-AP_CS_A.*\.csv$"),
        }
    }

    pub fn detect(&self, file_path: &Path) -> bool {
        let Some(name) = file_path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        Regex::new(&self.file_pattern(None))
            .map(|re| re.is_match(name))
            .unwrap_or(false)
    }

    pub fn threshold(&self) -> Threshold {
        match self {
            Self::Tsk => Threshold::QUARTER,
            Self::StemCsp => Threshold::HALF,
            Self::StemCsa => Threshold::QUARTER,
        }
    }

    /// Grade column order.
    pub fn categories(&self) -> &'static [Category] {
        match self {
            Self::Tsk => &[Category::Assignment, Category::Quiz, Category::Exam],
            Self::StemCsp => &[
                Category::Exercises,
                Category::Project,
                Category::Quizzes,
                Category::Exam,
                Category::Performance,
            ],
            Self::StemCsa => &[Category::Exercises, Category::QuizAndAssignment, Category::Exam],
        }
    }

    /// Overall grade weights in percent; each table sums to 100.
    pub fn weights(&self) -> &'static [(Category, u32)] {
        match self {
            Self::Tsk => &[(Category::Assignment, 50), (Category::Exam, 30), (Category::Quiz, 20)],
            Self::StemCsp => &[
                (Category::Exercises, 10),
                (Category::Project, 10),
                (Category::Performance, 10),
                (Category::Quizzes, 20),
                (Category::Exam, 50),
            ],
            Self::StemCsa => &[
                (Category::Exercises, 10),
                (Category::QuizAndAssignment, 30),
                (Category::Exam, 60),
            ],
        }
    }

    pub fn classify(&self, raw: &RawTable) -> Result<ClassifiedTable> {
        match self {
            Self::Tsk => classify_tsk(raw),
            Self::StemCsp => classify_csp(raw),
            Self::StemCsa => classify_csa(raw),
        }
    }

    pub fn aggregate_table(&self, raw: &RawTable, overall: bool) -> Result<Aggregation> {
        let classified = self.classify(raw)?;
        let options = AggregateOptions {
            threshold: self.threshold(),
            categories: self.categories(),
            weights: overall.then(|| self.weights()),
        };
        aggregate(&classified, &options)
    }

    pub fn aggregate(&self, file_path: &Path, overall: bool) -> Result<Aggregation> {
        let raw = read_table(file_path)?;
        self.aggregate_table(&raw, overall)
    }
}

pub fn get_by_key(key: &str) -> Option<PlatformKind> {
    ALL_PLATFORMS.iter().find(|p| p.key() == key).copied()
}

pub fn get_for_file(file_path: &Path) -> Option<PlatformKind> {
    ALL_PLATFORMS.iter().find(|p| p.detect(file_path)).copied()
}
