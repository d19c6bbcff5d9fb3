use std::fmt;

/// One untyped spreadsheet cell, as loaded from CSV or XLSX.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    /// Blank and whitespace-only text is treated as a missing value.
    pub fn from_text(raw: &str) -> Self {
        if raw.trim().is_empty() {
            Cell::Empty
        } else {
            Cell::Text(raw.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Number(n) => n.is_nan(),
            Cell::Text(s) => s.trim().is_empty(),
        }
    }

    pub fn text(&self) -> Option<String> {
        if self.is_empty() {
            None
        } else {
            Some(self.to_string())
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Number(n) if n.is_finite() && n.fract() == 0.0 => write!(f, "{}", *n as i64),
            Cell::Number(n) => write!(f, "{n}"),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

static EMPTY: Cell = Cell::Empty;

/// A sheet loaded verbatim: every row, header rows included, padded to a common width.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new(mut rows: Vec<Vec<Cell>>) -> Self {
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, Cell::Empty);
        }
        Self { rows }
    }

    /// Convenience for building tables from string literals (all cells text or empty).
    pub fn from_strings(rows: &[&[&str]]) -> Self {
        Self::new(
            rows.iter()
                .map(|row| row.iter().map(|s| Cell::from_text(s)).collect())
                .collect(),
        )
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&EMPTY)
    }

    /// Split off the first row as column headers.
    pub fn into_headed(mut self) -> HeadedTable {
        if self.rows.is_empty() {
            return HeadedTable {
                headers: Vec::new(),
                rows: Vec::new(),
            };
        }
        let headers = self.rows.remove(0).iter().map(|c| c.to_string()).collect();
        HeadedTable {
            headers,
            rows: self.rows,
        }
    }
}

/// A flat table with exactly one header row.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadedTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl HeadedTable {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h.trim() == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows.get(row).and_then(|r| r.get(col)).unwrap_or(&EMPTY)
    }

    pub fn column(&self, col: usize) -> Vec<Cell> {
        (0..self.rows.len()).map(|r| self.cell(r, col).clone()).collect()
    }
}

// ---------------------------------------------------------------------------
// Labels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Assignment,
    Exercises,
    Project,
    Quiz,
    Quizzes,
    QuizAndAssignment,
    Exam,
    Performance,
}

impl Category {
    /// Name used in aggregate column headers.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Assignment => "Assignment",
            Self::Exercises => "Exercises",
            Self::Project => "Project",
            Self::Quiz => "Quiz",
            Self::Quizzes => "Quizzes",
            Self::QuizAndAssignment => "Quiz and assignment",
            Self::Exam => "Exam",
            Self::Performance => "Performance",
        }
    }

    /// Assessment columns are scored by points earned; everything else is completion work.
    pub fn is_assessment(&self) -> bool {
        matches!(
            self,
            Self::Quiz | Self::Quizzes | Self::QuizAndAssignment | Self::Exam | Self::Performance
        )
    }
}

/// Grouping key: columns with equal labels are summed together.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnLabel {
    pub unit: Option<String>,
    pub category: Category,
}

impl ColumnLabel {
    pub fn new(unit: impl Into<String>, category: Category) -> Self {
        Self {
            unit: Some(unit.into()),
            category,
        }
    }

    pub fn unitless(category: Category) -> Self {
        Self {
            unit: None,
            category,
        }
    }
}

impl fmt::Display for ColumnLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.unit {
            Some(unit) => write!(f, "{unit} {}", self.category.name()),
            None => f.write_str(self.category.name()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Label(ColumnLabel),
    /// Deliberately excluded (free response, platform aggregates); not reported.
    Drop,
    /// Header could not be classified; reported and excluded.
    Invalid(String),
}

#[derive(Debug, Clone)]
pub struct ClassifiedColumn {
    pub header: String,
    pub classification: Classification,
    pub cells: Vec<Cell>,
}

/// Row identity in an aggregate table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StudentKey {
    pub student: String,
    pub section: String,
}

impl StudentKey {
    pub fn new(student: impl Into<String>, section: impl Into<String>) -> Self {
        Self {
            student: student.into(),
            section: section.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RosterEntry {
    pub period: String,
    pub course: String,
    pub id: String,
    pub last_name: String,
    pub first_name: String,
    pub alias: String,
}

impl fmt::Display for RosterEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}, {}", self.id, self.last_name, self.first_name)?;
        if self.alias != format!("{}, {}", self.last_name, self.first_name) {
            write!(f, " ({})", self.alias)?;
        }
        write!(f, "\tP{} {}", self.period, self.course)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_from_text_blank_is_empty() {
        assert_eq!(Cell::from_text("   "), Cell::Empty);
        assert_eq!(Cell::from_text("8"), Cell::Text("8".to_string()));
        assert!(Cell::Number(f64::NAN).is_empty());
    }

    #[test]
    fn test_cell_display_whole_numbers() {
        assert_eq!(Cell::Number(13.0).to_string(), "13");
        assert_eq!(Cell::Number(8.5).to_string(), "8.5");
        assert_eq!(Cell::Empty.to_string(), "");
    }

    #[test]
    fn test_raw_table_pads_rows() {
        let table = RawTable::from_strings(&[&["a", "b", "c"], &["1"]]);
        assert_eq!(table.width(), 3);
        assert_eq!(table.cell(1, 2), &Cell::Empty);
        assert_eq!(table.cell(9, 9), &Cell::Empty);
    }

    #[test]
    fn test_into_headed() {
        let table = RawTable::from_strings(&[&["Student", "Section"], &["Lee, Ann", "P1"]]);
        let headed = table.into_headed();
        assert_eq!(headed.column_index("Section"), Some(1));
        assert_eq!(headed.rows.len(), 1);
        assert_eq!(headed.column(0), vec![Cell::Text("Lee, Ann".to_string())]);
    }

    #[test]
    fn test_label_display() {
        assert_eq!(ColumnLabel::new("3", Category::Exam).to_string(), "3 Exam");
        assert_eq!(
            ColumnLabel::new("2", Category::QuizAndAssignment).to_string(),
            "2 Quiz and assignment"
        );
        assert_eq!(ColumnLabel::unitless(Category::Performance).to_string(), "Performance");
    }

    #[test]
    fn test_roster_entry_display_shows_alias() {
        let entry = RosterEntry {
            period: "3".to_string(),
            course: "AP CS A".to_string(),
            id: "1001".to_string(),
            last_name: "Lee".to_string(),
            first_name: "Ann".to_string(),
            alias: "Lee, Annie".to_string(),
        };
        assert_eq!(entry.to_string(), "1001: Lee, Ann (Lee, Annie)\tP3 AP CS A");
    }
}
