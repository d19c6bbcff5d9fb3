use std::path::Path;

use crate::error::{GradeError, Result};
use crate::models::{Cell, RawTable};

/// Load a CSV or XLSX sheet verbatim. XLSX reads the first worksheet.
pub fn read_table(file_path: &Path) -> Result<RawTable> {
    let ext = file_path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" => read_csv(file_path),
        #[cfg(feature = "xlsx")]
        "xlsx" | "xlsm" | "xls" => read_xlsx(file_path),
        _ => Err(GradeError::UnsupportedFile(file_path.display().to_string())),
    }
}

pub fn read_csv(file_path: &Path) -> Result<RawTable> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(std::io::BufReader::new(file));
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        rows.push(record.iter().map(Cell::from_text).collect());
    }
    Ok(RawTable::new(rows))
}

#[cfg(feature = "xlsx")]
fn read_xlsx(file_path: &Path) -> Result<RawTable> {
    use calamine::Reader;

    let mut workbook = calamine::open_workbook_auto(file_path)
        .map_err(|e| GradeError::Xlsx(format!("{}: {e}", file_path.display())))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| GradeError::Xlsx(format!("{}: workbook has no sheets", file_path.display())))?
        .map_err(|e| GradeError::Xlsx(format!("{}: {e}", file_path.display())))?;

    // Ranges start at the first used cell; pad back to A1 so header positions hold.
    let (first_row, first_col) = range.start().unwrap_or((0, 0));
    let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); first_row as usize];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; first_col as usize];
        cells.extend(row.iter().map(cell_from_data));
        rows.push(cells);
    }
    Ok(RawTable::new(rows))
}

#[cfg(feature = "xlsx")]
fn cell_from_data(data: &calamine::Data) -> Cell {
    use calamine::Data;
    match data {
        Data::Empty => Cell::Empty,
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::String(s) => Cell::from_text(s),
        other => Cell::from_text(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_csv_keeps_all_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grades.csv");
        let content = "\
Student,ID,Section,Unit 1 Exam (101)
    Points Possible,,,20
\"Lee, Ann\",7,P1,18
\"Diaz, Bo\",8,P1,
";
        std::fs::write(&path, content).unwrap();
        let table = read_table(&path).unwrap();
        assert_eq!(table.height(), 4);
        assert_eq!(table.width(), 4);
        assert_eq!(table.cell(2, 0), &Cell::Text("Lee, Ann".to_string()));
        assert_eq!(table.cell(3, 3), &Cell::Empty);
    }

    #[test]
    fn test_read_csv_ragged_rows_are_padded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ragged.csv");
        std::fs::write(&path, "a,b,c\n1\n").unwrap();
        let table = read_csv(&path).unwrap();
        assert_eq!(table.rows[1].len(), 3);
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grades.txt");
        std::fs::write(&path, "x").unwrap();
        assert!(matches!(read_table(&path), Err(GradeError::UnsupportedFile(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.csv");
        assert!(matches!(read_table(&path), Err(GradeError::Io(_))));
    }
}
