use crate::models::{Cell, RawTable};

/// One header cell after carry-forward.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    /// Effective value: the cell's own text, or the last non-blank value to its
    /// left when the row carries forward.
    pub text: Option<String>,
    /// True when the value was written in this column rather than inherited.
    pub fresh: bool,
}

/// All header rows for one data column.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderColumn {
    pub index: usize,
    pub cells: Vec<HeaderCell>,
}

impl HeaderColumn {
    pub fn text(&self, row: usize) -> Option<&str> {
        self.cells.get(row).and_then(|c| c.text.as_deref())
    }

    pub fn is_fresh(&self, row: usize) -> bool {
        self.cells.get(row).map_or(false, |c| c.fresh)
    }

    /// Human-readable name for reports: the non-blank header values joined.
    pub fn describe(&self) -> String {
        let parts: Vec<&str> = self
            .cells
            .iter()
            .filter_map(|c| c.text.as_deref())
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if parts.is_empty() {
            format!("column {}", self.index + 1)
        } else {
            parts.join(" / ")
        }
    }
}

/// A multi-row-header sheet split into per-column headers and the data body.
#[derive(Debug, Clone)]
pub struct SplitTable {
    pub headers: Vec<HeaderColumn>,
    pub body: Vec<Vec<Cell>>,
}

/// Fold the first `carry.len()` rows of `raw` into one [`HeaderColumn`] per
/// column from `first_column` on. `carry[r]` says whether header row `r`
/// inherits the previous non-blank value across blank cells.
pub fn normalize(raw: &RawTable, carry: &[bool], first_column: usize) -> SplitTable {
    let header_rows = carry.len();
    let headers = (first_column..raw.width())
        .scan(vec![None::<String>; header_rows], |last, col| {
            let cells = (0..header_rows)
                .map(|row| {
                    let own = raw.cell(row, col).text().map(|t| t.trim().to_string());
                    let fresh = own.is_some();
                    if let Some(value) = &own {
                        last[row] = Some(value.clone());
                    }
                    let text = if carry[row] { last[row].clone() } else { own };
                    HeaderCell { text, fresh }
                })
                .collect();
            Some(HeaderColumn { index: col, cells })
        })
        .collect();

    SplitTable {
        headers,
        body: raw.rows.iter().skip(header_rows).cloned().collect(),
    }
}
