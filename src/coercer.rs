use crate::models::{Category, Cell};

/// A scored cell. `max_points` is set only for `earned/possible` cells in
/// assessment columns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellValue {
    pub value: f64,
    pub max_points: Option<i64>,
}

impl CellValue {
    fn points(value: f64) -> Self {
        Self {
            value,
            max_points: None,
        }
    }
}

fn strip_annotations(text: &str) -> String {
    let mut s = text.to_string();
    if let Some(i) = s.find('\n') {
        s.truncate(i);
    }
    if let Some(i) = s.find(" lines of code") {
        s.truncate(i);
    }
    // " (…)" from the first opening paren to the last closing one
    if let (Some(open), Some(close)) = (s.find(" ("), s.rfind(')')) {
        if close > open + 2 {
            s.replace_range(open..=close, "");
        }
    }
    s.trim().to_string()
}

fn parse_fraction(text: &str) -> Option<(i64, i64)> {
    let (a, b) = text.split_once('/')?;
    Some((a.trim().parse().ok()?, b.trim().parse().ok()?))
}

/// Turn a raw cell into points for a column of the given category. Returns
/// `None` when the text is not a recognised status, fraction or number.
///
/// Work columns score `a/b` as 1 when at least half done, else 0. Assessment
/// columns score `a` and report `b` as the column's points possible.
pub fn coerce(cell: &Cell, category: Category) -> Option<CellValue> {
    let text = match cell {
        Cell::Empty => return Some(CellValue::points(0.0)),
        Cell::Number(n) if n.is_nan() => return Some(CellValue::points(0.0)),
        Cell::Number(n) => return Some(CellValue::points(*n)),
        Cell::Text(s) if s.trim().is_empty() => return Some(CellValue::points(0.0)),
        Cell::Text(s) => s,
    };

    if text.contains("In Progress") || text.contains("In progress") {
        return Some(CellValue::points(0.0));
    }
    if text.contains("Syntax error") {
        return Some(CellValue::points(0.0));
    }
    if text.contains("Turned In") {
        return Some(CellValue::points(1.0));
    }

    let text = strip_annotations(text);
    if let Some((earned, possible)) = parse_fraction(&text) {
        if category.is_assessment() {
            return Some(CellValue {
                value: earned as f64,
                max_points: Some(possible),
            });
        }
        let done = earned.checked_mul(2)? >= possible;
        return Some(CellValue::points(if done { 1.0 } else { 0.0 }));
    }

    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(CellValue::points)
}
