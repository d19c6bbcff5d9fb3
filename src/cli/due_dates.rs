use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::due_dates::{DueDate, DueDateStore};
use crate::error::Result;
use crate::settings::{load_settings, resolve_path};

pub fn list(course: Option<&str>) -> Result<()> {
    let settings = load_settings();
    let store = DueDateStore::open(&resolve_path(&settings.due_dates_file))?;
    let entries = store.entries(course);
    if entries.is_empty() {
        println!("No due dates stored in {}", store.path().display());
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Course", "Assignment", "Due"]);
    for (course, assignment, due) in entries {
        let shown = match &due {
            DueDate::Date(d) => d.clone(),
            DueDate::PermanentSkip => "X (never exported)".to_string(),
            DueDate::TemporarySkip => "S (asked next run)".to_string(),
            DueDate::Unresolved => "-".to_string(),
        };
        table.add_row(vec![Cell::new(course), Cell::new(assignment), Cell::new(shown)]);
    }
    println!("{}\n{table}", store.path().display().to_string().bold());
    Ok(())
}
