use std::path::{Path, PathBuf};

use colored::Colorize;
use tracing::{debug, trace};

use crate::due_dates::{DueDateResolver, DueDateStore, StoredDueDates, TerminalPrompt};
use crate::error::Result;
use crate::roster::{load_roster, Roster};
use crate::settings::{load_settings, resolve_path};
use crate::synergy::{reshape, write_period_tables};
use crate::table::read_table;

use super::{print_warnings, show};

/// Load the roster for a run. `None` (with the reason printed) disables reshaping.
pub(crate) fn roster_for_run(path: &Path) -> Option<Roster> {
    if !path.exists() {
        println!("{} not found - skipping Synergy bulk import formatting", path.display());
        return None;
    }
    match load_roster(path) {
        Ok(roster) if roster.is_empty() => {
            println!(
                "{} has no student roster info - skipping Synergy bulk import formatting",
                path.display()
            );
            None
        }
        Ok(roster) => {
            debug!("{} roster entries from {}", roster.len(), path.display());
            for entry in roster.entries() {
                trace!("{entry}");
            }
            Some(roster)
        }
        Err(e) => {
            println!("{}", format!("{e} - skipping Synergy bulk import formatting").red());
            None
        }
    }
}

/// Reshape one aggregate file and write its period files.
pub(crate) fn reshape_file(
    aggregate: &Path,
    output_dir: &Path,
    roster: &Roster,
    excluded_courses: &[String],
    due_dates: &mut dyn DueDateResolver,
    viewer: Option<&str>,
) -> Result<Vec<PathBuf>> {
    let table = read_table(aggregate)?;
    let reshaped = reshape(&table, roster, excluded_courses, due_dates)?;
    print_warnings(&reshaped.warnings);
    let written = write_period_tables(&reshaped, output_dir)?;
    if written.is_empty() {
        println!("{}", "No Synergy import rows to write.".yellow());
    }
    for file in &written {
        println!("{} {}", "Wrote".green(), file.display());
        show(viewer, file);
    }
    Ok(written)
}

pub fn run(
    file: &str,
    output_dir: Option<&str>,
    roster: Option<&str>,
    due_dates: Option<&str>,
    revise_dates: bool,
    no_open: bool,
) -> Result<()> {
    let settings = load_settings();
    let aggregate = PathBuf::from(file);
    let output_dir = match output_dir {
        Some(dir) => PathBuf::from(dir),
        None => aggregate
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(".")),
    };
    let roster_path = resolve_path(roster.unwrap_or(&settings.roster_file));
    let roster = load_roster(&roster_path)?;
    let store = DueDateStore::open(&resolve_path(due_dates.unwrap_or(&settings.due_dates_file)))?;
    let mut resolver = StoredDueDates::new(store, TerminalPrompt, revise_dates);
    let viewer = if no_open { None } else { settings.viewer.as_deref() };

    reshape_file(
        &aggregate,
        &output_dir,
        &roster,
        &settings.excluded_courses,
        &mut resolver,
        viewer,
    )?;
    Ok(())
}
