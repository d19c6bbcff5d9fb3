use std::path::{Path, PathBuf};

use chrono::Datelike;
use colored::Colorize;
use dialoguer::Select;
use regex::Regex;

use crate::discovery::{aggregate_output_path, is_current, latest_matching};
use crate::due_dates::{DueDateResolver, DueDateStore, StoredDueDates, TerminalPrompt};
use crate::error::{GradeError, Result};
use crate::platforms::{PlatformKind, ALL_PLATFORMS};
use crate::roster::Roster;
use crate::settings::{load_settings, resolve_path, shellexpand_path, Settings};

use super::aggregate::aggregate_to;
use super::show;
use super::synergy::{reshape_file, roster_for_run};

pub struct RunOptions {
    pub force: bool,
    pub no_open: bool,
    pub revise_dates: bool,
}

enum Freshness {
    Aggregate,
    Open,
    Skip,
}

fn ask_when_current(output: &Path) -> Result<Freshness> {
    println!("Aggregate file is already current: {}", output.display());
    let choice = Select::new()
        .with_prompt("What next?")
        .items(&["Re-aggregate", "Open the existing file", "Skip"])
        .default(2)
        .interact()?;
    Ok(match choice {
        0 => Freshness::Aggregate,
        1 => Freshness::Open,
        _ => Freshness::Skip,
    })
}

struct Batch<'a> {
    settings: &'a Settings,
    options: &'a RunOptions,
    download_dir: PathBuf,
    year: i32,
    roster: Option<Roster>,
    due_dates: &'a mut dyn DueDateResolver,
}

fn viewer_for<'s>(settings: &'s Settings, options: &RunOptions) -> Option<&'s str> {
    if options.no_open {
        None
    } else {
        settings.viewer.as_deref()
    }
}

impl Batch<'_> {
    fn process(&mut self, platform: PlatformKind) -> Result<()> {
        let pattern = Regex::new(&platform.file_pattern(Some(self.year)))
            .map_err(|e| GradeError::Other(e.to_string()))?;
        let Some(input) = latest_matching(&self.download_dir, &pattern)? else {
            println!(
                "{}: can't find an export matching {} in {}",
                platform.name(),
                platform.glob(),
                self.download_dir.display()
            );
            return Ok(());
        };
        println!("{}: processing {}", platform.name(), input.display());

        let output = aggregate_output_path(&input);
        let freshness = if self.options.force || !is_current(&output, &input) {
            Freshness::Aggregate
        } else {
            ask_when_current(&output)?
        };
        match freshness {
            Freshness::Aggregate => aggregate_to(platform, &input, &output, self.settings.overall_grade)?,
            Freshness::Open => {}
            Freshness::Skip => return Ok(()),
        }
        let viewer = viewer_for(self.settings, self.options);
        show(viewer, &output);

        if let Some(roster) = &self.roster {
            let output_dir = output.parent().map(Path::to_path_buf).unwrap_or_default();
            reshape_file(
                &output,
                &output_dir,
                roster,
                &self.settings.excluded_courses,
                &mut *self.due_dates,
                viewer,
            )
            .map_err(|e| GradeError::Other(format!("failed to create Synergy import files: {e}")))?;
        }
        Ok(())
    }
}

pub fn run(options: RunOptions) -> Result<()> {
    let settings = load_settings();
    let roster = roster_for_run(&resolve_path(&settings.roster_file));
    let store = DueDateStore::open(&resolve_path(&settings.due_dates_file))?;
    let mut resolver = StoredDueDates::new(store, TerminalPrompt, options.revise_dates);

    let mut batch = Batch {
        settings: &settings,
        options: &options,
        download_dir: PathBuf::from(shellexpand_path(&settings.download_dir)),
        year: chrono::Local::now().year(),
        roster,
        due_dates: &mut resolver,
    };

    let mut failed = 0;
    for platform in ALL_PLATFORMS {
        println!();
        if let Err(e) = batch.process(*platform) {
            failed += 1;
            println!("{}", format!("{}: {e}", platform.name()).red());
        }
    }
    if failed > 0 {
        println!("\n{}", format!("{failed} of {} platforms failed", ALL_PLATFORMS.len()).red());
    }
    Ok(())
}
