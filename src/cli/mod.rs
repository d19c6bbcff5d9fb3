pub mod aggregate;
pub mod due_dates;
pub mod init;
pub mod platforms;
pub mod run;
pub mod synergy;

use std::path::Path;

use clap::{Parser, Subcommand};
use colored::Colorize;

use crate::discovery::open_in_viewer;

#[derive(Parser)]
#[command(
    name = "gradeagg",
    about = "Aggregate classroom platform grade exports and build Synergy bulk-import files."
)]
pub struct Cli {
    /// Print debug trace of column classification (same as RUST_LOG=debug)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Save settings: download folder, roster, due-date file, viewer.
    Init {
        /// Folder searched for platform exports
        #[arg(long = "download-dir")]
        download_dir: Option<String>,
        /// Roster CSV exported from Synergy
        #[arg(long)]
        roster: Option<String>,
        /// Due-date CSV (created on first use)
        #[arg(long = "due-dates")]
        due_dates: Option<String>,
        /// Command used to open finished files
        #[arg(long)]
        viewer: Option<String>,
        /// Leave the Overall grade column out of aggregate files
        #[arg(long = "no-overall")]
        no_overall: bool,
    },
    /// Aggregate the newest export of every platform (the default command).
    Run {
        /// Re-aggregate even when the output is newer than the export
        #[arg(long)]
        force: bool,
        /// Don't open finished files in the viewer
        #[arg(long = "no-open")]
        no_open: bool,
        /// Ask again about every stored due date
        #[arg(long = "revise-dates")]
        revise_dates: bool,
    },
    /// Aggregate one export file.
    Aggregate {
        /// Path to the CSV or XLSX export
        file: String,
        /// Platform key (tsk, stem-csp, stem-csa); detected from the file name if omitted
        #[arg(long)]
        platform: Option<String>,
        /// Output CSV (default: "Aggregated <name>.csv" beside the export)
        #[arg(long, short)]
        output: Option<String>,
        /// Don't open the output in the viewer
        #[arg(long = "no-open")]
        no_open: bool,
    },
    /// Reshape an aggregate file into per-period Synergy bulk-import files.
    Synergy {
        /// Aggregate CSV produced by `aggregate` or `run`
        file: String,
        /// Folder for the import files (default: the aggregate file's folder)
        #[arg(long = "output-dir")]
        output_dir: Option<String>,
        /// Roster CSV (overrides settings)
        #[arg(long)]
        roster: Option<String>,
        /// Due-date CSV (overrides settings)
        #[arg(long = "due-dates")]
        due_dates: Option<String>,
        /// Ask again about every stored due date
        #[arg(long = "revise-dates")]
        revise_dates: bool,
        /// Don't open the import files in the viewer
        #[arg(long = "no-open")]
        no_open: bool,
    },
    /// List supported platforms.
    Platforms,
    /// Show stored due dates.
    DueDates {
        /// Only this course
        #[arg(long)]
        course: Option<String>,
    },
}

pub(crate) fn print_warnings(warnings: &[String]) {
    for warning in warnings {
        println!("{}", format!("Warning: {warning}").yellow());
    }
}

/// Open `file` when a viewer is configured; a failed launch is only reported.
pub(crate) fn show(viewer: Option<&str>, file: &Path) {
    if let Some(viewer) = viewer {
        if let Err(e) = open_in_viewer(viewer, file) {
            println!("{}", format!("Couldn't open {}: {e}", file.display()).yellow());
        }
    }
}
