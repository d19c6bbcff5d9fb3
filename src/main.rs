mod aggregator;
mod classifier;
mod cli;
mod coercer;
mod discovery;
mod due_dates;
mod error;
mod header;
mod models;
mod platforms;
mod roster;
mod settings;
mod synergy;
mod table;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::init::InitOptions;
use cli::run::RunOptions;
use cli::{Cli, Commands};

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let command = cli.command.unwrap_or(Commands::Run {
        force: false,
        no_open: false,
        revise_dates: false,
    });

    let result = match command {
        Commands::Init {
            download_dir,
            roster,
            due_dates,
            viewer,
            no_overall,
        } => cli::init::run(InitOptions {
            download_dir,
            roster,
            due_dates,
            viewer,
            no_overall,
        }),
        Commands::Run {
            force,
            no_open,
            revise_dates,
        } => cli::run::run(RunOptions {
            force,
            no_open,
            revise_dates,
        }),
        Commands::Aggregate {
            file,
            platform,
            output,
            no_open,
        } => cli::aggregate::run(&file, platform.as_deref(), output.as_deref(), no_open),
        Commands::Synergy {
            file,
            output_dir,
            roster,
            due_dates,
            revise_dates,
            no_open,
        } => cli::synergy::run(
            &file,
            output_dir.as_deref(),
            roster.as_deref(),
            due_dates.as_deref(),
            revise_dates,
            no_open,
        ),
        Commands::Platforms => cli::platforms::list(),
        Commands::DueDates { course } => cli::due_dates::list(course.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
