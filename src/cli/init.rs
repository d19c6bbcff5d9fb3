use colored::Colorize;
use dialoguer::Input;

use crate::error::Result;
use crate::settings::{load_settings, resolve_path, save_settings, settings_path, shellexpand_path};

pub struct InitOptions {
    pub download_dir: Option<String>,
    pub roster: Option<String>,
    pub due_dates: Option<String>,
    pub viewer: Option<String>,
    pub no_overall: bool,
}

pub fn run(options: InitOptions) -> Result<()> {
    let first_run = !settings_path().exists();
    let mut settings = load_settings();

    if let Some(dir) = options.download_dir {
        settings.download_dir = shellexpand_path(&dir);
    } else if first_run {
        let chosen: String = Input::new()
            .with_prompt("Folder with platform exports")
            .default(settings.download_dir.clone())
            .interact_text()?;
        settings.download_dir = shellexpand_path(chosen.trim());
    }
    if let Some(roster) = options.roster {
        settings.roster_file = shellexpand_path(&roster);
    }
    if let Some(due_dates) = options.due_dates {
        settings.due_dates_file = shellexpand_path(&due_dates);
    }
    if let Some(viewer) = options.viewer {
        settings.viewer = Some(viewer).filter(|v| !v.trim().is_empty());
    }
    if options.no_overall {
        settings.overall_grade = false;
    }

    save_settings(&settings)?;

    println!("{} {}", "Saved".green(), settings_path().display());
    println!("  Exports:   {}", settings.download_dir);
    let roster = resolve_path(&settings.roster_file);
    let marker = if roster.exists() { "".normal() } else { " (not found)".yellow() };
    println!("  Roster:    {}{marker}", roster.display());
    println!("  Due dates: {}", resolve_path(&settings.due_dates_file).display());
    println!("  Viewer:    {}", settings.viewer.as_deref().unwrap_or("none"));
    Ok(())
}
