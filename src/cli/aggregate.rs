use std::path::{Path, PathBuf};

use colored::Colorize;

use crate::discovery::aggregate_output_path;
use crate::error::{GradeError, Result};
use crate::platforms::{get_by_key, get_for_file, PlatformKind};
use crate::settings::load_settings;

use super::{print_warnings, show};

/// Aggregate `input` into `output`, printing warnings as they were collected.
pub(crate) fn aggregate_to(platform: PlatformKind, input: &Path, output: &Path, overall: bool) -> Result<()> {
    let result = platform.aggregate(input, overall)?;
    print_warnings(&result.warnings);
    result.table.write_csv(output)?;
    println!("{} {}", "Wrote".green(), output.display());
    Ok(())
}

pub fn run(file: &str, platform: Option<&str>, output: Option<&str>, no_open: bool) -> Result<()> {
    let settings = load_settings();
    let input = PathBuf::from(file);
    if !input.exists() {
        return Err(GradeError::Other(format!("File not found: {file}")));
    }

    let platform = match platform {
        Some(key) => get_by_key(key).ok_or_else(|| GradeError::UnknownPlatform(key.to_string()))?,
        None => get_for_file(&input).ok_or_else(|| {
            GradeError::UnknownPlatform(format!(
                "can't tell the platform from {}; pass --platform",
                input.display()
            ))
        })?,
    };
    let output = output.map_or_else(|| aggregate_output_path(&input), PathBuf::from);

    println!("{}: processing {}", platform.name(), input.display());
    aggregate_to(platform, &input, &output, settings.overall_grade)?;
    if !no_open {
        show(settings.viewer.as_deref(), &output);
    }
    Ok(())
}
