use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::SystemTime;

use regex::Regex;
use tracing::debug;

use crate::error::{GradeError, Result};

pub const OUTPUT_PREFIX: &str = "Aggregated ";

/// Newest file in `dir` whose name matches `pattern`, by modification time.
pub fn latest_matching(dir: &Path, pattern: &Regex) -> Result<Option<PathBuf>> {
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if !pattern.is_match(name) || !entry.file_type()?.is_file() {
            continue;
        }
        let modified = entry.metadata()?.modified()?;
        if newest.as_ref().map_or(true, |(t, _)| modified > *t) {
            newest = Some((modified, entry.path()));
        }
    }
    Ok(newest.map(|(_, path)| path))
}

/// `Aggregated <input stem>.csv` beside the input.
pub fn aggregate_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    input.with_file_name(format!("{OUTPUT_PREFIX}{stem}.csv"))
}

/// True when `output` exists and is no older than `input`.
pub fn is_current(output: &Path, input: &Path) -> bool {
    let modified = |p: &Path| std::fs::metadata(p).and_then(|m| m.modified()).ok();
    match (modified(output), modified(input)) {
        (Some(out), Some(inp)) => out >= inp,
        _ => false,
    }
}

/// Launch `viewer` on `file` without waiting for it to exit.
pub fn open_in_viewer(viewer: &str, file: &Path) -> Result<()> {
    let mut parts = viewer.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| GradeError::Other("viewer command is empty".to_string()))?;
    debug!("opening {} with {viewer}", file.display());
    Command::new(program).args(parts).arg(file).spawn()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn touch(path: &Path, age_secs: u64) {
        std::fs::write(path, "x").unwrap();
        let file = std::fs::File::options().write(true).open(path).unwrap();
        file.set_modified(SystemTime::now() - Duration::from_secs(age_secs)).unwrap();
    }

    #[test]
    fn test_latest_matching_picks_newest() {
        let dir = tempfile::tempdir().unwrap();
        touch(&dir.path().join("2024-09-01_Grades-AP_CS_A.csv"), 600);
        touch(&dir.path().join("2024-10-01_Grades-AP_CS_A.csv"), 60);
        touch(&dir.path().join("2024-11-01_Grades-AP_CS_Principles.csv"), 0);
        let re = Regex::new(r"^2024.*Grades-AP_CS_A.*\.csv$").unwrap();
        let found = latest_matching(dir.path(), &re).unwrap().unwrap();
        assert!(found.ends_with("2024-10-01_Grades-AP_CS_A.csv"));
    }

    #[test]
    fn test_latest_matching_none() {
        let dir = tempfile::tempdir().unwrap();
        let re = Regex::new(r"^CS20.*\.xlsx$").unwrap();
        assert_eq!(latest_matching(dir.path(), &re).unwrap(), None);
    }

    #[test]
    fn test_output_path() {
        let out = aggregate_output_path(Path::new("/dl/CS2024 P2.xlsx"));
        assert_eq!(out, PathBuf::from("/dl/Aggregated CS2024 P2.csv"));
    }

    #[test]
    fn test_is_current() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.csv");
        touch(&input, 60);
        assert!(!is_current(&output, &input));
        touch(&output, 0);
        assert!(is_current(&output, &input));
        touch(&input, 0);
        touch(&output, 120);
        assert!(!is_current(&output, &input));
    }
}
