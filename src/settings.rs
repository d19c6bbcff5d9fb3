use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_download_dir")]
    pub download_dir: String,
    #[serde(default = "default_roster_file")]
    pub roster_file: String,
    #[serde(default = "default_due_dates_file")]
    pub due_dates_file: String,
    /// Command used to open finished files, e.g. "libreoffice" or "open".
    #[serde(default)]
    pub viewer: Option<String>,
    #[serde(default = "default_true")]
    pub overall_grade: bool,
    #[serde(default = "default_excluded_courses")]
    pub excluded_courses: Vec<String>,
}

fn default_download_dir() -> String {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
        .to_string_lossy()
        .to_string()
}

fn default_roster_file() -> String {
    "Roster.csv".to_string()
}

fn default_due_dates_file() -> String {
    "due dates.csv".to_string()
}

fn default_true() -> bool {
    true
}

fn default_excluded_courses() -> Vec<String> {
    vec!["Audit".to_string()]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            download_dir: default_download_dir(),
            roster_file: default_roster_file(),
            due_dates_file: default_due_dates_file(),
            viewer: None,
            overall_grade: true,
            excluded_courses: default_excluded_courses(),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("gradeagg")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        match serde_json::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("ignoring unreadable {}: {e}", path.display());
                Settings::default()
            }
        }
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    std::fs::create_dir_all(config_dir())?;
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

/// Expand `~` and place relative paths under the config directory.
pub fn resolve_path(path: &str) -> PathBuf {
    let expanded = PathBuf::from(shellexpand_path(path));
    if expanded.is_absolute() {
        expanded
    } else {
        config_dir().join(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.roster_file, "Roster.csv");
        assert_eq!(s.due_dates_file, "due dates.csv");
        assert!(s.overall_grade);
        assert_eq!(s.excluded_courses, vec!["Audit".to_string()]);
        assert!(s.viewer.is_none());
        assert!(!s.download_dir.is_empty());
    }

    #[test]
    fn test_partial_json_merges_with_defaults() {
        let json = r#"{"roster_file": "P3 roster.csv", "viewer": "libreoffice"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.roster_file, "P3 roster.csv");
        assert_eq!(s.viewer.as_deref(), Some("libreoffice"));
        assert_eq!(s.due_dates_file, "due dates.csv");
        assert!(s.overall_grade);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            download_dir: "/tmp/downloads".to_string(),
            overall_grade: false,
            ..Settings::default()
        };
        std::fs::write(&path, serde_json::to_string_pretty(&settings).unwrap()).unwrap();
        let loaded: Settings =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(loaded.download_dir, "/tmp/downloads");
        assert!(!loaded.overall_grade);
    }

    #[test]
    fn test_shellexpand_leaves_plain_paths() {
        assert_eq!(shellexpand_path("Roster.csv"), "Roster.csv");
        assert!(!shellexpand_path("~/Downloads").starts_with('~'));
    }

    #[test]
    fn test_resolve_path() {
        assert_eq!(resolve_path("/srv/Roster.csv"), PathBuf::from("/srv/Roster.csv"));
        assert!(resolve_path("Roster.csv").ends_with(".config/gradeagg/Roster.csv"));
    }
}
