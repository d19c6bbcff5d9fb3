use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::error::{GradeError, Result};
use crate::models::RosterEntry;

pub const REQUIRED_COLUMNS: &[&str] = &["Period", "Course Title", "Student Name", "Sis Number"];

#[derive(Debug, Deserialize)]
struct RosterRecord {
    #[serde(rename = "Period")]
    period: String,
    #[serde(rename = "Course Title")]
    course: String,
    #[serde(rename = "Student Name")]
    student_name: String,
    #[serde(rename = "Sis Number")]
    sis_number: String,
    #[serde(rename = "Alias", default)]
    alias: Option<String>,
}

/// Split `"Last, First M."` into last and first name, dropping a trailing
/// middle initial.
pub fn parse_student_name(raw: &str) -> (String, String) {
    let (last, first) = raw.split_once(',').unwrap_or((raw, ""));
    let mut first = first.trim();
    if first.ends_with('.') {
        if let Some((given, _initial)) = first.rsplit_once(char::is_whitespace) {
            first = given.trim_end();
        }
    }
    (last.trim().to_string(), first.to_string())
}

impl From<RosterRecord> for RosterEntry {
    fn from(record: RosterRecord) -> Self {
        let (last_name, first_name) = parse_student_name(&record.student_name);
        let alias = record
            .alias
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| format!("{last_name}, {first_name}"));
        RosterEntry {
            period: record.period,
            course: record.course,
            id: record.sis_number,
            last_name,
            first_name,
            alias,
        }
    }
}

/// Roster entries keyed by alias.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: HashMap<String, RosterEntry>,
}

impl Roster {
    pub fn new(entries: Vec<RosterEntry>) -> Self {
        let mut roster = Self::default();
        for entry in entries {
            if let Some(previous) = roster.entries.insert(entry.alias.clone(), entry) {
                debug!("alias {} appears more than once; keeping the later row", previous.alias);
            }
        }
        roster
    }

    pub fn get(&self, alias: &str) -> Option<&RosterEntry> {
        self.entries.get(alias.trim())
    }

    /// Entries ordered by period, then name.
    pub fn entries(&self) -> Vec<&RosterEntry> {
        let mut entries: Vec<&RosterEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| (&a.period, &a.alias).cmp(&(&b.period, &b.alias)));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn load_roster(file_path: &Path) -> Result<Roster> {
    let file = std::fs::File::open(file_path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(std::io::BufReader::new(file));

    let headers = rdr.headers()?.clone();
    if let Some(missing) = REQUIRED_COLUMNS
        .iter()
        .find(|col| !headers.iter().any(|h| h == **col))
    {
        return Err(GradeError::RosterColumn {
            file: file_path.display().to_string(),
            column: missing.to_string(),
        });
    }

    let mut entries = Vec::new();
    for result in rdr.deserialize() {
        let record: RosterRecord = result?;
        entries.push(RosterEntry::from(record));
    }
    Ok(Roster::new(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_roster(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Roster.csv");
        std::fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_parse_student_name() {
        assert_eq!(parse_student_name("Lee, Ann"), ("Lee".to_string(), "Ann".to_string()));
        assert_eq!(parse_student_name("Lee, Ann M."), ("Lee".to_string(), "Ann".to_string()));
        assert_eq!(
            parse_student_name("De La Cruz, Mary Jo"),
            ("De La Cruz".to_string(), "Mary Jo".to_string())
        );
        assert_eq!(parse_student_name("Prince"), ("Prince".to_string(), String::new()));
    }

    #[test]
    fn test_load_roster_with_alias() {
        let (_dir, path) = write_roster(
            "Period,Course Title,Student Name,Sis Number,Alias\n\
             3,AP CS A,\"Lee, Ann M.\",1001,\n\
             3,AP CS A,\"Diaz, Roberto\",1002,\"Diaz, Bo\"\n",
        );
        let roster = load_roster(&path).unwrap();
        assert_eq!(roster.len(), 2);
        let ann = roster.get("Lee, Ann").unwrap();
        assert_eq!(ann.id, "1001");
        assert_eq!(ann.period, "3");
        let bo = roster.get("Diaz, Bo").unwrap();
        assert_eq!(bo.first_name, "Roberto");
        assert!(roster.get("Diaz, Roberto").is_none());

        let listing: Vec<String> = roster.entries().iter().map(|e| e.to_string()).collect();
        assert_eq!(
            listing,
            vec![
                "1002: Diaz, Roberto (Diaz, Bo)\tP3 AP CS A".to_string(),
                "1001: Lee, Ann\tP3 AP CS A".to_string(),
            ]
        );
    }

    #[test]
    fn test_alias_column_is_optional() {
        let (_dir, path) = write_roster(
            "Sis Number,Student Name,Period,Course Title,Grade\n\
             7,\"Kim, Jo\",2,Intro CS,10\n",
        );
        let roster = load_roster(&path).unwrap();
        assert_eq!(roster.get("Kim, Jo").unwrap().course, "Intro CS");
    }

    #[test]
    fn test_missing_required_column() {
        let (_dir, path) = write_roster("Period,Course Title,Student Name\n3,AP CS A,\"Lee, Ann\"\n");
        let err = load_roster(&path).unwrap_err();
        assert!(matches!(&err, GradeError::RosterColumn { column, .. } if column == "Sis Number"));
        assert!(err.to_string().contains("no column named Sis Number"));
    }
}
