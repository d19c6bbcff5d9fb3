use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use colored::Colorize;
use dialoguer::Input;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

pub const DATE_FORMAT: &str = "%m/%d/%Y";
const PERMANENT_SKIP: &str = "X";
const TEMPORARY_SKIP: &str = "S";

#[derive(Debug, Clone, PartialEq)]
pub enum DueDate {
    Date(String),
    /// `X`: never exported and never asked about again.
    PermanentSkip,
    /// `S`: not exported this run; asked about again next run.
    TemporarySkip,
    Unresolved,
}

impl DueDate {
    /// Parse a stored or typed value. Returns `None` for text that is not a
    /// date, `X`, `S` or blank.
    pub fn parse(raw: &str) -> Option<DueDate> {
        let raw = raw.trim();
        match raw.to_uppercase().as_str() {
            "" => Some(DueDate::Unresolved),
            PERMANENT_SKIP => Some(DueDate::PermanentSkip),
            TEMPORARY_SKIP => Some(DueDate::TemporarySkip),
            _ => NaiveDate::parse_from_str(raw, DATE_FORMAT)
                .ok()
                .map(|_| DueDate::Date(raw.to_string())),
        }
    }
}

impl fmt::Display for DueDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DueDate::Date(d) => f.write_str(d),
            DueDate::PermanentSkip => f.write_str(PERMANENT_SKIP),
            DueDate::TemporarySkip => f.write_str(TEMPORARY_SKIP),
            DueDate::Unresolved => Ok(()),
        }
    }
}

pub type DueDateMap = HashMap<String, DueDate>;

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DueDateRecord {
    #[serde(rename = "COURSE")]
    course: String,
    #[serde(rename = "ASSIGNMENT_NAME")]
    assignment: String,
    #[serde(rename = "ASSIGNMENT_DATE", default)]
    date: String,
}

/// The due-date side file. Rows keep their order; new assignments are
/// appended and existing rows only change value.
#[derive(Debug)]
pub struct DueDateStore {
    path: PathBuf,
    records: Vec<DueDateRecord>,
}

impl DueDateStore {
    pub fn open(path: &Path) -> Result<Self> {
        let mut records = Vec::new();
        if path.exists() {
            let mut rdr = csv::ReaderBuilder::new()
                .trim(csv::Trim::All)
                .from_path(path)?;
            for result in rdr.deserialize() {
                records.push(result?);
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, course: &str, assignment: &str) -> Option<DueDate> {
        self.records
            .iter()
            .find(|r| r.course == course && r.assignment == assignment)
            .map(|r| DueDate::parse(&r.date).unwrap_or(DueDate::Unresolved))
    }

    pub fn set(&mut self, course: &str, assignment: &str, date: &DueDate) {
        let value = date.to_string();
        match self
            .records
            .iter_mut()
            .find(|r| r.course == course && r.assignment == assignment)
        {
            Some(record) => record.date = value,
            None => self.records.push(DueDateRecord {
                course: course.to_string(),
                assignment: assignment.to_string(),
                date: value,
            }),
        }
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut wtr = csv::Writer::from_path(&self.path)?;
        if self.records.is_empty() {
            wtr.write_record(["COURSE", "ASSIGNMENT_NAME", "ASSIGNMENT_DATE"])?;
        }
        for record in &self.records {
            wtr.serialize(record)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// `(course, assignment, value)` for every stored row, optionally for one course.
    pub fn entries(&self, course: Option<&str>) -> Vec<(&str, &str, DueDate)> {
        self.records
            .iter()
            .filter(|r| course.map_or(true, |c| r.course == c))
            .map(|r| {
                (
                    r.course.as_str(),
                    r.assignment.as_str(),
                    DueDate::parse(&r.date).unwrap_or(DueDate::Unresolved),
                )
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Supplies a due date (or skip marker) for each assignment of a course.
pub trait DueDateResolver {
    fn resolve(&mut self, course: &str, assignments: &[String]) -> Result<DueDateMap>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum Question<'a> {
    New {
        course: &'a str,
        assignment: &'a str,
    },
    Revise {
        course: &'a str,
        assignment: &'a str,
        current: &'a DueDate,
    },
}

pub trait Prompt {
    /// `Ok(None)` keeps the current value.
    fn ask(&mut self, question: &Question<'_>) -> Result<Option<DueDate>>;
}

/// Answers from the store, asking the prompt about new assignments, stored
/// temporary skips and (with `revise`) stored dates. Each answer is saved
/// before the next question.
pub struct StoredDueDates<P: Prompt> {
    store: DueDateStore,
    prompt: P,
    revise: bool,
}

impl<P: Prompt> StoredDueDates<P> {
    pub fn new(store: DueDateStore, prompt: P, revise: bool) -> Self {
        Self {
            store,
            prompt,
            revise,
        }
    }
}

impl<P: Prompt> DueDateResolver for StoredDueDates<P> {
    fn resolve(&mut self, course: &str, assignments: &[String]) -> Result<DueDateMap> {
        let mut map = DueDateMap::new();
        for assignment in assignments {
            let stored = self.store.get(course, assignment);
            let asked = match &stored {
                None | Some(DueDate::Unresolved) => self.prompt.ask(&Question::New { course, assignment })?,
                Some(DueDate::PermanentSkip) => None,
                Some(current @ DueDate::TemporarySkip) => {
                    self.prompt.ask(&Question::Revise { course, assignment, current })?
                }
                Some(current @ DueDate::Date(_)) if self.revise => {
                    self.prompt.ask(&Question::Revise { course, assignment, current })?
                }
                Some(DueDate::Date(_)) => None,
            };

            let value = match (asked, stored) {
                (Some(answer), previous) => {
                    if previous.as_ref() != Some(&answer) {
                        self.store.set(course, assignment, &answer);
                        self.store.save()?;
                        debug!("saved {assignment} = {answer} to {}", self.store.path().display());
                    }
                    answer
                }
                (None, Some(previous)) => previous,
                (None, None) => DueDate::Unresolved,
            };
            map.insert(assignment.clone(), value);
        }
        Ok(map)
    }
}

/// Reads answers from the terminal.
pub struct TerminalPrompt;

fn validate_answer(input: &String, allow_blank: bool) -> std::result::Result<(), String> {
    match DueDate::parse(input) {
        Some(DueDate::Unresolved) if !allow_blank => Err("enter a date, X or S".to_string()),
        Some(_) => Ok(()),
        None => Err("expected m/d/yyyy, X or S".to_string()),
    }
}

impl Prompt for TerminalPrompt {
    fn ask(&mut self, question: &Question<'_>) -> Result<Option<DueDate>> {
        let (prompt, allow_blank) = match question {
            Question::New { course, assignment } => (
                format!(
                    "{course}: due date for {} (m/d/yyyy, X to permanently skip, S to skip this time)",
                    assignment.bold()
                ),
                false,
            ),
            Question::Revise {
                course,
                assignment,
                current,
            } => (
                format!(
                    "{course}: due date for {} is {current} (Enter keeps it, m/d/yyyy, X, S)",
                    assignment.bold()
                ),
                true,
            ),
        };
        let answer: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(allow_blank)
            .validate_with(|input: &String| validate_answer(input, allow_blank))
            .interact_text()?;
        Ok(DueDate::parse(&answer).filter(|d| *d != DueDate::Unresolved))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Answers from a fixed script and records what was asked.
    #[derive(Default)]
    struct Scripted {
        answers: VecDeque<Option<DueDate>>,
        asked: Vec<String>,
    }

    impl Scripted {
        fn new(answers: Vec<Option<DueDate>>) -> Self {
            Self {
                answers: answers.into(),
                asked: Vec::new(),
            }
        }
    }

    impl Prompt for Scripted {
        fn ask(&mut self, question: &Question<'_>) -> Result<Option<DueDate>> {
            let assignment = match question {
                Question::New { assignment, .. } | Question::Revise { assignment, .. } => assignment,
            };
            self.asked.push(assignment.to_string());
            Ok(self.answers.pop_front().flatten())
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn date(s: &str) -> DueDate {
        DueDate::Date(s.to_string())
    }

    #[test]
    fn test_parse_values() {
        assert_eq!(DueDate::parse("9/5/2024"), Some(date("9/5/2024")));
        assert_eq!(DueDate::parse("x"), Some(DueDate::PermanentSkip));
        assert_eq!(DueDate::parse("S"), Some(DueDate::TemporarySkip));
        assert_eq!(DueDate::parse(" "), Some(DueDate::Unresolved));
        assert_eq!(DueDate::parse("13/40/2024"), None);
        assert_eq!(DueDate::parse("tomorrow"), None);
    }

    #[test]
    fn test_new_answers_are_saved_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("due dates.csv");
        let store = DueDateStore::open(&path).unwrap();
        let prompt = Scripted::new(vec![Some(date("9/5/2024")), Some(DueDate::PermanentSkip)]);
        let mut resolver = StoredDueDates::new(store, prompt, false);
        let map = resolver.resolve("AP CS A", &names(&["1 Exam", "1 Exercises"])).unwrap();
        assert_eq!(map["1 Exam"], date("9/5/2024"));
        assert_eq!(map["1 Exercises"], DueDate::PermanentSkip);

        let reopened = DueDateStore::open(&path).unwrap();
        assert_eq!(reopened.get("AP CS A", "1 Exam"), Some(date("9/5/2024")));
        assert_eq!(reopened.get("AP CS A", "1 Exercises"), Some(DueDate::PermanentSkip));
        assert_eq!(reopened.get("Intro CS", "1 Exam"), None);
    }

    #[test]
    fn test_permanent_skip_never_reasked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("due dates.csv");
        let mut store = DueDateStore::open(&path).unwrap();
        store.set("AP CS A", "1 Exam", &DueDate::PermanentSkip);
        store.set("AP CS A", "2 Exam", &date("10/1/2024"));
        store.set("AP CS A", "3 Exam", &DueDate::TemporarySkip);
        store.save().unwrap();

        for revise in [false, true] {
            let store = DueDateStore::open(&path).unwrap();
            let mut resolver = StoredDueDates::new(store, Scripted::new(vec![None, None]), revise);
            let map = resolver
                .resolve("AP CS A", &names(&["1 Exam", "2 Exam", "3 Exam"]))
                .unwrap();
            assert_eq!(map["1 Exam"], DueDate::PermanentSkip);
            assert_eq!(map["3 Exam"], DueDate::TemporarySkip);
            assert!(!resolver.prompt.asked.contains(&"1 Exam".to_string()));
            assert!(resolver.prompt.asked.contains(&"3 Exam".to_string()));
            assert_eq!(resolver.prompt.asked.contains(&"2 Exam".to_string()), revise);
        }
    }

    #[test]
    fn test_revise_replaces_stored_date() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("due dates.csv");
        let mut store = DueDateStore::open(&path).unwrap();
        store.set("Intro CS", "1.1 Assignment", &date("9/1/2024"));
        let mut resolver = StoredDueDates::new(store, Scripted::new(vec![Some(date("9/3/2024"))]), true);
        let map = resolver.resolve("Intro CS", &names(&["1.1 Assignment"])).unwrap();
        assert_eq!(map["1.1 Assignment"], date("9/3/2024"));
        let entries = resolver.store.entries(Some("Intro CS"));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].2, date("9/3/2024"));
    }

    #[test]
    fn test_validate_answer() {
        assert!(validate_answer(&"9/5/2024".to_string(), false).is_ok());
        assert!(validate_answer(&String::new(), false).is_err());
        assert!(validate_answer(&String::new(), true).is_ok());
        assert!(validate_answer(&"soon".to_string(), true).is_err());
    }
}
