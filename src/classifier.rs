use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, trace};

use crate::header::HeaderColumn;
use crate::models::{Category, Classification, ColumnLabel};

// ---------------------------------------------------------------------------
// Rule matching
// ---------------------------------------------------------------------------

/// How a rule's pattern is compared with a header. Text patterns ignore case.
#[derive(Debug, Clone)]
pub enum Matcher {
    Contains(&'static str),
    StartsWith(&'static str),
    Regex(Regex),
}

impl Matcher {
    fn regex(pattern: &str) -> Self {
        Matcher::Regex(Regex::new(pattern).expect("Invalid classification rule regex"))
    }

    pub fn matches(&self, header: &str) -> bool {
        let header_upper = header.to_uppercase();
        match self {
            Matcher::Contains(pattern) => header_upper.contains(&pattern.to_uppercase()),
            Matcher::StartsWith(pattern) => header_upper.starts_with(&pattern.to_uppercase()),
            Matcher::Regex(re) => re.is_match(header),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RuleOutcome {
    Category(Category),
    Drop,
}

/// One row of a platform's ordered classification table. First match wins.
#[derive(Debug, Clone)]
pub struct Rule {
    pub matcher: Matcher,
    pub outcome: RuleOutcome,
}

fn first_integer(text: &str) -> Option<String> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u64>().ok().map(|n| n.to_string())
}

fn leading_integer(text: &str) -> Option<u32> {
    let digits: String = text
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

// ---------------------------------------------------------------------------
// Stateless classification (STEM AP CS A)
// ---------------------------------------------------------------------------

pub static CSA_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    vec![
        Rule {
            matcher: Matcher::StartsWith("FRQ"),
            outcome: RuleOutcome::Drop,
        },
        Rule {
            matcher: Matcher::regex(r"^Unit \d+ Exam"),
            outcome: RuleOutcome::Category(Category::Exam),
        },
        Rule {
            matcher: Matcher::regex(r"^Unit \d+: Lesson"),
            outcome: RuleOutcome::Category(Category::Exercises),
        },
        Rule {
            matcher: Matcher::regex(r"^(Unit \d+ Quiz|Assignment)"),
            outcome: RuleOutcome::Category(Category::QuizAndAssignment),
        },
    ]
});

/// Unit is the first integer anywhere in the header; category comes from the
/// first matching rule.
pub fn classify_stateless(header: &str, rules: &[Rule]) -> Classification {
    let header = header.trim();
    let rule = rules
        .iter()
        .find(|r| r.matcher.matches(header));
    if let Some(Rule {
        outcome: RuleOutcome::Drop,
        ..
    }) = rule
    {
        trace!("dropping {header}");
        return Classification::Drop;
    }
    let Some(unit) = first_integer(header) else {
        return Classification::Invalid("can't parse unit number".to_string());
    };
    match rule {
        Some(Rule {
            outcome: RuleOutcome::Category(category),
            ..
        }) => {
            let label = ColumnLabel::new(unit, *category);
            debug!("{label}\t\tWas: {header}");
            Classification::Label(label)
        }
        _ => Classification::Invalid("can't parse category".to_string()),
    }
}

// ---------------------------------------------------------------------------
// Positional classification (STEM AP CS Principles)
// ---------------------------------------------------------------------------

/// One category block in a positionally ordered export.
#[derive(Debug, Clone, Copy)]
pub struct Stage {
    pub category: Category,
    /// Text every header in this block must contain.
    pub requires: Option<&'static str>,
    /// Text that, when `requires` is missing, moves on to the next block.
    pub advance_on: Option<&'static str>,
    /// Whether labels in this block carry a unit number.
    pub numbered: bool,
    /// Whether a new leading project name starts a new unit.
    pub projects: bool,
}

/// Unit assignments for headers that carry no unit number.
#[derive(Debug, Clone, Copy)]
pub struct KeywordUnit {
    pub keyword: &'static str,
    pub unit: u32,
    /// The keyword marks the first column of the project block.
    pub opens_projects: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct PositionalRules {
    pub stages: &'static [Stage],
    pub keyword_units: &'static [KeywordUnit],
    pub max_unit: u32,
}

pub const CSP_RULES: PositionalRules = PositionalRules {
    stages: &[
        Stage {
            category: Category::Exercises,
            requires: None,
            advance_on: None,
            numbered: true,
            projects: false,
        },
        Stage {
            category: Category::Project,
            requires: None,
            advance_on: None,
            numbered: true,
            projects: true,
        },
        Stage {
            category: Category::Quizzes,
            requires: Some("Quiz"),
            advance_on: None,
            numbered: true,
            projects: false,
        },
        Stage {
            category: Category::Exam,
            requires: Some("Exam"),
            advance_on: Some("Create"),
            numbered: true,
            projects: false,
        },
        Stage {
            category: Category::Performance,
            requires: None,
            advance_on: None,
            numbered: false,
            projects: false,
        },
    ],
    keyword_units: &[
        KeywordUnit {
            keyword: "milestone",
            unit: 2,
            opens_projects: true,
        },
        KeywordUnit {
            keyword: "big picture",
            unit: 1,
            opens_projects: false,
        },
    ],
    max_unit: 6,
};

fn project_token(text: &str) -> String {
    text.split_whitespace()
        .next()
        .unwrap_or("")
        .split(':')
        .next()
        .unwrap_or("")
        .to_string()
}

/// Cursor over an export whose columns are sorted by category then unit but
/// carry no category text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionalState {
    pub category_index: usize,
    pub unit: u32,
    pub project_name: Option<String>,
}

impl PositionalState {
    /// Transition on the next header. A unit number lower than the previous
    /// one means the export has moved to the next category block.
    pub fn step(&self, rules: &PositionalRules, header: &str) -> (PositionalState, Classification) {
        let text = header.replace("Unit ", "");
        let text = text.trim();
        let text_upper = text.to_uppercase();
        let mut next = self.clone();
        let mut keyword_unit = None;

        if let Some(n) = leading_integer(text) {
            if n < next.unit {
                next.category_index += 1;
                if let Some(stage) = rules.stages.get(next.category_index) {
                    debug!("starting category {}", stage.category.name());
                }
            }
            if n != next.unit {
                trace!("starting unit {n}");
            }
            next.unit = n;
        } else if let Some(k) = rules
            .keyword_units
            .iter()
            .find(|k| text_upper.contains(&k.keyword.to_uppercase()))
        {
            let project_stage = rules.stages.iter().position(|s| s.projects);
            match project_stage {
                Some(p) if k.opens_projects && next.category_index < p => {
                    next.category_index = p;
                    next.unit = k.unit;
                    next.project_name = Some(project_token(text));
                    debug!("starting category {} at unit {}", rules.stages[p].category.name(), k.unit);
                }
                _ if !k.opens_projects => keyword_unit = Some(k.unit),
                _ => {}
            }
        }

        let Some(mut stage) = rules.stages.get(next.category_index).copied() else {
            return (
                next,
                Classification::Invalid("no category left after the last block".to_string()),
            );
        };

        if stage.projects && keyword_unit.is_none() {
            let token = project_token(text);
            if next.project_name.as_deref() != Some(token.as_str()) {
                next.unit += 1;
                debug!("starting unit {}: {token}", next.unit);
                next.project_name = Some(token);
            }
        }

        if let Some(required) = stage.requires {
            if !text.contains(required) {
                let advance = stage.advance_on.map_or(false, |a| text.contains(a));
                match rules.stages.get(next.category_index + 1) {
                    Some(following) if advance => {
                        next.category_index += 1;
                        stage = *following;
                        debug!("starting category {}", stage.category.name());
                    }
                    _ => {
                        return (
                            next,
                            Classification::Invalid(format!(
                                "expected \"{required}\" in a {} column",
                                stage.category.name()
                            )),
                        );
                    }
                }
            }
        }

        if next.unit > rules.max_unit {
            let unit = next.unit;
            return (
                next,
                Classification::Invalid(format!(
                    "unit {} is past the last unit ({})",
                    unit, rules.max_unit
                )),
            );
        }

        let label = if stage.numbered {
            ColumnLabel::new(keyword_unit.unwrap_or(next.unit).to_string(), stage.category)
        } else {
            ColumnLabel::unitless(stage.category)
        };
        debug!("{label}\t\tWas: {header}");
        (next, Classification::Label(label))
    }
}

// ---------------------------------------------------------------------------
// Lesson classification (Tech Smart Kids multi-row headers)
// ---------------------------------------------------------------------------

pub const TSK_UNIT_ROW: usize = 0;
pub const TSK_LESSON_ROW: usize = 1;
pub const TSK_TITLE_ROW: usize = 2;
pub const TSK_TYPE_ROW: usize = 3;
/// Unit, lesson, title, type, date. Only unit and lesson carry forward.
pub const TSK_CARRY: &[bool] = &[true, true, false, false, false];

/// Running unit and lesson for a TSK export. Lessons are named `<unit>.<n>`
/// (or `<unit>.T` for the unit test); a `Q` lesson marker appends `Q`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LessonState {
    pub unit: Option<String>,
    pub lesson: Option<String>,
}

fn parse_unit(text: &str) -> Option<String> {
    let rest = text.trim().strip_prefix("Unit")?;
    leading_integer(rest).map(|n| n.to_string())
}

fn parse_lesson_marker(text: &str) -> Option<String> {
    let text = text.trim();
    let text = text.strip_prefix("Lesson ").unwrap_or(text);
    let (marker, _) = text.split_once(':')?;
    Some(marker.trim().to_string())
}

impl LessonState {
    /// Fold one header column into the running state. Columns whose unit or
    /// lesson header can't be parsed leave the state unknown so the columns
    /// carried under them are dropped too.
    pub fn step(&self, column: &HeaderColumn) -> (LessonState, Classification) {
        let mut next = self.clone();

        if column.is_fresh(TSK_UNIT_ROW) {
            let text = column.text(TSK_UNIT_ROW).unwrap_or("");
            match parse_unit(text) {
                Some(unit) => {
                    trace!("starting unit {unit}");
                    next.unit = Some(unit);
                }
                None => {
                    return (
                        LessonState::default(),
                        Classification::Invalid(format!("can't parse unit number from {text:?}")),
                    );
                }
            }
        }

        if column.is_fresh(TSK_LESSON_ROW) {
            let text = column.text(TSK_LESSON_ROW).unwrap_or("");
            let Some(marker) = parse_lesson_marker(text) else {
                next.lesson = None;
                return (
                    next,
                    Classification::Invalid(format!("can't parse lesson from {text:?}")),
                );
            };
            if marker == "Q" {
                next.lesson = next.lesson.map(|l| format!("{l}Q"));
            } else if marker == "T" || (!marker.is_empty() && marker.chars().all(|c| c.is_ascii_digit())) {
                next.lesson = next.unit.as_ref().map(|u| format!("{u}.{marker}"));
            }
        }

        let Some(lesson) = next.lesson.clone() else {
            return (
                next,
                Classification::Invalid("no lesson number before this column".to_string()),
            );
        };

        let title = column.text(TSK_TITLE_ROW).unwrap_or("");
        let category = if column.text(TSK_TYPE_ROW) == Some("Assessment") {
            if title.starts_with("Practice Test") || title.ends_with("Lesson Check") {
                Category::Assignment
            } else if lesson.ends_with('T') {
                Category::Exam
            } else {
                Category::Quiz
            }
        } else {
            Category::Assignment
        };

        let label = ColumnLabel::new(lesson, category);
        debug!("{label}\t\tWas: {}", column.describe());
        (next, Classification::Label(label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{normalize, HeaderCell};
    use crate::models::RawTable;

    fn label(unit: &str, category: Category) -> Classification {
        Classification::Label(ColumnLabel::new(unit, category))
    }

    #[test]
    fn test_matches_case_folding() {
        assert!(Matcher::StartsWith("FRQ").matches("frq 1"));
        assert!(Matcher::Contains("quiz").matches("Unit 3 Quiz"));
        assert!(!Matcher::regex("^Quiz").matches("Unit 3 Quiz"));
    }

    #[test]
    fn test_csa_rule_patterns_compile() {
        let regexes = CSA_RULES
            .iter()
            .filter(|r| matches!(r.matcher, Matcher::Regex(_)))
            .count();
        assert_eq!(regexes, 3);
    }

    #[test]
    fn test_csa_categories() {
        assert_eq!(
            classify_stateless("Unit 3 Exam (4411)", &CSA_RULES),
            label("3", Category::Exam)
        );
        assert_eq!(
            classify_stateless("Unit 2: Lesson 4 - Loops (1234)", &CSA_RULES),
            label("2", Category::Exercises)
        );
        assert_eq!(
            classify_stateless("Unit 5 Quiz (99)", &CSA_RULES),
            label("5", Category::QuizAndAssignment)
        );
        assert_eq!(
            classify_stateless("Assignment 7 (8812)", &CSA_RULES),
            label("7", Category::QuizAndAssignment)
        );
    }

    #[test]
    fn test_csa_free_response_dropped_silently() {
        assert_eq!(classify_stateless("FRQ 2 Practice (55)", &CSA_RULES), Classification::Drop);
    }

    #[test]
    fn test_csa_unparseable_headers_are_invalid() {
        assert!(matches!(
            classify_stateless("Participation", &CSA_RULES),
            Classification::Invalid(reason) if reason.contains("unit number")
        ));
        assert!(matches!(
            classify_stateless("Unit 4 Reflection (12)", &CSA_RULES),
            Classification::Invalid(reason) if reason.contains("category")
        ));
    }

    fn run_positional(headers: &[&str]) -> Vec<Classification> {
        let mut state = PositionalState::default();
        headers
            .iter()
            .map(|h| {
                let (next, c) = state.step(&CSP_RULES, h);
                state = next;
                c
            })
            .collect()
    }

    #[test]
    fn test_csp_full_sequence() {
        let result = run_positional(&[
            "Unit 1 Lesson 1",
            "Unit 1 Lesson 2",
            "Unit 2 Lesson 1",
            "Pixel Milestone 1",
            "Pixel: Final",
            "Sound Milestone 1",
            "Unit 1 Quiz",
            "Unit 3 Quiz",
            "Unit 1 Exam",
            "Unit 2 Exam",
            "Create Task",
        ]);
        assert_eq!(
            result,
            vec![
                label("1", Category::Exercises),
                label("1", Category::Exercises),
                label("2", Category::Exercises),
                label("2", Category::Project),
                label("2", Category::Project),
                label("3", Category::Project),
                label("1", Category::Quizzes),
                label("3", Category::Quizzes),
                label("1", Category::Exam),
                label("2", Category::Exam),
                Classification::Label(ColumnLabel::unitless(Category::Performance)),
            ]
        );
    }

    #[test]
    fn test_csp_step_is_pure() {
        let state = PositionalState {
            category_index: 0,
            unit: 4,
            project_name: None,
        };
        let (next, c) = state.step(&CSP_RULES, "Unit 2 Quiz");
        assert_eq!(state.unit, 4);
        assert_eq!(next.category_index, 1);
        assert_eq!(next.unit, 3);
        assert_eq!(c, label("3", Category::Project));
    }

    #[test]
    fn test_csp_quiz_block_rejects_non_quiz() {
        let state = PositionalState {
            category_index: 2,
            unit: 1,
            project_name: None,
        };
        let (next, c) = state.step(&CSP_RULES, "Unit 2 Reflection");
        assert_eq!(next.unit, 2);
        assert!(matches!(c, Classification::Invalid(reason) if reason.contains("Quiz")));
    }

    #[test]
    fn test_csp_exam_block_needs_create_to_advance() {
        let state = PositionalState {
            category_index: 3,
            unit: 5,
            project_name: None,
        };
        let (_, c) = state.step(&CSP_RULES, "Explore Task");
        assert!(matches!(c, Classification::Invalid(_)));
    }

    #[test]
    fn test_csp_unit_past_last_is_invalid() {
        let (_, c) = PositionalState::default().step(&CSP_RULES, "Unit 7 Lesson 1");
        assert!(matches!(c, Classification::Invalid(reason) if reason.contains("past the last unit")));
    }

    #[test]
    fn test_csp_keyword_unit_does_not_move_cursor() {
        let state = PositionalState {
            category_index: 0,
            unit: 3,
            project_name: None,
        };
        let (next, c) = state.step(&CSP_RULES, "Big Picture: The Internet");
        assert_eq!(next.unit, 3);
        assert_eq!(c, label("1", Category::Exercises));
    }

    #[test]
    fn test_csp_big_picture_inside_project_block() {
        let result = run_positional(&[
            "Pixel Milestone 1",
            "Pixel: Final",
            "Big Picture: Data",
            "Pixel: Reflection",
            "Sound Milestone 1",
        ]);
        assert_eq!(
            result,
            vec![
                label("2", Category::Project),
                label("2", Category::Project),
                label("1", Category::Project),
                label("2", Category::Project),
                label("3", Category::Project),
            ]
        );
    }

    #[test]
    fn test_csp_falls_off_the_end() {
        let state = PositionalState {
            category_index: 4,
            unit: 6,
            project_name: None,
        };
        let (_, c) = state.step(&CSP_RULES, "Unit 1 Extra");
        assert!(matches!(c, Classification::Invalid(_)));
    }

    fn tsk_headers() -> Vec<HeaderColumn> {
        let raw = RawTable::from_strings(&[
            &["Last", "First", "ID", "Unit 1: Intro", "", "", "", "", "", "Unit 2: Loops"],
            &["", "", "", "Lesson 1: Hi", "Lesson P: Practice", "Lesson Q: Quiz", "Lesson T: Test", "", "", "Lesson 1: For"],
            &["", "", "", "Hello", "Extra", "Quiz 1", "Unit Test", "Practice Test A", "Loops Lesson Check", "Count"],
            &["", "", "", "Coding", "Coding", "Assessment", "Assessment", "Assessment", "Assessment", "Coding"],
            &["", "", "", "9/1", "9/2", "9/3", "9/4", "9/5", "9/6", "9/7"],
        ]);
        normalize(&raw, TSK_CARRY, 3).headers
    }

    fn run_lessons(headers: &[HeaderColumn]) -> Vec<Classification> {
        let mut state = LessonState::default();
        headers
            .iter()
            .map(|h| {
                let (next, c) = state.step(h);
                state = next;
                c
            })
            .collect()
    }

    #[test]
    fn test_tsk_lessons() {
        let result = run_lessons(&tsk_headers());
        assert_eq!(
            result,
            vec![
                label("1.1", Category::Assignment),
                label("1.1", Category::Assignment),
                label("1.1Q", Category::Quiz),
                label("1.T", Category::Exam),
                label("1.T", Category::Assignment),
                label("1.T", Category::Assignment),
                label("2.1", Category::Assignment),
            ]
        );
    }

    #[test]
    fn test_tsk_bad_unit_drops_carried_columns() {
        let bad = HeaderColumn {
            index: 3,
            cells: vec![
                HeaderCell { text: Some("Bonus".to_string()), fresh: true },
                HeaderCell { text: Some("Lesson 1: X".to_string()), fresh: true },
            ],
        };
        let carried = HeaderColumn {
            index: 4,
            cells: vec![
                HeaderCell { text: Some("Bonus".to_string()), fresh: false },
                HeaderCell { text: Some("Lesson 1: X".to_string()), fresh: false },
            ],
        };
        let state = LessonState {
            unit: Some("1".to_string()),
            lesson: Some("1.2".to_string()),
        };
        let (next, c) = state.step(&bad);
        assert!(matches!(c, Classification::Invalid(reason) if reason.contains("unit")));
        let (_, c) = next.step(&carried);
        assert!(matches!(c, Classification::Invalid(reason) if reason.contains("no lesson")));
    }

    #[test]
    fn test_tsk_lesson_without_colon_is_invalid() {
        let column = HeaderColumn {
            index: 3,
            cells: vec![
                HeaderCell { text: Some("Unit 1: Intro".to_string()), fresh: true },
                HeaderCell { text: Some("Lesson 1 Hello".to_string()), fresh: true },
            ],
        };
        let (_, c) = LessonState::default().step(&column);
        assert!(matches!(c, Classification::Invalid(reason) if reason.contains("lesson")));
    }
}
