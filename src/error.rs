use thiserror::Error;

#[derive(Error, Debug)]
pub enum GradeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Failed to read XLSX: {0}")]
    Xlsx(String),

    #[error("Unsupported input file: {0}")]
    UnsupportedFile(String),

    #[error("Unknown platform: {0}")]
    UnknownPlatform(String),

    #[error("{file}: invalid format - no column named {column}")]
    RosterColumn { file: String, column: String },

    #[error("Can't score column {column}: {value:?} is not a number")]
    CellValue { column: String, value: String },

    #[error("Roster maps students for this class into multiple courses: {first} and {second}")]
    MultipleCourses { first: String, second: String },

    #[error("Can't parse assignment type for {0}")]
    AssignmentType(String),

    #[error("Can't parse points for {assignment} for {student}")]
    ScoreValue { assignment: String, student: String },

    #[error("Can't parse max points for {0}")]
    MaxPoints(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, GradeError>;
