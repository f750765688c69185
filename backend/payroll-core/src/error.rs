// src/error.rs
use std::fmt;
use thiserror::Error;

// --- Run-level errors ---

/// Errors that abort a whole payroll run. Bad data never ends up here;
/// it is routed to the error or parse-failure reports instead.
#[derive(Error, Debug)]
pub enum PayrollError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Configuration could not be read from the environment: {0}")]
    Config(#[from] envy::Error),
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidConfig { field: &'static str, reason: String },
    #[error("Missing required column '{column}' in {source_file} input")]
    MissingColumn {
        column: &'static str,
        source_file: InputSource,
    },
}

// --- Row-level errors ---

/// Which input a rejected row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InputSource {
    Punches,
    Roster,
    Summary,
}

impl fmt::Display for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            InputSource::Punches => "punches",
            InputSource::Roster => "roster",
            InputSource::Summary => "summary",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowParseReason {
    #[error("required value is empty")]
    Empty,
    #[error("not a recognised date")]
    InvalidDate,
    #[error("not a recognised date-time")]
    InvalidTimestamp,
    #[error("not a number")]
    InvalidNumber,
    #[error("row could not be decoded")]
    Unreadable,
}

/// A single malformed input row. Collected into the parse-failure report
/// while the rest of the batch keeps going.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{source_file} row {row}: field '{field}' value '{value}' rejected: {reason}")]
pub struct RowParseError {
    pub source_file: InputSource,
    /// 1-based data row number (header excluded).
    pub row: usize,
    pub employee_name: Option<String>,
    pub field: &'static str,
    pub value: String,
    pub reason: RowParseReason,
}

impl RowParseError {
    pub fn new(
        source_file: InputSource,
        row: usize,
        field: &'static str,
        value: &str,
        reason: RowParseReason,
    ) -> Self {
        Self {
            source_file,
            row,
            employee_name: None,
            field,
            value: value.to_string(),
            reason,
        }
    }

    pub fn for_employee(mut self, employee_name: &str) -> Self {
        if !employee_name.trim().is_empty() {
            self.employee_name = Some(employee_name.trim().to_string());
        }
        self
    }
}
