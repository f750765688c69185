// src/lib.rs
//! Payroll hours from time-clock punches and roster data: normalization,
//! roster merge, regular/overtime allocation, error classification and
//! report assembly.

pub mod config;
pub mod csv_io;
pub mod error;
pub mod error_classifier;
pub mod models;
pub mod overtime;
pub mod pipeline;
pub mod report;
pub mod roster_merge;
pub mod time_normalizer;

#[cfg(test)]
mod overtime_tests;
#[cfg(test)]
mod test_support;

pub use config::PayrollConfig;
pub use error::{PayrollError, RowParseError};
pub use pipeline::{PayrollOutcome, PayrollRun, RunSummary};
