// src/error_classifier.rs
use tracing::info;

use crate::config::PayrollConfig;
use crate::models::{ErrorRecord, Hours, MergedRecord};

/// Why a record belongs on the Errors report, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorReason {
    NoClockInOrOut,
    NoClockIn,
    NoClockOut,
    BelowMinimum { minimum: Hours },
    /// Reported without a description; the flag itself is the signal.
    UnapprovedOvertime,
}

impl ErrorReason {
    pub fn description(&self) -> Option<String> {
        match self {
            ErrorReason::NoClockInOrOut => Some("No Clock In or Clock Out Time".to_string()),
            ErrorReason::NoClockIn => Some("No Clock In".to_string()),
            ErrorReason::NoClockOut => Some("No Clock Out".to_string()),
            ErrorReason::BelowMinimum { minimum } => {
                Some(format!("Less Than {} Hours", minimum.normalize()))
            }
            ErrorReason::UnapprovedOvertime => None,
        }
    }
}

/// Picks the first matching reason, or `None` for a clean record.
pub fn classify(record: &MergedRecord, config: &PayrollConfig) -> Option<ErrorReason> {
    let entry = &record.entry;
    match (entry.clock_in.is_none(), entry.clock_out.is_none()) {
        (true, true) => return Some(ErrorReason::NoClockInOrOut),
        (true, false) => return Some(ErrorReason::NoClockIn),
        (false, true) => return Some(ErrorReason::NoClockOut),
        (false, false) => {}
    }

    if let Some(hours) = record.adjusted_hours() {
        if hours < config.minimum_daily_hours {
            return Some(ErrorReason::BelowMinimum {
                minimum: config.minimum_daily_hours,
            });
        }
    }

    if record.unapproved_overtime {
        return Some(ErrorReason::UnapprovedOvertime);
    }
    None
}

/// Collects the records that fail validation, in input order.
pub fn classify_all(records: &[MergedRecord], config: &PayrollConfig) -> Vec<ErrorRecord> {
    let errors: Vec<ErrorRecord> = records
        .iter()
        .filter_map(|record| {
            classify(record, config).map(|reason| ErrorRecord {
                record: record.clone(),
                reason,
            })
        })
        .collect();

    info!(
        "Classified {} records: {} routed to the Errors report",
        records.len(),
        errors.len()
    );
    errors
}
