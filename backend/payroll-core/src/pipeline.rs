// src/pipeline.rs
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{OvertimePolicy, PayrollConfig};
use crate::csv_io::LoadedRows;
use crate::error::RowParseError;
use crate::error_classifier::classify_all;
use crate::models::{ErrorRecord, Hours, MergedRecord, RawPunchRow, RawRosterRow, UnrosteredEmployee};
use crate::overtime::OvertimeAllocator;
use crate::report::{aggregate_daily, aggregate_weekly, DailyAggregate, WeeklyAggregate};
use crate::roster_merge::{find_unrostered, merge, parse_roster_rows};
use crate::time_normalizer::{apply_manual_adjustment, normalize_rows};

/// Everything one run produces.
#[derive(Debug, Clone, Default)]
pub struct PayrollOutcome {
    pub payroll: Vec<MergedRecord>,
    pub errors: Vec<ErrorRecord>,
    pub parse_failures: Vec<RowParseError>,
    pub daily: Vec<DailyAggregate>,
    pub weekly: Vec<WeeklyAggregate>,
    pub unrostered: Vec<UnrosteredEmployee>,
}

/// Counts and totals written next to the reports.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub payroll_records: usize,
    pub error_records: usize,
    pub parse_failures: usize,
    pub unrostered: usize,
    pub unapproved_overtime_records: usize,
    #[serde(with = "rust_decimal::serde::str")]
    pub regular_hours: Hours,
    #[serde(with = "rust_decimal::serde::str")]
    pub overtime_hours: Hours,
    #[serde(with = "rust_decimal::serde::str")]
    pub held_hours: Hours,
    #[serde(with = "rust_decimal::serde::str")]
    pub bonus_hours: Hours,
}

impl PayrollOutcome {
    pub fn summary(&self) -> RunSummary {
        RunSummary {
            payroll_records: self.payroll.len(),
            error_records: self.errors.len(),
            parse_failures: self.parse_failures.len(),
            unrostered: self.unrostered.len(),
            unapproved_overtime_records: self.payroll.iter().filter(|r| r.unapproved_overtime).count(),
            regular_hours: self.payroll.iter().map(|r| r.split.regular).sum(),
            overtime_hours: self.payroll.iter().map(|r| r.split.overtime).sum(),
            held_hours: self.payroll.iter().map(|r| r.split.held).sum(),
            bonus_hours: self.payroll.iter().map(|r| r.bonus_hours).sum(),
        }
    }
}

pub struct PayrollRun {
    config: PayrollConfig,
}

impl PayrollRun {
    pub fn new(config: PayrollConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PayrollConfig {
        &self.config
    }

    /// Runs the whole batch. Bad rows end up in the outcome's failure and
    /// error lists; nothing here aborts on data.
    pub fn execute(&self, punch_rows: &[RawPunchRow], roster_rows: &[RawRosterRow]) -> PayrollOutcome {
        let config = &self.config;
        info!(
            "Starting payroll run: {} punch rows, {} roster rows, {} policy",
            punch_rows.len(),
            roster_rows.len(),
            match config.overtime_policy {
                OvertimePolicy::Daily => "daily",
                OvertimePolicy::WeeklyRolling => "weekly-rolling",
            }
        );

        let (entries, mut parse_failures) = normalize_rows(punch_rows, config);
        let (roster, roster_failures) = parse_roster_rows(roster_rows);
        parse_failures.extend(roster_failures);
        if !parse_failures.is_empty() {
            warn!("{} input rows could not be parsed", parse_failures.len());
        }

        let unrostered = find_unrostered(&entries, &roster);
        let merged = merge(entries, &roster, config);
        let allocated = OvertimeAllocator::new(config).allocate(merged);
        let payroll: Vec<MergedRecord> = allocated
            .into_iter()
            .map(|record| apply_manual_adjustment(record, config))
            .collect();

        let errors = classify_all(&payroll, config);
        let daily = aggregate_daily(&payroll);
        let weekly = aggregate_weekly(&payroll);

        PayrollOutcome {
            payroll,
            errors,
            parse_failures,
            daily,
            weekly,
            unrostered,
        }
    }

    /// Runs the batch over loader output. Records the loader could not
    /// decode join the row failures, ordered by input then row.
    pub fn execute_loaded(
        &self,
        punches: &LoadedRows<RawPunchRow>,
        roster: &LoadedRows<RawRosterRow>,
    ) -> PayrollOutcome {
        let mut outcome = self.execute(&punches.rows, &roster.rows);
        outcome
            .parse_failures
            .extend(punches.failures.iter().chain(&roster.failures).cloned());
        outcome.parse_failures.sort_by_key(|failure| (failure.source_file, failure.row));
        outcome
    }
}
