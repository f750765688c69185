// src/roster_merge.rs
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::config::{PayrollConfig, RosterJoin};
use crate::error::{InputSource, RowParseError, RowParseReason};
use crate::models::{
    DateWindow, EmployeeName, JobKey, MergedRecord, RawRosterRow, RosterInfo, TimeEntry,
    UnrosteredEmployee,
};
use crate::time_normalizer::{non_blank, parse_date};

// --- Roster parsing ---

fn parse_optional_date(
    row: usize,
    employee_name: &str,
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<NaiveDate>, RowParseError> {
    match non_blank(value) {
        None => Ok(None),
        Some(text) => parse_date(text).map(Some).ok_or_else(|| {
            RowParseError::new(InputSource::Roster, row, field, text, RowParseReason::InvalidDate)
                .for_employee(employee_name)
        }),
    }
}

fn text(value: Option<&str>) -> Option<String> {
    non_blank(value).map(String::from)
}

impl RosterInfo {
    /// Parses one roster row. Dates are the only typed fields; a malformed
    /// date rejects the row.
    pub fn parse(row: usize, raw: &RawRosterRow) -> Result<RosterInfo, RowParseError> {
        let employee_name = raw.employee_name.trim();
        if non_blank(Some(employee_name)).is_none() {
            return Err(RowParseError::new(
                InputSource::Roster,
                row,
                "Employee Name",
                &raw.employee_name,
                RowParseReason::Empty,
            ));
        }
        let date = |field: &'static str, value: &Option<String>| {
            parse_optional_date(row, employee_name, field, value.as_deref())
        };

        Ok(RosterInfo {
            employee_name: employee_name.to_string(),
            employee_id: text(raw.employee_id.as_deref()),
            ticket_date: date("Ticket Date", &raw.ticket_date)?,
            job_key: non_blank(raw.job_key.as_deref()).unwrap_or_default().to_string(),
            agency: text(raw.agency.as_deref()),
            clock_in_id: text(raw.clock_in_id.as_deref()),
            supervisor: text(raw.supervisor.as_deref()),
            pm_assigned: text(raw.pm_assigned.as_deref()),
            email: text(raw.email.as_deref()),
            wtl_approved: text(raw.wtl_approved.as_deref()),
            wtl_window: DateWindow::new(
                date("WTL Start Date", &raw.wtl_start)?,
                date("WTL End Date", &raw.wtl_end)?,
            ),
            approved_overtime: text(raw.approved_overtime.as_deref()),
            approved_ot_window: DateWindow::new(
                date("ApprovedOvertime Start Date", &raw.approved_ot_start)?,
                date("ApprovedOvertime End Date", &raw.approved_ot_end)?,
            ),
        })
    }
}

pub fn parse_roster_rows(rows: &[RawRosterRow]) -> (Vec<RosterInfo>, Vec<RowParseError>) {
    let mut roster = Vec::with_capacity(rows.len());
    let mut failures = Vec::new();
    for (index, raw) in rows.iter().enumerate() {
        match RosterInfo::parse(raw.source_row.unwrap_or(index + 1), raw) {
            Ok(info) => roster.push(info),
            Err(e) => {
                debug!("Rejected roster row: {}", e);
                failures.push(e);
            }
        }
    }
    info!(
        "Parsed {} roster rows ({} rejected)",
        roster.len(),
        failures.len()
    );
    (roster, failures)
}

// --- Join ---

type JoinKey = (EmployeeName, NaiveDate, Option<JobKey>);

/// Roster rows indexed by join key. The first row for a key wins, which is
/// what a left join followed by keep-first deduplication produces.
pub struct RosterIndex {
    join: RosterJoin,
    rows: HashMap<JoinKey, RosterInfo>,
}

impl RosterIndex {
    pub fn build(roster: &[RosterInfo], join: RosterJoin) -> Self {
        let mut rows = HashMap::new();
        for info in roster {
            // Without a ticket date a roster row can never satisfy the join.
            let Some(date) = info.ticket_date else {
                continue;
            };
            let key = Self::key(join, &info.employee_name, date, &info.job_key);
            rows.entry(key).or_insert_with(|| info.clone());
        }
        Self { join, rows }
    }

    fn key(join: RosterJoin, name: &str, date: NaiveDate, job: &str) -> JoinKey {
        let job = match join {
            RosterJoin::EmployeeDateJob => Some(job.to_string()),
            RosterJoin::EmployeeDate => None,
        };
        (name.to_string(), date, job)
    }

    pub fn lookup(&self, entry: &TimeEntry) -> Option<&RosterInfo> {
        let key = Self::key(self.join, &entry.employee_name, entry.ticket_date, &entry.job_key);
        self.rows.get(&key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

fn fill(value: Option<&String>, default: &str) -> String {
    value.cloned().unwrap_or_else(|| default.to_string())
}

/// Left-joins entries with the roster.
///
/// Duplicate (employee, date, job) entries are dropped keeping the first
/// occurrence. Unmatched entries are kept with no roster row and the
/// default agency. Output is in stable (employee, ticket date) order, with
/// encounter order preserved inside each employee/date.
pub fn merge(entries: Vec<TimeEntry>, roster: &[RosterInfo], config: &PayrollConfig) -> Vec<MergedRecord> {
    let index = RosterIndex::build(roster, config.roster_join);
    let mut seen: HashSet<(EmployeeName, NaiveDate, JobKey)> = HashSet::new();
    let mut merged = Vec::with_capacity(entries.len());
    let mut duplicates = 0usize;
    let mut misses = 0usize;

    for entry in entries {
        let dedup_key = (entry.employee_name.clone(), entry.ticket_date, entry.job_key.clone());
        if !seen.insert(dedup_key) {
            duplicates += 1;
            debug!(
                "Dropping duplicate entry for {} on {} (job '{}', row {})",
                entry.employee_name, entry.ticket_date, entry.job_key, entry.row
            );
            continue;
        }

        let roster_row = index.lookup(&entry).cloned();
        if roster_row.is_none() {
            misses += 1;
            debug!(
                "No roster match for {} on {} (job '{}')",
                entry.employee_name, entry.ticket_date, entry.job_key
            );
        }
        let agency = fill(
            roster_row.as_ref().and_then(|r| r.agency.as_ref()),
            &config.default_agency,
        );
        let supervisor = fill(
            roster_row.as_ref().and_then(|r| r.supervisor.as_ref()),
            &config.unassigned_label,
        );
        let pm_assigned = fill(
            roster_row.as_ref().and_then(|r| r.pm_assigned.as_ref()),
            &config.unassigned_label,
        );
        merged.push(MergedRecord::new(entry, roster_row, agency, supervisor, pm_assigned));
    }

    merged.sort_by(|a, b| {
        (a.entry.employee_name.as_str(), a.entry.ticket_date)
            .cmp(&(b.entry.employee_name.as_str(), b.entry.ticket_date))
    });

    if misses > 0 {
        warn!("{} of {} entries had no roster match", misses, merged.len());
    }
    info!(
        "Merged {} entries with {} roster keys ({} duplicates dropped)",
        merged.len(),
        index.len(),
        duplicates
    );
    merged
}

// --- Reconciliation ---

/// Lists (employee, date) pairs whose employee never appears in the roster.
pub fn find_unrostered(entries: &[TimeEntry], roster: &[RosterInfo]) -> Vec<UnrosteredEmployee> {
    let known: HashSet<&str> = roster.iter().map(|r| r.employee_name.as_str()).collect();
    let mut reported = HashSet::new();
    let mut missing = Vec::new();

    for entry in entries {
        if known.contains(entry.employee_name.as_str()) {
            continue;
        }
        let item = UnrosteredEmployee {
            employee_name: entry.employee_name.clone(),
            ticket_date: entry.ticket_date,
        };
        if reported.insert(item.clone()) {
            missing.push(item);
        }
    }

    if !missing.is_empty() {
        warn!("{} employee/date pairs are not on the roster", missing.len());
    }
    missing
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(date_str: &str) -> NaiveDate {
        NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
    }

    fn entry(row: usize, name: &str, date: &str, job: &str) -> TimeEntry {
        TimeEntry {
            row,
            employee_name: name.to_string(),
            employee_id: None,
            ticket_date: d(date),
            job_key: job.to_string(),
            clock_in: None,
            clock_out: None,
            hours_worked: None,
            raw_hours: Some(dec!(8.5)),
            adjusted_hours: Some(dec!(8)),
            lunch_deducted: true,
        }
    }

    fn roster_row(name: &str, date: &str, job: &str, agency: Option<&str>) -> RosterInfo {
        RosterInfo {
            employee_name: name.to_string(),
            ticket_date: Some(d(date)),
            job_key: job.to_string(),
            agency: agency.map(String::from),
            supervisor: Some("Pat Lead".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_merge_joins_on_employee_date_and_job() {
        let config = PayrollConfig::default();
        let roster = vec![
            roster_row("Doe, Jane", "2024-03-04", "J100", Some("Talent Corp")),
            roster_row("Doe, Jane", "2024-03-04", "J200", Some("ECO Staffing")),
        ];
        let merged = merge(vec![entry(1, "Doe, Jane", "2024-03-04", "J200")], &roster, &config);

        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].agency, "ECO Staffing");
        assert_eq!(merged[0].supervisor, "Pat Lead");
        assert!(merged[0].roster_matched());
    }

    #[test]
    fn test_merge_on_employee_date_ignores_job() {
        let config = PayrollConfig {
            roster_join: RosterJoin::EmployeeDate,
            ..PayrollConfig::default()
        };
        let roster = vec![roster_row("Doe, Jane", "2024-03-04", "J100", Some("Talent Corp"))];
        let merged = merge(vec![entry(1, "Doe, Jane", "2024-03-04", "J999")], &roster, &config);

        assert_eq!(merged[0].agency, "Talent Corp");
    }

    #[test]
    fn test_join_miss_keeps_record_with_defaults() {
        let config = PayrollConfig::default();
        let merged = merge(vec![entry(1, "Roe, Sam", "2024-03-04", "J100")], &[], &config);

        assert_eq!(merged.len(), 1, "Unmatched entries must not be dropped");
        assert!(merged[0].roster.is_none());
        assert_eq!(merged[0].agency, "CSI");
        assert_eq!(merged[0].supervisor, "NEEDS TO BE ASSIGNED");
        assert_eq!(merged[0].pm_assigned, "NEEDS TO BE ASSIGNED");
    }

    #[test]
    fn test_matched_row_without_agency_gets_default() {
        let config = PayrollConfig::default();
        let roster = vec![roster_row("Doe, Jane", "2024-03-04", "J100", None)];
        let merged = merge(vec![entry(1, "Doe, Jane", "2024-03-04", "J100")], &roster, &config);

        assert!(merged[0].roster_matched());
        assert_eq!(merged[0].agency, "CSI");
    }

    #[test]
    fn test_duplicate_keys_keep_first_occurrence() {
        let config = PayrollConfig::default();
        let entries = vec![
            entry(1, "Doe, Jane", "2024-03-04", "J100"),
            entry(2, "Doe, Jane", "2024-03-04", "J100"),
            entry(3, "Doe, Jane", "2024-03-04", "J200"),
        ];
        let merged = merge(entries, &[], &config);

        let rows: Vec<usize> = merged.iter().map(|r| r.entry.row).collect();
        assert_eq!(rows, vec![1, 3]);
    }

    #[test]
    fn test_first_roster_row_wins_for_duplicate_roster_keys() {
        let config = PayrollConfig::default();
        let roster = vec![
            roster_row("Doe, Jane", "2024-03-04", "J100", Some("First Agency")),
            roster_row("Doe, Jane", "2024-03-04", "J100", Some("Second Agency")),
        ];
        let merged = merge(vec![entry(1, "Doe, Jane", "2024-03-04", "J100")], &roster, &config);

        assert_eq!(merged[0].agency, "First Agency");
    }

    #[test]
    fn test_output_is_ordered_by_employee_then_date_stably() {
        let config = PayrollConfig::default();
        let entries = vec![
            entry(1, "Zed, Amy", "2024-03-04", "J1"),
            entry(2, "Doe, Jane", "2024-03-05", "J1"),
            entry(3, "Doe, Jane", "2024-03-04", "J2"),
            entry(4, "Doe, Jane", "2024-03-04", "J1"),
        ];
        let merged = merge(entries, &[], &config);

        let rows: Vec<usize> = merged.iter().map(|r| r.entry.row).collect();
        assert_eq!(rows, vec![3, 4, 2, 1]);
    }

    #[test]
    fn test_roster_parse_rejects_bad_window_date() {
        let raw = RawRosterRow {
            employee_name: "Doe, Jane".to_string(),
            ticket_date: Some("03/04/2024".to_string()),
            wtl_start: Some("not a date".to_string()),
            ..Default::default()
        };
        let err = RosterInfo::parse(7, &raw).expect_err("bad date should reject the row");

        assert_eq!(err.row, 7);
        assert_eq!(err.field, "WTL Start Date");
        assert_eq!(err.reason, RowParseReason::InvalidDate);
        assert_eq!(err.employee_name.as_deref(), Some("Doe, Jane"));
    }

    #[test]
    fn test_roster_parse_reads_windows() {
        let raw = RawRosterRow {
            employee_name: " Doe, Jane ".to_string(),
            ticket_date: Some("2024-03-04".to_string()),
            job_key: Some("J100".to_string()),
            approved_ot_start: Some("03/01/2024".to_string()),
            approved_ot_end: Some("03/08/2024".to_string()),
            wtl_start: Some("NaT".to_string()),
            ..Default::default()
        };
        let info = RosterInfo::parse(1, &raw).expect("row should parse");

        assert_eq!(info.employee_name, "Doe, Jane");
        assert!(info.approved_ot_window.is_complete());
        assert!(!info.wtl_window.is_complete());
        assert_eq!(info.wtl_window.start, None);
    }

    #[test]
    fn test_find_unrostered_reports_each_pair_once() {
        let roster = vec![roster_row("Doe, Jane", "2024-03-04", "J100", None)];
        let entries = vec![
            entry(1, "Doe, Jane", "2024-03-04", "J100"),
            entry(2, "Roe, Sam", "2024-03-04", "J100"),
            entry(3, "Roe, Sam", "2024-03-04", "J200"),
            entry(4, "Roe, Sam", "2024-03-05", "J100"),
        ];
        let missing = find_unrostered(&entries, &roster);

        assert_eq!(
            missing,
            vec![
                UnrosteredEmployee {
                    employee_name: "Roe, Sam".to_string(),
                    ticket_date: d("2024-03-04"),
                },
                UnrosteredEmployee {
                    employee_name: "Roe, Sam".to_string(),
                    ticket_date: d("2024-03-05"),
                },
            ]
        );
    }
}
