// src/report.rs
//! Output shaping: fixed column layouts and the daily / weekly summaries.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use std::collections::{BTreeMap, HashMap};
use tracing::info;

use crate::error::{InputSource, RowParseError, RowParseReason};
use crate::models::{day_name, EmployeeName, ErrorRecord, Hours, JobKey, MergedRecord};
use crate::time_normalizer::{non_blank, parse_date, parse_hours, parse_timestamp};

pub const DATE_FORMAT: &str = "%m/%d/%Y";
pub const TIMESTAMP_FORMAT: &str = "%m/%d/%Y %H:%M";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn format_hours(hours: Hours) -> String {
    format!("{:.2}", hours)
}

fn flag(value: bool) -> String {
    if value { "Y".to_string() } else { String::new() }
}

// --- Columns ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportColumn {
    TicketDate,
    EmployeeName,
    ClockIn,
    ClockOut,
    HoursWorked,
    LunchAdjusted,
    RegularTime,
    Overtime,
    HeldOvertime,
    DayOfWeek,
    EmployeeId,
    Agency,
    ClockInId,
    SupervisorsName,
    PmAssigned,
    JobKey,
    Email,
    WtlApproved,
    WtlStartDate,
    WtlEndDate,
    ApprovedOvertime,
    ApprovedOvertimeStartDate,
    ApprovedOvertimeEndDate,
    RemainingBalance,
    UnapprovedOvertime,
    ErrorDescription,
    // Summary layouts
    Day,
    RegularHours,
    OvertimeHours,
    HeldHours,
    EntryCount,
    WeekStart,
    IsoWeek,
}

impl ReportColumn {
    pub fn header(self) -> &'static str {
        match self {
            ReportColumn::TicketDate => "Ticket Date",
            ReportColumn::EmployeeName => "Employee Name",
            ReportColumn::ClockIn => "Clock In",
            ReportColumn::ClockOut => "Clock Out",
            ReportColumn::HoursWorked => "Hours Worked",
            ReportColumn::LunchAdjusted => "Lunch Adjusted",
            ReportColumn::RegularTime => "Regular Time",
            ReportColumn::Overtime => "Overtime",
            ReportColumn::HeldOvertime => "Held Overtime",
            ReportColumn::DayOfWeek => "Day of the Week",
            ReportColumn::EmployeeId => "Employee ID",
            ReportColumn::Agency => "Agency",
            ReportColumn::ClockInId => "Clock-In ID",
            ReportColumn::SupervisorsName => "Supervisors Name",
            ReportColumn::PmAssigned => "PM Assigned",
            ReportColumn::JobKey => "JobNo|Customer|Description",
            ReportColumn::Email => "Email",
            ReportColumn::WtlApproved => "WTL Approved",
            ReportColumn::WtlStartDate => "WTL Start Date",
            ReportColumn::WtlEndDate => "WTL End Date",
            ReportColumn::ApprovedOvertime => "ApprovedOvertime",
            ReportColumn::ApprovedOvertimeStartDate => "ApprovedOvertime Start Date",
            ReportColumn::ApprovedOvertimeEndDate => "ApprovedOvertime End Date",
            ReportColumn::RemainingBalance => "Remaining Balance",
            ReportColumn::UnapprovedOvertime => "Unapproved Overtime",
            ReportColumn::ErrorDescription => "Error Description",
            ReportColumn::Day => "Day",
            ReportColumn::RegularHours => "Regular Hours",
            ReportColumn::OvertimeHours => "Overtime Hours",
            ReportColumn::HeldHours => "Held Hours",
            ReportColumn::EntryCount => "Entries",
            ReportColumn::WeekStart => "Week Start",
            ReportColumn::IsoWeek => "ISO Week",
        }
    }
}

/// Payroll sheet layout.
pub const PAYROLL_COLUMNS: [ReportColumn; 25] = [
    ReportColumn::TicketDate,
    ReportColumn::EmployeeName,
    ReportColumn::ClockIn,
    ReportColumn::ClockOut,
    ReportColumn::HoursWorked,
    ReportColumn::LunchAdjusted,
    ReportColumn::RegularTime,
    ReportColumn::Overtime,
    ReportColumn::DayOfWeek,
    ReportColumn::EmployeeId,
    ReportColumn::Agency,
    ReportColumn::ClockInId,
    ReportColumn::SupervisorsName,
    ReportColumn::PmAssigned,
    ReportColumn::JobKey,
    ReportColumn::Email,
    ReportColumn::WtlApproved,
    ReportColumn::WtlStartDate,
    ReportColumn::WtlEndDate,
    ReportColumn::ApprovedOvertime,
    ReportColumn::ApprovedOvertimeStartDate,
    ReportColumn::ApprovedOvertimeEndDate,
    ReportColumn::HeldOvertime,
    ReportColumn::RemainingBalance,
    ReportColumn::UnapprovedOvertime,
];

/// Errors sheet layout: the payroll columns plus the reason.
pub fn error_columns() -> Vec<ReportColumn> {
    let mut columns = PAYROLL_COLUMNS.to_vec();
    columns.push(ReportColumn::ErrorDescription);
    columns
}

pub const DAILY_SUMMARY_COLUMNS: [ReportColumn; 17] = [
    ReportColumn::EmployeeName,
    ReportColumn::EmployeeId,
    ReportColumn::JobKey,
    ReportColumn::Agency,
    ReportColumn::TicketDate,
    ReportColumn::Day,
    ReportColumn::LunchAdjusted,
    ReportColumn::RegularHours,
    ReportColumn::OvertimeHours,
    ReportColumn::HeldHours,
    ReportColumn::ClockIn,
    ReportColumn::ClockOut,
    ReportColumn::SupervisorsName,
    ReportColumn::PmAssigned,
    ReportColumn::Email,
    ReportColumn::WtlApproved,
    ReportColumn::ApprovedOvertime,
];

pub const WEEKLY_SUMMARY_COLUMNS: [ReportColumn; 10] = [
    ReportColumn::EmployeeName,
    ReportColumn::EmployeeId,
    ReportColumn::Agency,
    ReportColumn::IsoWeek,
    ReportColumn::WeekStart,
    ReportColumn::LunchAdjusted,
    ReportColumn::RegularHours,
    ReportColumn::OvertimeHours,
    ReportColumn::HeldHours,
    ReportColumn::EntryCount,
];

// --- Tables ---

/// Anything that can fill cells of a report layout. Columns a row does not
/// know come out empty.
pub trait ReportRow {
    fn cell(&self, column: ReportColumn) -> Option<String>;
}

/// A rendered report: a fixed column order and string cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    pub columns: Vec<ReportColumn>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn build<R: ReportRow>(columns: &[ReportColumn], records: &[R]) -> Self {
        let rows = records
            .iter()
            .map(|record| {
                columns
                    .iter()
                    .map(|column| record.cell(*column).unwrap_or_default())
                    .collect()
            })
            .collect();
        Self {
            columns: columns.to_vec(),
            rows,
        }
    }

    /// Projects rows keyed by header name onto a layout. Unknown headers
    /// are dropped and missing ones are left empty.
    pub fn from_named_rows(columns: &[ReportColumn], named: &[HashMap<String, String>]) -> Self {
        let rows = named
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| row.get(column.header()).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        Self {
            columns: columns.to_vec(),
            rows,
        }
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.header()).collect()
    }

    /// Rows keyed by header name, for feeding a report back in.
    pub fn named_rows(&self) -> Vec<HashMap<String, String>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .zip(row)
                    .map(|(column, value)| (column.header().to_string(), value.clone()))
                    .collect()
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl ReportRow for MergedRecord {
    fn cell(&self, column: ReportColumn) -> Option<String> {
        let entry = &self.entry;
        let roster = self.roster.as_ref();
        match column {
            ReportColumn::TicketDate => Some(format_date(entry.ticket_date)),
            ReportColumn::EmployeeName => Some(entry.employee_name.clone()),
            ReportColumn::ClockIn => entry.clock_in.map(format_timestamp),
            ReportColumn::ClockOut => entry.clock_out.map(format_timestamp),
            ReportColumn::HoursWorked => entry.hours_worked.or(entry.raw_hours).map(format_hours),
            ReportColumn::LunchAdjusted => self.adjusted_hours().map(format_hours),
            ReportColumn::RegularTime => self.base_hours().map(|_| format_hours(self.split.regular)),
            ReportColumn::Overtime => self.base_hours().map(|_| format_hours(self.split.overtime)),
            ReportColumn::HeldOvertime => self.base_hours().map(|_| format_hours(self.split.held)),
            ReportColumn::DayOfWeek => Some(entry.day_name().to_string()),
            ReportColumn::EmployeeId => self.employee_id().map(String::from),
            ReportColumn::Agency => Some(self.agency.clone()),
            ReportColumn::ClockInId => roster.and_then(|r| r.clock_in_id.clone()),
            ReportColumn::SupervisorsName => Some(self.supervisor.clone()),
            ReportColumn::PmAssigned => Some(self.pm_assigned.clone()),
            ReportColumn::JobKey => Some(entry.job_key.clone()),
            ReportColumn::Email => roster.and_then(|r| r.email.clone()),
            ReportColumn::WtlApproved => roster.and_then(|r| r.wtl_approved.clone()),
            ReportColumn::WtlStartDate => roster.and_then(|r| r.wtl_window.start).map(format_date),
            ReportColumn::WtlEndDate => roster.and_then(|r| r.wtl_window.end).map(format_date),
            ReportColumn::ApprovedOvertime => roster.and_then(|r| r.approved_overtime.clone()),
            ReportColumn::ApprovedOvertimeStartDate => {
                roster.and_then(|r| r.approved_ot_window.start).map(format_date)
            }
            ReportColumn::ApprovedOvertimeEndDate => {
                roster.and_then(|r| r.approved_ot_window.end).map(format_date)
            }
            ReportColumn::RemainingBalance => self.remaining_balance.map(format_hours),
            ReportColumn::UnapprovedOvertime => Some(flag(self.unapproved_overtime)),
            _ => None,
        }
    }
}

impl ReportRow for ErrorRecord {
    fn cell(&self, column: ReportColumn) -> Option<String> {
        match column {
            ReportColumn::ErrorDescription => self.description(),
            other => self.record.cell(other),
        }
    }
}

// --- Daily aggregate ---

/// Grouping key for the daily summary.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DailyKey {
    pub employee_name: EmployeeName,
    pub job_key: JobKey,
    pub agency: String,
    pub ticket_date: NaiveDate,
}

/// One summary row per (employee, job, agency, date). Hours are summed;
/// display metadata is the first value seen in the group.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyAggregate {
    pub key: DailyKey,
    pub employee_id: Option<String>,
    pub adjusted_hours: Hours,
    pub regular_hours: Hours,
    pub overtime_hours: Hours,
    pub held_hours: Hours,
    pub clock_in: Option<NaiveDateTime>,
    pub clock_out: Option<NaiveDateTime>,
    pub supervisor: Option<String>,
    pub pm_assigned: Option<String>,
    pub email: Option<String>,
    pub wtl_approved: Option<String>,
    pub approved_overtime: Option<String>,
}

impl DailyAggregate {
    pub fn day(&self) -> &'static str {
        day_name(self.key.ticket_date.weekday())
    }

    fn absorb(&mut self, other: DailyAggregate) {
        self.adjusted_hours += other.adjusted_hours;
        self.regular_hours += other.regular_hours;
        self.overtime_hours += other.overtime_hours;
        self.held_hours += other.held_hours;
        self.employee_id = self.employee_id.take().or(other.employee_id);
        self.clock_in = self.clock_in.or(other.clock_in);
        self.clock_out = self.clock_out.or(other.clock_out);
        self.supervisor = self.supervisor.take().or(other.supervisor);
        self.pm_assigned = self.pm_assigned.take().or(other.pm_assigned);
        self.email = self.email.take().or(other.email);
        self.wtl_approved = self.wtl_approved.take().or(other.wtl_approved);
        self.approved_overtime = self.approved_overtime.take().or(other.approved_overtime);
    }

    /// Reads a row of the daily summary layout back in.
    pub fn from_named_row(row_no: usize, row: &HashMap<String, String>) -> Result<Self, RowParseError> {
        let get = |column: ReportColumn| non_blank(row.get(column.header()).map(String::as_str));
        let employee_name = get(ReportColumn::EmployeeName).unwrap_or_default().to_string();
        let fail = |column: ReportColumn, value: &str, reason: RowParseReason| {
            RowParseError::new(InputSource::Summary, row_no, column.header(), value, reason)
                .for_employee(&employee_name)
        };

        let date_text = get(ReportColumn::TicketDate)
            .ok_or_else(|| fail(ReportColumn::TicketDate, "", RowParseReason::Empty))?;
        let ticket_date = parse_date(date_text)
            .ok_or_else(|| fail(ReportColumn::TicketDate, date_text, RowParseReason::InvalidDate))?;

        let hours = |column: ReportColumn| -> Result<Hours, RowParseError> {
            match get(column) {
                None => Ok(Hours::ZERO),
                Some(text) => parse_hours(text)
                    .ok_or_else(|| fail(column, text, RowParseReason::InvalidNumber)),
            }
        };
        let timestamp = |column: ReportColumn| -> Result<Option<NaiveDateTime>, RowParseError> {
            match get(column) {
                None => Ok(None),
                Some(text) => parse_timestamp(text)
                    .map(Some)
                    .ok_or_else(|| fail(column, text, RowParseReason::InvalidTimestamp)),
            }
        };
        let text = |column: ReportColumn| get(column).map(String::from);

        Ok(DailyAggregate {
            key: DailyKey {
                employee_name: employee_name.clone(),
                job_key: get(ReportColumn::JobKey).unwrap_or_default().to_string(),
                agency: get(ReportColumn::Agency).unwrap_or_default().to_string(),
                ticket_date,
            },
            employee_id: text(ReportColumn::EmployeeId),
            adjusted_hours: hours(ReportColumn::LunchAdjusted)?,
            regular_hours: hours(ReportColumn::RegularHours)?,
            overtime_hours: hours(ReportColumn::OvertimeHours)?,
            held_hours: hours(ReportColumn::HeldHours)?,
            clock_in: timestamp(ReportColumn::ClockIn)?,
            clock_out: timestamp(ReportColumn::ClockOut)?,
            supervisor: text(ReportColumn::SupervisorsName),
            pm_assigned: text(ReportColumn::PmAssigned),
            email: text(ReportColumn::Email),
            wtl_approved: text(ReportColumn::WtlApproved),
            approved_overtime: text(ReportColumn::ApprovedOvertime),
        })
    }
}

impl ReportRow for DailyAggregate {
    fn cell(&self, column: ReportColumn) -> Option<String> {
        match column {
            ReportColumn::EmployeeName => Some(self.key.employee_name.clone()),
            ReportColumn::EmployeeId => self.employee_id.clone(),
            ReportColumn::JobKey => Some(self.key.job_key.clone()),
            ReportColumn::Agency => Some(self.key.agency.clone()),
            ReportColumn::TicketDate => Some(format_date(self.key.ticket_date)),
            ReportColumn::Day => Some(self.day().to_string()),
            ReportColumn::LunchAdjusted => Some(format_hours(self.adjusted_hours)),
            ReportColumn::RegularHours => Some(format_hours(self.regular_hours)),
            ReportColumn::OvertimeHours => Some(format_hours(self.overtime_hours)),
            ReportColumn::HeldHours => Some(format_hours(self.held_hours)),
            ReportColumn::ClockIn => self.clock_in.map(format_timestamp),
            ReportColumn::ClockOut => self.clock_out.map(format_timestamp),
            ReportColumn::SupervisorsName => self.supervisor.clone(),
            ReportColumn::PmAssigned => self.pm_assigned.clone(),
            ReportColumn::Email => self.email.clone(),
            ReportColumn::WtlApproved => self.wtl_approved.clone(),
            ReportColumn::ApprovedOvertime => self.approved_overtime.clone(),
            _ => None,
        }
    }
}

/// A line that can be summed into the daily summary. Implemented by merged
/// records and by summary rows themselves, so re-aggregating a summary is
/// a no-op on its totals.
pub trait HoursLine {
    fn to_daily(&self) -> DailyAggregate;
}

impl HoursLine for MergedRecord {
    fn to_daily(&self) -> DailyAggregate {
        let roster = self.roster.as_ref();
        DailyAggregate {
            key: DailyKey {
                employee_name: self.entry.employee_name.clone(),
                job_key: self.entry.job_key.clone(),
                agency: self.agency.clone(),
                ticket_date: self.entry.ticket_date,
            },
            employee_id: self.employee_id().map(String::from),
            // Missing punches sum as zero.
            adjusted_hours: self.adjusted_hours().unwrap_or(Hours::ZERO),
            regular_hours: self.split.regular,
            overtime_hours: self.split.overtime,
            held_hours: self.split.held,
            clock_in: self.entry.clock_in,
            clock_out: self.entry.clock_out,
            supervisor: Some(self.supervisor.clone()),
            pm_assigned: Some(self.pm_assigned.clone()),
            email: roster.and_then(|r| r.email.clone()),
            wtl_approved: roster.and_then(|r| r.wtl_approved.clone()),
            approved_overtime: roster.and_then(|r| r.approved_overtime.clone()),
        }
    }
}

impl HoursLine for DailyAggregate {
    fn to_daily(&self) -> DailyAggregate {
        self.clone()
    }
}

/// Sums lines per (employee, job, agency, date), in first-seen order.
pub fn aggregate_daily<L: HoursLine>(lines: &[L]) -> Vec<DailyAggregate> {
    let mut positions: HashMap<DailyKey, usize> = HashMap::new();
    let mut groups: Vec<DailyAggregate> = Vec::new();

    for line in lines {
        let daily = line.to_daily();
        match positions.get(&daily.key) {
            Some(&pos) => groups[pos].absorb(daily),
            None => {
                positions.insert(daily.key.clone(), groups.len());
                groups.push(daily);
            }
        }
    }

    info!("Built {} daily summary rows from {} lines", groups.len(), lines.len());
    groups
}

// --- Weekly aggregate ---

#[derive(Debug, Clone, PartialEq)]
pub struct WeeklyAggregate {
    pub employee_name: EmployeeName,
    pub iso_year: i32,
    pub iso_week: u32,
    pub employee_id: Option<String>,
    pub agency: String,
    pub adjusted_hours: Hours,
    pub regular_hours: Hours,
    pub overtime_hours: Hours,
    pub held_hours: Hours,
    pub entry_count: usize,
}

impl WeeklyAggregate {
    pub fn week_start(&self) -> Option<NaiveDate> {
        NaiveDate::from_isoywd_opt(self.iso_year, self.iso_week, Weekday::Mon)
    }
}

impl ReportRow for WeeklyAggregate {
    fn cell(&self, column: ReportColumn) -> Option<String> {
        match column {
            ReportColumn::EmployeeName => Some(self.employee_name.clone()),
            ReportColumn::EmployeeId => self.employee_id.clone(),
            ReportColumn::Agency => Some(self.agency.clone()),
            ReportColumn::IsoWeek => Some(format!("{}-W{:02}", self.iso_year, self.iso_week)),
            ReportColumn::WeekStart => self.week_start().map(format_date),
            ReportColumn::LunchAdjusted => Some(format_hours(self.adjusted_hours)),
            ReportColumn::RegularHours => Some(format_hours(self.regular_hours)),
            ReportColumn::OvertimeHours => Some(format_hours(self.overtime_hours)),
            ReportColumn::HeldHours => Some(format_hours(self.held_hours)),
            ReportColumn::EntryCount => Some(self.entry_count.to_string()),
            _ => None,
        }
    }
}

/// Sums records per (employee, ISO week), ordered by employee then week.
pub fn aggregate_weekly(records: &[MergedRecord]) -> Vec<WeeklyAggregate> {
    let mut weeks: BTreeMap<(EmployeeName, i32, u32), WeeklyAggregate> = BTreeMap::new();

    for record in records {
        let iso = record.entry.ticket_date.iso_week();
        let key = (record.entry.employee_name.clone(), iso.year(), iso.week());
        let week = weeks.entry(key).or_insert_with(|| WeeklyAggregate {
            employee_name: record.entry.employee_name.clone(),
            iso_year: iso.year(),
            iso_week: iso.week(),
            employee_id: None,
            agency: record.agency.clone(),
            adjusted_hours: Hours::ZERO,
            regular_hours: Hours::ZERO,
            overtime_hours: Hours::ZERO,
            held_hours: Hours::ZERO,
            entry_count: 0,
        });
        if week.employee_id.is_none() {
            week.employee_id = record.employee_id().map(String::from);
        }
        week.adjusted_hours += record.adjusted_hours().unwrap_or(Hours::ZERO);
        week.regular_hours += record.split.regular;
        week.overtime_hours += record.split.overtime;
        week.held_hours += record.split.held;
        week.entry_count += 1;
    }

    weeks.into_values().collect()
}
