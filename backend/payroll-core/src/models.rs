// src/models.rs
use chrono::{Datelike, NaiveDate, NaiveDateTime, Weekday};
use rust_decimal::Decimal;
use serde::Deserialize;

pub type EmployeeName = String;
pub type JobKey = String;
pub type Hours = Decimal;

// --- Raw input rows (as loaded, before any parsing) ---

/// One row of the time-clock export. Every field is kept as text so a
/// malformed value can be reported against its row instead of failing the
/// whole file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawPunchRow {
    /// 1-based data row in the source file, set by the loader.
    #[serde(skip)]
    pub source_row: Option<usize>,
    #[serde(rename = "Employee Name", default)]
    pub employee_name: String,
    #[serde(rename = "Employee ID", default)]
    pub employee_id: Option<String>,
    #[serde(rename = "Ticket Date", default)]
    pub ticket_date: Option<String>,
    #[serde(rename = "JobNo|Customer|Description", default)]
    pub job_key: Option<String>,
    #[serde(rename = "Clock In", default)]
    pub clock_in: Option<String>,
    #[serde(rename = "Clock Out", default)]
    pub clock_out: Option<String>,
    #[serde(rename = "Hours Worked", default)]
    pub hours_worked: Option<String>,
}

/// One row of the roster / assignment sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawRosterRow {
    #[serde(skip)]
    pub source_row: Option<usize>,
    #[serde(rename = "Employee Name", default)]
    pub employee_name: String,
    #[serde(rename = "Employee ID", default)]
    pub employee_id: Option<String>,
    #[serde(rename = "Ticket Date", default)]
    pub ticket_date: Option<String>,
    #[serde(rename = "JobNo|Customer|Description", default)]
    pub job_key: Option<String>,
    #[serde(rename = "Agency", default)]
    pub agency: Option<String>,
    #[serde(rename = "Clock-In ID", default)]
    pub clock_in_id: Option<String>,
    #[serde(rename = "Supervisors Name", default)]
    pub supervisor: Option<String>,
    #[serde(rename = "PM Assigned", default)]
    pub pm_assigned: Option<String>,
    #[serde(rename = "Email", default)]
    pub email: Option<String>,
    #[serde(rename = "WTL Approved", default)]
    pub wtl_approved: Option<String>,
    #[serde(rename = "WTL Start Date", default)]
    pub wtl_start: Option<String>,
    #[serde(rename = "WTL End Date", default)]
    pub wtl_end: Option<String>,
    #[serde(rename = "ApprovedOvertime", default)]
    pub approved_overtime: Option<String>,
    #[serde(rename = "ApprovedOvertime Start Date", default)]
    pub approved_ot_start: Option<String>,
    #[serde(rename = "ApprovedOvertime End Date", default)]
    pub approved_ot_end: Option<String>,
}

// --- Normalized entries ---

/// A single punch after parsing, rounding and the lunch deduction.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeEntry {
    /// 1-based position in the punch input; the encounter order.
    pub row: usize,
    pub employee_name: EmployeeName,
    pub employee_id: Option<String>,
    pub ticket_date: NaiveDate,
    pub job_key: JobKey,
    pub clock_in: Option<NaiveDateTime>,
    pub clock_out: Option<NaiveDateTime>,
    /// The "Hours Worked" figure supplied by the source, if any.
    pub hours_worked: Option<Hours>,
    /// Clock-out minus clock-in. `None` when a punch is missing.
    pub raw_hours: Option<Hours>,
    /// Raw hours after the lunch deduction. `None` when a punch is missing.
    pub adjusted_hours: Option<Hours>,
    pub lunch_deducted: bool,
}

impl TimeEntry {
    pub fn weekday(&self) -> Weekday {
        self.ticket_date.weekday()
    }

    pub fn day_name(&self) -> &'static str {
        day_name(self.weekday())
    }

    pub fn is_weekend(&self) -> bool {
        matches!(self.weekday(), Weekday::Sat | Weekday::Sun)
    }
}

pub fn day_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

// --- Roster ---

/// A start/end date pair. Only a complete pair grants anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn is_complete(&self) -> bool {
        self.start.is_some() && self.end.is_some()
    }
}

/// Per (employee, date, job) assignment metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RosterInfo {
    pub employee_name: EmployeeName,
    pub employee_id: Option<String>,
    pub ticket_date: Option<NaiveDate>,
    pub job_key: JobKey,
    pub agency: Option<String>,
    pub clock_in_id: Option<String>,
    pub supervisor: Option<String>,
    pub pm_assigned: Option<String>,
    pub email: Option<String>,
    pub wtl_approved: Option<String>,
    pub wtl_window: DateWindow,
    pub approved_overtime: Option<String>,
    pub approved_ot_window: DateWindow,
}

// --- Merged and allocated records ---

/// How a record's base (pre-bonus) hours were allocated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HourSplit {
    pub regular: Hours,
    pub overtime: Hours,
    /// Overtime withheld because no approval window covered it.
    pub held: Hours,
}

impl HourSplit {
    pub fn total(&self) -> Hours {
        self.regular + self.overtime + self.held
    }
}

/// A time entry joined with its roster row and, after allocation, its
/// regular/overtime split.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRecord {
    pub entry: TimeEntry,
    /// `None` when no roster row matched the join key.
    pub roster: Option<RosterInfo>,
    pub agency: String,
    pub supervisor: String,
    pub pm_assigned: String,
    pub split: HourSplit,
    /// Manual-adjustment hours added after allocation.
    pub bonus_hours: Hours,
    /// Cumulative hours in the allocation window minus the weekly threshold.
    pub remaining_balance: Option<Hours>,
    /// Overtime (paid or held) with no approved-overtime window.
    pub unapproved_overtime: bool,
}

impl MergedRecord {
    pub fn new(
        entry: TimeEntry,
        roster: Option<RosterInfo>,
        agency: String,
        supervisor: String,
        pm_assigned: String,
    ) -> Self {
        Self {
            entry,
            roster,
            agency,
            supervisor,
            pm_assigned,
            split: HourSplit::default(),
            bonus_hours: Hours::ZERO,
            remaining_balance: None,
            unapproved_overtime: false,
        }
    }

    /// Hours fed to the allocator: lunch-adjusted, before any bonus.
    pub fn base_hours(&self) -> Option<Hours> {
        self.entry.adjusted_hours
    }

    /// Lunch-adjusted hours including any manual-adjustment bonus.
    pub fn adjusted_hours(&self) -> Option<Hours> {
        self.entry.adjusted_hours.map(|h| h + self.bonus_hours)
    }

    pub fn employee_id(&self) -> Option<&str> {
        self.entry
            .employee_id
            .as_deref()
            .or_else(|| self.roster.as_ref().and_then(|r| r.employee_id.as_deref()))
    }

    pub fn has_approved_overtime(&self) -> bool {
        self.roster
            .as_ref()
            .map_or(false, |r| r.approved_ot_window.is_complete())
    }

    pub fn has_wtl_window(&self) -> bool {
        self.roster
            .as_ref()
            .map_or(false, |r| r.wtl_window.is_complete())
    }

    pub fn roster_matched(&self) -> bool {
        self.roster.is_some()
    }
}

/// A merged record that failed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorRecord {
    pub record: MergedRecord,
    pub reason: crate::error_classifier::ErrorReason,
}

impl ErrorRecord {
    pub fn description(&self) -> Option<String> {
        self.reason.description()
    }
}

/// An employee/date seen in the punches but absent from the roster.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnrosteredEmployee {
    pub employee_name: EmployeeName,
    pub ticket_date: NaiveDate,
}
