// src/time_normalizer.rs
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::config::PayrollConfig;
use crate::error::{InputSource, RowParseError, RowParseReason};
use crate::models::{Hours, MergedRecord, RawPunchRow, TimeEntry};

// --- Constants ---

const SECONDS_PER_HOUR: Decimal = dec!(3600);
const ROUNDING_STEP_MINUTES: u32 = 15;
/// Seconds past a quarter-hour mark at which a punch rounds up instead of down.
const ROUND_UP_AFTER_SECS: i64 = 7 * 60;

// `%Y` also accepts a two-digit year (as year 0024), so the `%y` forms go
// first. `%y` needs exactly two digits and rejects four-digit years.
const DATE_FORMATS: [&str; 3] = ["%m/%d/%y", "%Y-%m-%d", "%m/%d/%Y"];
const TIMESTAMP_FORMATS: [&str; 14] = [
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %H:%M",
    "%m/%d/%y %I:%M:%S %p",
    "%m/%d/%y %I:%M %p",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %I:%M %p",
];

/// Spreadsheet exports write these for empty cells.
const BLANK_MARKERS: [&str; 4] = ["nat", "nan", "none", "null"];

// --- Parsing helpers ---

pub(crate) fn is_blank(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || BLANK_MARKERS.contains(&trimmed.to_ascii_lowercase().as_str())
}

/// Returns the trimmed value, or `None` for empty / spreadsheet-null cells.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !is_blank(v))
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Parses a calendar date. A full timestamp is accepted and truncated to
/// its date, since exports often write midnight timestamps for dates.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| parse_timestamp(value).map(|dt| dt.date()))
}

pub fn parse_hours(value: &str) -> Option<Hours> {
    let value = value.trim();
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .ok()
}

// --- Time arithmetic ---

/// Rounds to the nearest quarter hour: fewer than 7 minutes past a mark
/// rounds down, anything else rounds up. Seconds are zeroed.
pub fn round_to_quarter_hour(dt: NaiveDateTime) -> NaiveDateTime {
    let past_mark = i64::from(dt.minute() % ROUNDING_STEP_MINUTES) * 60 + i64::from(dt.second());
    let floor = dt - Duration::seconds(past_mark) - Duration::nanoseconds(i64::from(dt.nanosecond()));
    if past_mark < ROUND_UP_AFTER_SECS {
        floor
    } else {
        floor + Duration::minutes(i64::from(ROUNDING_STEP_MINUTES))
    }
}

pub fn elapsed_hours(clock_in: NaiveDateTime, clock_out: NaiveDateTime) -> Hours {
    Decimal::from((clock_out - clock_in).num_seconds()) / SECONDS_PER_HOUR
}

/// Applies the unpaid lunch deduction.
///
/// The deduction is taken when the threshold is zero (flat policy) or when
/// the basis reaches it. The basis is the source's own "Hours Worked" figure
/// when supplied, otherwise the computed raw hours.
pub fn apply_lunch_deduction(
    raw_hours: Hours,
    supplied_hours: Option<Hours>,
    config: &PayrollConfig,
) -> (Hours, bool) {
    let threshold = config.lunch_deduction_threshold_hours;
    let basis = supplied_hours.unwrap_or(raw_hours);
    if threshold.is_zero() || basis >= threshold {
        (raw_hours - config.lunch_deduction_hours, true)
    } else {
        (raw_hours, false)
    }
}

// --- Row normalization ---

fn parse_optional_timestamp(
    row: usize,
    field: &'static str,
    value: Option<&str>,
    config: &PayrollConfig,
) -> Result<Option<NaiveDateTime>, RowParseError> {
    match non_blank(value) {
        None => Ok(None),
        Some(text) => {
            let parsed = parse_timestamp(text).ok_or_else(|| {
                RowParseError::new(InputSource::Punches, row, field, text, RowParseReason::InvalidTimestamp)
            })?;
            Ok(Some(if config.rounding_enabled {
                round_to_quarter_hour(parsed)
            } else {
                parsed
            }))
        }
    }
}

/// Turns one raw punch row into a [`TimeEntry`].
///
/// Missing punches are not an error here: the entry is kept with
/// `adjusted_hours == None` so the classifier can report it. Only values
/// that are present but unreadable reject the row.
pub fn normalize_row(
    row: usize,
    raw: &RawPunchRow,
    config: &PayrollConfig,
) -> Result<TimeEntry, RowParseError> {
    let employee_name = raw.employee_name.trim();
    if is_blank(employee_name) {
        return Err(RowParseError::new(
            InputSource::Punches,
            row,
            "Employee Name",
            &raw.employee_name,
            RowParseReason::Empty,
        ));
    }

    let date_text = non_blank(raw.ticket_date.as_deref()).ok_or_else(|| {
        RowParseError::new(InputSource::Punches, row, "Ticket Date", "", RowParseReason::Empty)
            .for_employee(employee_name)
    })?;
    let ticket_date = parse_date(date_text).ok_or_else(|| {
        RowParseError::new(InputSource::Punches, row, "Ticket Date", date_text, RowParseReason::InvalidDate)
            .for_employee(employee_name)
    })?;

    let clock_in = parse_optional_timestamp(row, "Clock In", raw.clock_in.as_deref(), config)
        .map_err(|e| e.for_employee(employee_name))?;
    let clock_out = parse_optional_timestamp(row, "Clock Out", raw.clock_out.as_deref(), config)
        .map_err(|e| e.for_employee(employee_name))?;

    let hours_worked = match non_blank(raw.hours_worked.as_deref()) {
        None => None,
        Some(text) => Some(parse_hours(text).ok_or_else(|| {
            RowParseError::new(InputSource::Punches, row, "Hours Worked", text, RowParseReason::InvalidNumber)
                .for_employee(employee_name)
        })?),
    };

    let raw_hours = match (clock_in, clock_out) {
        (Some(start), Some(end)) => Some(elapsed_hours(start, end)),
        _ => None,
    };
    let (adjusted_hours, lunch_deducted) = match raw_hours {
        Some(raw_hours) => {
            let (adjusted, deducted) = apply_lunch_deduction(raw_hours, hours_worked, config);
            (Some(adjusted), deducted)
        }
        None => (None, false),
    };

    if let Some(raw_hours) = raw_hours {
        if raw_hours.is_sign_negative() {
            warn!(
                "Row {}: clock out precedes clock in for {} on {} ({}h)",
                row, employee_name, ticket_date, raw_hours
            );
        }
    }

    Ok(TimeEntry {
        row,
        employee_name: employee_name.to_string(),
        employee_id: non_blank(raw.employee_id.as_deref()).map(String::from),
        ticket_date,
        job_key: non_blank(raw.job_key.as_deref()).unwrap_or_default().to_string(),
        clock_in,
        clock_out,
        hours_worked,
        raw_hours,
        adjusted_hours,
        lunch_deducted,
    })
}

/// Normalizes every punch row, isolating unreadable rows.
pub fn normalize_rows(
    rows: &[RawPunchRow],
    config: &PayrollConfig,
) -> (Vec<TimeEntry>, Vec<RowParseError>) {
    let mut entries = Vec::with_capacity(rows.len());
    let mut failures = Vec::new();

    for (index, raw) in rows.iter().enumerate() {
        match normalize_row(raw.source_row.unwrap_or(index + 1), raw, config) {
            Ok(entry) => entries.push(entry),
            Err(e) => {
                debug!("Rejected punch row: {}", e);
                failures.push(e);
            }
        }
    }

    info!(
        "Normalized {} punch rows ({} rejected, rounding {})",
        entries.len(),
        failures.len(),
        if config.rounding_enabled { "on" } else { "off" }
    );
    (entries, failures)
}

// --- Manual adjustment ---

/// Adds the WTL bonus to a record that carries a complete WTL window.
///
/// The bonus is set, not accumulated, so applying this twice still adds it
/// once. Records with missing punches get no bonus.
pub fn apply_manual_adjustment(mut record: MergedRecord, config: &PayrollConfig) -> MergedRecord {
    if record.has_wtl_window() && record.base_hours().is_some() {
        record.bonus_hours = config.wtl_bonus_hours;
    } else {
        record.bonus_hours = Hours::ZERO;
    }
    record
}
