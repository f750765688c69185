// src/test_support.rs
//! Builders shared by the unit test files.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;

use crate::models::{DateWindow, Hours, MergedRecord, RosterInfo, TimeEntry};

pub fn d(date_str: &str) -> NaiveDate {
    NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
        .unwrap_or_else(|_| panic!("Invalid date string format: {}", date_str))
}

pub fn at(date_str: &str, time_str: &str) -> NaiveDateTime {
    let text = format!("{} {}", date_str, time_str);
    NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M"))
        .unwrap_or_else(|_| panic!("Invalid timestamp: {}", text))
}

/// An entry whose punches span exactly `hours` starting at 07:00. `None`
/// leaves the clock-out empty.
pub fn entry(row: usize, name: &str, date: &str, hours: Option<Hours>) -> TimeEntry {
    let clock_in = at(date, "07:00");
    let clock_out = hours.map(|h| {
        let minutes = (h * dec!(60)).to_i64().unwrap_or(0);
        clock_in + Duration::minutes(minutes)
    });
    TimeEntry {
        row,
        employee_name: name.to_string(),
        employee_id: Some(format!("E-{}", name.len())),
        ticket_date: d(date),
        job_key: format!("J{}", row),
        clock_in: Some(clock_in),
        clock_out,
        hours_worked: None,
        raw_hours: hours,
        adjusted_hours: hours,
        lunch_deducted: false,
    }
}

/// An unrostered record with default fills, as the merge produces it.
pub fn record(row: usize, name: &str, date: &str, hours: Option<Hours>) -> MergedRecord {
    MergedRecord::new(
        entry(row, name, date, hours),
        None,
        "CSI".to_string(),
        "NEEDS TO BE ASSIGNED".to_string(),
        "NEEDS TO BE ASSIGNED".to_string(),
    )
}

fn roster_for(record: &MergedRecord) -> RosterInfo {
    RosterInfo {
        employee_name: record.entry.employee_name.clone(),
        ticket_date: Some(record.entry.ticket_date),
        job_key: record.entry.job_key.clone(),
        ..Default::default()
    }
}

/// Attaches a roster row carrying a complete approved-overtime window.
pub fn approved(mut record: MergedRecord) -> MergedRecord {
    let mut roster = record.roster.take().unwrap_or_else(|| roster_for(&record));
    roster.approved_overtime = Some("Yes".to_string());
    roster.approved_ot_window = DateWindow::new(Some(d("2024-03-01")), Some(d("2024-03-31")));
    record.roster = Some(roster);
    record
}

/// Attaches a roster row carrying a complete WTL window.
pub fn with_wtl(mut record: MergedRecord) -> MergedRecord {
    let mut roster = record.roster.take().unwrap_or_else(|| roster_for(&record));
    roster.wtl_approved = Some("Yes".to_string());
    roster.wtl_window = DateWindow::new(Some(d("2024-03-01")), Some(d("2024-03-31")));
    record.roster = Some(roster);
    record
}
