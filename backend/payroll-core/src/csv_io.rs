// src/csv_io.rs
//! Reading the punch and roster exports, and writing every report of a run.

use csv::{Reader, ReaderBuilder, Writer};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{InputSource, PayrollError, RowParseError, RowParseReason};
use crate::models::{MergedRecord, RawPunchRow, RawRosterRow, UnrosteredEmployee};
use crate::pipeline::PayrollOutcome;
use crate::report::{
    error_columns, format_date, format_hours, ReportTable, DAILY_SUMMARY_COLUMNS, PAYROLL_COLUMNS,
    WEEKLY_SUMMARY_COLUMNS,
};

const REQUIRED_COLUMNS: [&str; 2] = ["Employee Name", "Ticket Date"];

pub const PAYROLL_FILE: &str = "payroll.csv";
pub const ERRORS_FILE: &str = "errors.csv";
pub const PARSE_ERRORS_FILE: &str = "parse_errors.csv";
pub const DAILY_SUMMARY_FILE: &str = "daily_summary.csv";
pub const WEEKLY_SUMMARY_FILE: &str = "weekly_summary.csv";
pub const UNROSTERED_FILE: &str = "unrostered.csv";
pub const HOURS_IMPORT_FILE: &str = "hours_import.csv";
pub const RUN_SUMMARY_FILE: &str = "run_summary.json";

// --- Loading ---

fn csv_reader<R: Read>(input: R) -> Reader<R> {
    ReaderBuilder::new().flexible(true).trim(csv::Trim::Headers).from_reader(input)
}

fn check_columns<R: Read>(
    reader: &mut Reader<R>,
    source: InputSource,
    required: &[&'static str],
) -> Result<(), PayrollError> {
    let headers = reader.headers()?.clone();
    for &column in required {
        if !headers.iter().any(|h| h == column) {
            return Err(PayrollError::MissingColumn {
                column,
                source_file: source,
            });
        }
    }
    Ok(())
}

/// Rows decoded from one input, and the records that could not be decoded.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedRows<T> {
    pub rows: Vec<T>,
    pub failures: Vec<RowParseError>,
}

impl<T> Default for LoadedRows<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            failures: Vec::new(),
        }
    }
}

/// A report row keyed by header, with its 1-based data row number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRow {
    pub row: usize,
    pub values: HashMap<String, String>,
}

/// Decodes every record, pairing each with its 1-based data row. A record
/// that cannot be decoded (bad UTF-8, unreadable field) becomes a failure
/// and reading continues; only I/O errors end the read.
fn read_records<T: DeserializeOwned, R: Read>(
    input: R,
    source: InputSource,
    required: &[&'static str],
) -> Result<LoadedRows<(usize, T)>, PayrollError> {
    let mut reader = csv_reader(input);
    check_columns(&mut reader, source, required)?;

    let mut loaded = LoadedRows::default();
    for (index, result) in reader.deserialize::<T>().enumerate() {
        let row = index + 1;
        match result {
            Ok(record) => loaded.rows.push((row, record)),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                warn!("Skipping undecodable {} row {}: {}", source, row, e);
                loaded.failures.push(RowParseError::new(
                    source,
                    row,
                    "record",
                    &e.to_string(),
                    RowParseReason::Unreadable,
                ));
            }
        }
    }

    info!(
        "Loaded {} {} rows ({} undecodable)",
        loaded.rows.len(),
        source,
        loaded.failures.len()
    );
    Ok(loaded)
}

/// Reads punch rows from any CSV source.
pub fn read_punches<R: Read>(input: R) -> Result<LoadedRows<RawPunchRow>, PayrollError> {
    let loaded = read_records::<RawPunchRow, R>(input, InputSource::Punches, &REQUIRED_COLUMNS)?;
    Ok(LoadedRows {
        rows: loaded
            .rows
            .into_iter()
            .map(|(row, raw)| RawPunchRow {
                source_row: Some(row),
                ..raw
            })
            .collect(),
        failures: loaded.failures,
    })
}

/// Reads roster rows from any CSV source.
pub fn read_roster<R: Read>(input: R) -> Result<LoadedRows<RawRosterRow>, PayrollError> {
    let loaded = read_records::<RawRosterRow, R>(input, InputSource::Roster, &REQUIRED_COLUMNS)?;
    Ok(LoadedRows {
        rows: loaded
            .rows
            .into_iter()
            .map(|(row, raw)| RawRosterRow {
                source_row: Some(row),
                ..raw
            })
            .collect(),
        failures: loaded.failures,
    })
}

pub fn load_punches(path: &Path) -> Result<LoadedRows<RawPunchRow>, PayrollError> {
    debug!("Reading punches from {}", path.display());
    read_punches(BufReader::new(File::open(path)?))
}

pub fn load_roster(path: &Path) -> Result<LoadedRows<RawRosterRow>, PayrollError> {
    debug!("Reading roster from {}", path.display());
    read_roster(BufReader::new(File::open(path)?))
}

/// Reads any report back as rows keyed by header.
pub fn read_named_rows<R: Read>(input: R) -> Result<LoadedRows<NamedRow>, PayrollError> {
    let loaded = read_records::<HashMap<String, String>, R>(input, InputSource::Summary, &[])?;
    Ok(LoadedRows {
        rows: loaded
            .rows
            .into_iter()
            .map(|(row, values)| NamedRow { row, values })
            .collect(),
        failures: loaded.failures,
    })
}

// --- Writing ---

pub fn write_table<W: Write>(output: W, table: &ReportTable) -> Result<(), PayrollError> {
    let mut writer = Writer::from_writer(output);
    writer.write_record(table.headers())?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_parse_failures<W: Write>(output: W, failures: &[RowParseError]) -> Result<(), PayrollError> {
    let mut writer = Writer::from_writer(output);
    writer.write_record(["Source", "Row", "Employee Name", "Field", "Value", "Reason"])?;
    for failure in failures {
        writer.write_record([
            failure.source_file.to_string(),
            failure.row.to_string(),
            failure.employee_name.clone().unwrap_or_default(),
            failure.field.to_string(),
            failure.value.clone(),
            failure.reason.to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_unrostered<W: Write>(output: W, missing: &[UnrosteredEmployee]) -> Result<(), PayrollError> {
    let mut writer = Writer::from_writer(output);
    writer.write_record(["Employee Name", "Ticket Date"])?;
    for item in missing {
        writer.write_record([item.employee_name.clone(), format_date(item.ticket_date)])?;
    }
    writer.flush()?;
    Ok(())
}

/// Splits "Last, First" on the first comma. A name without a comma is all
/// last name.
pub fn split_name(full_name: &str) -> (String, String) {
    match full_name.split_once(',') {
        Some((last, first)) => (last.trim().to_string(), first.trim().to_string()),
        None => (full_name.trim().to_string(), String::new()),
    }
}

/// The payroll-provider import. Records with missing punches are left out.
pub fn write_hours_import<W: Write>(output: W, records: &[MergedRecord]) -> Result<(), PayrollError> {
    let mut writer = Writer::from_writer(output);
    writer.write_record([
        "Employee ID",
        "Last Name",
        "First Name",
        "Ticket Date",
        "Regular Time",
        "Overtime",
        "JobNo|Customer|Description",
    ])?;
    for record in records.iter().filter(|r| r.base_hours().is_some()) {
        let (last, first) = split_name(&record.entry.employee_name);
        writer.write_record([
            record.employee_id().unwrap_or_default().to_string(),
            last,
            first,
            format_date(record.entry.ticket_date),
            format_hours(record.split.regular),
            format_hours(record.split.overtime),
            record.entry.job_key.clone(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn create(dir: &Path, name: &str) -> Result<(PathBuf, BufWriter<File>), PayrollError> {
    let path = dir.join(name);
    let file = File::create(&path)?;
    Ok((path, BufWriter::new(file)))
}

/// Writes every report of a run into `dir`, returning the paths written.
/// The payroll and errors files are always produced, even when empty.
pub fn write_reports(dir: &Path, outcome: &PayrollOutcome) -> Result<Vec<PathBuf>, PayrollError> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let (path, file) = create(dir, PAYROLL_FILE)?;
    write_table(file, &ReportTable::build(&PAYROLL_COLUMNS, &outcome.payroll))?;
    written.push(path);

    let (path, file) = create(dir, ERRORS_FILE)?;
    write_table(file, &ReportTable::build(&error_columns(), &outcome.errors))?;
    written.push(path);

    let (path, file) = create(dir, PARSE_ERRORS_FILE)?;
    write_parse_failures(file, &outcome.parse_failures)?;
    written.push(path);

    let (path, file) = create(dir, DAILY_SUMMARY_FILE)?;
    write_table(file, &ReportTable::build(&DAILY_SUMMARY_COLUMNS, &outcome.daily))?;
    written.push(path);

    let (path, file) = create(dir, WEEKLY_SUMMARY_FILE)?;
    write_table(file, &ReportTable::build(&WEEKLY_SUMMARY_COLUMNS, &outcome.weekly))?;
    written.push(path);

    let (path, file) = create(dir, UNROSTERED_FILE)?;
    write_unrostered(file, &outcome.unrostered)?;
    written.push(path);

    let (path, file) = create(dir, HOURS_IMPORT_FILE)?;
    write_hours_import(file, &outcome.payroll)?;
    written.push(path);

    let (path, mut file) = create(dir, RUN_SUMMARY_FILE)?;
    serde_json::to_writer_pretty(&mut file, &outcome.summary())
        .map_err(|e| PayrollError::Io(e.into()))?;
    file.flush()?;
    written.push(path);

    info!("Wrote {} report files to {}", written.len(), dir.display());
    Ok(written)
}
