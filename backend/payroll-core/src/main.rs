use anyhow::{Context, Result};
use clap::Parser;
use rust_decimal::Decimal;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use payroll_core::config::{OvertimePolicy, RosterJoin, UnapprovedOvertime, WeeklyReset};
use payroll_core::csv_io::{load_punches, load_roster, write_reports};
use payroll_core::{PayrollConfig, PayrollRun};

/// Computes regular and overtime hours from a punch export and a roster.
#[derive(Parser, Debug)]
#[command(name = "payroll-core", version, about)]
struct Args {
    /// Time-clock export (CSV)
    #[arg(long)]
    punches: PathBuf,

    /// Roster / assignment sheet (CSV)
    #[arg(long)]
    roster: PathBuf,

    /// Directory the reports are written to
    #[arg(long, default_value = "payroll_out")]
    out_dir: PathBuf,

    #[arg(long, value_enum)]
    overtime_policy: Option<OvertimePolicy>,

    #[arg(long, value_enum)]
    weekly_reset: Option<WeeklyReset>,

    #[arg(long, value_enum)]
    unapproved_overtime: Option<UnapprovedOvertime>,

    #[arg(long, value_enum)]
    roster_join: Option<RosterJoin>,

    /// Shifts at least this long lose the lunch deduction; 0 deducts always
    #[arg(long)]
    lunch_threshold: Option<Decimal>,

    #[arg(long)]
    lunch_deduction: Option<Decimal>,

    #[arg(long)]
    default_agency: Option<String>,

    #[arg(long)]
    unassigned_label: Option<String>,

    /// Round punches to the nearest quarter hour
    #[arg(long)]
    rounding: Option<bool>,

    #[arg(long)]
    weekend_all_overtime: Option<bool>,

    #[arg(long)]
    minimum_daily_hours: Option<Decimal>,

    #[arg(long)]
    daily_regular_hours: Option<Decimal>,

    #[arg(long)]
    weekly_regular_hours: Option<Decimal>,

    #[arg(long)]
    wtl_bonus_hours: Option<Decimal>,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn apply_overrides(&self, config: &mut PayrollConfig) {
        if let Some(policy) = self.overtime_policy {
            config.overtime_policy = policy;
        }
        if let Some(reset) = self.weekly_reset {
            config.weekly_reset = reset;
        }
        if let Some(unapproved) = self.unapproved_overtime {
            config.unapproved_overtime = unapproved;
        }
        if let Some(join) = self.roster_join {
            config.roster_join = join;
        }
        if let Some(threshold) = self.lunch_threshold {
            config.lunch_deduction_threshold_hours = threshold;
        }
        if let Some(deduction) = self.lunch_deduction {
            config.lunch_deduction_hours = deduction;
        }
        if let Some(agency) = &self.default_agency {
            config.default_agency = agency.clone();
        }
        if let Some(label) = &self.unassigned_label {
            config.unassigned_label = label.clone();
        }
        if let Some(rounding) = self.rounding {
            config.rounding_enabled = rounding;
        }
        if let Some(weekend) = self.weekend_all_overtime {
            config.weekend_all_overtime = weekend;
        }
        if let Some(hours) = self.minimum_daily_hours {
            config.minimum_daily_hours = hours;
        }
        if let Some(hours) = self.daily_regular_hours {
            config.daily_regular_hours = hours;
        }
        if let Some(hours) = self.weekly_regular_hours {
            config.weekly_regular_hours = hours;
        }
        if let Some(hours) = self.wtl_bonus_hours {
            config.wtl_bonus_hours = hours;
        }
    }
}

/// Layers the CLI over the environment, then validates the result once.
fn resolve_config(args: &Args, mut config: PayrollConfig) -> Result<PayrollConfig> {
    args.apply_overrides(&mut config);
    config.validate().context("Invalid payroll configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();

    dotenv::dotenv().ok();
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let config = PayrollConfig::from_env().context("Failed to load payroll configuration")?;
    let config = resolve_config(&args, config)?;

    let punches = load_punches(&args.punches)
        .with_context(|| format!("Failed to read punches from {}", args.punches.display()))?;
    let roster = load_roster(&args.roster)
        .with_context(|| format!("Failed to read roster from {}", args.roster.display()))?;

    let outcome = PayrollRun::new(config).execute_loaded(&punches, &roster);
    write_reports(&args.out_dir, &outcome)
        .with_context(|| format!("Failed to write reports to {}", args.out_dir.display()))?;

    let summary = outcome.summary();
    if summary.parse_failures > 0 {
        warn!(
            "{} rows could not be parsed; see parse_errors.csv",
            summary.parse_failures
        );
    }
    info!(
        "Payroll run complete: {} records, {} errors, regular={}h, overtime={}h, held={}h, bonus={}h",
        summary.payroll_records,
        summary.error_records,
        summary.regular_hours,
        summary.overtime_hours,
        summary.held_hours,
        summary.bonus_hours
    );
    Ok(())
}
