// src/config.rs
use clap::ValueEnum;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PayrollError;

// --- Policy switches ---

/// How adjusted hours are split into regular and overtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum OvertimePolicy {
    /// Regular hours capped per employee per ticket date.
    Daily,
    /// Regular hours capped per employee per week, consumed in date order.
    WeeklyRolling,
}

/// When the weekly regular-hours budget starts over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum WeeklyReset {
    /// Budget resets every ISO week (Monday to Sunday).
    IsoWeek,
    /// One budget for the whole input file.
    Never,
}

/// What happens to overtime hours that have no approved-overtime window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum UnapprovedOvertime {
    /// Paid as overtime and flagged.
    Pay,
    /// Moved out of overtime into held hours and flagged.
    Hold,
}

/// Which keys the roster is joined on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RosterJoin {
    EmployeeDateJob,
    EmployeeDate,
}

// --- Defaults ---

fn default_lunch_threshold() -> Decimal {
    dec!(5)
}
fn default_lunch_deduction() -> Decimal {
    dec!(0.5)
}
fn default_overtime_policy() -> OvertimePolicy {
    OvertimePolicy::WeeklyRolling
}
fn default_weekly_reset() -> WeeklyReset {
    WeeklyReset::IsoWeek
}
fn default_unapproved_overtime() -> UnapprovedOvertime {
    UnapprovedOvertime::Pay
}
fn default_agency() -> String {
    "CSI".to_string()
}
fn default_unassigned_label() -> String {
    "NEEDS TO BE ASSIGNED".to_string()
}
fn default_true() -> bool {
    true
}
fn default_roster_join() -> RosterJoin {
    RosterJoin::EmployeeDateJob
}
fn default_eight() -> Decimal {
    dec!(8)
}
fn default_forty() -> Decimal {
    dec!(40)
}

// --- Configuration ---

/// Options recognised by a payroll run. Read from `PAYROLL_*` environment
/// variables (a `.env` file is honoured); the CLI may override any field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayrollConfig {
    /// 0 deducts lunch from every shift; 5 only from shifts of at least 5h.
    #[serde(default = "default_lunch_threshold", with = "rust_decimal::serde::str")]
    pub lunch_deduction_threshold_hours: Decimal,
    #[serde(default = "default_lunch_deduction", with = "rust_decimal::serde::str")]
    pub lunch_deduction_hours: Decimal,
    #[serde(default = "default_overtime_policy")]
    pub overtime_policy: OvertimePolicy,
    #[serde(default = "default_weekly_reset")]
    pub weekly_reset: WeeklyReset,
    #[serde(default = "default_unapproved_overtime")]
    pub unapproved_overtime: UnapprovedOvertime,
    #[serde(default = "default_agency")]
    pub default_agency: String,
    #[serde(default = "default_unassigned_label")]
    pub unassigned_label: String,
    #[serde(default)]
    pub rounding_enabled: bool,
    #[serde(default = "default_true")]
    pub weekend_all_overtime: bool,
    #[serde(default = "default_roster_join")]
    pub roster_join: RosterJoin,
    #[serde(default = "default_eight", with = "rust_decimal::serde::str")]
    pub minimum_daily_hours: Decimal,
    #[serde(default = "default_eight", with = "rust_decimal::serde::str")]
    pub daily_regular_hours: Decimal,
    #[serde(default = "default_forty", with = "rust_decimal::serde::str")]
    pub weekly_regular_hours: Decimal,
    #[serde(default = "default_lunch_deduction", with = "rust_decimal::serde::str")]
    pub wtl_bonus_hours: Decimal,
}

impl Default for PayrollConfig {
    fn default() -> Self {
        Self {
            lunch_deduction_threshold_hours: default_lunch_threshold(),
            lunch_deduction_hours: default_lunch_deduction(),
            overtime_policy: default_overtime_policy(),
            weekly_reset: default_weekly_reset(),
            unapproved_overtime: default_unapproved_overtime(),
            default_agency: default_agency(),
            unassigned_label: default_unassigned_label(),
            rounding_enabled: false,
            weekend_all_overtime: true,
            roster_join: default_roster_join(),
            minimum_daily_hours: default_eight(),
            daily_regular_hours: default_eight(),
            weekly_regular_hours: default_forty(),
            wtl_bonus_hours: default_lunch_deduction(),
        }
    }
}

impl PayrollConfig {
    pub const ENV_PREFIX: &'static str = "PAYROLL_";

    /// Loads `PAYROLL_*` settings from the environment (and `.env`). Values
    /// are not validated here; callers validate once their overrides are in.
    pub fn from_env() -> Result<Self, PayrollError> {
        // Load .env file if it exists
        dotenv::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, PayrollError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::prefixed(Self::ENV_PREFIX).from_iter::<_, PayrollConfig>(vars)?;
        info!(
            "Payroll configuration loaded: policy={:?}, lunch threshold={}h, rounding={}",
            config.overtime_policy, config.lunch_deduction_threshold_hours, config.rounding_enabled
        );
        Ok(config)
    }

    /// Rejects values that would make the allocation meaningless.
    pub fn validate(&self) -> Result<(), PayrollError> {
        let non_negative = [
            ("lunch_deduction_threshold_hours", self.lunch_deduction_threshold_hours),
            ("lunch_deduction_hours", self.lunch_deduction_hours),
            ("minimum_daily_hours", self.minimum_daily_hours),
            ("daily_regular_hours", self.daily_regular_hours),
            ("weekly_regular_hours", self.weekly_regular_hours),
            ("wtl_bonus_hours", self.wtl_bonus_hours),
        ];
        for (field, value) in non_negative {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(PayrollError::InvalidConfig {
                    field,
                    reason: format!("must not be negative, got {}", value),
                });
            }
        }
        if self.default_agency.trim().is_empty() {
            return Err(PayrollError::InvalidConfig {
                field: "default_agency",
                reason: "must not be blank".to_string(),
            });
        }
        Ok(())
    }
}
