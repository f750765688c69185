// src/overtime.rs
//! Regular/overtime allocation.
//!
//! Entries are folded per employee in (ticket date, encounter) order. A
//! regular-hours budget is threaded through the fold and starts over at
//! each budget window: every ticket date under the daily policy, every ISO
//! week (or never) under the weekly-rolling policy. Earlier entries consume
//! the budget first.

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info};

use crate::config::{OvertimePolicy, PayrollConfig, UnapprovedOvertime, WeeklyReset};
use crate::models::{HourSplit, Hours, MergedRecord};

/// The period over which one regular-hours budget applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BudgetWindow {
    Day(NaiveDate),
    IsoWeek { year: i32, week: u32 },
    Whole,
}

/// Outcome of splitting a single entry's hours against a budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntrySplit {
    pub regular: Hours,
    pub overtime: Hours,
    /// Budget left for the entries that follow in the same window.
    pub remaining_budget: Hours,
}

/// Splits one entry's hours against the remaining regular budget.
///
/// Weekend entries (when the override is on) are all overtime and leave the
/// budget untouched. Zero or negative hours count as regular without
/// touching the budget.
pub fn split_entry(hours: Hours, weekend_override: bool, budget: Hours) -> EntrySplit {
    if weekend_override {
        return EntrySplit {
            regular: Hours::ZERO,
            overtime: hours,
            remaining_budget: budget,
        };
    }
    if hours <= Hours::ZERO {
        return EntrySplit {
            regular: hours,
            overtime: Hours::ZERO,
            remaining_budget: budget,
        };
    }
    if budget <= Hours::ZERO {
        EntrySplit {
            regular: Hours::ZERO,
            overtime: hours,
            remaining_budget: Hours::ZERO,
        }
    } else if hours <= budget {
        EntrySplit {
            regular: hours,
            overtime: Hours::ZERO,
            remaining_budget: budget - hours,
        }
    } else {
        EntrySplit {
            regular: budget,
            overtime: hours - budget,
            remaining_budget: Hours::ZERO,
        }
    }
}

/// Budget and running total carried from one entry to the next.
#[derive(Debug, Clone, Copy)]
struct FoldState {
    budget_window: Option<BudgetWindow>,
    budget: Hours,
    balance_window: Option<BudgetWindow>,
    cumulative: Hours,
}

impl FoldState {
    fn start() -> Self {
        Self {
            budget_window: None,
            budget: Hours::ZERO,
            balance_window: None,
            cumulative: Hours::ZERO,
        }
    }
}

pub struct OvertimeAllocator<'a> {
    config: &'a PayrollConfig,
}

impl<'a> OvertimeAllocator<'a> {
    pub fn new(config: &'a PayrollConfig) -> Self {
        Self { config }
    }

    fn week_window(&self, date: NaiveDate) -> BudgetWindow {
        match self.config.weekly_reset {
            WeeklyReset::IsoWeek => {
                let iso = date.iso_week();
                BudgetWindow::IsoWeek {
                    year: iso.year(),
                    week: iso.week(),
                }
            }
            WeeklyReset::Never => BudgetWindow::Whole,
        }
    }

    fn budget_window(&self, date: NaiveDate) -> BudgetWindow {
        match self.config.overtime_policy {
            OvertimePolicy::Daily => BudgetWindow::Day(date),
            OvertimePolicy::WeeklyRolling => self.week_window(date),
        }
    }

    fn window_budget(&self) -> Hours {
        match self.config.overtime_policy {
            OvertimePolicy::Daily => self.config.daily_regular_hours,
            OvertimePolicy::WeeklyRolling => self.config.weekly_regular_hours,
        }
    }

    /// Allocates one record, returning it with its split filled in and the
    /// state for the next record.
    fn step(&self, state: FoldState, record: MergedRecord) -> (FoldState, MergedRecord) {
        let date = record.entry.ticket_date;
        let mut state = state;

        let budget_window = self.budget_window(date);
        if state.budget_window != Some(budget_window) {
            state.budget_window = Some(budget_window);
            state.budget = self.window_budget();
        }
        let balance_window = self.week_window(date);
        if state.balance_window != Some(balance_window) {
            state.balance_window = Some(balance_window);
            state.cumulative = Hours::ZERO;
        }

        let Some(hours) = record.base_hours() else {
            // Missing punch: contributes nothing to either bucket.
            let record = MergedRecord {
                split: HourSplit::default(),
                remaining_balance: None,
                unapproved_overtime: false,
                ..record
            };
            return (state, record);
        };

        let weekend_override = self.config.weekend_all_overtime && record.entry.is_weekend();
        let split = split_entry(hours, weekend_override, state.budget);
        state.budget = split.remaining_budget;
        state.cumulative += hours;

        let unapproved = split.overtime > Hours::ZERO && !record.has_approved_overtime();
        let hour_split = if unapproved && self.config.unapproved_overtime == UnapprovedOvertime::Hold {
            HourSplit {
                regular: split.regular,
                overtime: Hours::ZERO,
                held: split.overtime,
            }
        } else {
            HourSplit {
                regular: split.regular,
                overtime: split.overtime,
                held: Hours::ZERO,
            }
        };

        let record = MergedRecord {
            split: hour_split,
            remaining_balance: Some(state.cumulative - self.config.weekly_regular_hours),
            unapproved_overtime: unapproved,
            ..record
        };
        (state, record)
    }

    fn allocate_employee(&self, records: Vec<MergedRecord>) -> Vec<MergedRecord> {
        let employee = records
            .first()
            .map(|r| r.entry.employee_name.clone())
            .unwrap_or_default();

        let (_, allocated) = records.into_iter().fold(
            (FoldState::start(), Vec::new()),
            |(state, mut done), record| {
                let (next, record) = self.step(state, record);
                done.push(record);
                (next, done)
            },
        );

        let regular: Hours = allocated.iter().map(|r| r.split.regular).sum();
        let overtime: Hours = allocated.iter().map(|r| r.split.overtime).sum();
        let held: Hours = allocated.iter().map(|r| r.split.held).sum();
        debug!(
            "Allocated {}: regular={}h, overtime={}h, held={}h over {} entries",
            employee,
            regular,
            overtime,
            held,
            allocated.len()
        );
        allocated
    }

    /// Splits every record's base hours into regular / overtime / held.
    ///
    /// Records are returned in stable (employee, ticket date) order; the
    /// input order decides which same-day entries consume the budget first.
    pub fn allocate(&self, records: Vec<MergedRecord>) -> Vec<MergedRecord> {
        let mut records = records;
        records.sort_by(|a, b| {
            (a.entry.employee_name.as_str(), a.entry.ticket_date)
                .cmp(&(b.entry.employee_name.as_str(), b.entry.ticket_date))
        });

        let mut allocated = Vec::with_capacity(records.len());
        let mut group: Vec<MergedRecord> = Vec::new();
        for record in records {
            let same_employee = group
                .last()
                .map_or(true, |last| last.entry.employee_name == record.entry.employee_name);
            if !same_employee {
                allocated.extend(self.allocate_employee(std::mem::take(&mut group)));
            }
            group.push(record);
        }
        if !group.is_empty() {
            allocated.extend(self.allocate_employee(group));
        }

        let flagged = allocated.iter().filter(|r| r.unapproved_overtime).count();
        info!(
            "Allocated {} records under {:?} policy ({} with unapproved overtime)",
            allocated.len(),
            self.config.overtime_policy,
            flagged
        );
        allocated
    }
}
