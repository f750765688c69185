// src/overtime_tests.rs

#[cfg(test)]
mod tests {
    use crate::config::{OvertimePolicy, PayrollConfig, UnapprovedOvertime, WeeklyReset};
    use crate::models::{Hours, MergedRecord};
    use crate::overtime::*;
    use crate::test_support::{approved, record};
    use rust_decimal_macros::dec;

    fn daily() -> PayrollConfig {
        PayrollConfig {
            overtime_policy: OvertimePolicy::Daily,
            ..PayrollConfig::default()
        }
    }

    fn weekly() -> PayrollConfig {
        PayrollConfig::default()
    }

    fn by_row(records: &[MergedRecord], row: usize) -> &MergedRecord {
        records
            .iter()
            .find(|r| r.entry.row == row)
            .unwrap_or_else(|| panic!("row {} missing from allocation", row))
    }

    // --- split_entry ---

    #[test]
    fn test_split_entry_within_budget() {
        let split = split_entry(dec!(6), false, dec!(8));
        assert_eq!(split.regular, dec!(6));
        assert_eq!(split.overtime, dec!(0));
        assert_eq!(split.remaining_budget, dec!(2));
    }

    #[test]
    fn test_split_entry_exceeding_budget() {
        let split = split_entry(dec!(30), false, dec!(24));
        assert_eq!(split.regular, dec!(24));
        assert_eq!(split.overtime, dec!(6));
        assert_eq!(split.remaining_budget, dec!(0));
    }

    #[test]
    fn test_split_entry_weekend_keeps_budget() {
        let split = split_entry(dec!(5), true, dec!(40));
        assert_eq!(split.regular, dec!(0));
        assert_eq!(split.overtime, dec!(5));
        assert_eq!(split.remaining_budget, dec!(40));
    }

    #[test]
    fn test_split_entry_negative_hours_stay_regular() {
        let split = split_entry(dec!(-0.5), false, dec!(8));
        assert_eq!(split.regular, dec!(-0.5));
        assert_eq!(split.overtime, dec!(0));
        assert_eq!(split.remaining_budget, dec!(8));
    }

    // --- Daily policy ---

    #[test]
    fn test_daily_ten_hour_weekday_splits_eight_two() {
        let config = daily();
        let allocated = OvertimeAllocator::new(&config)
            .allocate(vec![record(1, "Doe, Jane", "2024-03-04", Some(dec!(10)))]);

        assert_eq!(allocated[0].split.regular, dec!(8));
        assert_eq!(allocated[0].split.overtime, dec!(2));
        assert_eq!(allocated[0].split.held, dec!(0));
    }

    #[test]
    fn test_daily_budget_resets_each_day() {
        let config = daily();
        let allocated = OvertimeAllocator::new(&config).allocate(vec![
            record(1, "Doe, Jane", "2024-03-04", Some(dec!(10))),
            record(2, "Doe, Jane", "2024-03-05", Some(dec!(7))),
        ]);

        assert_eq!(by_row(&allocated, 2).split.regular, dec!(7));
        assert_eq!(by_row(&allocated, 2).split.overtime, dec!(0));
    }

    #[test]
    fn test_same_day_entries_consume_budget_in_encounter_order() {
        let config = daily();
        let allocated = OvertimeAllocator::new(&config).allocate(vec![
            record(1, "Doe, Jane", "2024-03-04", Some(dec!(6))),
            record(2, "Doe, Jane", "2024-03-04", Some(dec!(5))),
        ]);

        let first = by_row(&allocated, 1);
        let second = by_row(&allocated, 2);
        assert_eq!((first.split.regular, first.split.overtime), (dec!(6), dec!(0)));
        assert_eq!((second.split.regular, second.split.overtime), (dec!(2), dec!(3)));
    }

    // --- Weekly-rolling policy ---

    #[test]
    fn test_weekly_rolling_budget_sequence() {
        let config = weekly();
        let allocated = OvertimeAllocator::new(&config).allocate(vec![
            record(1, "Doe, Jane", "2024-03-04", Some(dec!(8))),
            record(2, "Doe, Jane", "2024-03-05", Some(dec!(8))),
            record(3, "Doe, Jane", "2024-03-06", Some(dec!(30))),
        ]);

        assert_eq!(by_row(&allocated, 1).split.regular, dec!(8));
        assert_eq!(by_row(&allocated, 2).split.regular, dec!(8));
        let third = by_row(&allocated, 3);
        assert_eq!(third.split.regular, dec!(24));
        assert_eq!(third.split.overtime, dec!(6));

        let balances: Vec<Option<Hours>> = allocated.iter().map(|r| r.remaining_balance).collect();
        assert_eq!(balances, vec![Some(dec!(-32)), Some(dec!(-24)), Some(dec!(6))]);
    }

    #[test]
    fn test_weekly_budget_resets_on_iso_week() {
        let config = weekly();
        let allocated = OvertimeAllocator::new(&config).allocate(vec![
            record(1, "Doe, Jane", "2024-03-04", Some(dec!(40))),
            record(2, "Doe, Jane", "2024-03-11", Some(dec!(10))),
        ]);

        assert_eq!(by_row(&allocated, 2).split.regular, dec!(10));
        assert_eq!(by_row(&allocated, 2).split.overtime, dec!(0));
        assert_eq!(by_row(&allocated, 2).remaining_balance, Some(dec!(-30)));
    }

    #[test]
    fn test_weekly_budget_never_resets_when_configured() {
        let config = PayrollConfig {
            weekly_reset: WeeklyReset::Never,
            ..PayrollConfig::default()
        };
        let allocated = OvertimeAllocator::new(&config).allocate(vec![
            record(1, "Doe, Jane", "2024-03-04", Some(dec!(40))),
            record(2, "Doe, Jane", "2024-03-11", Some(dec!(10))),
        ]);

        assert_eq!(by_row(&allocated, 2).split.regular, dec!(0));
        assert_eq!(by_row(&allocated, 2).split.overtime, dec!(10));
        assert_eq!(by_row(&allocated, 2).remaining_balance, Some(dec!(10)));
    }

    #[test]
    fn test_employees_have_separate_budgets() {
        let config = weekly();
        let allocated = OvertimeAllocator::new(&config).allocate(vec![
            record(1, "Doe, Jane", "2024-03-04", Some(dec!(45))),
            record(2, "Roe, Sam", "2024-03-04", Some(dec!(10))),
        ]);

        assert_eq!(by_row(&allocated, 1).split.overtime, dec!(5));
        assert_eq!(by_row(&allocated, 2).split.regular, dec!(10));
        assert_eq!(by_row(&allocated, 2).split.overtime, dec!(0));
    }

    // --- Weekend override ---

    #[test]
    fn test_weekend_entries_have_no_regular_hours() {
        for config in [daily(), weekly()] {
            let allocated = OvertimeAllocator::new(&config).allocate(vec![
                record(1, "Doe, Jane", "2024-03-09", Some(dec!(6))),
                record(2, "Doe, Jane", "2024-03-10", Some(dec!(3))),
            ]);
            for allocated_record in &allocated {
                assert_eq!(allocated_record.split.regular, dec!(0));
            }
            assert_eq!(by_row(&allocated, 1).split.overtime, dec!(6));
            assert_eq!(by_row(&allocated, 2).split.overtime, dec!(3));
        }
    }

    #[test]
    fn test_weekend_hours_do_not_consume_weekly_budget() {
        let config = PayrollConfig {
            weekly_reset: WeeklyReset::Never,
            ..PayrollConfig::default()
        };
        let allocated = OvertimeAllocator::new(&config).allocate(vec![
            record(1, "Doe, Jane", "2024-03-09", Some(dec!(6))),
            record(2, "Doe, Jane", "2024-03-11", Some(dec!(40))),
        ]);

        assert_eq!(by_row(&allocated, 2).split.regular, dec!(40));
        assert_eq!(by_row(&allocated, 2).split.overtime, dec!(0));
    }

    #[test]
    fn test_weekend_override_can_be_disabled() {
        let config = PayrollConfig {
            weekend_all_overtime: false,
            ..daily()
        };
        let allocated = OvertimeAllocator::new(&config)
            .allocate(vec![record(1, "Doe, Jane", "2024-03-09", Some(dec!(6)))]);

        assert_eq!(allocated[0].split.regular, dec!(6));
        assert_eq!(allocated[0].split.overtime, dec!(0));
    }

    // --- Approval ---

    #[test]
    fn test_unapproved_overtime_is_paid_and_flagged_by_default() {
        let config = daily();
        let allocated = OvertimeAllocator::new(&config)
            .allocate(vec![record(1, "Doe, Jane", "2024-03-04", Some(dec!(10)))]);

        assert!(allocated[0].unapproved_overtime);
        assert_eq!(allocated[0].split.overtime, dec!(2));
        assert_eq!(allocated[0].split.held, dec!(0));
    }

    #[test]
    fn test_hold_policy_moves_unapproved_overtime_to_held() {
        let config = PayrollConfig {
            unapproved_overtime: UnapprovedOvertime::Hold,
            ..daily()
        };
        let allocated = OvertimeAllocator::new(&config).allocate(vec![
            record(1, "Doe, Jane", "2024-03-04", Some(dec!(10))),
            approved(record(2, "Roe, Sam", "2024-03-04", Some(dec!(10)))),
        ]);

        let unapproved = by_row(&allocated, 1);
        assert!(unapproved.unapproved_overtime);
        assert_eq!(unapproved.split.regular, dec!(8));
        assert_eq!(unapproved.split.overtime, dec!(0));
        assert_eq!(unapproved.split.held, dec!(2));

        let approved_record = by_row(&allocated, 2);
        assert!(!approved_record.unapproved_overtime);
        assert_eq!(approved_record.split.overtime, dec!(2));
        assert_eq!(approved_record.split.held, dec!(0));
    }

    #[test]
    fn test_regular_only_entry_is_never_flagged() {
        let config = weekly();
        let allocated = OvertimeAllocator::new(&config)
            .allocate(vec![record(1, "Doe, Jane", "2024-03-04", Some(dec!(8)))]);

        assert!(!allocated[0].unapproved_overtime);
    }

    // --- Missing punches and invariants ---

    #[test]
    fn test_missing_punch_contributes_nothing() {
        let config = daily();
        let allocated = OvertimeAllocator::new(&config).allocate(vec![
            record(1, "Doe, Jane", "2024-03-04", None),
            record(2, "Doe, Jane", "2024-03-04", Some(dec!(10))),
        ]);

        let missing = by_row(&allocated, 1);
        assert_eq!(missing.split.regular, dec!(0));
        assert_eq!(missing.split.overtime, dec!(0));
        assert_eq!(missing.remaining_balance, None);
        assert!(!missing.unapproved_overtime);

        let full = by_row(&allocated, 2);
        assert_eq!((full.split.regular, full.split.overtime), (dec!(8), dec!(2)));
    }

    #[test]
    fn test_split_always_sums_to_adjusted_hours() {
        let hours = [
            ("2024-03-04", dec!(9.75)),
            ("2024-03-05", dec!(12.25)),
            ("2024-03-06", dec!(7.5)),
            ("2024-03-07", dec!(11)),
            ("2024-03-08", dec!(4.25)),
            ("2024-03-09", dec!(6)),
            ("2024-03-11", dec!(13.5)),
        ];
        for policy in [OvertimePolicy::Daily, OvertimePolicy::WeeklyRolling] {
            for unapproved in [UnapprovedOvertime::Pay, UnapprovedOvertime::Hold] {
                let config = PayrollConfig {
                    overtime_policy: policy,
                    unapproved_overtime: unapproved,
                    ..PayrollConfig::default()
                };
                let records = hours
                    .iter()
                    .enumerate()
                    .map(|(i, (date, h))| record(i + 1, "Doe, Jane", date, Some(*h)))
                    .collect();
                for allocated in OvertimeAllocator::new(&config).allocate(records) {
                    assert_eq!(
                        allocated.split.total(),
                        allocated.base_hours().unwrap_or_default(),
                        "row {} under {:?}/{:?}",
                        allocated.entry.row,
                        policy,
                        unapproved
                    );
                }
            }
        }
    }

    #[test]
    fn test_allocation_orders_by_employee_then_date() {
        let config = weekly();
        let allocated = OvertimeAllocator::new(&config).allocate(vec![
            record(1, "Roe, Sam", "2024-03-04", Some(dec!(8))),
            record(2, "Doe, Jane", "2024-03-05", Some(dec!(8))),
            record(3, "Doe, Jane", "2024-03-04", Some(dec!(8))),
        ]);

        let rows: Vec<usize> = allocated.iter().map(|r| r.entry.row).collect();
        assert_eq!(rows, vec![3, 2, 1]);
    }
}
