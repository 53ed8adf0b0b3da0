//! Constraint validation: per-kind value ranges and mutual compatibility.

use std::collections::HashSet;

use crate::model::{Constraint, ConstraintKind, ValidationReport, ViolationKind};

pub(super) fn check(constraints: &[Constraint]) -> ValidationReport {
    let mut report = ValidationReport::new();

    if constraints.is_empty() {
        report.violation(
            ViolationKind::MissingConstraints,
            "At least one constraint is required",
        );
        return report;
    }

    let mut seen = HashSet::new();
    if !constraints.iter().all(|c| seen.insert(c.kind)) {
        report.violation(
            ViolationKind::ConstraintError,
            "Duplicate constraint types are not allowed",
        );
    }

    for constraint in constraints {
        check_value(constraint, &mut report);
    }
    check_compatibility(constraints, &mut report);

    report
}

fn check_value(constraint: &Constraint, report: &mut ValidationReport) {
    if constraint.value <= 0.0 {
        report.violation(
            ViolationKind::ConstraintValueError,
            format!("Constraint value must be positive: {}", constraint.value),
        );
        return;
    }

    match constraint.kind {
        ConstraintKind::FuyouLimit => {
            if constraint.value > 5_000_000.0 {
                report.warn(format!(
                    "Fuyou limit seems very high: {} yen",
                    constraint.value
                ));
                report.suggest("Consider double-checking the fuyou limit value");
            } else if constraint.value < 500_000.0 {
                report.warn(format!(
                    "Fuyou limit seems very low: {} yen",
                    constraint.value
                ));
            }
        }
        ConstraintKind::DailyHours => {
            if constraint.value > 16.0 {
                report.violation(
                    ViolationKind::ConstraintValueError,
                    format!("Daily hours limit too high: {} hours", constraint.value),
                );
                report.suggest("Consider setting daily hours limit to 8-12 hours");
            } else if constraint.value < 1.0 {
                report.violation(
                    ViolationKind::ConstraintValueError,
                    format!("Daily hours limit too low: {} hours", constraint.value),
                );
            }
        }
        ConstraintKind::WeeklyHours => {
            if constraint.value > 80.0 {
                report.warn(format!(
                    "Weekly hours limit very high: {} hours",
                    constraint.value
                ));
                report.suggest("Consider reducing weekly hours for better work-life balance");
            } else if constraint.value < 5.0 {
                report.warn(format!(
                    "Weekly hours limit very low: {} hours",
                    constraint.value
                ));
            }
        }
        _ => {}
    }
}

fn check_compatibility(constraints: &[Constraint], report: &mut ValidationReport) {
    let find = |kind| constraints.iter().find(|c| c.kind == kind);
    let daily = find(ConstraintKind::DailyHours);
    let weekly = find(ConstraintKind::WeeklyHours);
    let fuyou = find(ConstraintKind::FuyouLimit);

    if let (Some(daily), Some(weekly)) = (daily, weekly) {
        let max_weekly_from_daily = daily.value * 7.0;
        if weekly.value > max_weekly_from_daily {
            report.violation(
                ViolationKind::ConstraintCompatibilityError,
                format!(
                    "Weekly hours limit ({}) is inconsistent with daily hours limit ({})",
                    weekly.value, daily.value
                ),
            );
            report.suggest(format!(
                "Consider setting weekly hours to {max_weekly_from_daily} or less"
            ));
        }
    }

    if let (Some(fuyou), Some(weekly)) = (fuyou, weekly) {
        // Rough annual projection at a 1000 yen/hour floor.
        let max_annual_income = weekly.value * 1000.0 * 52.0;
        if max_annual_income > fuyou.value * 2.0 {
            report.warn("Weekly hours limit may result in income exceeding fuyou limit");
            report.suggest("Consider reducing weekly hours or increasing fuyou limit");
        }
    }
}
