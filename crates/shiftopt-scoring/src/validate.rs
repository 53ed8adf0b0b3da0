//! Post-solve solution validation.
//!
//! Three parallel checks over a produced solution: structural consistency,
//! constraint satisfaction against the original request, and shift
//! feasibility. Violations do not discard the solution; callers halve its
//! confidence and surface the report.

use std::collections::HashMap;

use chrono::NaiveDate;
use shiftopt_core::model::{
    Constraint, ConstraintKind, OptimizationSolution, SuggestedShift, ValidationReport,
    ViolationKind,
};
use shiftopt_core::time::{overlaps, span_hours};
use tracing::debug;

use crate::objective::{daily_hours, weekly_hours};

/// Tolerance for money/hour sum comparisons.
const EPSILON: f64 = 0.01;

/// Validates optimization solutions against the request that produced them.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolutionValidator;

impl SolutionValidator {
    pub fn new() -> Self {
        SolutionValidator
    }

    pub fn validate_solution(
        &self,
        solution: &OptimizationSolution,
        constraints: &[Constraint],
    ) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.merge(check_structure(solution));
        report.merge(check_constraints(solution, constraints));
        report.merge(check_feasibility(&solution.suggested_shifts));
        let report = report.finish();
        if !report.is_valid {
            debug!(
                violations = report.violations.len(),
                "solution failed post-solve validation"
            );
        }
        report
    }

    /// Constraint kinds the solution fails to satisfy; feeds the
    /// per-constraint violation metrics.
    pub fn unsatisfied_kinds(&self, solution: &OptimizationSolution) -> Vec<ConstraintKind> {
        solution
            .constraints_satisfied
            .iter()
            .filter(|(_, ok)| !**ok)
            .map(|(kind, _)| *kind)
            .collect()
    }
}

fn check_structure(solution: &OptimizationSolution) -> ValidationReport {
    let mut report = ValidationReport::new();

    if solution.suggested_shifts.is_empty() {
        report.violation(
            ViolationKind::EmptySolution,
            "Solution must contain at least one suggested shift",
        );
        return report;
    }

    if !(0.0..=1.0).contains(&solution.confidence_score) {
        report.violation(
            ViolationKind::StructureError,
            format!("Invalid confidence score: {}", solution.confidence_score),
        );
    } else if solution.confidence_score < 0.5 {
        report.warn(format!(
            "Low confidence score: {}",
            solution.confidence_score
        ));
        report.suggest("Consider reviewing the optimization parameters or constraints");
    }

    if solution.objective_value < 0.0 {
        report.warn(format!(
            "Negative objective value: {}",
            solution.objective_value
        ));
    }

    let income: f64 = solution
        .suggested_shifts
        .iter()
        .map(|s| s.calculated_earnings)
        .sum();
    if (income - solution.total_income).abs() > EPSILON {
        report.violation(
            ViolationKind::StructureError,
            format!(
                "Income calculation inconsistent: calculated={income}, reported={}",
                solution.total_income
            ),
        );
    }

    let hours: f64 = solution
        .suggested_shifts
        .iter()
        .map(|s| s.working_hours)
        .sum();
    if (hours - solution.total_hours).abs() > EPSILON {
        report.violation(
            ViolationKind::StructureError,
            format!(
                "Hours calculation inconsistent: calculated={hours}, reported={}",
                solution.total_hours
            ),
        );
    }

    report
}

fn check_constraints(
    solution: &OptimizationSolution,
    constraints: &[Constraint],
) -> ValidationReport {
    let mut report = ValidationReport::new();

    for constraint in constraints {
        match constraint.kind {
            ConstraintKind::FuyouLimit => {
                if solution.total_income > constraint.value {
                    report.violation(
                        ViolationKind::ConstraintViolation,
                        format!(
                            "Fuyou limit violation: {} > {}",
                            solution.total_income, constraint.value
                        ),
                    );
                    report.suggest("Consider reducing shift hours or hourly rates");
                } else if solution.total_income > constraint.value * 0.9 {
                    report.warn(format!(
                        "Approaching fuyou limit: {} (limit: {})",
                        solution.total_income, constraint.value
                    ));
                }
            }
            ConstraintKind::DailyHours => {
                let max_daily = daily_hours(&solution.suggested_shifts)
                    .values()
                    .fold(0.0_f64, |acc, h| acc.max(*h));
                if max_daily > constraint.value {
                    report.violation(
                        ViolationKind::ConstraintViolation,
                        format!("Daily hours violation: {max_daily} > {}", constraint.value),
                    );
                    report.suggest("Consider reducing daily shift hours");
                } else if max_daily > constraint.value * 0.9 {
                    report.warn(format!(
                        "Approaching daily hours limit: {max_daily} (limit: {})",
                        constraint.value
                    ));
                }
            }
            ConstraintKind::WeeklyHours => {
                let max_weekly = weekly_hours(&solution.suggested_shifts)
                    .values()
                    .fold(0.0_f64, |acc, h| acc.max(*h));
                if max_weekly > constraint.value {
                    report.violation(
                        ViolationKind::ConstraintViolation,
                        format!("Weekly hours violation: {max_weekly} > {}", constraint.value),
                    );
                    report.suggest("Consider reducing weekly shift hours");
                } else if max_weekly > constraint.value * 0.9 {
                    report.warn(format!(
                        "Approaching weekly hours limit: {max_weekly} (limit: {})",
                        constraint.value
                    ));
                }
            }
            // Accepted but with no recomputable effect on solutions.
            _ => {}
        }
    }

    report
}

fn check_feasibility(shifts: &[SuggestedShift]) -> ValidationReport {
    let mut report = ValidationReport::new();

    for (date, pairs) in overlapping_pairs(shifts) {
        for (a, b) in pairs {
            report.violation(
                ViolationKind::FeasibilityError,
                format!(
                    "Overlapping shifts on {date}: {}-{} and {}-{}",
                    a.start_time.format("%H:%M"),
                    a.end_time.format("%H:%M"),
                    b.start_time.format("%H:%M"),
                    b.end_time.format("%H:%M"),
                ),
            );
        }
        report.suggest("Review shift scheduling to avoid overlaps");
    }

    for shift in shifts {
        check_shift(shift, &mut report);
    }

    report
}

fn check_shift(shift: &SuggestedShift, report: &mut ValidationReport) {
    if shift.start_time >= shift.end_time {
        report.violation(
            ViolationKind::ShiftValidationError,
            format!(
                "Invalid shift times: {} to {}",
                shift.start_time.format("%H:%M"),
                shift.end_time.format("%H:%M")
            ),
        );
    } else {
        let span = span_hours(shift.start_time, shift.end_time);
        if span > 12.0 {
            report.warn(format!("Very long shift: {span} hours"));
            report.suggest("Consider breaking long shifts into multiple shorter shifts");
        }
    }

    let expected = shift.working_hours * shift.hourly_rate;
    if (expected - shift.calculated_earnings).abs() > EPSILON {
        report.violation(
            ViolationKind::ShiftValidationError,
            format!(
                "Earnings calculation error: expected {expected}, got {}",
                shift.calculated_earnings
            ),
        );
    }

    if !(0.0..=1.0).contains(&shift.confidence) {
        report.violation(
            ViolationKind::ShiftValidationError,
            format!("Invalid confidence score: {}", shift.confidence),
        );
    } else if shift.confidence < 0.5 {
        report.warn(format!("Low confidence shift: {}", shift.confidence));
    }
}

type OverlapPair<'a> = (&'a SuggestedShift, &'a SuggestedShift);

fn overlapping_pairs(shifts: &[SuggestedShift]) -> HashMap<NaiveDate, Vec<OverlapPair<'_>>> {
    let mut by_date: HashMap<NaiveDate, Vec<&SuggestedShift>> = HashMap::new();
    for shift in shifts {
        by_date.entry(shift.date).or_default().push(shift);
    }

    let mut result: HashMap<NaiveDate, Vec<OverlapPair<'_>>> = HashMap::new();
    for (date, day_shifts) in by_date {
        for (i, a) in day_shifts.iter().enumerate() {
            for b in day_shifts.iter().skip(i + 1) {
                if overlaps(a.start_time, a.end_time, b.start_time, b.end_time) {
                    result.entry(date).or_default().push((a, b));
                }
            }
        }
    }
    result
}
