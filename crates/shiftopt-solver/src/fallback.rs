//! Deterministic fallback schedule.
//!
//! Produced whenever a strategy cannot converge: one moderate shift per day
//! at the highest-paying job over the first week, stopping once earnings
//! reach 80% of the fuyou limit. Low confidence, never an error.

use serde_json::json;
use shiftopt_core::model::ConstraintKind;
use tracing::info;

use crate::engine::SolverOutcome;
use crate::problem::Problem;
use crate::roster::make_shift;

pub(crate) fn fallback_outcome(problem: &Problem, reason: &str) -> SolverOutcome {
    info!(reason, "using deterministic fallback solution");

    let Some(best_job) = problem.best_job() else {
        return SolverOutcome {
            shifts: Vec::new(),
            objective_value: 0.0,
            confidence_score: 0.1,
            metadata: [
                ("algorithm".to_string(), json!("fallback")),
                ("reason".to_string(), json!("no_job_sources")),
            ]
            .into_iter()
            .collect(),
        };
    };

    let mut daily_limit: f64 = 8.0;
    if let Some(limit) = problem.constraint_value(ConstraintKind::DailyHours) {
        daily_limit = daily_limit.min(limit);
    }
    let shift_hours = daily_limit.min(6.0);
    let duration_minutes = (shift_hours * 60.0).round() as i64;
    let fuyou_limit = problem.constraint_value(ConstraintKind::FuyouLimit);

    let mut shifts = Vec::new();
    let mut cumulative = 0.0;
    for date in problem.dates.iter().take(7) {
        cumulative += shift_hours * best_job.hourly_rate;
        if let Some(limit) = fuyou_limit {
            if cumulative > limit * 0.8 {
                break;
            }
        }
        shifts.push(make_shift(
            best_job,
            *date,
            10,
            duration_minutes,
            0.5,
            2,
            "Fallback solution: simple shift at highest paying job".to_string(),
        ));
    }

    let total_income: f64 = shifts.iter().map(|s| s.calculated_earnings).sum();
    SolverOutcome {
        shifts,
        objective_value: total_income,
        confidence_score: 0.5,
        metadata: [
            ("algorithm".to_string(), json!("fallback")),
            ("reason".to_string(), json!(reason)),
        ]
        .into_iter()
        .collect(),
    }
}

#[cfg(test)]
mod tests {
    use shiftopt_core::model::{Constraint, ConstraintUnit};

    use super::*;
    use crate::roster::tests::problem;

    #[test]
    fn schedules_up_to_a_week_at_the_best_job() {
        let problem = problem(30, &[1000.0, 1500.0]);
        let outcome = fallback_outcome(&problem, "optimization_failed");
        assert_eq!(outcome.shifts.len(), 7);
        assert!(outcome.shifts.iter().all(|s| s.hourly_rate == 1500.0));
        assert!(outcome.shifts.iter().all(|s| s.working_hours == 6.0));
        assert_eq!(outcome.confidence_score, 0.5);
        assert_eq!(outcome.metadata["reason"], "optimization_failed");
    }

    #[test]
    fn stops_at_eighty_percent_of_fuyou() {
        let mut p = problem(30, &[1000.0]);
        // 6h * 1000 = 6000 yen per day; 80% of 20_000 is 16_000, so the
        // third day's cumulative 18_000 crosses the line.
        p.constraints.insert(
            ConstraintKind::FuyouLimit,
            Constraint {
                kind: ConstraintKind::FuyouLimit,
                value: 20_000.0,
                unit: ConstraintUnit::Yen,
                priority: 1,
                metadata: Default::default(),
            },
        );
        let outcome = fallback_outcome(&p, "optimization_failed");
        assert_eq!(outcome.shifts.len(), 2);
        assert_eq!(outcome.objective_value, 12_000.0);
    }

    #[test]
    fn respects_tight_daily_limits() {
        let mut p = problem(10, &[1000.0]);
        p.constraints.insert(
            ConstraintKind::DailyHours,
            Constraint {
                kind: ConstraintKind::DailyHours,
                value: 4.0,
                unit: ConstraintUnit::Hours,
                priority: 1,
                metadata: Default::default(),
            },
        );
        let outcome = fallback_outcome(&p, "x");
        assert!(outcome.shifts.iter().all(|s| s.working_hours == 4.0));
    }
}
