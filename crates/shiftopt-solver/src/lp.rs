//! Linear-programming strategy.
//!
//! Builds one relaxed binary variable per `(date, job, duration, start)`
//! slot, minimizes the signed objective under daily/weekly/fuyou and
//! pairwise-overlap rows, then lifts every variable above 0.5 into a
//! suggested shift. Numeric failure degrades to the deterministic
//! fallback; the caller never sees which path ran.

use std::collections::HashMap;

use good_lp::{constraint, microlp, variable, variables, Expression, Solution, SolverModel};
use serde_json::json;
use shiftopt_core::model::{AlgorithmKind, ConstraintKind, ObjectiveKind, SolverPreferences};
use shiftopt_core::time::week_key;
use shiftopt_core::{OptimizeError, Result};
use tracing::{debug, warn};

use crate::engine::{SolveContext, SolverOutcome, Strategy};
use crate::fallback::fallback_outcome;
use crate::problem::Problem;
use crate::roster::make_shift;

/// Candidate shift durations, in hours.
const DURATIONS: [i64; 3] = [4, 6, 8];
/// Start-hour window `[8, 20)`; shifts must end by 22:00.
const START_HOURS: std::ops::Range<i64> = 8..20;
const LATEST_END: i64 = 22;

/// One decision variable's slot.
#[derive(Debug, Clone)]
struct Slot {
    date_index: usize,
    job_id: String,
    start: i64,
    end: i64,
    duration: i64,
    rate: f64,
}

impl Slot {
    fn overlaps(&self, other: &Slot) -> bool {
        !(self.end <= other.start || other.end <= self.start)
    }
}

pub struct LinearProgrammingStrategy {
    max_memory_mb: usize,
}

impl LinearProgrammingStrategy {
    pub fn new(max_memory_mb: usize) -> Self {
        LinearProgrammingStrategy { max_memory_mb }
    }

    fn build_slots(problem: &Problem) -> Vec<Slot> {
        let mut slots = Vec::new();
        for (date_index, _) in problem.dates.iter().enumerate() {
            for job in problem.jobs_ordered() {
                for duration in DURATIONS {
                    for start in START_HOURS {
                        if start + duration <= LATEST_END {
                            slots.push(Slot {
                                date_index,
                                job_id: job.id.clone(),
                                start,
                                end: start + duration,
                                duration,
                                rate: job.hourly_rate,
                            });
                        }
                    }
                }
            }
        }
        slots
    }

    /// Rounds the thresholded variables to a feasible roster. A fractional
    /// vertex can lift into a schedule that nudges past a row bound, so
    /// slots are re-admitted greedily (highest relaxation value first)
    /// under the same daily, weekly, fuyou and overlap limits.
    fn repair_lift(
        &self,
        problem: &Problem,
        slots: &[Slot],
        mut lifted: Vec<(usize, f64)>,
    ) -> Vec<shiftopt_core::model::SuggestedShift> {
        lifted.sort_by(|a, b| b.1.total_cmp(&a.1));

        let daily_limit = problem.constraint_value(ConstraintKind::DailyHours);
        let weekly_limit = problem.constraint_value(ConstraintKind::WeeklyHours);
        let income_limit = problem
            .constraint_value(ConstraintKind::FuyouLimit)
            .map(|fuyou| fuyou * problem.dates.len() as f64 / 365.0);

        let mut daily: HashMap<usize, f64> = HashMap::new();
        let mut weekly: HashMap<(i32, u32), f64> = HashMap::new();
        let mut income = 0.0;
        let mut accepted: Vec<usize> = Vec::new();

        'next: for (index, _) in lifted {
            let slot = &slots[index];
            let hours = slot.duration as f64;
            for &other in &accepted {
                if slots[other].date_index == slot.date_index && slots[other].overlaps(slot) {
                    continue 'next;
                }
            }
            if let Some(limit) = daily_limit {
                if daily.get(&slot.date_index).copied().unwrap_or(0.0) + hours > limit {
                    continue;
                }
            }
            let week = week_key(problem.dates[slot.date_index]);
            if let Some(limit) = weekly_limit {
                if weekly.get(&week).copied().unwrap_or(0.0) + hours > limit {
                    continue;
                }
            }
            if let Some(limit) = income_limit {
                if income + slot.rate * hours > limit {
                    continue;
                }
            }
            *daily.entry(slot.date_index).or_insert(0.0) += hours;
            *weekly.entry(week).or_insert(0.0) += hours;
            income += slot.rate * hours;
            accepted.push(index);
        }

        accepted.sort_unstable();
        accepted
            .into_iter()
            .map(|index| {
                let slot = &slots[index];
                let job = &problem.job_sources[&slot.job_id];
                make_shift(
                    job,
                    problem.dates[slot.date_index],
                    slot.start as u32,
                    slot.duration * 60,
                    0.9,
                    1,
                    format!("Optimized shift at {} for {} hours", job.name, slot.duration),
                )
            })
            .collect()
    }

    /// Rough row estimate used for the per-request memory guard.
    fn estimated_rows(problem: &Problem, slots: &[Slot]) -> usize {
        let per_date = if problem.dates.is_empty() {
            0
        } else {
            slots.len() / problem.dates.len()
        };
        problem.dates.len() * per_date * per_date / 2 + problem.dates.len() + 60
    }
}

impl Strategy for LinearProgrammingStrategy {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::LinearProgramming
    }

    fn optimize(
        &self,
        problem: &Problem,
        preferences: &SolverPreferences,
        ctx: &SolveContext,
    ) -> Result<SolverOutcome> {
        if ctx.cancelled() {
            return Err(OptimizeError::Cancelled);
        }

        let slots = Self::build_slots(problem);
        if slots.is_empty() {
            return Ok(fallback_outcome(problem, "no_decision_variables"));
        }

        // Keep the formulation inside the per-request memory budget; the
        // pairwise overlap rows dominate.
        let row_budget = self.max_memory_mb * 256;
        if slots.len() > 50_000 || Self::estimated_rows(problem, &slots) > row_budget {
            warn!(
                slots = slots.len(),
                "LP formulation over memory budget"
            );
            return Ok(fallback_outcome(problem, "problem_too_large"));
        }

        let mut vars = variables!();
        let xs: Vec<_> = slots
            .iter()
            .map(|_| vars.add(variable().clamp(0, 1)))
            .collect();

        // Minimization form: income coefficients are negated.
        let objective: Expression = slots
            .iter()
            .zip(&xs)
            .map(|(slot, &x)| match problem.objective {
                ObjectiveKind::MinimizeHours => slot.duration as f64 * x,
                _ => -(slot.rate * slot.duration as f64) * x,
            })
            .sum();

        let mut model = vars.minimise(objective).using(microlp);
        let mut rows = 0usize;

        if let Some(daily) = problem.constraint_value(ConstraintKind::DailyHours) {
            for date_index in 0..problem.dates.len() {
                let hours: Expression = slots
                    .iter()
                    .zip(&xs)
                    .filter(|(slot, _)| slot.date_index == date_index)
                    .map(|(slot, &x)| slot.duration as f64 * x)
                    .sum();
                model = model.with(constraint!(hours <= daily));
                rows += 1;
            }
        }

        if let Some(weekly) = problem.constraint_value(ConstraintKind::WeeklyHours) {
            let mut weeks: HashMap<(i32, u32), Vec<usize>> = HashMap::new();
            for (index, slot) in slots.iter().enumerate() {
                weeks
                    .entry(week_key(problem.dates[slot.date_index]))
                    .or_default()
                    .push(index);
            }
            for members in weeks.values() {
                let hours: Expression = members
                    .iter()
                    .map(|&i| slots[i].duration as f64 * xs[i])
                    .sum();
                model = model.with(constraint!(hours <= weekly));
                rows += 1;
            }
        }

        if let Some(fuyou) = problem.constraint_value(ConstraintKind::FuyouLimit) {
            // Annual ceiling prorated over the horizon.
            let prorated = fuyou * problem.dates.len() as f64 / 365.0;
            let income: Expression = slots
                .iter()
                .zip(&xs)
                .map(|(slot, &x)| slot.rate * slot.duration as f64 * x)
                .sum();
            model = model.with(constraint!(income <= prorated));
            rows += 1;
        }

        // At most one of any two time-overlapping slots per date.
        let mut date_start = 0;
        while date_start < slots.len() {
            let date_index = slots[date_start].date_index;
            let mut date_end = date_start;
            while date_end < slots.len() && slots[date_end].date_index == date_index {
                date_end += 1;
            }
            for i in date_start..date_end {
                for j in (i + 1)..date_end {
                    if slots[i].overlaps(&slots[j]) {
                        model = model.with(constraint!(xs[i] + xs[j] <= 1));
                        rows += 1;
                    }
                }
            }
            date_start = date_end;
        }

        debug!(
            variables = slots.len(),
            rows,
            objective = ?problem.objective,
            "LP model built"
        );

        let solution = match model.solve() {
            Ok(solution) => solution,
            Err(e) => {
                warn!(error = %e, "LP solve failed");
                return Ok(fallback_outcome(problem, "optimization_failed"));
            }
        };

        let mut lifted: Vec<(usize, f64)> = Vec::new();
        let mut lp_income = 0.0;
        let mut lp_hours = 0.0;
        for (index, (slot, &x)) in slots.iter().zip(&xs).enumerate() {
            let value = solution.value(x);
            lp_income += slot.rate * slot.duration as f64 * value;
            lp_hours += slot.duration as f64 * value;
            if value > 0.5 {
                lifted.push((index, value));
            }
        }

        let shifts = self.repair_lift(problem, &slots, lifted);

        // Reported in "higher is better" form for maximization objectives.
        let objective_value = match problem.objective {
            ObjectiveKind::MinimizeHours => lp_hours,
            _ => lp_income,
        };

        let metadata = [
            ("algorithm".to_string(), json!("linear_programming")),
            ("solver_status".to_string(), json!("optimal")),
            ("variables".to_string(), json!(slots.len())),
            ("rows".to_string(), json!(rows)),
            (
                "max_iterations".to_string(),
                json!(preferences.max_iterations.unwrap_or(1000)),
            ),
        ]
        .into_iter()
        .collect();

        Ok(SolverOutcome {
            shifts,
            objective_value,
            confidence_score: 0.9,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use shiftopt_core::model::{Constraint, ConstraintUnit, SolverPreferences};
    use shiftopt_scoring::{daily_hours, weekly_hours};

    use super::*;
    use crate::roster::tests::problem;

    fn constrain(p: &mut Problem, kind: ConstraintKind, value: f64) {
        let unit = match kind {
            ConstraintKind::FuyouLimit => ConstraintUnit::Yen,
            _ => ConstraintUnit::Hours,
        };
        p.constraints.insert(
            kind,
            Constraint {
                kind,
                value,
                unit,
                priority: 1,
                metadata: Default::default(),
            },
        );
    }

    #[test]
    fn slot_grid_respects_the_window() {
        let p = problem(1, &[1000.0]);
        let slots = LinearProgrammingStrategy::build_slots(&p);
        // 11 four-hour, 9 six-hour and 7 eight-hour starts.
        assert_eq!(slots.len(), 27);
        assert!(slots.iter().all(|s| s.start >= 8 && s.start < 20));
        assert!(slots.iter().all(|s| s.end <= 22));
    }

    #[test]
    fn income_run_honors_all_limits() {
        let mut p = problem(30, &[1200.0]);
        constrain(&mut p, ConstraintKind::FuyouLimit, 1_030_000.0);
        constrain(&mut p, ConstraintKind::DailyHours, 8.0);
        constrain(&mut p, ConstraintKind::WeeklyHours, 28.0);

        let strategy = LinearProgrammingStrategy::new(1024);
        let outcome = strategy
            .optimize(&p, &SolverPreferences::default(), &SolveContext::unbounded())
            .unwrap();

        assert!(!outcome.shifts.is_empty());
        assert_eq!(outcome.confidence_score, 0.9);
        assert_eq!(outcome.metadata["algorithm"], "linear_programming");

        let income: f64 = outcome.shifts.iter().map(|s| s.calculated_earnings).sum();
        assert!(income <= 1_030_000.0);
        for hours in daily_hours(&outcome.shifts).values() {
            assert!(*hours <= 8.0 + 1e-6);
        }
        for hours in weekly_hours(&outcome.shifts).values() {
            assert!(*hours <= 28.0 + 1e-6);
        }
    }

    #[test]
    fn lifted_shifts_never_overlap() {
        let mut p = problem(7, &[1200.0, 1500.0]);
        constrain(&mut p, ConstraintKind::DailyHours, 12.0);

        let strategy = LinearProgrammingStrategy::new(1024);
        let outcome = strategy
            .optimize(&p, &SolverPreferences::default(), &SolveContext::unbounded())
            .unwrap();

        for date in p.dates.iter() {
            let day: Vec<_> = outcome.shifts.iter().filter(|s| s.date == *date).collect();
            for (i, a) in day.iter().enumerate() {
                for b in day.iter().skip(i + 1) {
                    assert!(
                        a.end_time <= b.start_time || b.end_time <= a.start_time,
                        "overlap on {date}"
                    );
                }
            }
        }
    }

    #[test]
    fn minimize_hours_selects_nothing() {
        let mut p = problem(7, &[1200.0]);
        p.objective = ObjectiveKind::MinimizeHours;
        constrain(&mut p, ConstraintKind::DailyHours, 8.0);

        let strategy = LinearProgrammingStrategy::new(1024);
        let outcome = strategy
            .optimize(&p, &SolverPreferences::default(), &SolveContext::unbounded())
            .unwrap();
        assert!(outcome.shifts.is_empty());
        assert_eq!(outcome.objective_value, 0.0);
    }

    #[test]
    fn oversized_problems_fall_back() {
        let p = problem(365, &[1000.0, 1100.0, 1200.0]);
        let strategy = LinearProgrammingStrategy::new(1); // 256-row budget
        let outcome = strategy
            .optimize(&p, &SolverPreferences::default(), &SolveContext::unbounded())
            .unwrap();
        assert_eq!(outcome.metadata["algorithm"], "fallback");
        assert_eq!(outcome.metadata["reason"], "problem_too_large");
        assert_eq!(outcome.confidence_score, 0.5);
    }
}
