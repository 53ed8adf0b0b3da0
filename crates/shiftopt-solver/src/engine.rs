//! Strategy interface and the dispatching engine.
//!
//! Each algorithm lives behind [`Strategy`]; the engine builds the numeric
//! problem, routes to the requested strategy and lifts the outcome into a
//! full [`OptimizationSolution`] with aggregates and the per-constraint
//! satisfaction map.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use shiftopt_core::model::{
    AlgorithmKind, Constraint, ConstraintKind, Metadata, OptimizationRequest,
    OptimizationSolution, SolverPreferences, SuggestedShift,
};
use shiftopt_core::{OptimizeError, Result};
use shiftopt_scoring::{daily_hours, weekly_hours};
use tracing::info;

use crate::genetic::GeneticAlgorithmStrategy;
use crate::lp::LinearProgrammingStrategy;
use crate::multi_objective::MultiObjectiveStrategy;
use crate::problem::{Problem, ProblemBuilder};

/// Cooperative cancellation and deadline, checked between solver
/// iterations. Cheap to clone across threads.
#[derive(Debug, Clone)]
pub struct SolveContext {
    cancel: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl SolveContext {
    pub fn new(cancel: Arc<AtomicBool>, timeout: Option<Duration>) -> Self {
        SolveContext {
            cancel,
            deadline: timeout.map(|t| Instant::now() + t),
        }
    }

    /// Context without cancellation or deadline.
    pub fn unbounded() -> Self {
        SolveContext {
            cancel: Arc::new(AtomicBool::new(false)),
            deadline: None,
        }
    }

    pub fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    pub fn timed_out(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn should_stop(&self) -> bool {
        self.cancelled() || self.timed_out()
    }

    /// Metadata key to set when a run stops early, if any.
    pub fn stop_reason(&self) -> Option<&'static str> {
        if self.cancelled() {
            Some("cancelled")
        } else if self.timed_out() {
            Some("timed_out")
        } else {
            None
        }
    }
}

/// Raw result a strategy hands back before solution assembly.
#[derive(Debug, Clone)]
pub struct SolverOutcome {
    pub shifts: Vec<SuggestedShift>,
    pub objective_value: f64,
    pub confidence_score: f64,
    pub metadata: Metadata,
}

/// Common interface over the solver strategies.
pub trait Strategy: Send + Sync {
    fn kind(&self) -> AlgorithmKind;

    /// Produces a schedule for the problem. Numeric failure must degrade
    /// to a fallback outcome rather than error; errors are reserved for
    /// conditions the strategy cannot absorb.
    fn optimize(
        &self,
        problem: &Problem,
        preferences: &SolverPreferences,
        ctx: &SolveContext,
    ) -> Result<SolverOutcome>;
}

/// Engine-wide tuning, loaded once at startup.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub ga_population: usize,
    pub ga_generations: usize,
    pub max_shifts: usize,
    pub max_memory_mb: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            ga_population: 50,
            ga_generations: 100,
            max_shifts: 1000,
            max_memory_mb: 1024,
        }
    }
}

/// Routes requests to solver strategies and assembles solutions.
pub struct Engine {
    lp: LinearProgrammingStrategy,
    genetic: GeneticAlgorithmStrategy,
    multi_objective: MultiObjectiveStrategy,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Self {
        Engine {
            lp: LinearProgrammingStrategy::new(settings.max_memory_mb),
            genetic: GeneticAlgorithmStrategy::new(
                settings.ga_population,
                settings.ga_generations,
            ),
            multi_objective: MultiObjectiveStrategy::new(
                settings.ga_population,
                settings.ga_generations,
            ),
            settings,
        }
    }

    /// Runs one optimization end to end. CPU-bound; callers move this off
    /// the request-dispatch thread.
    pub fn optimize(
        &self,
        request: &OptimizationRequest,
        ctx: &SolveContext,
    ) -> Result<OptimizationSolution> {
        let algorithm = request.preferences.algorithm;
        let problem = ProblemBuilder::build(request);
        let started = Instant::now();

        let strategy: &dyn Strategy = match algorithm {
            AlgorithmKind::LinearProgramming => &self.lp,
            AlgorithmKind::GeneticAlgorithm => &self.genetic,
            AlgorithmKind::MultiObjectiveNsga2 => &self.multi_objective,
            AlgorithmKind::SimulatedAnnealing => {
                return Err(OptimizeError::Solver(format!(
                    "Unsupported algorithm: {algorithm}"
                )))
            }
        };

        let outcome = strategy.optimize(&problem, &request.preferences, ctx)?;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let solution = self.assemble(outcome, request, algorithm, elapsed_ms);

        info!(
            algorithm = %algorithm,
            shifts = solution.total_shifts,
            objective = solution.objective_value,
            elapsed_ms,
            "optimization completed"
        );
        Ok(solution)
    }

    fn assemble(
        &self,
        outcome: SolverOutcome,
        request: &OptimizationRequest,
        algorithm: AlgorithmKind,
        execution_time_ms: u64,
    ) -> OptimizationSolution {
        let mut shifts = outcome.shifts;
        let mut metadata = outcome.metadata;
        if shifts.len() > self.settings.max_shifts {
            shifts.truncate(self.settings.max_shifts);
            metadata.insert("truncated".to_string(), serde_json::Value::Bool(true));
        }

        let mut solution = OptimizationSolution {
            suggested_shifts: shifts,
            objective_value: outcome.objective_value,
            constraints_satisfied: Default::default(),
            algorithm_used: algorithm,
            execution_time_ms,
            confidence_score: outcome.confidence_score,
            metadata,
            total_income: 0.0,
            total_hours: 0.0,
            total_shifts: 0,
            job_source_distribution: Default::default(),
        };
        solution.refresh_totals();

        for constraint in &request.constraints {
            solution.constraints_satisfied.insert(
                constraint.kind,
                constraint_satisfied(constraint, &solution.suggested_shifts, solution.total_income),
            );
        }
        solution
    }
}

fn constraint_satisfied(
    constraint: &Constraint,
    shifts: &[SuggestedShift],
    total_income: f64,
) -> bool {
    match constraint.kind {
        ConstraintKind::FuyouLimit => total_income <= constraint.value,
        ConstraintKind::DailyHours => daily_hours(shifts)
            .values()
            .all(|hours| *hours <= constraint.value),
        ConstraintKind::WeeklyHours => weekly_hours(shifts)
            .values()
            .all(|hours| *hours <= constraint.value),
        // No recomputable meaning; reported as satisfied.
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use shiftopt_core::model::{
        ConstraintUnit, JobSource, ObjectiveKind, SolverPreferences, TimeRange,
    };

    use super::*;

    fn request(algorithm: AlgorithmKind) -> OptimizationRequest {
        let start = chrono::NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        OptimizationRequest {
            user_id: "u1".into(),
            objective: ObjectiveKind::MaximizeIncome,
            time_range: TimeRange {
                start,
                end: start + chrono::Days::new(7),
            },
            constraints: vec![
                Constraint {
                    kind: ConstraintKind::FuyouLimit,
                    value: 1_030_000.0,
                    unit: ConstraintUnit::Yen,
                    priority: 1,
                    metadata: Default::default(),
                },
                Constraint {
                    kind: ConstraintKind::DailyHours,
                    value: 8.0,
                    unit: ConstraintUnit::Hours,
                    priority: 1,
                    metadata: Default::default(),
                },
            ],
            job_sources: vec![JobSource {
                id: "A".into(),
                name: "Cafe".into(),
                hourly_rate: 1200.0,
                is_active: true,
                expected_monthly_hours: None,
                default_break_minutes: 0,
            }],
            existing_shifts: vec![],
            availability: vec![],
            preferences: SolverPreferences {
                algorithm,
                random_seed: Some(42),
                ..SolverPreferences::default()
            },
            tier_level: Default::default(),
        }
    }

    #[test]
    fn simulated_annealing_is_not_dispatchable() {
        let engine = Engine::new(EngineSettings::default());
        let err = engine
            .optimize(
                &request(AlgorithmKind::SimulatedAnnealing),
                &SolveContext::unbounded(),
            )
            .unwrap_err();
        assert!(err.to_string().contains("simulated_annealing"));
    }

    #[test]
    fn lp_run_produces_consistent_aggregates() {
        let engine = Engine::new(EngineSettings::default());
        let solution = engine
            .optimize(
                &request(AlgorithmKind::LinearProgramming),
                &SolveContext::unbounded(),
            )
            .unwrap();
        assert!(!solution.suggested_shifts.is_empty());
        let income: f64 = solution
            .suggested_shifts
            .iter()
            .map(|s| s.calculated_earnings)
            .sum();
        assert!((income - solution.total_income).abs() < 0.01);
        assert_eq!(solution.total_shifts, solution.suggested_shifts.len());
        assert_eq!(
            solution.constraints_satisfied[&ConstraintKind::FuyouLimit],
            true
        );
        assert_eq!(solution.algorithm_used, AlgorithmKind::LinearProgramming);
    }

    #[test]
    fn cancelled_context_reports_reason() {
        let cancel = Arc::new(AtomicBool::new(true));
        let ctx = SolveContext::new(cancel, None);
        assert!(ctx.should_stop());
        assert_eq!(ctx.stop_reason(), Some("cancelled"));

        let ctx = SolveContext::new(
            Arc::new(AtomicBool::new(false)),
            Some(Duration::from_secs(0)),
        );
        assert!(ctx.timed_out());
        assert_eq!(ctx.stop_reason(), Some("timed_out"));
    }
}
