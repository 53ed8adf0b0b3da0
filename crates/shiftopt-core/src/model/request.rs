//! Optimization request schema: constraints, job sources, committed shifts,
//! availability windows and solver preferences.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::time::{expand_dates, flexdate, hhmm};

/// Kinds of optimization constraints. At most one of each kind per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Annual income ceiling in yen.
    FuyouLimit,
    WeeklyHours,
    DailyHours,
    Availability,
    JobSourceLimit,
    MinimumIncome,
    BreakConstraints,
}

impl ConstraintKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ConstraintKind::FuyouLimit => "fuyou_limit",
            ConstraintKind::WeeklyHours => "weekly_hours",
            ConstraintKind::DailyHours => "daily_hours",
            ConstraintKind::Availability => "availability",
            ConstraintKind::JobSourceLimit => "job_source_limit",
            ConstraintKind::MinimumIncome => "minimum_income",
            ConstraintKind::BreakConstraints => "break_constraints",
        }
    }
}

impl std::fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Units for constraint values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintUnit {
    Yen,
    Hours,
    Minutes,
    Days,
    Shifts,
    Percentage,
}

/// What the solver maximizes (or minimizes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveKind {
    MaximizeIncome,
    MinimizeHours,
    BalanceSources,
    MultiObjective,
}

/// Solver strategies the service can dispatch to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmKind {
    LinearProgramming,
    GeneticAlgorithm,
    SimulatedAnnealing,
    MultiObjectiveNsga2,
}

impl AlgorithmKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AlgorithmKind::LinearProgramming => "linear_programming",
            AlgorithmKind::GeneticAlgorithm => "genetic_algorithm",
            AlgorithmKind::SimulatedAnnealing => "simulated_annealing",
            AlgorithmKind::MultiObjectiveNsga2 => "multi_objective_nsga2",
        }
    }
}

impl std::fmt::Display for AlgorithmKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription tier levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TierLevel {
    #[default]
    Free,
    Standard,
    Pro,
}

impl TierLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            TierLevel::Free => "free",
            TierLevel::Standard => "standard",
            TierLevel::Pro => "pro",
        }
    }
}

impl std::fmt::Display for TierLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single optimization constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(rename = "constraint_type")]
    pub kind: ConstraintKind,
    /// Must be strictly positive; checked by the request validator.
    #[serde(rename = "constraint_value")]
    pub value: f64,
    #[serde(rename = "constraint_unit")]
    pub unit: ConstraintUnit,
    /// 1 = hard, 2 = soft, 3 = nice-to-have.
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub metadata: super::Metadata,
}

impl Constraint {
    pub fn is_hard(&self) -> bool {
        self.priority == 1
    }
}

fn default_priority() -> u8 {
    1
}

fn default_true() -> bool {
    true
}

/// Employer record; immutable within a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSource {
    pub id: String,
    pub name: String,
    /// Hourly rate in yen.
    pub hourly_rate: f64,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub expected_monthly_hours: Option<u32>,
    #[serde(default)]
    pub default_break_minutes: u32,
}

/// A work block the user has already committed to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistingShift {
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub job_source_id: Option<String>,
    pub job_source_name: String,
    #[serde(default)]
    pub is_confirmed: bool,
    pub hourly_rate: f64,
    #[serde(default)]
    pub break_minutes: u32,
}

/// Recurring availability window keyed by day of week (0 = Sunday).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilitySlot {
    pub day_of_week: u8,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default)]
    pub job_source_id: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: u8,
}

/// Solver tuning knobs carried with the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolverPreferences {
    #[serde(default = "default_algorithm")]
    pub algorithm: AlgorithmKind,
    #[serde(default)]
    pub max_iterations: Option<u32>,
    /// Timeout in seconds; the run returns its best-so-far on expiry.
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub convergence_threshold: Option<f64>,
    #[serde(default = "default_true")]
    pub enable_parallel: bool,
    #[serde(default)]
    pub random_seed: Option<u64>,
}

impl Default for SolverPreferences {
    fn default() -> Self {
        SolverPreferences {
            algorithm: AlgorithmKind::LinearProgramming,
            max_iterations: None,
            timeout: None,
            convergence_threshold: None,
            enable_parallel: true,
            random_seed: None,
        }
    }
}

fn default_algorithm() -> AlgorithmKind {
    AlgorithmKind::LinearProgramming
}

/// Half-open horizon `[start, end)` over which shifts may be scheduled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeRange {
    #[serde(with = "flexdate")]
    pub start: NaiveDate,
    #[serde(with = "flexdate")]
    pub end: NaiveDate,
}

impl TimeRange {
    /// Number of schedulable days; zero or negative when the range is empty
    /// or reversed.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// The calendar dates covered, end exclusive.
    pub fn dates(&self) -> Vec<NaiveDate> {
        expand_dates(self.start, self.end)
    }
}

/// An end-to-end optimization request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub user_id: String,
    pub objective: ObjectiveKind,
    pub time_range: TimeRange,
    pub constraints: Vec<Constraint>,
    pub job_sources: Vec<JobSource>,
    #[serde(default)]
    pub existing_shifts: Vec<ExistingShift>,
    #[serde(default)]
    pub availability: Vec<AvailabilitySlot>,
    #[serde(default)]
    pub preferences: SolverPreferences,
    #[serde(default)]
    pub tier_level: TierLevel,
}

impl OptimizationRequest {
    /// Looks up a constraint by kind, if present.
    pub fn constraint(&self, kind: ConstraintKind) -> Option<&Constraint> {
        self.constraints.iter().find(|c| c.kind == kind)
    }
}
