//! Solution-side schema: suggested shifts, solutions, responses and run
//! status records.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::time::hhmm;

use super::{AlgorithmKind, ConstraintKind};

/// Open key/value bag attached to constraints, solutions and responses.
pub type Metadata = HashMap<String, serde_json::Value>;

/// A candidate shift produced by a solver.
///
/// Invariants (checked by the post-solve validator):
/// `working_hours = span - break` and
/// `calculated_earnings = working_hours * hourly_rate`, both to within 0.01.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedShift {
    pub id: String,
    pub job_source_id: Option<String>,
    pub job_source_name: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub hourly_rate: f64,
    pub break_minutes: u32,
    pub working_hours: f64,
    pub calculated_earnings: f64,
    /// Confidence in this suggestion, in `[0, 1]`.
    pub confidence: f64,
    pub priority: u8,
    /// Human-readable explanation for why this shift was suggested.
    pub reasoning: String,
    /// True when this mirrors an existing committed shift.
    #[serde(default)]
    pub is_original: bool,
}

/// An optimized roster plus the bookkeeping around it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationSolution {
    pub suggested_shifts: Vec<SuggestedShift>,
    pub objective_value: f64,
    pub constraints_satisfied: HashMap<ConstraintKind, bool>,
    pub algorithm_used: AlgorithmKind,
    pub execution_time_ms: u64,
    pub confidence_score: f64,
    #[serde(default)]
    pub metadata: Metadata,
    pub total_income: f64,
    pub total_hours: f64,
    pub total_shifts: usize,
    pub job_source_distribution: HashMap<String, u32>,
}

impl OptimizationSolution {
    /// Recomputes the aggregate fields from the suggested shifts so the
    /// sum invariants hold by construction.
    pub fn refresh_totals(&mut self) {
        self.total_income = self.suggested_shifts.iter().map(|s| s.calculated_earnings).sum();
        self.total_hours = self.suggested_shifts.iter().map(|s| s.working_hours).sum();
        self.total_shifts = self.suggested_shifts.len();
        self.job_source_distribution.clear();
        for shift in &self.suggested_shifts {
            *self
                .job_source_distribution
                .entry(shift.job_source_name.clone())
                .or_insert(0) += 1;
        }
    }
}

/// Response envelope for `/optimize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResponse {
    pub success: bool,
    pub optimization_run_id: String,
    #[serde(default)]
    pub solution: Option<OptimizationSolution>,
    #[serde(default)]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub processing_time_ms: u64,
    /// Present when post-solve validation found non-fatal problems.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<super::ValidationReport>,
}

/// Lifecycle states of an optimization run.
///
/// `Started -> Running -> Completed | Failed | Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Started,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl RunState {
    /// Terminal states never transition again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Failed | RunState::Cancelled
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunState::Started => "started",
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
            RunState::Cancelled => "cancelled",
        }
    }
}

/// Snapshot of a background optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatus {
    pub run_id: String,
    pub status: RunState,
    /// Progress in `[0, 1]`.
    pub progress: f64,
    pub message: String,
    #[serde(default)]
    pub estimated_completion: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shift(name: &str, earnings: f64, hours: f64) -> SuggestedShift {
        SuggestedShift {
            id: "s1".into(),
            job_source_id: Some("A".into()),
            job_source_name: name.into(),
            date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(16, 0, 0).unwrap(),
            hourly_rate: 1200.0,
            break_minutes: 0,
            working_hours: hours,
            calculated_earnings: earnings,
            confidence: 0.9,
            priority: 1,
            reasoning: "test".into(),
            is_original: false,
        }
    }

    #[test]
    fn refresh_totals_matches_shift_sums() {
        let mut solution = OptimizationSolution {
            suggested_shifts: vec![shift("Cafe", 7200.0, 6.0), shift("Store", 4800.0, 4.0)],
            objective_value: 0.0,
            constraints_satisfied: HashMap::new(),
            algorithm_used: AlgorithmKind::LinearProgramming,
            execution_time_ms: 1,
            confidence_score: 0.9,
            metadata: Metadata::new(),
            total_income: 0.0,
            total_hours: 0.0,
            total_shifts: 0,
            job_source_distribution: HashMap::new(),
        };
        solution.refresh_totals();
        assert_eq!(solution.total_income, 12_000.0);
        assert_eq!(solution.total_hours, 10.0);
        assert_eq!(solution.total_shifts, 2);
        assert_eq!(solution.job_source_distribution["Cafe"], 1);
    }

    #[test]
    fn run_states_serialize_snake_case() {
        assert_eq!(
            serde_json::to_value(RunState::Completed).unwrap(),
            serde_json::json!("completed")
        );
        assert!(RunState::Cancelled.is_terminal());
        assert!(!RunState::Running.is_terminal());
    }

    #[test]
    fn constraint_map_keys_are_strings() {
        let mut satisfied = HashMap::new();
        satisfied.insert(ConstraintKind::FuyouLimit, true);
        let value = serde_json::to_value(&satisfied).unwrap();
        assert_eq!(value["fuyou_limit"], serde_json::json!(true));
    }
}
