//! Numeric problem formulation built from a validated request.

use std::collections::HashMap;

use chrono::NaiveDate;
use shiftopt_core::model::{
    Constraint, ConstraintKind, ExistingShift, JobSource, ObjectiveKind, OptimizationRequest,
};
use shiftopt_core::time::{minutes_of, weekday_sunday0};
use tracing::debug;

/// Hour-granular availability over the horizon.
///
/// `A[d][h]` is true when some available slot for `weekday(d)` covers
/// `h:00` (slot bounds inclusive).
#[derive(Debug, Clone)]
pub struct AvailabilityMatrix {
    days: Vec<[bool; 24]>,
}

impl AvailabilityMatrix {
    fn build(dates: &[NaiveDate], slots: &[shiftopt_core::model::AvailabilitySlot]) -> Self {
        let days = dates
            .iter()
            .map(|date| {
                let weekday = weekday_sunday0(*date);
                let mut hours = [false; 24];
                for slot in slots
                    .iter()
                    .filter(|s| s.is_available && s.day_of_week == weekday)
                {
                    let start = minutes_of(slot.start_time);
                    let end = minutes_of(slot.end_time);
                    for (hour, open) in hours.iter_mut().enumerate() {
                        let minute = hour as i64 * 60;
                        if start <= minute && minute <= end {
                            *open = true;
                        }
                    }
                }
                hours
            })
            .collect();
        AvailabilityMatrix { days }
    }

    pub fn is_available(&self, day_index: usize, hour: usize) -> bool {
        self.days
            .get(day_index)
            .map_or(false, |hours| hours.get(hour).copied().unwrap_or(false))
    }

    pub fn day_count(&self) -> usize {
        self.days.len()
    }
}

/// Structured problem data handed to solver strategies.
#[derive(Debug, Clone)]
pub struct Problem {
    pub user_id: String,
    pub objective: ObjectiveKind,
    /// Horizon dates, end exclusive, in order.
    pub dates: Vec<NaiveDate>,
    /// Job sources indexed by id.
    pub job_sources: HashMap<String, JobSource>,
    pub existing_shifts: Vec<ExistingShift>,
    pub availability: AvailabilityMatrix,
    /// Constraints keyed by kind for O(1) solver lookup.
    pub constraints: HashMap<ConstraintKind, Constraint>,
}

impl Problem {
    pub fn constraint(&self, kind: ConstraintKind) -> Option<&Constraint> {
        self.constraints.get(&kind)
    }

    pub fn constraint_value(&self, kind: ConstraintKind) -> Option<f64> {
        self.constraints.get(&kind).map(|c| c.value)
    }

    /// Highest-paying job source, used by the deterministic fallback.
    pub fn best_job(&self) -> Option<&JobSource> {
        self.job_sources
            .values()
            .max_by(|a, b| a.hourly_rate.total_cmp(&b.hourly_rate))
    }

    /// Job sources in a stable order (by id) for reproducible iteration.
    pub fn jobs_ordered(&self) -> Vec<&JobSource> {
        let mut jobs: Vec<&JobSource> = self.job_sources.values().collect();
        jobs.sort_by(|a, b| a.id.cmp(&b.id));
        jobs
    }
}

/// Converts validated requests into [`Problem`] values.
pub struct ProblemBuilder;

impl ProblemBuilder {
    pub fn build(request: &OptimizationRequest) -> Problem {
        let dates = request.time_range.dates();
        let job_sources: HashMap<String, JobSource> = request
            .job_sources
            .iter()
            .map(|js| (js.id.clone(), js.clone()))
            .collect();
        let availability = AvailabilityMatrix::build(&dates, &request.availability);
        let constraints: HashMap<ConstraintKind, Constraint> = request
            .constraints
            .iter()
            .map(|c| (c.kind, c.clone()))
            .collect();

        debug!(
            days = dates.len(),
            jobs = job_sources.len(),
            constraints = constraints.len(),
            "problem built"
        );

        Problem {
            user_id: request.user_id.clone(),
            objective: request.objective,
            dates,
            job_sources,
            existing_shifts: request.existing_shifts.clone(),
            availability,
            constraints,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveTime;
    use shiftopt_core::model::{
        AvailabilitySlot, ConstraintUnit, ObjectiveKind, SolverPreferences, TierLevel, TimeRange,
    };

    use super::*;

    fn request() -> OptimizationRequest {
        OptimizationRequest {
            user_id: "u1".into(),
            objective: ObjectiveKind::MaximizeIncome,
            time_range: TimeRange {
                start: NaiveDate::from_ymd_opt(2025, 4, 6).unwrap(), // Sunday
                end: NaiveDate::from_ymd_opt(2025, 4, 13).unwrap(),
            },
            constraints: vec![Constraint {
                kind: ConstraintKind::FuyouLimit,
                value: 1_030_000.0,
                unit: ConstraintUnit::Yen,
                priority: 1,
                metadata: Default::default(),
            }],
            job_sources: vec![
                JobSource {
                    id: "A".into(),
                    name: "Cafe".into(),
                    hourly_rate: 1200.0,
                    is_active: true,
                    expected_monthly_hours: None,
                    default_break_minutes: 0,
                },
                JobSource {
                    id: "B".into(),
                    name: "Store".into(),
                    hourly_rate: 1500.0,
                    is_active: true,
                    expected_monthly_hours: None,
                    default_break_minutes: 0,
                },
            ],
            existing_shifts: vec![],
            availability: vec![AvailabilitySlot {
                day_of_week: 0, // Sunday
                start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                is_available: true,
                job_source_id: None,
                priority: 1,
            }],
            preferences: SolverPreferences::default(),
            tier_level: TierLevel::Free,
        }
    }

    #[test]
    fn builds_dates_and_indexes() {
        let problem = ProblemBuilder::build(&request());
        assert_eq!(problem.dates.len(), 7);
        assert_eq!(problem.job_sources.len(), 2);
        assert!(problem.constraint(ConstraintKind::FuyouLimit).is_some());
        assert!(problem.constraint(ConstraintKind::DailyHours).is_none());
        assert_eq!(problem.best_job().unwrap().id, "B");
    }

    #[test]
    fn availability_matrix_follows_weekday_slots() {
        let problem = ProblemBuilder::build(&request());
        // Day 0 is the Sunday covered by the 09:00-17:00 slot.
        assert!(problem.availability.is_available(0, 9));
        assert!(problem.availability.is_available(0, 17)); // inclusive end
        assert!(!problem.availability.is_available(0, 8));
        assert!(!problem.availability.is_available(0, 18));
        // Day 1 is Monday with no slot at all.
        assert!(!problem.availability.is_available(1, 12));
    }

    #[test]
    fn unavailable_slots_are_ignored() {
        let mut req = request();
        req.availability[0].is_available = false;
        let problem = ProblemBuilder::build(&req);
        assert!(!problem.availability.is_available(0, 12));
    }
}
