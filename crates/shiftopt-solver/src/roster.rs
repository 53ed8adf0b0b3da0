//! Shared roster primitives for the population-based strategies.
//!
//! A chromosome is a list of genes, at most one per horizon date after
//! repair. Genes carry the rate they were drawn with; lifting resolves the
//! rate back to its job source.

use chrono::{Duration, NaiveDate, NaiveTime};
use rand::rngs::StdRng;
use rand::Rng;
use shiftopt_core::model::{JobSource, SuggestedShift};
use shiftopt_core::time::week_key;
use uuid::Uuid;

use crate::problem::Problem;

/// Latest wall-clock hour a shift may end at.
const LATEST_END_HOUR: i64 = 23;

/// One candidate shift inside a chromosome.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Gene {
    pub date_index: usize,
    pub start_hour: u32,
    pub duration_minutes: i64,
    pub hourly_rate: f64,
}

impl Gene {
    pub fn break_minutes(&self) -> i64 {
        if self.duration_minutes > 360 {
            30
        } else {
            0
        }
    }

    pub fn working_hours(&self) -> f64 {
        (self.duration_minutes - self.break_minutes()) as f64 / 60.0
    }

    pub fn earnings(&self) -> f64 {
        self.working_hours() * self.hourly_rate
    }
}

/// Clamps a start hour so the shift ends by [`LATEST_END_HOUR`].
pub(crate) fn clamp_start(start_hour: u32, duration_minutes: i64) -> u32 {
    let duration_hours = (duration_minutes + 59) / 60;
    let latest = (LATEST_END_HOUR - duration_hours).max(0) as u32;
    start_hour.min(latest)
}

/// Draws a random schedule: ~60% per-day inclusion, integer durations in
/// 2..=8 hours, rates from the request's pool, capped per ISO week by a
/// weekly-hours target drawn uniformly from `[10, weekly_cap]`.
pub(crate) fn random_schedule(problem: &Problem, rng: &mut StdRng, weekly_cap: f64) -> Vec<Gene> {
    let rates: Vec<f64> = problem.jobs_ordered().iter().map(|j| j.hourly_rate).collect();
    if rates.is_empty() {
        return Vec::new();
    }

    let min_weekly = 10.0_f64.min(weekly_cap);
    let target_weekly = if weekly_cap > min_weekly {
        rng.random_range(min_weekly..=weekly_cap)
    } else {
        weekly_cap
    };

    let mut genes = Vec::new();
    let mut current_week = None;
    let mut week_hours = 0.0;
    for (date_index, date) in problem.dates.iter().enumerate() {
        let week = week_key(*date);
        if current_week != Some(week) {
            current_week = Some(week);
            week_hours = 0.0;
        }
        if !rng.random_bool(0.6) {
            continue;
        }
        let duration_hours = rng.random_range(2..=8) as i64;
        if week_hours + duration_hours as f64 > target_weekly {
            continue;
        }
        week_hours += duration_hours as f64;
        let duration_minutes = duration_hours * 60;
        let start_hour = clamp_start(rng.random_range(9..=16), duration_minutes);
        let rate = rates[rng.random_range(0..rates.len())];
        genes.push(Gene {
            date_index,
            start_hour,
            duration_minutes,
            hourly_rate: rate,
        });
    }
    genes
}

/// Drops duplicate genes on the same date, keeping the highest earner, and
/// restores date order. Keeps lifted rosters overlap-free.
pub(crate) fn repair(mut genes: Vec<Gene>) -> Vec<Gene> {
    genes.sort_by(|a, b| {
        a.date_index
            .cmp(&b.date_index)
            .then(b.earnings().total_cmp(&a.earnings()))
    });
    genes.dedup_by_key(|g| g.date_index);
    genes
}

/// Resolves a gene's rate back to a job source (first match by rate).
pub(crate) fn job_for_rate(problem: &Problem, rate: f64) -> Option<&JobSource> {
    problem
        .jobs_ordered()
        .into_iter()
        .find(|j| (j.hourly_rate - rate).abs() < f64::EPSILON)
}

/// Builds a suggested shift with the standard break rule: 30 unpaid
/// minutes once a shift runs longer than 6 hours.
pub(crate) fn make_shift(
    job: &JobSource,
    date: NaiveDate,
    start_hour: u32,
    duration_minutes: i64,
    confidence: f64,
    priority: u8,
    reasoning: String,
) -> SuggestedShift {
    let start_time = NaiveTime::from_hms_opt(start_hour, 0, 0).unwrap_or_default();
    let end_time = start_time + Duration::minutes(duration_minutes);
    let break_minutes = if duration_minutes > 360 { 30 } else { 0 };
    let working_hours = (duration_minutes - break_minutes) as f64 / 60.0;
    SuggestedShift {
        id: Uuid::new_v4().to_string(),
        job_source_id: Some(job.id.clone()),
        job_source_name: job.name.clone(),
        date,
        start_time,
        end_time,
        hourly_rate: job.hourly_rate,
        break_minutes: break_minutes as u32,
        working_hours,
        calculated_earnings: working_hours * job.hourly_rate,
        confidence,
        priority,
        reasoning,
        is_original: false,
    }
}

/// Lifts a repaired chromosome into suggested shifts.
pub(crate) fn lift_genes(
    problem: &Problem,
    genes: &[Gene],
    confidence: f64,
    reasoning: impl Fn(&JobSource, f64) -> String,
) -> Vec<SuggestedShift> {
    genes
        .iter()
        .filter_map(|gene| {
            let date = *problem.dates.get(gene.date_index)?;
            let job = job_for_rate(problem, gene.hourly_rate)?;
            Some(make_shift(
                job,
                date,
                gene.start_hour,
                gene.duration_minutes,
                confidence,
                1,
                reasoning(job, gene.working_hours()),
            ))
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use rand::SeedableRng;
    use shiftopt_core::model::{ObjectiveKind, OptimizationRequest, SolverPreferences, TimeRange};

    use super::*;
    use crate::problem::ProblemBuilder;

    pub(crate) fn problem(days: u64, rates: &[f64]) -> Problem {
        let start = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        let request = OptimizationRequest {
            user_id: "u1".into(),
            objective: ObjectiveKind::MaximizeIncome,
            time_range: TimeRange {
                start,
                end: start + chrono::Days::new(days),
            },
            constraints: vec![],
            job_sources: rates
                .iter()
                .enumerate()
                .map(|(i, rate)| JobSource {
                    id: format!("J{i}"),
                    name: format!("Job {i}"),
                    hourly_rate: *rate,
                    is_active: true,
                    expected_monthly_hours: None,
                    default_break_minutes: 0,
                })
                .collect(),
            existing_shifts: vec![],
            availability: vec![],
            preferences: SolverPreferences::default(),
            tier_level: Default::default(),
        };
        ProblemBuilder::build(&request)
    }

    #[test]
    fn break_rule_applies_over_six_hours() {
        let gene = Gene {
            date_index: 0,
            start_hour: 10,
            duration_minutes: 480,
            hourly_rate: 1000.0,
        };
        assert_eq!(gene.break_minutes(), 30);
        assert_eq!(gene.working_hours(), 7.5);
        assert_eq!(gene.earnings(), 7500.0);

        let short = Gene {
            duration_minutes: 360,
            ..gene
        };
        assert_eq!(short.break_minutes(), 0);
        assert_eq!(short.earnings(), 6000.0);
    }

    #[test]
    fn clamp_keeps_shifts_inside_the_day() {
        assert_eq!(clamp_start(16, 480), 15); // 8h from 16:00 would pass 23:00
        assert_eq!(clamp_start(10, 480), 10);
        assert_eq!(clamp_start(16, 120), 16);
    }

    #[test]
    fn random_schedules_respect_weekly_target() {
        let problem = problem(28, &[1000.0, 1200.0]);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let genes = random_schedule(&problem, &mut rng, 20.0);
            let mut per_week = std::collections::HashMap::new();
            for gene in &genes {
                let week = week_key(problem.dates[gene.date_index]);
                *per_week.entry(week).or_insert(0.0) += gene.duration_minutes as f64 / 60.0;
            }
            for hours in per_week.values() {
                assert!(*hours <= 20.0 + 1e-9);
            }
        }
    }

    #[test]
    fn repair_keeps_one_gene_per_date() {
        let cheap = Gene {
            date_index: 3,
            start_hour: 9,
            duration_minutes: 120,
            hourly_rate: 1000.0,
        };
        let rich = Gene {
            duration_minutes: 360,
            ..cheap.clone()
        };
        let repaired = repair(vec![cheap.clone(), rich.clone(), cheap.clone()]);
        assert_eq!(repaired.len(), 1);
        assert_eq!(repaired[0], rich);
    }

    #[test]
    fn lift_produces_consistent_shifts() {
        let problem = problem(7, &[1200.0]);
        let genes = vec![Gene {
            date_index: 2,
            start_hour: 10,
            duration_minutes: 480,
            hourly_rate: 1200.0,
        }];
        let shifts = lift_genes(&problem, &genes, 0.8, |job, hours| {
            format!("{} for {hours} hours", job.name)
        });
        assert_eq!(shifts.len(), 1);
        let shift = &shifts[0];
        assert_eq!(shift.date, problem.dates[2]);
        assert_eq!(shift.break_minutes, 30);
        assert!((shift.calculated_earnings - shift.working_hours * 1200.0).abs() < 1e-9);
        assert_eq!(shift.end_time, NaiveTime::from_hms_opt(18, 0, 0).unwrap());
    }
}
