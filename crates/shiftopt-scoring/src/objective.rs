//! Composable objective terms over a candidate roster.
//!
//! Every term is a pure function of `(shifts, job_sources)`; the
//! multi-objective entry point returns the weighted sum together with the
//! per-objective breakdown. All bonuses and penalties are denominated in
//! yen so they compose with base income.

use std::collections::HashMap;

use chrono::NaiveDate;
use shiftopt_core::model::{Constraint, ConstraintKind, JobSource, SuggestedShift};
use shiftopt_core::time::{is_weekend, week_key, weekday_sunday0};
use tracing::trace;

/// Earnings wall used by the risk term: the standard dependent ceiling.
const FUYOU_WALL: f64 = 1_030_000.0;

/// Weights for the income objective.
#[derive(Debug, Clone, Copy)]
pub struct IncomeWeights {
    pub base_income: f64,
    pub overtime_bonus: f64,
    pub weekend_premium: f64,
    pub consistency_bonus: f64,
    pub risk_penalty: f64,
}

impl Default for IncomeWeights {
    fn default() -> Self {
        IncomeWeights {
            base_income: 1.0,
            overtime_bonus: 0.3,
            weekend_premium: 0.2,
            consistency_bonus: 0.1,
            risk_penalty: -0.2,
        }
    }
}

/// Weights for the work-life-balance objective.
#[derive(Debug, Clone, Copy)]
pub struct BalanceWeights {
    pub hour_penalty: f64,
    pub consistency_bonus: f64,
    pub split_shift_penalty: f64,
    pub evening_penalty: f64,
    pub rest_period_bonus: f64,
}

impl Default for BalanceWeights {
    fn default() -> Self {
        BalanceWeights {
            hour_penalty: -1.0,
            consistency_bonus: 0.3,
            split_shift_penalty: -0.5,
            evening_penalty: -0.2,
            rest_period_bonus: 0.4,
        }
    }
}

/// Weights for the source-balance objective.
#[derive(Debug, Clone, Copy)]
pub struct SourceBalanceWeights {
    pub distribution_bonus: f64,
    pub relationship_bonus: f64,
    pub skill_diversity_bonus: f64,
    pub income_diversity_bonus: f64,
}

impl Default for SourceBalanceWeights {
    fn default() -> Self {
        SourceBalanceWeights {
            distribution_bonus: 1.0,
            relationship_bonus: 0.3,
            skill_diversity_bonus: 0.2,
            income_diversity_bonus: 0.4,
        }
    }
}

/// Per-kind weights for the penalty-method constraint function.
#[derive(Debug, Clone, Copy)]
pub struct PenaltyWeights {
    pub fuyou_limit: f64,
    pub daily_hours: f64,
    pub weekly_hours: f64,
    pub availability: f64,
}

impl Default for PenaltyWeights {
    fn default() -> Self {
        PenaltyWeights {
            fuyou_limit: 1000.0,
            daily_hours: 100.0,
            weekly_hours: 50.0,
            availability: 200.0,
        }
    }
}

/// Income objective: base income plus overtime, weekend and consistency
/// bonuses, minus a risk term for approaching the earnings wall.
pub fn income_objective(
    shifts: &[SuggestedShift],
    _job_sources: &HashMap<String, JobSource>,
    weights: IncomeWeights,
) -> f64 {
    if shifts.is_empty() {
        return 0.0;
    }

    let base_income: f64 = shifts.iter().map(|s| s.calculated_earnings).sum();
    let overtime = overtime_bonus(shifts);
    let weekend = weekend_premium(shifts);
    let consistency = consistency_bonus(shifts);
    let risk = risk_penalty(base_income);

    let total = base_income * weights.base_income
        + overtime * weights.overtime_bonus
        + weekend * weights.weekend_premium
        + consistency * weights.consistency_bonus
        + risk * weights.risk_penalty;
    trace!(base_income, overtime, weekend, consistency, risk, total, "income objective");
    total
}

/// Work-life-balance objective: fewer hours, consistent patterns, no split
/// shifts, little evening work, adequate rest.
pub fn work_life_balance_objective(
    shifts: &[SuggestedShift],
    _job_sources: &HashMap<String, JobSource>,
    weights: BalanceWeights,
) -> f64 {
    if shifts.is_empty() {
        return 0.0;
    }

    let total_hours: f64 = shifts.iter().map(|s| s.working_hours).sum();
    total_hours * weights.hour_penalty
        + consistency_bonus(shifts) * weights.consistency_bonus
        + split_shift_penalty(shifts) * weights.split_shift_penalty
        + evening_penalty(shifts) * weights.evening_penalty
        + rest_period_bonus(shifts) * weights.rest_period_bonus
}

/// Source-balance objective: spread work across employers.
pub fn source_balance_objective(
    shifts: &[SuggestedShift],
    job_sources: &HashMap<String, JobSource>,
    weights: SourceBalanceWeights,
) -> f64 {
    if shifts.is_empty() {
        return 0.0;
    }

    distribution_score(shifts) * weights.distribution_bonus
        + relationship_score(shifts, job_sources) * weights.relationship_bonus
        + skill_diversity(shifts) * weights.skill_diversity_bonus
        + income_diversity(shifts) * weights.income_diversity_bonus
}

/// Weighted sum over the three objectives; returns `(total, breakdown)`
/// with breakdown keys `income`, `work_life_balance`, `job_source_balance`.
pub fn multi_objective_score(
    shifts: &[SuggestedShift],
    job_sources: &HashMap<String, JobSource>,
) -> (f64, HashMap<&'static str, f64>) {
    let income = income_objective(shifts, job_sources, IncomeWeights::default());
    let balance = work_life_balance_objective(shifts, job_sources, BalanceWeights::default());
    let sources = source_balance_objective(shifts, job_sources, SourceBalanceWeights::default());

    let total = income * 0.5 + balance * 0.3 + sources * 0.2;
    let breakdown = HashMap::from([
        ("income", income),
        ("work_life_balance", balance),
        ("job_source_balance", sources),
    ]);
    (total, breakdown)
}

/// Penalty for constraint violations, for penalty-method solvers.
/// Magnitude of each violation times its per-kind weight.
pub fn constraint_penalty(
    shifts: &[SuggestedShift],
    constraints: &HashMap<ConstraintKind, Constraint>,
    weights: PenaltyWeights,
) -> f64 {
    let mut penalty = 0.0;

    if let Some(fuyou) = constraints.get(&ConstraintKind::FuyouLimit) {
        let income: f64 = shifts.iter().map(|s| s.calculated_earnings).sum();
        if income > fuyou.value {
            penalty += (income - fuyou.value) * weights.fuyou_limit;
        }
    }

    if let Some(daily) = constraints.get(&ConstraintKind::DailyHours) {
        for hours in daily_hours(shifts).values() {
            if *hours > daily.value {
                penalty += (hours - daily.value) * weights.daily_hours;
            }
        }
    }

    if let Some(weekly) = constraints.get(&ConstraintKind::WeeklyHours) {
        for hours in weekly_hours(shifts).values() {
            if *hours > weekly.value {
                penalty += (hours - weekly.value) * weights.weekly_hours;
            }
        }
    }

    penalty
}

/// Working hours per calendar date.
pub fn daily_hours(shifts: &[SuggestedShift]) -> HashMap<NaiveDate, f64> {
    let mut map = HashMap::new();
    for shift in shifts {
        *map.entry(shift.date).or_insert(0.0) += shift.working_hours;
    }
    map
}

/// Working hours per `(iso_year, iso_week)` bucket.
pub fn weekly_hours(shifts: &[SuggestedShift]) -> HashMap<(i32, u32), f64> {
    let mut map = HashMap::new();
    for shift in shifts {
        *map.entry(week_key(shift.date)).or_insert(0.0) += shift.working_hours;
    }
    map
}

/// Coefficient of variation of shift counts per source; `1 - cv` clamped to
/// zero is the balance score used by the multi-objective strategy.
pub fn distribution_balance(counts: &[u32]) -> f64 {
    if counts.is_empty() {
        return 0.0;
    }
    if counts.len() == 1 {
        return 1.0;
    }
    let mean = counts.iter().map(|&c| f64::from(c)).sum::<f64>() / counts.len() as f64;
    if mean == 0.0 {
        return 0.0;
    }
    let variance = counts
        .iter()
        .map(|&c| (f64::from(c) - mean).powi(2))
        .sum::<f64>()
        / counts.len() as f64;
    let cv = variance.sqrt() / mean;
    (1.0 - cv).max(0.0)
}

fn overtime_bonus(shifts: &[SuggestedShift]) -> f64 {
    // 500 yen per hour beyond 8 on any single day.
    daily_hours(shifts)
        .values()
        .filter(|hours| **hours > 8.0)
        .map(|hours| (hours - 8.0) * 500.0)
        .sum()
}

fn weekend_premium(shifts: &[SuggestedShift]) -> f64 {
    shifts
        .iter()
        .filter(|s| is_weekend(s.date))
        .map(|s| s.calculated_earnings * 0.1)
        .sum()
}

fn consistency_bonus(shifts: &[SuggestedShift]) -> f64 {
    let mut by_weekday: HashMap<u8, Vec<&SuggestedShift>> = HashMap::new();
    for shift in shifts {
        by_weekday
            .entry(weekday_sunday0(shift.date))
            .or_default()
            .push(shift);
    }

    let mut bonus = 0.0;
    for group in by_weekday.values().filter(|g| g.len() > 1) {
        if group.windows(2).all(|w| w[0].start_time == w[1].start_time) {
            bonus += 500.0;
        }
        if group
            .windows(2)
            .all(|w| (w[0].working_hours - w[1].working_hours).abs() < 1e-9)
        {
            bonus += 300.0;
        }
    }
    bonus
}

fn risk_penalty(base_income: f64) -> f64 {
    // Grows linearly once earnings pass 80% of the wall.
    (base_income - FUYOU_WALL * 0.8).max(0.0)
}

fn split_shift_penalty(shifts: &[SuggestedShift]) -> f64 {
    let mut per_day: HashMap<NaiveDate, u32> = HashMap::new();
    for shift in shifts {
        *per_day.entry(shift.date).or_insert(0) += 1;
    }
    per_day
        .values()
        .filter(|count| **count > 1)
        .map(|count| f64::from(count - 1) * 1000.0)
        .sum()
}

fn evening_penalty(shifts: &[SuggestedShift]) -> f64 {
    use chrono::Timelike;
    shifts
        .iter()
        .filter(|s| s.start_time.hour() >= 18)
        .map(|s| s.working_hours * 100.0)
        .sum()
}

fn rest_period_bonus(shifts: &[SuggestedShift]) -> f64 {
    use chrono::Timelike;
    if shifts.len() < 2 {
        return 0.0;
    }
    let mut sorted: Vec<&SuggestedShift> = shifts.iter().collect();
    sorted.sort_by_key(|s| (s.date, s.start_time));

    let mut bonus = 0.0;
    for pair in sorted.windows(2) {
        let (prev, curr) = (pair[0], pair[1]);
        if (curr.date - prev.date).num_days() == 1 {
            bonus += 500.0;
        }
        if curr.date == prev.date && curr.start_time.hour() > prev.end_time.hour() + 2 {
            bonus += 200.0;
        }
    }
    bonus
}

fn distribution_score(shifts: &[SuggestedShift]) -> f64 {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    for shift in shifts {
        if let Some(id) = shift.job_source_id.as_deref() {
            *counts.entry(id).or_insert(0) += 1;
        }
    }
    if counts.is_empty() {
        return 0.0;
    }
    if counts.len() == 1 {
        return 500.0;
    }
    let values: Vec<u32> = counts.values().copied().collect();
    1000.0 * distribution_balance(&values)
}

fn relationship_score(shifts: &[SuggestedShift], job_sources: &HashMap<String, JobSource>) -> f64 {
    if job_sources.is_empty() {
        return 0.0;
    }
    let used = used_sources(shifts);
    (used as f64 / job_sources.len() as f64) * 1000.0
}

fn skill_diversity(shifts: &[SuggestedShift]) -> f64 {
    used_sources(shifts) as f64 * 200.0
}

fn income_diversity(shifts: &[SuggestedShift]) -> f64 {
    let mut per_source: HashMap<&str, f64> = HashMap::new();
    for shift in shifts {
        if let Some(id) = shift.job_source_id.as_deref() {
            *per_source.entry(id).or_insert(0.0) += shift.calculated_earnings;
        }
    }
    let total: f64 = per_source.values().sum();
    if per_source.is_empty() || total == 0.0 {
        return 0.0;
    }

    let entropy: f64 = per_source
        .values()
        .filter(|income| **income > 0.0)
        .map(|income| {
            let p = income / total;
            -p * p.log2()
        })
        .sum();
    let max_entropy = (per_source.len() as f64).log2();
    if max_entropy == 0.0 {
        return 0.0;
    }
    (entropy / max_entropy) * 1000.0
}

fn used_sources(shifts: &[SuggestedShift]) -> usize {
    shifts
        .iter()
        .filter_map(|s| s.job_source_id.as_deref())
        .collect::<std::collections::HashSet<_>>()
        .len()
}
