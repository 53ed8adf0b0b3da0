//! Multi-objective strategy (NSGA-II shaped).
//!
//! Evolves rosters against three maximized objectives: total income,
//! negated working hours and source balance (`1 - cv` of the per-source
//! shift counts). Survivors are picked by non-domination rank with
//! crowding-distance truncation; the returned schedule is the knee of the
//! final front under the weighted multi-objective score.

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;
use shiftopt_core::model::{AlgorithmKind, ConstraintKind, SolverPreferences};
use shiftopt_core::{OptimizeError, Result};
use shiftopt_scoring::{distribution_balance, multi_objective_score};
use tracing::debug;

use crate::engine::{SolveContext, SolverOutcome, Strategy};
use crate::fallback::fallback_outcome;
use crate::problem::Problem;
use crate::roster::{clamp_start, job_for_rate, lift_genes, random_schedule, Gene};

const OBJECTIVES: usize = 3;

pub struct MultiObjectiveStrategy {
    population_size: usize,
    generations: usize,
}

impl MultiObjectiveStrategy {
    pub fn new(population_size: usize, generations: usize) -> Self {
        MultiObjectiveStrategy {
            population_size: population_size.max(4),
            generations,
        }
    }
}

impl Strategy for MultiObjectiveStrategy {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::MultiObjectiveNsga2
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
        if problem.job_sources.is_empty() || problem.dates.is_empty() {
            return Ok(fallback_outcome(problem, "no_job_sources"));
        }

        let mut rng = match preferences.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let generations = preferences
            .max_iterations
            .map(|m| m as usize)
            .unwrap_or(self.generations);
        let weekly_cap = problem
            .constraint_value(ConstraintKind::WeeklyHours)
            .unwrap_or(40.0);
        let rates: Vec<f64> = problem
            .jobs_ordered()
            .iter()
            .map(|j| j.hourly_rate)
            .collect();

        let mut population: Vec<Vec<Gene>> = (0..self.population_size)
            .map(|_| random_schedule(problem, &mut rng, weekly_cap))
            .collect();

        let mut generations_run = 0usize;
        let mut stopped_early = None;

        for _ in 0..generations {
            if ctx.cancelled() {
                return Err(OptimizeError::Cancelled);
            }
            if ctx.timed_out() {
                stopped_early = Some("timed_out");
                break;
            }

            let objectives: Vec<[f64; OBJECTIVES]> = population
                .iter()
                .map(|genes| evaluate(problem, genes))
                .collect();
            let fronts = fast_non_dominated_sort(&objectives);
            let (ranks, crowding) = rank_and_crowding(&fronts, &objectives, population.len());

            let mut offspring = Vec::with_capacity(self.population_size);
            while offspring.len() < self.population_size {
                let first = tournament(&ranks, &crowding, &mut rng);
                let second = tournament(&ranks, &crowding, &mut rng);
                let mut child = crossover(&population[first], &population[second], &mut rng);
                if rng.random::<f64>() < 0.1 {
                    mutate(&mut child, &rates, &mut rng);
                }
                offspring.push(child);
            }

            // (mu + lambda) survival: combine, re-rank, truncate by
            // crowding inside the last admitted front.
            let mut combined = population;
            combined.extend(offspring);
            let combined_objectives: Vec<[f64; OBJECTIVES]> = combined
                .iter()
                .map(|genes| evaluate(problem, genes))
                .collect();
            let fronts = fast_non_dominated_sort(&combined_objectives);

            let mut next: Vec<Vec<Gene>> = Vec::with_capacity(self.population_size);
            for front in &fronts {
                if next.len() + front.len() <= self.population_size {
                    next.extend(front.iter().map(|&i| combined[i].clone()));
                } else {
                    let distances = crowding_distance(front, &combined_objectives);
                    let mut by_crowding: Vec<usize> = (0..front.len()).collect();
                    by_crowding.sort_by(|a, b| distances[*b].total_cmp(&distances[*a]));
                    for &pos in by_crowding.iter() {
                        if next.len() == self.population_size {
                            break;
                        }
                        next.push(combined[front[pos]].clone());
                    }
                }
                if next.len() == self.population_size {
                    break;
                }
            }
            population = next;
            generations_run += 1;
        }

        // Knee pick: score the first front with the weighted objective sum.
        let objectives: Vec<[f64; OBJECTIVES]> = population
            .iter()
            .map(|genes| evaluate(problem, genes))
            .collect();
        let fronts = fast_non_dominated_sort(&objectives);
        let front = fronts.first().cloned().unwrap_or_default();

        let mut best: Option<(Vec<shiftopt_core::model::SuggestedShift>, f64, [f64; 3])> = None;
        for &index in &front {
            let shifts = lift_genes(problem, &population[index], 0.8, |job, _| {
                format!("Multi-objective solution: balanced shift at {}", job.name)
            });
            if shifts.is_empty() {
                continue;
            }
            let (score, _) = multi_objective_score(&shifts, &problem.job_sources);
            if best.as_ref().map_or(true, |(_, b, _)| score > *b) {
                best = Some((shifts, score, objectives[index]));
            }
        }

        let Some((shifts, _, picked)) = best else {
            return Ok(fallback_outcome(problem, "empty_pareto_front"));
        };

        let balance_score = picked[2];
        debug!(
            generations_run,
            front_size = front.len(),
            balance_score,
            "pareto search finished"
        );

        let total_income: f64 = shifts.iter().map(|s| s.calculated_earnings).sum();
        let total_hours: f64 = shifts.iter().map(|s| s.working_hours).sum();

        let mut metadata: shiftopt_core::model::Metadata = [
            ("algorithm".to_string(), json!("multi_objective_nsga2")),
            ("generations_run".to_string(), json!(generations_run)),
            ("pareto_front_size".to_string(), json!(front.len())),
            ("balance_score".to_string(), json!(balance_score)),
            (
                "objectives".to_string(),
                json!({
                    "income": total_income,
                    "hours": total_hours,
                    "balance": balance_score,
                }),
            ),
        ]
        .into_iter()
        .collect();
        if let Some(reason) = stopped_early {
            metadata.insert(reason.to_string(), json!(true));
        }

        Ok(SolverOutcome {
            shifts,
            objective_value: total_income,
            confidence_score: 0.8,
            metadata,
        })
    }
}

/// Maximized objective vector: income, negated hours, source balance.
fn evaluate(problem: &Problem, genes: &[Gene]) -> [f64; OBJECTIVES] {
    let income: f64 = genes.iter().map(Gene::earnings).sum();
    let hours: f64 = genes.iter().map(Gene::working_hours).sum();

    let mut counts: HashMap<&str, u32> = HashMap::new();
    for gene in genes {
        if let Some(job) = job_for_rate(problem, gene.hourly_rate) {
            *counts.entry(job.id.as_str()).or_insert(0) += 1;
        }
    }
    let count_values: Vec<u32> = counts.values().copied().collect();
    let balance = distribution_balance(&count_values);

    [income, -hours, balance]
}

fn dominates(a: &[f64; OBJECTIVES], b: &[f64; OBJECTIVES]) -> bool {
    let mut strictly_better = false;
    for (x, y) in a.iter().zip(b.iter()) {
        if x < y {
            return false;
        }
        if x > y {
            strictly_better = true;
        }
    }
    strictly_better
}

/// Deb's fast non-dominated sort; returns fronts of population indices.
fn fast_non_dominated_sort(objectives: &[[f64; OBJECTIVES]]) -> Vec<Vec<usize>> {
    let n = objectives.len();
    let mut dominated_by: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut domination_count = vec![0usize; n];
    let mut fronts: Vec<Vec<usize>> = vec![Vec::new()];

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            if dominates(&objectives[i], &objectives[j]) {
                dominated_by[i].push(j);
            } else if dominates(&objectives[j], &objectives[i]) {
                domination_count[i] += 1;
            }
        }
        if domination_count[i] == 0 {
            fronts[0].push(i);
        }
    }

    let mut current = 0;
    while !fronts[current].is_empty() {
        let mut next = Vec::new();
        for &i in &fronts[current] {
            for &j in &dominated_by[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    next.push(j);
                }
            }
        }
        current += 1;
        fronts.push(next);
    }
    fronts.pop();
    fronts
}

/// Crowding distance within one front, aligned with the front's order.
fn crowding_distance(front: &[usize], objectives: &[[f64; OBJECTIVES]]) -> Vec<f64> {
    let mut distance = vec![0.0_f64; front.len()];
    if front.len() <= 2 {
        return vec![f64::INFINITY; front.len()];
    }

    for objective in 0..OBJECTIVES {
        let mut order: Vec<usize> = (0..front.len()).collect();
        order.sort_by(|a, b| {
            objectives[front[*a]][objective].total_cmp(&objectives[front[*b]][objective])
        });
        let low = objectives[front[order[0]]][objective];
        let high = objectives[front[*order.last().unwrap()]][objective];
        distance[order[0]] = f64::INFINITY;
        distance[*order.last().unwrap()] = f64::INFINITY;
        if (high - low).abs() < f64::EPSILON {
            continue;
        }
        for window in order.windows(3) {
            let spread = objectives[front[window[2]]][objective]
                - objectives[front[window[0]]][objective];
            distance[window[1]] += spread / (high - low);
        }
    }
    distance
}

fn rank_and_crowding(
    fronts: &[Vec<usize>],
    objectives: &[[f64; OBJECTIVES]],
    n: usize,
) -> (Vec<usize>, Vec<f64>) {
    let mut ranks = vec![0usize; n];
    let mut crowding = vec![0.0_f64; n];
    for (rank, front) in fronts.iter().enumerate() {
        let distances = crowding_distance(front, objectives);
        for (pos, &index) in front.iter().enumerate() {
            ranks[index] = rank;
            crowding[index] = distances[pos];
        }
    }
    (ranks, crowding)
}

/// Binary tournament on (rank, crowding distance).
fn tournament(ranks: &[usize], crowding: &[f64], rng: &mut StdRng) -> usize {
    let a = rng.random_range(0..ranks.len());
    let b = rng.random_range(0..ranks.len());
    if ranks[a] < ranks[b] || (ranks[a] == ranks[b] && crowding[a] > crowding[b]) {
        a
    } else {
        b
    }
}

/// Uniform crossover keyed by date: where both parents schedule a date the
/// child inherits one gene at random, otherwise it takes what exists.
fn crossover(first: &[Gene], second: &[Gene], rng: &mut StdRng) -> Vec<Gene> {
    let mut by_date: HashMap<usize, Vec<&Gene>> = HashMap::new();
    for gene in first.iter().chain(second.iter()) {
        by_date.entry(gene.date_index).or_default().push(gene);
    }
    let mut dates: Vec<usize> = by_date.keys().copied().collect();
    dates.sort_unstable();

    dates
        .into_iter()
        .map(|date| {
            let options = &by_date[&date];
            options[rng.random_range(0..options.len())].clone()
        })
        .collect()
}

/// Nudges one gene's duration by an hour or resamples its rate.
fn mutate(genes: &mut [Gene], rates: &[f64], rng: &mut StdRng) {
    if genes.is_empty() || rates.is_empty() {
        return;
    }
    let index = rng.random_range(0..genes.len());
    let gene = &mut genes[index];
    if rng.random_bool(0.5) {
        let step = if rng.random_bool(0.5) { 60 } else { -60 };
        gene.duration_minutes = (gene.duration_minutes + step).clamp(120, 480);
        gene.start_hour = clamp_start(gene.start_hour, gene.duration_minutes);
    } else {
        gene.hourly_rate = rates[rng.random_range(0..rates.len())];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::tests::problem;

    fn prefs(seed: u64) -> SolverPreferences {
        SolverPreferences {
            algorithm: AlgorithmKind::MultiObjectiveNsga2,
            random_seed: Some(seed),
            ..SolverPreferences::default()
        }
    }

    #[test]
    fn domination_is_strict_pareto() {
        assert!(dominates(&[2.0, 0.0, 1.0], &[1.0, 0.0, 1.0]));
        assert!(!dominates(&[1.0, 0.0, 1.0], &[1.0, 0.0, 1.0]));
        assert!(!dominates(&[2.0, -1.0, 1.0], &[1.0, 0.0, 1.0]));
    }

    #[test]
    fn sort_layers_fronts_correctly() {
        let objectives = vec![
            [10.0, -5.0, 1.0], // dominates the last
            [8.0, -4.0, 0.5],  // trade-off with the first
            [5.0, -8.0, 0.2],  // dominated by the first
        ];
        let fronts = fast_non_dominated_sort(&objectives);
        assert_eq!(fronts[0], vec![0, 1]);
        assert_eq!(fronts[1], vec![2]);
    }

    #[test]
    fn boundary_points_get_infinite_crowding() {
        let objectives = vec![
            [1.0, 0.0, 0.0],
            [2.0, 0.0, 0.0],
            [3.0, 0.0, 0.0],
            [4.0, 0.0, 0.0],
        ];
        let front: Vec<usize> = (0..4).collect();
        let distances = crowding_distance(&front, &objectives);
        assert!(distances[0].is_infinite());
        assert!(distances[3].is_infinite());
        assert!(distances[1].is_finite() && distances[1] > 0.0);
    }

    #[test]
    fn crossover_never_duplicates_dates() {
        let mut rng = StdRng::seed_from_u64(5);
        let first: Vec<Gene> = (0..5)
            .map(|i| Gene {
                date_index: i,
                start_hour: 10,
                duration_minutes: 240,
                hourly_rate: 1000.0,
            })
            .collect();
        let second: Vec<Gene> = (2..8)
            .map(|i| Gene {
                date_index: i,
                start_hour: 12,
                duration_minutes: 360,
                hourly_rate: 1200.0,
            })
            .collect();
        for _ in 0..20 {
            let child = crossover(&first, &second, &mut rng);
            let mut dates: Vec<_> = child.iter().map(|g| g.date_index).collect();
            let before = dates.len();
            dates.dedup();
            assert_eq!(before, dates.len());
            assert_eq!(before, 8);
        }
    }

    #[test]
    fn pareto_run_balances_sources() {
        let p = problem(21, &[1000.0, 1200.0, 1400.0]);
        let strategy = MultiObjectiveStrategy::new(30, 40);
        let outcome = strategy
            .optimize(&p, &prefs(11), &SolveContext::unbounded())
            .unwrap();
        assert!(!outcome.shifts.is_empty());
        assert_eq!(outcome.metadata["algorithm"], "multi_objective_nsga2");
        assert!(outcome.metadata.contains_key("balance_score"));
        assert!(outcome.metadata["objectives"]["income"].as_f64().unwrap() > 0.0);
        // No date is double-booked.
        let mut dates: Vec<_> = outcome.shifts.iter().map(|s| s.date).collect();
        dates.sort();
        let before = dates.len();
        dates.dedup();
        assert_eq!(before, dates.len());
    }

    #[test]
    fn timed_out_runs_flag_their_outcome() {
        let p = problem(14, &[1000.0]);
        let strategy = MultiObjectiveStrategy::new(16, 40);
        let ctx = SolveContext::new(
            std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false)),
            Some(std::time::Duration::from_secs(0)),
        );
        let outcome = strategy.optimize(&p, &prefs(3), &ctx).unwrap();
        // Expired before the first generation: the fallback carries the flag
        // or the metadata records the early stop.
        assert!(
            outcome.metadata.get("timed_out") == Some(&json!(true))
                || outcome.metadata.get("reason").is_some()
        );
    }
}
