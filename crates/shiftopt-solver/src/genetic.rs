//! Genetic-algorithm strategy.
//!
//! Evolves rosters of `(date, duration, rate)` genes: tournament selection,
//! elitist survival, union-and-subsample crossover and small hour/rate
//! mutations. Fitness is normalized per objective and penalized for
//! crossing the annual earnings wall or overworking the average week; the
//! thresholds are annual figures applied regardless of horizon length and
//! flagged as such in the outcome metadata.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde_json::json;
use shiftopt_core::model::{AlgorithmKind, ConstraintKind, ObjectiveKind, SolverPreferences};
use shiftopt_core::time::week_key;
use shiftopt_core::{OptimizeError, Result};
use tracing::debug;

use crate::engine::{SolveContext, SolverOutcome, Strategy};
use crate::fallback::fallback_outcome;
use crate::problem::Problem;
use crate::roster::{clamp_start, lift_genes, random_schedule, repair, Gene};

/// Annual earnings wall the over-limit penalty is anchored to.
const EARNINGS_WALL: f64 = 1_030_000.0;

pub struct GeneticAlgorithmStrategy {
    population_size: usize,
    generations: usize,
    mutation_rate: f64,
    crossover_rate: f64,
}

impl GeneticAlgorithmStrategy {
    pub fn new(population_size: usize, generations: usize) -> Self {
        GeneticAlgorithmStrategy {
            population_size: population_size.max(2),
            generations,
            mutation_rate: 0.1,
            crossover_rate: 0.8,
        }
    }
}

impl Strategy for GeneticAlgorithmStrategy {
    fn kind(&self) -> AlgorithmKind {
        AlgorithmKind::GeneticAlgorithm
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
        let weeks = problem
            .dates
            .iter()
            .map(|d| week_key(*d))
            .collect::<std::collections::HashSet<_>>()
            .len()
            .max(1);
        let rates: Vec<f64> = problem
            .jobs_ordered()
            .iter()
            .map(|j| j.hourly_rate)
            .collect();

        let mut population: Vec<Vec<Gene>> = (0..self.population_size)
            .map(|_| random_schedule(problem, &mut rng, weekly_cap))
            .collect();

        let mut best: Option<(Vec<Gene>, f64)> = None;
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

            let objective = problem.objective;
            let fitness: Vec<f64> = if preferences.enable_parallel {
                population
                    .par_iter()
                    .map(|c| fitness_of(c, objective, weeks))
                    .collect()
            } else {
                population
                    .iter()
                    .map(|c| fitness_of(c, objective, weeks))
                    .collect()
            };

            for (individual, score) in population.iter().zip(&fitness) {
                if best.as_ref().map_or(true, |(_, b)| score > b) {
                    best = Some((individual.clone(), *score));
                }
            }

            // Elitism: the top 20% survive verbatim.
            let mut order: Vec<usize> = (0..population.len()).collect();
            order.sort_by(|a, b| fitness[*b].total_cmp(&fitness[*a]));
            let elite_count = (population.len() / 5).max(1);
            let mut next: Vec<Vec<Gene>> = order[..elite_count]
                .iter()
                .map(|&i| population[i].clone())
                .collect();

            while next.len() < population.len() {
                let first = tournament(&population, &fitness, &mut rng);
                let second = tournament(&population, &fitness, &mut rng);
                let mut child = if rng.random::<f64>() < self.crossover_rate {
                    crossover(first, second, &mut rng)
                } else {
                    first.to_vec()
                };
                if rng.random::<f64>() < self.mutation_rate {
                    mutate(&mut child, &rates, &mut rng);
                }
                next.push(child);
            }

            population = next;
            generations_run += 1;
        }

        let Some((best_genes, best_fitness)) = best else {
            let mut outcome = fallback_outcome(problem, "timed_out");
            outcome
                .metadata
                .insert("timed_out".to_string(), json!(true));
            return Ok(outcome);
        };

        let genes = post_process(repair(best_genes), problem);
        if genes.is_empty() {
            return Ok(fallback_outcome(problem, "empty_evolution"));
        }

        debug!(
            generations_run,
            best_fitness,
            shifts = genes.len(),
            "genetic evolution finished"
        );

        let shifts = lift_genes(problem, &genes, 0.8, |job, hours| {
            format!("Evolved shift pattern at {} for {hours:.1} hours", job.name)
        });
        let objective_value: f64 = shifts.iter().map(|s| s.calculated_earnings).sum();

        let mut metadata: shiftopt_core::model::Metadata = [
            ("algorithm".to_string(), json!("genetic_algorithm")),
            ("generations_run".to_string(), json!(generations_run)),
            ("population_size".to_string(), json!(self.population_size)),
            ("best_fitness".to_string(), json!(best_fitness)),
            ("annual_thresholds".to_string(), json!(true)),
        ]
        .into_iter()
        .collect();
        if let Some(reason) = stopped_early {
            metadata.insert(reason.to_string(), json!(true));
        }

        Ok(SolverOutcome {
            shifts,
            objective_value,
            confidence_score: 0.8,
            metadata,
        })
    }
}

/// Normalized fitness minus over-limit penalties, floored at zero.
fn fitness_of(genes: &[Gene], objective: ObjectiveKind, weeks: usize) -> f64 {
    let earnings: f64 = genes.iter().map(Gene::earnings).sum();
    let hours: f64 = genes.iter().map(Gene::working_hours).sum();

    let raw = match objective {
        ObjectiveKind::MaximizeIncome => earnings / 1_000_000.0,
        ObjectiveKind::MinimizeHours => (2_000_000.0 - earnings).max(0.0) / 2_000_000.0,
        ObjectiveKind::BalanceSources | ObjectiveKind::MultiObjective => {
            (1.0 - (hours - 100.0).abs() / 100.0).max(0.0)
        }
    };

    let mut penalty = 0.0;
    if earnings > EARNINGS_WALL {
        penalty += (earnings - EARNINGS_WALL) / 100_000.0 * 0.5;
    }
    let avg_weekly = hours / weeks as f64;
    if avg_weekly > 40.0 {
        penalty += 0.1 * (avg_weekly - 40.0);
    }

    (raw - penalty).max(0.0)
}

/// Size-3 tournament; the fittest contender wins.
fn tournament<'a>(population: &'a [Vec<Gene>], fitness: &[f64], rng: &mut StdRng) -> &'a [Gene] {
    let mut winner = rng.random_range(0..population.len());
    for _ in 0..2 {
        let contender = rng.random_range(0..population.len());
        if fitness[contender] > fitness[winner] {
            winner = contender;
        }
    }
    &population[winner]
}

/// Union of both parents' genes, subsampled to a random size in `[5, 15]`.
fn crossover(first: &[Gene], second: &[Gene], rng: &mut StdRng) -> Vec<Gene> {
    let mut union: Vec<Gene> = first.iter().chain(second.iter()).cloned().collect();
    union.shuffle(rng);
    let target = rng.random_range(5..=15).min(union.len());
    union.truncate(target);
    union
}

/// Perturbs one random gene: either its hours by a standard-normal step
/// clamped to `[2, 8]`, or its rate resampled from the pool.
fn mutate(genes: &mut [Gene], rates: &[f64], rng: &mut StdRng) {
    if genes.is_empty() || rates.is_empty() {
        return;
    }
    let index = rng.random_range(0..genes.len());
    let gene = &mut genes[index];
    if rng.random_bool(0.5) {
        let hours = gene.duration_minutes as f64 / 60.0 + standard_normal(rng);
        let hours = hours.clamp(2.0, 8.0);
        gene.duration_minutes = (hours * 60.0).round() as i64;
        gene.start_hour = clamp_start(gene.start_hour, gene.duration_minutes);
    } else {
        gene.hourly_rate = rates[rng.random_range(0..rates.len())];
    }
}

/// Box-Muller draw from N(0, 1).
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// Orders shifts by rate descending; with a fuyou constraint present the
/// list is greedily truncated so cumulative earnings stay under the limit.
fn post_process(mut genes: Vec<Gene>, problem: &Problem) -> Vec<Gene> {
    genes.sort_by(|a, b| b.hourly_rate.total_cmp(&a.hourly_rate));
    if let Some(limit) = problem.constraint_value(ConstraintKind::FuyouLimit) {
        let mut cumulative = 0.0;
        genes.retain(|gene| {
            if cumulative + gene.earnings() <= limit {
                cumulative += gene.earnings();
                true
            } else {
                false
            }
        });
    }
    genes
}

#[cfg(test)]
mod tests {
    use shiftopt_core::model::{Constraint, ConstraintUnit};

    use super::*;
    use crate::roster::tests::problem;

    fn prefs(seed: u64) -> SolverPreferences {
        SolverPreferences {
            algorithm: AlgorithmKind::GeneticAlgorithm,
            random_seed: Some(seed),
            ..SolverPreferences::default()
        }
    }

    fn gene(hours: i64, rate: f64) -> Gene {
        Gene {
            date_index: 0,
            start_hour: 10,
            duration_minutes: hours * 60,
            hourly_rate: rate,
        }
    }

    #[test]
    fn fitness_normalizes_by_objective() {
        let roster = vec![gene(5, 1000.0)]; // 5h * 1000 = 5000 yen
        assert!((fitness_of(&roster, ObjectiveKind::MaximizeIncome, 4) - 0.005).abs() < 1e-9);
        assert!(
            (fitness_of(&roster, ObjectiveKind::MinimizeHours, 4) - 1_995_000.0 / 2_000_000.0)
                .abs()
                < 1e-9
        );
        // 5 working hours, target 100: 1 - 95/100.
        assert!(
            (fitness_of(&roster, ObjectiveKind::BalanceSources, 4) - 0.05).abs() < 1e-9
        );
    }

    #[test]
    fn over_wall_earnings_are_penalized() {
        // 200 shifts of 8h (7.5 working) at 1000 yen: 1.5M yen.
        let roster: Vec<Gene> = (0..200).map(|_| gene(8, 1000.0)).collect();
        let over = fitness_of(&roster, ObjectiveKind::MaximizeIncome, 52);
        // raw 1.5, penalty (470_000/100_000)*0.5 = 2.35 -> floored at 0.
        assert_eq!(over, 0.0);
    }

    #[test]
    fn heavy_weeks_are_penalized() {
        // 60 working hours in one week, small earnings.
        let roster: Vec<Gene> = (0..10).map(|_| gene(6, 100.0)).collect();
        let fit_one_week = fitness_of(&roster, ObjectiveKind::MinimizeHours, 1);
        let fit_two_weeks = fitness_of(&roster, ObjectiveKind::MinimizeHours, 2);
        assert!(fit_one_week < fit_two_weeks);
    }

    #[test]
    fn crossover_stays_within_subsample_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        let first: Vec<Gene> = (0..10).map(|_| gene(4, 1000.0)).collect();
        let second: Vec<Gene> = (0..10).map(|_| gene(6, 1200.0)).collect();
        for _ in 0..50 {
            let child = crossover(&first, &second, &mut rng);
            assert!(child.len() >= 5 && child.len() <= 15);
        }
    }

    #[test]
    fn mutation_keeps_hours_in_range() {
        let mut rng = StdRng::seed_from_u64(9);
        let rates = vec![1000.0, 1400.0];
        for _ in 0..200 {
            let mut genes = vec![gene(8, 1000.0)];
            mutate(&mut genes, &rates, &mut rng);
            let hours = genes[0].duration_minutes as f64 / 60.0;
            assert!((2.0..=8.0).contains(&hours));
            assert!(rates.contains(&genes[0].hourly_rate));
        }
    }

    #[test]
    fn post_process_truncates_at_the_fuyou_limit() {
        let mut p = problem(30, &[1500.0]);
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
        // Each 6h gene earns 9000 yen; only two fit under 20k.
        let genes: Vec<Gene> = (0..5)
            .map(|i| Gene {
                date_index: i,
                start_hour: 10,
                duration_minutes: 360,
                hourly_rate: 1500.0,
            })
            .collect();
        let kept = post_process(genes, &p);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn evolved_roster_respects_the_fuyou_limit() {
        let mut p = problem(30, &[1500.0]);
        p.constraints.insert(
            ConstraintKind::FuyouLimit,
            Constraint {
                kind: ConstraintKind::FuyouLimit,
                value: 1_030_000.0,
                unit: ConstraintUnit::Yen,
                priority: 1,
                metadata: Default::default(),
            },
        );
        let strategy = GeneticAlgorithmStrategy::new(50, 100);
        let outcome = strategy
            .optimize(&p, &prefs(42), &SolveContext::unbounded())
            .unwrap();
        assert!(!outcome.shifts.is_empty());
        let income: f64 = outcome.shifts.iter().map(|s| s.calculated_earnings).sum();
        assert!(income <= 1_030_000.0);
        assert_eq!(outcome.metadata["algorithm"], "genetic_algorithm");
        assert_eq!(outcome.metadata["annual_thresholds"], true);
        // One shift per date after repair.
        let mut dates: Vec<_> = outcome.shifts.iter().map(|s| s.date).collect();
        dates.sort();
        dates.dedup();
        assert_eq!(dates.len(), outcome.shifts.len());
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let p = problem(14, &[1000.0, 1300.0]);
        let strategy = GeneticAlgorithmStrategy::new(20, 30);
        let mut first = strategy
            .optimize(&p, &prefs(7), &SolveContext::unbounded())
            .unwrap();
        let mut second = strategy
            .optimize(&p, &prefs(7), &SolveContext::unbounded())
            .unwrap();
        // Shift ids are random; compare the schedule itself.
        for outcome in [&mut first, &mut second] {
            for shift in &mut outcome.shifts {
                shift.id.clear();
            }
        }
        assert_eq!(first.objective_value, second.objective_value);
        assert_eq!(first.shifts.len(), second.shifts.len());
    }
}
