//! Tier policy table and the algorithm catalog.

use serde::{Deserialize, Serialize};

use super::{AlgorithmKind, ObjectiveKind, TierLevel};

/// Quota limits attached to a subscription tier. `-1` means unlimited.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TierLimits {
    pub max_optimization_runs: i32,
    pub available_algorithms: Vec<AlgorithmKind>,
    pub max_constraints: i32,
    /// Maximum days in the optimization horizon.
    pub max_time_horizon: i64,
    pub analytics_access: bool,
    pub api_access: bool,
    pub support_level: String,
}

impl TierLimits {
    /// The process-wide policy table; effectively-immutable configuration.
    pub fn for_level(level: TierLevel) -> TierLimits {
        match level {
            TierLevel::Free => TierLimits {
                max_optimization_runs: 5,
                available_algorithms: vec![AlgorithmKind::LinearProgramming],
                max_constraints: 5,
                max_time_horizon: 30,
                analytics_access: false,
                api_access: false,
                support_level: "basic".into(),
            },
            TierLevel::Standard => TierLimits {
                max_optimization_runs: 50,
                available_algorithms: vec![
                    AlgorithmKind::LinearProgramming,
                    AlgorithmKind::GeneticAlgorithm,
                ],
                max_constraints: 15,
                max_time_horizon: 90,
                analytics_access: true,
                api_access: false,
                support_level: "standard".into(),
            },
            TierLevel::Pro => TierLimits {
                max_optimization_runs: -1,
                available_algorithms: vec![
                    AlgorithmKind::LinearProgramming,
                    AlgorithmKind::GeneticAlgorithm,
                    AlgorithmKind::MultiObjectiveNsga2,
                ],
                max_constraints: -1,
                max_time_horizon: 365,
                analytics_access: true,
                api_access: true,
                support_level: "premium".into(),
            },
        }
    }

    pub fn allows_algorithm(&self, algorithm: AlgorithmKind) -> bool {
        self.available_algorithms.contains(&algorithm)
    }
}

/// Catalog entry served by `GET /algorithms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlgorithmInfo {
    pub id: AlgorithmKind,
    pub name: String,
    pub description: String,
    /// low, medium, high.
    pub complexity: String,
    /// fast, medium, slow.
    pub execution_time: String,
    pub suitable_for: Vec<ObjectiveKind>,
    pub tier_requirement: TierLevel,
}

impl AlgorithmInfo {
    /// The full catalog, including strategies no tier currently unlocks.
    pub fn catalog() -> Vec<AlgorithmInfo> {
        vec![
            AlgorithmInfo {
                id: AlgorithmKind::LinearProgramming,
                name: "Linear Programming".into(),
                description: "Fast linear optimization suitable for most scenarios".into(),
                complexity: "low".into(),
                execution_time: "fast".into(),
                suitable_for: vec![ObjectiveKind::MaximizeIncome, ObjectiveKind::MinimizeHours],
                tier_requirement: TierLevel::Free,
            },
            AlgorithmInfo {
                id: AlgorithmKind::GeneticAlgorithm,
                name: "Genetic Algorithm".into(),
                description: "Evolutionary optimization for complex constraints".into(),
                complexity: "medium".into(),
                execution_time: "medium".into(),
                suitable_for: vec![ObjectiveKind::BalanceSources, ObjectiveKind::MultiObjective],
                tier_requirement: TierLevel::Standard,
            },
            AlgorithmInfo {
                id: AlgorithmKind::SimulatedAnnealing,
                name: "Simulated Annealing".into(),
                description: "Probabilistic optimization for escaping local optima".into(),
                complexity: "medium".into(),
                execution_time: "medium".into(),
                suitable_for: vec![ObjectiveKind::MultiObjective],
                tier_requirement: TierLevel::Standard,
            },
            AlgorithmInfo {
                id: AlgorithmKind::MultiObjectiveNsga2,
                name: "NSGA-II Multi-Objective".into(),
                description: "Multi-objective optimization with Pareto solutions".into(),
                complexity: "high".into(),
                execution_time: "slow".into(),
                suitable_for: vec![ObjectiveKind::MultiObjective],
                tier_requirement: TierLevel::Pro,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tier_table_matches_policy() {
        let free = TierLimits::for_level(TierLevel::Free);
        assert_eq!(free.max_constraints, 5);
        assert_eq!(free.max_time_horizon, 30);
        assert!(free.allows_algorithm(AlgorithmKind::LinearProgramming));
        assert!(!free.allows_algorithm(AlgorithmKind::GeneticAlgorithm));

        let standard = TierLimits::for_level(TierLevel::Standard);
        assert_eq!(standard.max_constraints, 15);
        assert!(standard.allows_algorithm(AlgorithmKind::GeneticAlgorithm));
        assert!(!standard.allows_algorithm(AlgorithmKind::MultiObjectiveNsga2));

        let pro = TierLimits::for_level(TierLevel::Pro);
        assert_eq!(pro.max_constraints, -1);
        assert_eq!(pro.max_time_horizon, 365);
        assert!(pro.allows_algorithm(AlgorithmKind::MultiObjectiveNsga2));
    }

    #[test]
    fn no_tier_unlocks_simulated_annealing() {
        for level in [TierLevel::Free, TierLevel::Standard, TierLevel::Pro] {
            assert!(!TierLimits::for_level(level).allows_algorithm(AlgorithmKind::SimulatedAnnealing));
        }
        // It still appears in the catalog.
        assert!(AlgorithmInfo::catalog()
            .iter()
            .any(|a| a.id == AlgorithmKind::SimulatedAnnealing));
    }
}
