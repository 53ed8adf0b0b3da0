//! Tier-policy validation stage.

use crate::model::{OptimizationRequest, TierLimits, ValidationReport, ViolationKind};

pub(super) fn check(request: &OptimizationRequest) -> ValidationReport {
    let mut report = ValidationReport::new();
    let limits = TierLimits::for_level(request.tier_level);

    let algorithm = request.preferences.algorithm;
    if !limits.allows_algorithm(algorithm) {
        report.violation(
            ViolationKind::TierLimitError,
            format!(
                "Algorithm '{algorithm}' is not available for {} tier",
                request.tier_level
            ),
        );
        report.suggest(format!(
            "Upgrade to a higher tier to access the {algorithm} algorithm"
        ));
    }

    if limits.max_constraints != -1 && request.constraints.len() as i32 > limits.max_constraints {
        report.violation(
            ViolationKind::TierLimitError,
            format!(
                "Too many constraints: {} > {} (limit for {} tier)",
                request.constraints.len(),
                limits.max_constraints,
                request.tier_level
            ),
        );
        report.suggest(format!(
            "Reduce constraints to {} or upgrade to a higher tier",
            limits.max_constraints
        ));
    }

    let span = request.time_range.span_days();
    if span > limits.max_time_horizon {
        report.violation(
            ViolationKind::TierLimitError,
            format!(
                "Time horizon too long: {span} days > {} days (limit for {} tier)",
                limits.max_time_horizon, request.tier_level
            ),
        );
        report.suggest(format!(
            "Reduce time horizon to {} days or upgrade to a higher tier",
            limits.max_time_horizon
        ));
    }

    report
}
