//! Pre-solve request validation.
//!
//! A three-stage cascade: tier policy, constraint checks (values and
//! mutual compatibility), then time range and job sources. Each stage
//! produces a [`ValidationReport`]; violations are fatal, warnings and
//! suggestions flow through to the response.

mod constraints;
mod request;
mod tier;

use tracing::debug;

use crate::model::{Constraint, OptimizationRequest, ValidationReport};

/// Validates optimization requests before they reach a solver.
///
/// Stateless; the tier policy table is process-wide configuration looked
/// up per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestValidator;

impl RequestValidator {
    pub fn new() -> Self {
        RequestValidator
    }

    /// Runs the full cascade. The result is deterministic for a given
    /// request: validating twice yields identical reports.
    pub fn validate_request(&self, request: &OptimizationRequest) -> ValidationReport {
        let mut report = ValidationReport::new();
        report.merge(tier::check(request));
        report.merge(self.validate_constraints(&request.constraints));
        report.merge(request::check_time_range(request));
        report.merge(request::check_job_sources(request));
        let report = report.finish();
        debug!(
            valid = report.is_valid,
            violations = report.violations.len(),
            warnings = report.warnings.len(),
            "request validated"
        );
        report
    }

    /// Constraint-only validation, used by the pre-flight endpoint.
    pub fn validate_constraints(&self, constraints: &[Constraint]) -> ValidationReport {
        constraints::check(constraints).finish()
    }
}
