//! Time-range and job-source validation stages.

use std::collections::HashSet;

use chrono::{Days, Utc};

use crate::model::{OptimizationRequest, ValidationReport, ViolationKind};

pub(super) fn check_time_range(request: &OptimizationRequest) -> ValidationReport {
    let mut report = ValidationReport::new();
    let range = &request.time_range;

    if range.start >= range.end {
        report.violation(
            ViolationKind::TimeRangeError,
            "Start date must be before end date",
        );
        return report;
    }

    let span = range.span_days();
    if span > 365 {
        report.violation(
            ViolationKind::TimeRangeError,
            format!("Time range cannot exceed 365 days: {span} days"),
        );
    }

    let today = Utc::now().date_naive();
    if let Some(floor) = today.checked_sub_days(Days::new(30)) {
        if range.start < floor {
            report.warn("Start date is more than 30 days in the past");
            report.suggest("Consider using a more recent start date");
        }
    }
    if let Some(ceiling) = today.checked_add_days(Days::new(365)) {
        if range.end > ceiling {
            report.warn("End date is more than 1 year in the future");
            report.suggest("Consider using a nearer end date for more accurate optimization");
        }
    }

    report
}

pub(super) fn check_job_sources(request: &OptimizationRequest) -> ValidationReport {
    let mut report = ValidationReport::new();

    if request.job_sources.is_empty() {
        report.violation(
            ViolationKind::JobSourceError,
            "At least one job source is required",
        );
        return report;
    }

    let mut ids = HashSet::new();
    if !request.job_sources.iter().all(|js| ids.insert(js.id.as_str())) {
        report.violation(
            ViolationKind::JobSourceError,
            "Duplicate job source IDs are not allowed",
        );
    }

    for source in &request.job_sources {
        if source.hourly_rate <= 0.0 {
            report.violation(
                ViolationKind::JobSourceError,
                format!(
                    "Invalid hourly rate for job source '{}': {}",
                    source.name, source.hourly_rate
                ),
            );
        } else if source.hourly_rate > 10_000.0 {
            report.warn(format!(
                "Very high hourly rate for job source '{}': {} yen/hour",
                source.name, source.hourly_rate
            ));
        } else if source.hourly_rate < 800.0 {
            report.warn(format!(
                "Low hourly rate for job source '{}': {} yen/hour",
                source.name, source.hourly_rate
            ));
            report.suggest("Consider verifying the hourly rate meets minimum wage requirements");
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::tests::{base_request, job};

    #[test]
    fn reversed_range_is_fatal() {
        let mut request = base_request(10);
        std::mem::swap(&mut request.time_range.start, &mut request.time_range.end);
        let report = check_time_range(&request);
        assert!(report
            .violations
            .iter()
            .any(|v| v.message.contains("before end date")));
    }

    #[test]
    fn horizon_over_a_year_is_fatal() {
        let request = base_request(366);
        let report = check_time_range(&request);
        assert!(report
            .violations
            .iter()
            .any(|v| v.message.contains("cannot exceed 365 days")));
        // 365 exactly is allowed at this stage.
        assert!(check_time_range(&base_request(365)).violations.is_empty());
    }

    #[test]
    fn stale_start_only_warns() {
        let mut request = base_request(10);
        request.time_range.start = request
            .time_range
            .start
            .checked_sub_days(Days::new(60))
            .unwrap();
        let report = check_time_range(&request);
        assert!(report.violations.is_empty());
        assert!(report
            .warnings
            .iter()
            .any(|w| w.contains("30 days in the past")));
    }

    #[test]
    fn duplicate_job_ids_are_fatal() {
        let mut request = base_request(10);
        request.job_sources = vec![job("A", 1200.0), job("A", 1500.0)];
        let report = check_job_sources(&request);
        assert!(report
            .violations
            .iter()
            .any(|v| v.message.contains("Duplicate job source IDs")));
    }

    #[test]
    fn rate_bounds_warn_but_do_not_block() {
        let mut request = base_request(10);
        request.job_sources = vec![job("A", 12_000.0), job("B", 700.0)];
        let report = check_job_sources(&request);
        assert!(report.violations.is_empty());
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn zero_rate_is_fatal() {
        let mut request = base_request(10);
        request.job_sources = vec![job("A", 0.0)];
        let report = check_job_sources(&request);
        assert!(!report.violations.is_empty());
    }
}
