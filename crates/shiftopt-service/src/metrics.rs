//! Request metrics with Prometheus text exposition.
//!
//! Counters are atomics; the running mean and the labelled counters sit
//! behind small mutexes. The exposition format is part of the service's
//! wire contract, so it is rendered directly.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use shiftopt_core::model::{AlgorithmKind, ConstraintKind};

#[derive(Debug, Default)]
pub struct Metrics {
    total: AtomicU64,
    successful: AtomicU64,
    failed: AtomicU64,
    average_ms: Mutex<f64>,
    algorithm_usage: Mutex<BTreeMap<&'static str, u64>>,
    constraint_violations: Mutex<BTreeMap<&'static str, u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics::default()
    }

    /// Counts a request entering the optimizer.
    pub fn record_request(&self) {
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a successful completion and folds its processing time into
    /// the running mean.
    pub fn record_success(&self, processing_time_ms: u64, algorithm: AlgorithmKind) {
        self.successful.fetch_add(1, Ordering::Relaxed);
        let total = self.total.load(Ordering::Relaxed).max(1) as f64;
        let mut average = self.average_ms.lock();
        *average = (*average * (total - 1.0) + processing_time_ms as f64) / total;
        drop(average);
        *self
            .algorithm_usage
            .lock()
            .entry(algorithm.as_str())
            .or_insert(0) += 1;
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Counts a post-solve constraint violation by kind.
    pub fn record_constraint_violation(&self, kind: ConstraintKind) {
        *self
            .constraint_violations
            .lock()
            .entry(kind.as_str())
            .or_insert(0) += 1;
    }

    pub fn success_rate(&self) -> f64 {
        let total = self.total.load(Ordering::Relaxed);
        if total == 0 {
            return 0.0;
        }
        self.successful.load(Ordering::Relaxed) as f64 / total as f64
    }

    /// Prometheus text exposition.
    pub fn render(&self) -> String {
        let mut lines = vec![
            format!(
                "optimization_total_requests {}",
                self.total.load(Ordering::Relaxed)
            ),
            format!(
                "optimization_successful_requests {}",
                self.successful.load(Ordering::Relaxed)
            ),
            format!(
                "optimization_failed_requests {}",
                self.failed.load(Ordering::Relaxed)
            ),
            format!(
                "optimization_average_processing_time_ms {}",
                *self.average_ms.lock()
            ),
            format!("optimization_success_rate {}", self.success_rate()),
        ];
        for (algorithm, count) in self.algorithm_usage.lock().iter() {
            lines.push(format!(
                "optimization_algorithm_usage{{algorithm=\"{algorithm}\"}} {count}"
            ));
        }
        for (constraint, count) in self.constraint_violations.lock().iter() {
            lines.push(format!(
                "optimization_constraint_violations{{constraint=\"{constraint}\"}} {count}"
            ));
        }
        lines.join("\n")
    }
}
