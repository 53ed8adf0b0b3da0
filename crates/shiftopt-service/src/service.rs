//! Service state and run orchestration.
//!
//! One [`Service`] value is constructed at startup and passed explicitly;
//! it owns the validators, the solver engine, the run registry, metrics
//! and the concurrency limiter. Solver work is CPU-bound and always runs
//! on the blocking pool, never on the request-dispatch threads.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use shiftopt_core::model::{OptimizationRequest, OptimizationResponse};
use shiftopt_core::RequestValidator;
use shiftopt_scoring::SolutionValidator;
use shiftopt_solver::{Engine, EngineSettings, SolveContext};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::metrics::Metrics;
use crate::runtime::RunRegistry;

pub type SharedService = Arc<Service>;

pub struct Service {
    pub config: ServiceConfig,
    pub validator: RequestValidator,
    pub solution_validator: SolutionValidator,
    pub engine: Engine,
    pub runs: RunRegistry,
    pub metrics: Metrics,
    limiter: Semaphore,
    trace_counter: AtomicU64,
}

impl Service {
    pub fn new(config: ServiceConfig) -> SharedService {
        let engine = Engine::new(EngineSettings {
            ga_population: config.ga_population,
            ga_generations: config.ga_generations,
            max_shifts: config.max_shifts_per_optimization,
            max_memory_mb: config.max_memory_mb,
        });
        let limiter = Semaphore::new(config.max_concurrent_optimizations);
        info!("optimization service initialized");
        Arc::new(Service {
            config,
            validator: RequestValidator::new(),
            solution_validator: SolutionValidator::new(),
            engine,
            runs: RunRegistry::new(),
            metrics: Metrics::new(),
            limiter,
            trace_counter: AtomicU64::new(0),
        })
    }

    /// Next `opt_<counter>_<YYYYMMDD_HHMMSS>` trace id.
    pub fn next_trace_id(&self) -> String {
        let count = self.trace_counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("opt_{count}_{}", Utc::now().format("%Y%m%d_%H%M%S"))
    }

    /// Runs one optimization end to end: solve on the blocking pool under
    /// the concurrency limiter, post-validate, and degrade confidence on
    /// non-fatal violations instead of failing.
    pub async fn run_optimization(
        self: &Arc<Self>,
        request: Arc<OptimizationRequest>,
        cancel: Arc<AtomicBool>,
    ) -> OptimizationResponse {
        let started = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        self.metrics.record_request();
        info!(
            run_id,
            user_id = %request.user_id,
            algorithm = %request.preferences.algorithm,
            "starting optimization"
        );

        let _permit = match self.limiter.acquire().await {
            Ok(permit) => permit,
            Err(_) => {
                self.metrics.record_failure();
                return self.failure_response(run_id, "service is shutting down", started);
            }
        };

        let timeout = request
            .preferences
            .timeout
            .unwrap_or(self.config.max_optimization_time);
        let ctx = SolveContext::new(cancel, Some(Duration::from_secs(timeout)));
        let service = self.clone();
        let solver_request = request.clone();
        let solved =
            tokio::task::spawn_blocking(move || service.engine.optimize(&solver_request, &ctx))
                .await;

        match solved {
            Ok(Ok(mut solution)) => {
                let report = self
                    .solution_validator
                    .validate_solution(&solution, &request.constraints);
                let mut validation = None;
                if !report.is_valid {
                    warn!(
                        run_id,
                        error = report.error_message.as_deref().unwrap_or(""),
                        "solution validation failed; degrading confidence"
                    );
                    solution.confidence_score *= 0.5;
                    for kind in self.solution_validator.unsatisfied_kinds(&solution) {
                        self.metrics.record_constraint_violation(kind);
                    }
                    validation = Some(report);
                }

                let processing_time_ms = started.elapsed().as_millis() as u64;
                self.metrics
                    .record_success(processing_time_ms, request.preferences.algorithm);
                info!(run_id, processing_time_ms, "optimization succeeded");
                OptimizationResponse {
                    success: true,
                    optimization_run_id: run_id,
                    solution: Some(solution),
                    error: None,
                    timestamp: Utc::now(),
                    processing_time_ms,
                    validation,
                }
            }
            Ok(Err(e)) => {
                error!(run_id, error = %e, "optimization failed");
                self.metrics.record_failure();
                self.failure_response(run_id, &e.to_string(), started)
            }
            Err(join_error) => {
                error!(run_id, error = %join_error, "solver task panicked");
                self.metrics.record_failure();
                self.failure_response(run_id, "solver task panicked", started)
            }
        }
    }

    /// Starts a background run; its lifecycle is recorded in the registry.
    pub fn spawn_run(self: &Arc<Self>, run_id: String, request: OptimizationRequest) {
        let cancel = self.runs.insert_started(&run_id);
        let service = self.clone();
        tokio::spawn(async move {
            service.runs.set_running(&run_id, 0.1, "Initializing...");
            let response = service
                .run_optimization(Arc::new(request), cancel.clone())
                .await;
            if cancel.load(Ordering::Relaxed) {
                service.runs.cancel(&run_id);
            } else if response.success {
                service.runs.complete(&run_id, response);
            } else {
                service
                    .runs
                    .fail(&run_id, response.error.as_deref().unwrap_or("unknown error"));
            }
        });
    }

    fn failure_response(
        &self,
        run_id: String,
        error: &str,
        started: Instant,
    ) -> OptimizationResponse {
        OptimizationResponse {
            success: false,
            optimization_run_id: run_id,
            solution: None,
            error: Some(error.to_string()),
            timestamp: Utc::now(),
            processing_time_ms: started.elapsed().as_millis() as u64,
            validation: None,
        }
    }
}
