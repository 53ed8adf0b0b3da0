//! Background-run registry.
//!
//! Active runs and completed runs live in separate process-wide maps;
//! completing a run moves its entry. Every active run owns a cancel flag
//! the solver checks between iterations, so shutdown can transition
//! `running -> cancelled` cooperatively.

use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chrono::{Duration, Utc};
use parking_lot::{Mutex, RwLock};
use shiftopt_core::model::{OptimizationResponse, RunState, RunStatus};
use tracing::info;

/// A finished run: terminal status plus the stored response.
#[derive(Debug, Clone)]
pub struct CompletedRun {
    pub status: RunStatus,
    pub response: OptimizationResponse,
}

#[derive(Debug, Default)]
pub struct RunRegistry {
    active: RwLock<HashMap<String, RunStatus>>,
    completed: RwLock<HashMap<String, CompletedRun>>,
    cancel_flags: Mutex<HashMap<String, Arc<AtomicBool>>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        RunRegistry::default()
    }

    /// Registers a new run in `started` state and returns its cancel flag.
    pub fn insert_started(&self, run_id: &str) -> Arc<AtomicBool> {
        let flag = Arc::new(AtomicBool::new(false));
        self.cancel_flags
            .lock()
            .insert(run_id.to_string(), flag.clone());
        self.active.write().insert(
            run_id.to_string(),
            RunStatus {
                run_id: run_id.to_string(),
                status: RunState::Started,
                progress: 0.0,
                message: "Optimization started successfully".into(),
                estimated_completion: None,
            },
        );
        flag
    }

    /// Transitions an active run to `running`.
    pub fn set_running(&self, run_id: &str, progress: f64, message: &str) {
        if let Some(status) = self.active.write().get_mut(run_id) {
            status.status = RunState::Running;
            status.progress = progress;
            status.message = message.to_string();
            status.estimated_completion = Some(Utc::now() + Duration::minutes(5));
        }
    }

    /// Moves a run into the completed store with its response.
    pub fn complete(&self, run_id: &str, response: OptimizationResponse) {
        self.active.write().remove(run_id);
        self.cancel_flags.lock().remove(run_id);
        let objective = response
            .solution
            .as_ref()
            .map(|s| s.objective_value.to_string())
            .unwrap_or_else(|| "N/A".into());
        let status = RunStatus {
            run_id: run_id.to_string(),
            status: RunState::Completed,
            progress: 1.0,
            message: format!("Optimization completed with objective value: {objective}"),
            estimated_completion: None,
        };
        self.completed
            .write()
            .insert(run_id.to_string(), CompletedRun { status, response });
        info!(run_id, "async run completed");
    }

    /// Marks an active run as failed; the entry stays in the active map.
    pub fn fail(&self, run_id: &str, error: &str) {
        self.cancel_flags.lock().remove(run_id);
        if let Some(status) = self.active.write().get_mut(run_id) {
            status.status = RunState::Failed;
            status.progress = 0.0;
            status.message = format!("Optimization failed: {error}");
            status.estimated_completion = None;
        }
    }

    /// Marks an active run as cancelled.
    pub fn cancel(&self, run_id: &str) {
        self.cancel_flags.lock().remove(run_id);
        if let Some(status) = self.active.write().get_mut(run_id) {
            status.status = RunState::Cancelled;
            status.progress = 0.0;
            status.message = "Service shutdown".into();
            status.estimated_completion = None;
        }
    }

    /// Snapshot of a run's status, wherever it lives.
    pub fn status(&self, run_id: &str) -> Option<RunStatus> {
        if let Some(status) = self.active.read().get(run_id) {
            return Some(status.clone());
        }
        self.completed
            .read()
            .get(run_id)
            .map(|run| run.status.clone())
    }

    pub fn completed_run(&self, run_id: &str) -> Option<CompletedRun> {
        self.completed.read().get(run_id).cloned()
    }

    /// Requests cancellation of every active run; used on shutdown.
    pub fn cancel_all(&self) {
        let flags: Vec<(String, Arc<AtomicBool>)> = self
            .cancel_flags
            .lock()
            .iter()
            .map(|(id, flag)| (id.clone(), flag.clone()))
            .collect();
        for (run_id, flag) in flags {
            flag.store(true, std::sync::atomic::Ordering::Relaxed);
            self.cancel(&run_id);
        }
        info!("all active runs cancelled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response() -> OptimizationResponse {
        OptimizationResponse {
            success: true,
            optimization_run_id: "r1".into(),
            solution: None,
            error: None,
            timestamp: Utc::now(),
            processing_time_ms: 10,
            validation: None,
        }
    }

    #[test]
    fn lifecycle_moves_completed_runs() {
        let registry = RunRegistry::new();
        registry.insert_started("r1");
        assert_eq!(registry.status("r1").unwrap().status, RunState::Started);

        registry.set_running("r1", 0.1, "Initializing...");
        let status = registry.status("r1").unwrap();
        assert_eq!(status.status, RunState::Running);
        assert!(status.estimated_completion.is_some());

        registry.complete("r1", response());
        let status = registry.status("r1").unwrap();
        assert_eq!(status.status, RunState::Completed);
        assert_eq!(status.progress, 1.0);
        assert!(registry.completed_run("r1").is_some());
    }

    #[test]
    fn unknown_runs_have_no_status() {
        let registry = RunRegistry::new();
        assert!(registry.status("nope").is_none());
    }

    #[test]
    fn failed_runs_stay_queryable() {
        let registry = RunRegistry::new();
        registry.insert_started("r2");
        registry.fail("r2", "solver exploded");
        let status = registry.status("r2").unwrap();
        assert_eq!(status.status, RunState::Failed);
        assert!(status.message.contains("solver exploded"));
        assert!(registry.completed_run("r2").is_none());
    }

    #[test]
    fn cancel_all_flips_flags_and_statuses() {
        let registry = RunRegistry::new();
        let flag = registry.insert_started("r3");
        registry.set_running("r3", 0.5, "working");
        registry.cancel_all();
        assert!(flag.load(std::sync::atomic::Ordering::Relaxed));
        assert_eq!(registry.status("r3").unwrap().status, RunState::Cancelled);
    }
}
