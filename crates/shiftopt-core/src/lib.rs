//! shiftopt core - domain model and request validation
//!
//! This crate provides the fundamental types for the optimization service:
//! - Request and solution schemas with their wire formats
//! - The tier policy table and algorithm catalog
//! - The pre-solve request validator cascade
//! - Calendar/wall-clock helpers shared by the solvers

pub mod error;
pub mod model;
pub mod time;
pub mod validate;

pub use error::{OptimizeError, Result};
pub use model::{
    AlgorithmInfo, AlgorithmKind, AvailabilitySlot, Constraint, ConstraintKind, ConstraintUnit,
    ExistingShift, JobSource, Metadata, ObjectiveKind, OptimizationRequest, OptimizationResponse,
    OptimizationSolution, RunState, RunStatus, SolverPreferences, SuggestedShift, TierLevel,
    TierLimits, TimeRange, ValidationReport, Violation, ViolationKind,
};
pub use validate::RequestValidator;
