//! Wire-level domain model.
//!
//! Every entity the service accepts or emits is a closed record here;
//! only `metadata` fields stay open key/value bags.

mod request;
mod solution;
mod tier;
mod validation;

pub use request::{
    AlgorithmKind, AvailabilitySlot, Constraint, ConstraintKind, ConstraintUnit, ExistingShift,
    JobSource, ObjectiveKind, OptimizationRequest, SolverPreferences, TierLevel, TimeRange,
};
pub use solution::{
    Metadata, OptimizationResponse, OptimizationSolution, RunState, RunStatus, SuggestedShift,
};
pub use tier::{AlgorithmInfo, TierLimits};
pub use validation::{ValidationReport, Violation, ViolationKind};
