//! shiftopt solver - optimization strategies
//!
//! Converts validated requests into numeric problems and solves them with
//! one of three strategies behind a common interface:
//! - linear programming over relaxed binary slot variables
//! - a genetic algorithm over per-date roster genes
//! - an NSGA-II-shaped Pareto search over income, hours and source balance
//!
//! Every strategy owns a deterministic fallback; numeric failure degrades
//! instead of erroring.

pub mod engine;
mod fallback;
pub mod genetic;
pub mod lp;
pub mod multi_objective;
pub mod problem;
mod roster;

pub use engine::{Engine, EngineSettings, SolveContext, SolverOutcome, Strategy};
pub use genetic::GeneticAlgorithmStrategy;
pub use lp::LinearProgrammingStrategy;
pub use multi_objective::MultiObjectiveStrategy;
pub use problem::{AvailabilityMatrix, Problem, ProblemBuilder};
