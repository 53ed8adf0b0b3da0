//! Structured validation results.
//!
//! Validators never fail with errors for expected problems; they report
//! violations (fatal), warnings and suggestions, and callers decide.

use serde::{Deserialize, Serialize};

/// Category of a reported violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    MissingConstraints,
    ConstraintError,
    ConstraintValueError,
    ConstraintCompatibilityError,
    TierLimitError,
    TimeRangeError,
    JobSourceError,
    StructureError,
    ConstraintViolation,
    FeasibilityError,
    ShiftValidationError,
    EmptySolution,
    InternalError,
}

/// A single fatal validation finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: ViolationKind,
}

/// Outcome of a validation stage (or of the merged cascade).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn new() -> Self {
        ValidationReport {
            is_valid: true,
            ..ValidationReport::default()
        }
    }

    pub fn violation(&mut self, kind: ViolationKind, message: impl Into<String>) {
        self.violations.push(Violation {
            message: message.into(),
            kind,
        });
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn suggest(&mut self, message: impl Into<String>) {
        self.suggestions.push(message.into());
    }

    /// Folds another stage's findings into this report.
    pub fn merge(&mut self, other: ValidationReport) {
        self.violations.extend(other.violations);
        self.warnings.extend(other.warnings);
        self.suggestions.extend(other.suggestions);
    }

    /// Settles `is_valid` and the joined error message; call once all
    /// stages have been merged.
    pub fn finish(mut self) -> Self {
        self.is_valid = self.violations.is_empty();
        self.error_message = if self.violations.is_empty() {
            None
        } else {
            Some(
                self.violations
                    .iter()
                    .map(|v| v.message.as_str())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        };
        self
    }
}
