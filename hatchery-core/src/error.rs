//! Error types for allocation and lifecycle operations

use hatchery_client::{BackendError, TankLocation};
use thiserror::Error;

use crate::cascade::CascadeReport;
use crate::occupancy::Occupancy;

/// Result type for hatchery operations
pub type Result<T> = std::result::Result<T, HatcheryError>;

/// Hatchery error types
///
/// Every variant is local to one operation; none leaves the client in a state
/// that a retry by the user cannot recover from.
#[derive(Error, Debug)]
pub enum HatcheryError {
    /// Input rejected before any network call
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// The chosen tank was taken between listing and submitting.
    /// Carries the pool as re-fetched at the moment of rejection.
    #[error("Tank {tank_id} is no longer available in the {category} pool")]
    TankUnavailable {
        tank_id: String,
        category: TankLocation,
        refreshed: Box<Occupancy>,
    },

    /// Record does not exist in the latest snapshot
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// A cascade delete stopped or finished with failures
    #[error("Cascade delete incomplete: {0}")]
    PartialCascade(Box<CascadeReport>),

    /// Transport or collaborator failure
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl HatcheryError {
    pub fn is_validation(&self) -> bool {
        matches!(self, HatcheryError::Validation(_))
    }

    pub fn is_tank_unavailable(&self) -> bool {
        matches!(self, HatcheryError::TankUnavailable { .. })
    }

    /// Cascade report, when the error came from a partial cascade.
    pub fn cascade_report(&self) -> Option<&CascadeReport> {
        match self {
            HatcheryError::PartialCascade(report) => Some(report),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for HatcheryError {
    fn from(errors: ValidationErrors) -> Self {
        HatcheryError::Validation(errors)
    }
}

/// One rejected input field.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// All rejected fields of one submission.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &'static str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.push(field, message);
        errors
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}
