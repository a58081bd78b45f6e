//! # Error Types
//!
//! Domain-specific error types for depot-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  depot-core errors (this file)                                         │
//! │  ├── CoreError        - Session / view lookups, locking, kit anomalies │
//! │  └── ValidationError  - Keeper input that must be corrected            │
//! │                                                                         │
//! │  depot-client errors (separate crate)                                  │
//! │  └── ClientError      - Network, timeout, backend, cancellation        │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ClientError → presentation layer  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Validation errors are raised before any network call. They are never
//! retryable: the keeper has to change the input first.

use std::fmt;

use thiserror::Error;

use crate::types::SelectionKey;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The key does not match any line of the active holdings view.
    #[error("No returnable line for {0}")]
    UnknownLine(String),

    /// The item is not a kit (or has no such sub-item).
    #[error("Item {item_id} on request {request_id} is not a kit")]
    NotAKit { request_id: String, item_id: String },

    /// The SKU has no regular occurrences in the view.
    #[error("No holdings for SKU {0}")]
    UnknownSku(String),

    /// An operation needs the line to be selected first.
    #[error("{0} is not selected for return")]
    NotSelected(String),

    /// A submit is in flight; edits wait until it resolves.
    ///
    /// ## When This Occurs
    /// ```text
    /// submit() ──► phase = Submitting
    ///                  │
    ///     toggle / set quantity / save condition
    ///                  │
    ///                  ▼
    ///          SessionLocked
    /// ```
    #[error("Return is being submitted; edits are locked until it resolves")]
    SessionLocked,

    /// Kit sub-items whose missing quantity came out negative.
    ///
    /// Negative values mean the holdings data is inconsistent. They are
    /// reported, never clamped to zero.
    #[error("Kit {kit_name} has inconsistent sub-item quantities: {}", format_anomalies(.anomalies))]
    KitAnomaly {
        kit_name: String,
        anomalies: Vec<KitAnomalyDetail>,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    pub(crate) fn unknown(key: &SelectionKey) -> Self {
        CoreError::UnknownLine(key.to_string())
    }

    /// Returns true if the session can continue after this error.
    ///
    /// A clamped quantity is stored anyway, so the keeper only needs to be
    /// told about it.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CoreError::Validation(ValidationError::QuantityOutOfBounds { .. })
        )
    }
}

/// One kit sub-item whose missing quantity is negative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KitAnomalyDetail {
    pub kit_item_id: String,
    pub name: String,
    pub missing: i64,
}

fn format_anomalies(anomalies: &[KitAnomalyDetail]) -> String {
    anomalies
        .iter()
        .map(|a| format!("{} (missing {})", a.name, a.missing))
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// Validation Error
// =============================================================================

/// Which end of the `[0, available]` range a quantity crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityBound {
    Minimum,
    Maximum(i64),
}

impl fmt::Display for QuantityBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantityBound::Minimum => write!(f, "cannot be negative"),
            QuantityBound::Maximum(max) => write!(f, "cannot exceed {}", max),
        }
    }
}

/// Input validation errors.
///
/// These occur when the keeper's input doesn't meet requirements. All of
/// them block submission until corrected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// A text field exceeds its maximum length.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// A field does not have the expected format.
    #[error("{field} is invalid: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Nothing has been selected for return.
    #[error("Select at least one item to return")]
    EmptySelection,

    /// Selected lines that still have a return quantity of zero.
    #[error("Set a return quantity for: {}", .items.join(", "))]
    ZeroQuantity { items: Vec<String> },

    /// Lines with a quantity but no matching condition split.
    #[error("Set the condition for: {}", .items.join(", "))]
    ConditionIncomplete { items: Vec<String> },

    /// All three condition counts are zero.
    #[error("Specify at least one condition for {target}")]
    NoConditionSpecified { target: String },

    /// Condition counts do not add up to the allocated quantity.
    ///
    /// ## User Workflow
    /// ```text
    /// Allocated quantity: 5
    ///      │
    ///      ▼
    /// good 2 + revision 2 + lost 0 = 4
    ///      │
    ///      ▼
    /// ConditionSumMismatch { expected: 5, actual: 4 }
    ///      │
    ///      ▼
    /// UI shows: "Condition total 4 must equal return quantity 5 for DRL-001"
    /// ```
    #[error("Condition total {actual} must equal return quantity {expected} for {target}")]
    ConditionSumMismatch {
        target: String,
        expected: i64,
        actual: i64,
    },

    /// A condition count is negative.
    #[error("{field} count cannot be negative")]
    NegativeCount { field: String },

    /// A quantity was outside `[0, available]` and has been clamped.
    ///
    /// Recoverable: `applied` is already stored for the line.
    #[error("Return quantity {requested} for {target} {bound}; using {applied}")]
    QuantityOutOfBounds {
        target: String,
        requested: i64,
        applied: i64,
        bound: QuantityBound,
    },

    /// Condition descriptor text could not be parsed.
    #[error("Invalid condition descriptor '{input}': {reason}")]
    InvalidDescriptor { input: String, reason: String },

    /// Evidence photo is required before submitting.
    #[error("Capture a photo of the returned items before submitting")]
    PhotoRequired,

    /// Photo exceeds the configured upload size.
    #[error("Photo is {size} bytes; the limit is {max} bytes")]
    PhotoTooLarge { size: usize, max: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
