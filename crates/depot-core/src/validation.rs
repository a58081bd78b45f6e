//! # Validation Module
//!
//! Field-level validators for return input.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Field checks (THIS MODULE)                                   │
//! │  ├── Identifiers, notes, condition counts                              │
//! │  └── Evidence photo size and type                                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Session checks (submission module)                           │
//! │  ├── Non-empty selection, no zero quantities                           │
//! │  └── Every quantity covered by a matching condition split              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Inventory backend                                            │
//! │  └── Authoritative holdings, rejects returns it cannot apply           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use depot_core::types::ConditionCounts;
//! use depot_core::validation::{validate_condition_counts, validate_identifier};
//!
//! validate_identifier("engineerId", "eng-42").unwrap();
//! validate_condition_counts(&ConditionCounts::new(3, 1, 0)).unwrap();
//! assert!(validate_condition_counts(&ConditionCounts::new(3, -1, 0)).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{ConditionCounts, PhotoEvidence, ReturnPayload};
use crate::{MAX_IDENTIFIER_LEN, MAX_NOTES_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates an engineer, warehouse or request identifier.
///
/// ## Rules
/// - Must not be empty or whitespace
/// - At most 100 characters
/// - No control characters (identifiers end up in URL paths)
pub fn validate_identifier(field: &str, value: &str) -> ValidationResult<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_IDENTIFIER_LEN,
        });
    }

    if value.chars().any(char::is_control) {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "contains control characters".to_string(),
        });
    }

    Ok(())
}

/// Validates free-text notes. Empty notes are fine.
pub fn validate_notes(field: &str, notes: &str) -> ValidationResult<()> {
    if notes.chars().count() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTES_LEN,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates that no condition count is negative.
///
/// Sum checks need the allocated quantity and live with the session.
pub fn validate_condition_counts(counts: &ConditionCounts) -> ValidationResult<()> {
    let fields = [
        ("good", counts.good),
        ("revision", counts.revision),
        ("lost", counts.lost),
    ];

    for (field, value) in fields {
        if value < 0 {
            return Err(ValidationError::NegativeCount {
                field: field.to_string(),
            });
        }
    }

    Ok(())
}

// =============================================================================
// Evidence Photo
// =============================================================================

/// Validates an evidence photo before upload.
///
/// ## Rules
/// - Must contain data
/// - Content type must be an image
/// - At most `max_bytes` bytes
pub fn validate_photo(photo: &PhotoEvidence, max_bytes: usize) -> ValidationResult<()> {
    if photo.bytes.is_empty() {
        return Err(ValidationError::PhotoRequired);
    }

    if !photo.content_type.starts_with("image/") {
        return Err(ValidationError::InvalidFormat {
            field: "photo".to_string(),
            reason: format!("expected an image, got {}", photo.content_type),
        });
    }

    if photo.bytes.len() > max_bytes {
        return Err(ValidationError::PhotoTooLarge {
            size: photo.bytes.len(),
            max: max_bytes,
        });
    }

    Ok(())
}

// =============================================================================
// Payload
// =============================================================================

/// Checks the invariants every outgoing payload must hold.
pub fn validate_payload(payload: &ReturnPayload) -> ValidationResult<()> {
    validate_identifier("engineerId", &payload.engineer_id)?;
    validate_identifier("warehouseId", &payload.warehouse_id)?;
    validate_notes("generalNotes", &payload.general_notes)?;

    if payload.items.is_empty() {
        return Err(ValidationError::EmptySelection);
    }

    for line in &payload.items {
        validate_condition_counts(&ConditionCounts::new(
            line.quantity_returned,
            line.quantity_damaged,
            line.quantity_lost,
        ))?;
        validate_notes("notes", &line.notes)?;
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
