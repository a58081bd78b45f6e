//! # Condition Allocation
//!
//! Splits a returned quantity into good / under-revision / lost.
//!
//! A condition is saved either for one line or for a whole SKU group. A
//! group holds a single shared split that must add up to the group total;
//! the split is spread over the occurrences when the payload is built.
//!
//! ## Descriptor Text
//! Conditions round-trip through a compact text form:
//! ```text
//! good:3,revision:1,lost:0
//! ```
//! Missing keys count as 0; order does not matter.

use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::session::ReturnSession;
use crate::types::{ConditionCounts, SelectionKey};
use crate::validation::validate_condition_counts;

// =============================================================================
// Condition Target
// =============================================================================

/// What a condition split applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConditionTarget {
    /// One selected line (regular occurrence or kit sub-item).
    Line(SelectionKey),

    /// Every selected occurrence of an aggregated SKU.
    Group(String),
}

impl From<SelectionKey> for ConditionTarget {
    fn from(key: SelectionKey) -> Self {
        ConditionTarget::Line(key)
    }
}

// =============================================================================
// Session Operations
// =============================================================================

impl ReturnSession {
    /// The saved split for a target, or all zeros when nothing is saved.
    pub fn open_condition(&self, target: &ConditionTarget) -> ConditionCounts {
        let saved = match target {
            ConditionTarget::Line(key) => self.allocations.get(key).and_then(|a| a.condition),
            ConditionTarget::Group(sku) => self.sku_groups.get(sku).copied().flatten(),
        };
        saved.unwrap_or_default()
    }

    /// Quantity a target's split must add up to.
    pub fn allocated_quantity(&self, target: &ConditionTarget) -> i64 {
        match target {
            ConditionTarget::Line(key) => self.return_quantity(key),
            ConditionTarget::Group(sku) => self.aggregated_quantity(sku),
        }
    }

    /// Saves a split after checking it against the allocated quantity.
    ///
    /// Nothing is written unless every check passes.
    pub fn save_condition(&mut self, target: &ConditionTarget, counts: ConditionCounts) -> CoreResult<()> {
        self.ensure_editable()?;
        let label = self.target_label(target);

        let registered = match target {
            ConditionTarget::Line(key) => {
                if self.view.available_quantity(key).is_none() {
                    return Err(CoreError::unknown(key));
                }
                self.is_selected(key)
            }
            ConditionTarget::Group(sku) => self.sku_groups.contains_key(sku),
        };
        if !registered {
            return Err(CoreError::NotSelected(label));
        }

        validate_condition_counts(&counts)?;
        if counts.is_empty() {
            return Err(ValidationError::NoConditionSpecified { target: label }.into());
        }

        let expected = self.allocated_quantity(target);
        if counts.total() != expected {
            return Err(ValidationError::ConditionSumMismatch {
                target: label,
                expected,
                actual: counts.total(),
            }
            .into());
        }

        match target {
            ConditionTarget::Line(key) => {
                if let Some(allocation) = self.allocations.get_mut(key) {
                    allocation.condition = Some(counts);
                }
            }
            ConditionTarget::Group(sku) => {
                self.sku_groups.insert(sku.clone(), Some(counts));
            }
        }

        self.refresh_phase();
        Ok(())
    }

    pub fn save_line_condition(&mut self, key: &SelectionKey, counts: ConditionCounts) -> CoreResult<()> {
        self.save_condition(&ConditionTarget::Line(key.clone()), counts)
    }

    pub fn save_group_condition(&mut self, sku: &str, counts: ConditionCounts) -> CoreResult<()> {
        self.save_condition(&ConditionTarget::Group(sku.to_string()), counts)
    }

    /// Parses descriptor text and saves it.
    pub fn save_condition_descriptor(&mut self, target: &ConditionTarget, descriptor: &str) -> CoreResult<()> {
        let counts: ConditionCounts = descriptor.parse()?;
        self.save_condition(target, counts)
    }

    pub(crate) fn target_label(&self, target: &ConditionTarget) -> String {
        match target {
            ConditionTarget::Line(key) => self.view.line_name(key),
            ConditionTarget::Group(sku) => self
                .view
                .aggregate_sku(sku)
                .map(|a| format!("{} ({})", a.name, a.sku))
                .unwrap_or_else(|| sku.clone()),
        }
    }
}

// =============================================================================
// Descriptor Text
// =============================================================================

impl fmt::Display for ConditionCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "good:{},revision:{},lost:{}", self.good, self.revision, self.lost)
    }
}

impl FromStr for ConditionCounts {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| ValidationError::InvalidDescriptor {
            input: s.to_string(),
            reason,
        };

        let mut counts = ConditionCounts::default();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (name, value) = part
                .split_once(':')
                .ok_or_else(|| invalid(format!("expected name:count, got '{}'", part)))?;

            let value: i64 = value
                .trim()
                .parse()
                .map_err(|_| invalid(format!("'{}' is not a whole number", value.trim())))?;

            match name.trim().to_ascii_lowercase().as_str() {
                "good" => counts.good = value,
                "revision" => counts.revision = value,
                "lost" => counts.lost = value,
                other => return Err(invalid(format!("unknown condition '{}'", other))),
            }
        }

        validate_condition_counts(&counts)?;
        Ok(counts)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
