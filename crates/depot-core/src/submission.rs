//! # Submission
//!
//! Session validation and construction of the return payload.
//!
//! ## Payload Construction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Session → ReturnPayload                            │
//! │                                                                         │
//! │  validate()                                                            │
//! │   ├── at least one regular line selected      else EmptySelection      │
//! │   ├── no selected line (or group) at zero     else ZeroQuantity        │
//! │   └── every quantity covered by a condition   else ConditionIncomplete │
//! │                                                                         │
//! │  per selected occurrence with quantity q > 0:                          │
//! │   counts (good g, revision r, lost l), C = g + r + l                   │
//! │   damaged  = round_half_up(r × q / C)                                  │
//! │   lost     = round_half_up(l × q / C)                                  │
//! │   returned = q − damaged − lost                                        │
//! │   (a negative remainder is taken back from the larger other bucket)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Kit sub-items are never sent: a kit is settled through its disposition.

use crate::condition::ConditionTarget;
use crate::error::{CoreResult, ValidationError};
use crate::session::ReturnSession;
use crate::types::{ConditionCounts, ReturnLineItem, ReturnPayload, SelectionKey};
use crate::validation::{validate_identifier, validate_notes, validate_payload, ValidationResult};

// =============================================================================
// Condition Split
// =============================================================================

/// A line's quantity split into the backend's three buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineSplit {
    pub returned: i64,
    pub damaged: i64,
    pub lost: i64,
}

impl LineSplit {
    #[inline]
    pub const fn total(&self) -> i64 {
        self.returned + self.damaged + self.lost
    }
}

/// `round(part × quantity / total)` with halves rounded up.
#[inline]
fn round_share(part: i64, quantity: i64, total: i64) -> i64 {
    let numerator = 2 * part as i128 * quantity as i128 + total as i128;
    (numerator / (2 * total as i128)) as i64
}

/// Scales condition counts to a line quantity.
///
/// The buckets always sum to `quantity` and are never negative. Counts that
/// add up to zero send everything back as returned.
pub fn split_by_condition(counts: &ConditionCounts, quantity: i64) -> LineSplit {
    let quantity = quantity.max(0);
    let total = counts.total();
    if total <= 0 || counts.good < 0 || counts.revision < 0 || counts.lost < 0 {
        return LineSplit {
            returned: quantity,
            ..LineSplit::default()
        };
    }

    let mut damaged = round_share(counts.revision, quantity, total);
    let mut lost = round_share(counts.lost, quantity, total);
    let mut returned = quantity - damaged - lost;

    // Both shares rounded up past the quantity
    while returned < 0 {
        let deficit = -returned;
        if damaged >= lost && damaged > 0 {
            let taken = deficit.min(damaged);
            damaged -= taken;
            returned += taken;
        } else {
            let taken = deficit.min(lost);
            lost -= taken;
            returned += taken;
        }
    }

    LineSplit {
        returned,
        damaged,
        lost,
    }
}

// =============================================================================
// Session Operations
// =============================================================================

impl ReturnSession {
    /// Checks that the session can be submitted.
    pub fn validate(&self) -> ValidationResult<()> {
        validate_identifier("engineerId", self.view.engineer_id())?;
        validate_identifier("warehouseId", self.view.warehouse_id())?;

        let regular: Vec<&SelectionKey> = self.selection.iter().filter(|k| !k.is_kit_sub_item()).collect();
        if regular.is_empty() {
            return Err(ValidationError::EmptySelection);
        }

        let mut zero = Vec::new();
        for sku in self.sku_groups.keys() {
            if self.aggregated_quantity(sku) == 0 {
                zero.push(self.target_label(&ConditionTarget::Group(sku.clone())));
            }
        }
        // Inside a group only the group total has to be positive
        for key in &regular {
            if self.return_quantity(key) == 0 && self.group_of(key).is_none() {
                zero.push(self.view.line_name(key));
            }
        }
        if !zero.is_empty() {
            return Err(ValidationError::ZeroQuantity { items: zero });
        }

        let incomplete = self.lines_missing_condition();
        if !incomplete.is_empty() {
            return Err(ValidationError::ConditionIncomplete { items: incomplete });
        }

        validate_notes("generalNotes", &self.general_notes)?;
        for notes in self.item_notes.values() {
            validate_notes("notes", notes)?;
        }

        Ok(())
    }

    /// Names of lines and groups whose quantity is not covered by a matching
    /// condition split.
    pub fn lines_missing_condition(&self) -> Vec<String> {
        let mut missing = Vec::new();

        for (sku, condition) in &self.sku_groups {
            let total = self.aggregated_quantity(sku);
            if let Some(counts) = condition {
                if total > 0 && counts.total() != total {
                    missing.push(self.target_label(&ConditionTarget::Group(sku.clone())));
                }
            }
        }

        for key in &self.selection {
            let quantity = self.return_quantity(key);
            if quantity <= 0 || self.group_condition_of(key).is_some() {
                continue;
            }

            let covered = self
                .allocations
                .get(key)
                .and_then(|a| a.condition)
                .is_some_and(|c| c.total() == quantity);
            if !covered {
                missing.push(self.view.line_name(key));
            }
        }

        missing
    }

    /// Builds the payload for `SubmitReturn`, one line per returned
    /// occurrence.
    pub fn build_payload(&self) -> CoreResult<ReturnPayload> {
        self.validate()?;

        let mut items = Vec::new();
        for key in self.selection.iter().filter(|k| !k.is_kit_sub_item()) {
            let quantity = self.return_quantity(key);
            if quantity <= 0 {
                continue;
            }

            let counts = self
                .effective_condition(key)
                .unwrap_or(ConditionCounts::all_good(quantity));
            let split = split_by_condition(&counts, quantity);

            items.push(ReturnLineItem {
                item_id: key.item_id().to_string(),
                quantity_returned: split.returned,
                quantity_damaged: split.damaged,
                quantity_lost: split.lost,
                notes: self.item_notes.get(key).cloned().unwrap_or_default(),
            });
        }

        let payload = ReturnPayload {
            engineer_id: self.view.engineer_id().to_string(),
            warehouse_id: self.view.warehouse_id().to_string(),
            items,
            general_notes: self.general_notes.clone(),
            photo_url: self.photo.as_ref().and_then(|p| p.uploaded_url.clone()),
        };
        validate_payload(&payload)?;

        Ok(payload)
    }

    /// A group's shared split wins over the line's own.
    fn effective_condition(&self, key: &SelectionKey) -> Option<ConditionCounts> {
        self.group_condition_of(key)
            .or_else(|| self.allocations.get(key).and_then(|a| a.condition))
    }

    fn group_condition_of(&self, key: &SelectionKey) -> Option<ConditionCounts> {
        let sku = self.group_of(key)?;
        self.sku_groups.get(sku).copied().flatten()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
