//! # Quantity Allocation
//!
//! Return quantities per line, and redistribution of an aggregated SKU
//! total across the requests it came from.
//!
//! ## Redistribution
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DRL-001 total 5 → 4          current      available     result         │
//! │                               ───────      ─────────     ──────         │
//! │  REQ-1                           2             2            2  (+1)     │
//! │  REQ-2                           3             3            2           │
//! │                                                                         │
//! │  1. floor(current × target / Σcurrent), capped at availability         │
//! │     (equal weights when Σcurrent = 0)                                  │
//! │  2. remainder +1 in occurrence order, wrapping, skipping full lines    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{CoreError, CoreResult, QuantityBound, ValidationError};
use crate::session::ReturnSession;
use crate::types::{Allocation, SelectionKey};

impl ReturnSession {
    /// The stored return quantity of a line, else its availability.
    pub fn return_quantity(&self, key: &SelectionKey) -> i64 {
        match self.allocations.get(key) {
            Some(allocation) => allocation.return_quantity,
            None => self.view.available_quantity(key).unwrap_or(0),
        }
    }

    /// Sets the return quantity of a selected line.
    ///
    /// Values outside `[0, available]` are clamped and the clamped value is
    /// stored; the error that follows is recoverable and tells the keeper
    /// what was applied.
    pub fn set_return_quantity(&mut self, key: &SelectionKey, value: i64) -> CoreResult<i64> {
        self.ensure_editable()?;
        let available = self
            .view
            .available_quantity(key)
            .ok_or_else(|| CoreError::unknown(key))?;

        let allocation = match self.allocations.get_mut(key) {
            Some(allocation) => allocation,
            None => return Err(CoreError::NotSelected(self.view.line_name(key))),
        };

        let applied = value.clamp(0, available.max(0));
        allocation.return_quantity = applied;
        self.refresh_phase();

        clamped_result(self.view.line_name(key), value, applied, available)
    }

    /// Sum of the return quantities of a SKU's selected occurrences.
    pub fn aggregated_quantity(&self, sku: &str) -> i64 {
        self.view
            .aggregate_sku(sku)
            .map(|a| {
                a.keys()
                    .filter_map(|k| self.allocations.get(&k))
                    .map(|al| al.return_quantity)
                    .sum::<i64>()
            })
            .unwrap_or(0)
    }

    /// Spreads a new SKU total over its occurrences in proportion to their
    /// current quantities.
    ///
    /// Unselected occurrences are selected and the SKU is registered as a
    /// group. A total outside `[0, total_available]` is clamped.
    pub fn set_aggregated(&mut self, sku: &str, total: i64) -> CoreResult<i64> {
        self.ensure_editable()?;
        let aggregate = self
            .view
            .aggregate_sku(sku)
            .ok_or_else(|| CoreError::UnknownSku(sku.to_string()))?;

        let keys: Vec<SelectionKey> = aggregate.keys().collect();
        for key in &keys {
            if !self.is_selected(key) {
                self.select_regular(key.clone());
            }
        }
        self.sku_groups.entry(aggregate.sku.clone()).or_insert(None);

        let current: Vec<i64> = keys.iter().map(|k| self.return_quantity(k)).collect();
        let available: Vec<i64> = keys
            .iter()
            .map(|k| self.view.available_quantity(k).unwrap_or(0))
            .collect();

        let applied = total.clamp(0, aggregate.total_available.max(0));
        let distribution = redistribute(&current, &available, applied);

        for (key, quantity) in keys.into_iter().zip(distribution) {
            let allocation = self.allocations.entry(key).or_insert_with(Allocation::default);
            allocation.return_quantity = quantity;
        }
        self.refresh_phase();

        clamped_result(aggregate.name, total, applied, aggregate.total_available)
    }
}

fn clamped_result(target: String, requested: i64, applied: i64, available: i64) -> CoreResult<i64> {
    if requested == applied {
        return Ok(applied);
    }

    let bound = if requested < 0 {
        QuantityBound::Minimum
    } else {
        QuantityBound::Maximum(available)
    };
    Err(ValidationError::QuantityOutOfBounds {
        target,
        requested,
        applied,
        bound,
    }
    .into())
}

// =============================================================================
// Redistribution
// =============================================================================

/// Distributes `target` over lines with the given current quantities and
/// capacities.
///
/// The result never exceeds a line's capacity and sums to `target` whenever
/// `target <= Σavailable`.
pub fn redistribute(current: &[i64], available: &[i64], target: i64) -> Vec<i64> {
    debug_assert_eq!(current.len(), available.len());
    let n = current.len();
    if n == 0 || target <= 0 {
        return vec![0; n];
    }

    let current_total: i64 = current.iter().map(|q| (*q).max(0)).sum();
    let weights: Vec<i64> = if current_total == 0 {
        vec![1; n]
    } else {
        current.iter().map(|q| (*q).max(0)).collect()
    };
    let weight_total: i64 = weights.iter().sum();

    let mut result: Vec<i64> = weights
        .iter()
        .zip(available)
        .map(|(weight, cap)| {
            let share = (*weight as i128 * target as i128 / weight_total as i128) as i64;
            share.min((*cap).max(0))
        })
        .collect();

    let mut remainder = target - result.iter().sum::<i64>();
    let mut index = 0;
    let mut full_in_a_row = 0;
    while remainder > 0 && full_in_a_row < n {
        if result[index] < available[index] {
            result[index] += 1;
            remainder -= 1;
            full_in_a_row = 0;
        } else {
            full_in_a_row += 1;
        }
        index = (index + 1) % n;
    }

    result
}

// =============================================================================
// Unit Tests
// =============================================================================
