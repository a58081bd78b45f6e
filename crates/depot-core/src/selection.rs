//! # Selection State
//!
//! Which lines of the holdings view are being returned.
//!
//! Selecting a regular item starts it at a return quantity of 0 with no
//! condition. Selecting a kit sub-item starts it at the full kit quantity,
//! all in good condition. Deselecting removes every trace of the line, so a
//! toggle on and off leaves the session exactly as it was.

use crate::error::{CoreError, CoreResult};
use crate::holdings::AggregatedItem;
use crate::session::ReturnSession;
use crate::types::{Allocation, ConditionCounts, SelectionKey};

impl ReturnSession {
    /// Toggles a line; returns whether it is selected afterwards.
    pub fn toggle_item(&mut self, key: &SelectionKey) -> CoreResult<bool> {
        if key.is_kit_sub_item() {
            return self.toggle_kit_sub_item(key);
        }

        self.ensure_editable()?;
        if self.view.available_quantity(key).is_none() {
            return Err(CoreError::unknown(key));
        }

        let selected = if self.is_selected(key) {
            self.forget(key);
            self.prune_groups();
            false
        } else {
            self.select_regular(key.clone());
            true
        };

        self.refresh_phase();
        Ok(selected)
    }

    /// Toggles one sub-item of a kit; returns whether it is selected
    /// afterwards.
    pub fn toggle_kit_sub_item(&mut self, key: &SelectionKey) -> CoreResult<bool> {
        self.ensure_editable()?;
        let quantity = self
            .view
            .find_kit_item(key)
            .map(|k| k.quantity)
            .ok_or_else(|| CoreError::unknown(key))?;

        let selected = if self.is_selected(key) {
            self.forget(key);
            false
        } else {
            self.select_kit_sub_item(key.clone(), quantity);
            true
        };

        self.refresh_phase();
        Ok(selected)
    }

    /// Selects or deselects every sub-item of a kit.
    pub fn select_all_kit_sub_items(
        &mut self,
        request_id: &str,
        item_id: &str,
        checked: bool,
    ) -> CoreResult<()> {
        self.ensure_editable()?;
        let kit = self
            .view
            .find_item(request_id, item_id)
            .ok_or_else(|| CoreError::unknown(&SelectionKey::item(request_id, item_id)))?;
        if !kit.is_kit {
            return Err(CoreError::NotAKit {
                request_id: request_id.to_string(),
                item_id: item_id.to_string(),
            });
        }

        let sub_items: Vec<(SelectionKey, i64)> = kit
            .kit_items
            .iter()
            .map(|k| (SelectionKey::kit_sub_item(request_id, item_id, &k.id), k.quantity))
            .collect();

        for (key, quantity) in sub_items {
            match (checked, self.is_selected(&key)) {
                (true, false) => self.select_kit_sub_item(key, quantity),
                (false, true) => self.forget(&key),
                _ => {}
            }
        }

        self.refresh_phase();
        Ok(())
    }

    /// Selects or deselects every regular item of one request.
    ///
    /// Lines that are already selected keep their quantities.
    pub fn select_all(&mut self, request_id: &str, checked: bool) -> CoreResult<()> {
        self.ensure_editable()?;
        let request = self
            .view
            .find_request(request_id)
            .ok_or_else(|| CoreError::UnknownLine(request_id.to_string()))?;

        let keys: Vec<SelectionKey> = request
            .regular_items()
            .map(|i| SelectionKey::item(request_id, &i.id))
            .collect();

        for key in keys {
            match (checked, self.is_selected(&key)) {
                (true, false) => self.select_regular(key),
                (false, true) => self.forget(&key),
                _ => {}
            }
        }

        self.prune_groups();
        self.refresh_phase();
        Ok(())
    }

    /// Selects or deselects every occurrence of an aggregated SKU.
    ///
    /// Selecting registers the SKU as a group, so its occurrences share one
    /// condition and can be edited through a single total.
    pub fn select_aggregated(&mut self, aggregate: &AggregatedItem, checked: bool) -> CoreResult<()> {
        self.ensure_editable()?;
        // Occurrences may have changed since the caller computed the aggregate
        let current = self
            .view
            .aggregate_sku(&aggregate.sku)
            .ok_or_else(|| CoreError::UnknownSku(aggregate.sku.clone()))?;

        if checked {
            for key in current.keys() {
                if !self.is_selected(&key) {
                    self.select_regular(key);
                }
            }
            self.sku_groups.entry(current.sku.clone()).or_insert(None);
        } else {
            for key in current.keys() {
                self.forget(&key);
            }
            self.sku_groups.remove(&current.sku);
        }

        self.refresh_phase();
        Ok(())
    }

    pub(crate) fn select_regular(&mut self, key: SelectionKey) {
        self.allocations.insert(key.clone(), Allocation::default());
        self.selection.insert(key);
    }

    fn select_kit_sub_item(&mut self, key: SelectionKey, quantity: i64) {
        self.allocations.insert(
            key.clone(),
            Allocation {
                return_quantity: quantity,
                condition: Some(ConditionCounts::all_good(quantity)),
            },
        );
        self.selection.insert(key);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
