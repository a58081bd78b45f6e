//! # Holdings Projection
//!
//! Turns the backend's engineer-holdings response into the loan-request view
//! the return session works on, and computes SKU aggregates over it.
//!
//! ## Projection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  HoldingItem DRL-001                     LoanRequest REQ-1              │
//! │   ├ source REQ-1 qty 2   ──────────────►  └ LoanItem DRL-001 qty 2      │
//! │   └ source REQ-2 qty 1   ──────┐                                        │
//! │                                │         LoanRequest REQ-2              │
//! │  HoldingItem SAW-010           └──────►  ├ LoanItem DRL-001 qty 1       │
//! │   └ source REQ-2 qty 4   ──────────────►  └ LoanItem SAW-010 qty 4      │
//! │                                                                         │
//! │  One LoanRequest per distinct request number,                          │
//! │  one LoanItem per (request number, item id).                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Sources with a non-positive quantity are already fully returned and are
//! left out of the view.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::types::{
    EngineerHoldings, KitItem, LoanItem, LoanRequest, Occurrence, SelectionKey,
};
use crate::DEFAULT_UNIT;

// =============================================================================
// Holdings View
// =============================================================================

/// The active, authoritative view of what one engineer holds in one
/// warehouse.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingsView {
    engineer_id: String,
    warehouse_id: String,
    requests: Vec<LoanRequest>,
}

impl HoldingsView {
    pub fn new(
        engineer_id: impl Into<String>,
        warehouse_id: impl Into<String>,
        requests: Vec<LoanRequest>,
    ) -> Self {
        HoldingsView {
            engineer_id: engineer_id.into(),
            warehouse_id: warehouse_id.into(),
            requests,
        }
    }

    /// Projects a holdings response onto one warehouse.
    ///
    /// Requests are ordered by request number; items keep the order in
    /// which the backend listed them.
    pub fn project(holdings: &EngineerHoldings, warehouse_id: &str) -> Self {
        let mut by_request: BTreeMap<String, LoanRequest> = BTreeMap::new();

        let warehouse_items = holdings
            .holdings_by_warehouse
            .iter()
            .filter(|w| w.warehouse.id == warehouse_id)
            .flat_map(|w| w.items.iter());

        for item in warehouse_items {
            for source in item.sources.iter().filter(|s| s.quantity > 0) {
                let request = by_request
                    .entry(source.source_request_number.clone())
                    .or_insert_with(|| LoanRequest {
                        id: source.source_request_number.clone(),
                        request_number: source.source_request_number.clone(),
                        requester_id: holdings.engineer.id.clone(),
                        project: None,
                        warehouse: warehouse_id.to_string(),
                        items: Vec::new(),
                    });

                if request.project.is_none() {
                    request.project = source.project_id.clone();
                }

                // Same item listed twice for one request: merge into one line.
                // Distinct item ids stay separate lines even when they share a SKU.
                if let Some(existing) = request.items.iter_mut().find(|i| i.id == item.item_id) {
                    existing.quantity_fulfilled =
                        Some(existing.quantity_fulfilled.unwrap_or(0) + source.quantity);
                    existing.quantity_requested = existing.quantity_fulfilled;
                    continue;
                }

                request.items.push(LoanItem {
                    id: item.item_id.clone(),
                    sku: item.sku.clone(),
                    name: item.name.clone(),
                    quantity_requested: Some(source.quantity),
                    quantity_fulfilled: Some(source.quantity),
                    unit: item.unit.clone().unwrap_or_else(|| DEFAULT_UNIT.to_string()),
                    is_kit: item.is_kit,
                    kit_items: item.kit_items.clone(),
                });
            }
        }

        HoldingsView::new(
            holdings.engineer.id.clone(),
            warehouse_id,
            by_request.into_values().collect(),
        )
    }

    #[inline]
    pub fn engineer_id(&self) -> &str {
        &self.engineer_id
    }

    #[inline]
    pub fn warehouse_id(&self) -> &str {
        &self.warehouse_id
    }

    #[inline]
    pub fn requests(&self) -> &[LoanRequest] {
        &self.requests
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    pub fn find_request(&self, request_id: &str) -> Option<&LoanRequest> {
        self.requests.iter().find(|r| r.id == request_id)
    }

    pub fn find_item(&self, request_id: &str, item_id: &str) -> Option<&LoanItem> {
        self.find_request(request_id)?.find_item(item_id)
    }

    /// The kit sub-item behind a kit key.
    pub fn find_kit_item(&self, key: &SelectionKey) -> Option<&KitItem> {
        match key {
            SelectionKey::KitSubItem {
                request_id,
                item_id,
                kit_item_id,
            } => self.find_item(request_id, item_id)?.find_kit_item(kit_item_id),
            SelectionKey::Item { .. } => None,
        }
    }

    /// Upper bound for a line's return quantity, or `None` if the key is not
    /// part of the view.
    pub fn available_quantity(&self, key: &SelectionKey) -> Option<i64> {
        match key {
            SelectionKey::Item {
                request_id,
                item_id,
            } => self
                .find_item(request_id, item_id)
                .filter(|i| !i.is_kit)
                .map(LoanItem::available_quantity),
            SelectionKey::KitSubItem { .. } => self.find_kit_item(key).map(|k| k.quantity),
        }
    }

    /// Human-readable name of a line, for error messages.
    pub fn line_name(&self, key: &SelectionKey) -> String {
        let name = match key {
            SelectionKey::Item {
                request_id,
                item_id,
            } => self
                .find_item(request_id, item_id)
                .map(|i| format!("{} ({})", i.name, request_id)),
            SelectionKey::KitSubItem { request_id, .. } => self
                .find_kit_item(key)
                .map(|k| format!("{} ({})", k.name, request_id)),
        };
        name.unwrap_or_else(|| key.to_string())
    }

    // =========================================================================
    // SKU Aggregation
    // =========================================================================

    /// Merges regular occurrences sharing a SKU, in view order.
    ///
    /// Recomputed on every call; nothing here is stored.
    pub fn aggregate(&self) -> Vec<AggregatedItem> {
        let mut aggregates: Vec<AggregatedItem> = Vec::new();

        for request in &self.requests {
            for item in request.regular_items() {
                let occurrence = Occurrence::new(&request.id, &item.id);
                match aggregates.iter_mut().find(|a| a.sku == item.sku) {
                    Some(aggregate) => {
                        aggregate.total_available += item.available_quantity();
                        aggregate.occurrences.push(occurrence);
                    }
                    None => aggregates.push(AggregatedItem {
                        sku: item.sku.clone(),
                        name: item.name.clone(),
                        unit: item.unit.clone(),
                        total_available: item.available_quantity(),
                        occurrences: vec![occurrence],
                    }),
                }
            }
        }

        aggregates
    }

    /// The aggregate for one SKU.
    pub fn aggregate_sku(&self, sku: &str) -> Option<AggregatedItem> {
        self.aggregate().into_iter().find(|a| a.sku == sku)
    }

    /// Removes an item, dropping its request once nothing is left on it.
    pub(crate) fn remove_item(&mut self, request_id: &str, item_id: &str) -> Option<LoanItem> {
        let position = self.requests.iter().position(|r| r.id == request_id)?;
        let request = &mut self.requests[position];
        let item_position = request.items.iter().position(|i| i.id == item_id)?;
        let removed = request.items.remove(item_position);

        if request.items.is_empty() {
            self.requests.remove(position);
        }

        Some(removed)
    }
}

// =============================================================================
// Aggregated Item
// =============================================================================

/// Occurrences of one SKU across all of the engineer's requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedItem {
    pub sku: String,
    pub name: String,
    pub unit: String,
    pub total_available: i64,
    pub occurrences: Vec<Occurrence>,
}

impl AggregatedItem {
    /// Selection keys of every occurrence.
    pub fn keys(&self) -> impl Iterator<Item = SelectionKey> + '_ {
        self.occurrences.iter().map(Occurrence::key)
    }

    pub fn is_multi_request(&self) -> bool {
        self.occurrences.len() > 1
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
