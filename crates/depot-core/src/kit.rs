//! # Kit Reconciliation
//!
//! Computes what a returned kit is short of, and records the keeper's
//! decision to restock or disassemble it.
//!
//! ## Missing Quantity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  missing = requested − returned + revision + lost                      │
//! │                                                                         │
//! │  Tripod   requested 5, returned 3, revision 1, lost 0  ──►  missing 3   │
//! │  Level    not selected                             ──►  missing = req   │
//! │                                                                         │
//! │  missing > 0   shortfall, listed on the restock sheet                  │
//! │  missing < 0   anomaly: data is inconsistent, disposition refused      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A disposition is reporting only: the kit leaves the session and the view,
//! and no backend call is made for it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, KitAnomalyDetail};
use crate::session::ReturnSession;
use crate::types::{DispositionChoice, KitDisposition, KitItemShortfall, LoanItem, SelectionKey};

// =============================================================================
// Reconciliation Result
// =============================================================================

/// Per-sub-item outcome of a kit return.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KitReconciliation {
    pub request_id: String,
    pub kit_item_id: String,
    pub kit_name: String,

    /// Every sub-item, including those with nothing missing.
    pub lines: Vec<KitItemShortfall>,

    pub anomalies: Vec<KitAnomalyDetail>,
}

impl KitReconciliation {
    /// Sub-items with a positive missing quantity.
    pub fn shortfalls(&self) -> Vec<KitItemShortfall> {
        self.lines
            .iter()
            .filter(|l| l.missing_quantity > 0)
            .cloned()
            .collect()
    }

    pub fn is_consistent(&self) -> bool {
        self.anomalies.is_empty()
    }

    pub fn is_complete(&self) -> bool {
        self.is_consistent() && self.lines.iter().all(|l| l.missing_quantity == 0)
    }
}

/// A kit disposition taken during the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct KitDispositionRecord {
    pub request_number: String,
    pub kit_item_id: String,
    pub kit_sku: String,
    pub kit_name: String,
    pub disposition: KitDisposition,

    #[ts(as = "String")]
    pub decided_at: DateTime<Utc>,
}

/// `requested − returned + revision + lost`.
#[inline]
pub const fn missing_quantity(requested: i64, returned: i64, revision: i64, lost: i64) -> i64 {
    requested - returned + revision + lost
}

// =============================================================================
// Session Operations
// =============================================================================

impl ReturnSession {
    /// Computes the missing quantity of every sub-item of a kit.
    pub fn compute_missing(&self, request_id: &str, item_id: &str) -> CoreResult<KitReconciliation> {
        let kit = self.find_kit(request_id, item_id)?;

        let mut lines = Vec::with_capacity(kit.kit_items.len());
        let mut anomalies = Vec::new();

        for sub_item in &kit.kit_items {
            let key = SelectionKey::kit_sub_item(request_id, item_id, &sub_item.id);
            let (returned, condition) = match self.allocations.get(&key) {
                Some(allocation) => (allocation.return_quantity, allocation.condition.unwrap_or_default()),
                None => (0, Default::default()),
            };

            let missing = missing_quantity(sub_item.quantity, returned, condition.revision, condition.lost);
            if missing < 0 {
                anomalies.push(KitAnomalyDetail {
                    kit_item_id: sub_item.id.clone(),
                    name: sub_item.name.clone(),
                    missing,
                });
            }

            lines.push(KitItemShortfall {
                kit_item_id: sub_item.id.clone(),
                name: sub_item.name.clone(),
                category: sub_item.category.clone(),
                unit: sub_item.unit.clone(),
                requested: sub_item.quantity,
                returned,
                revision: condition.revision,
                lost: condition.lost,
                missing_quantity: missing,
            });
        }

        Ok(KitReconciliation {
            request_id: request_id.to_string(),
            kit_item_id: item_id.to_string(),
            kit_name: kit.name.clone(),
            lines,
            anomalies,
        })
    }

    /// Finalizes a kit as restocked or disassembled.
    ///
    /// The kit and its sub-item selections leave the session; a request left
    /// without items leaves the view. Refused while any sub-item is
    /// inconsistent.
    pub fn dispose_kit(
        &mut self,
        request_id: &str,
        item_id: &str,
        choice: DispositionChoice,
    ) -> CoreResult<KitDispositionRecord> {
        self.ensure_editable()?;
        let reconciliation = self.compute_missing(request_id, item_id)?;
        if !reconciliation.is_consistent() {
            return Err(CoreError::KitAnomaly {
                kit_name: reconciliation.kit_name,
                anomalies: reconciliation.anomalies,
            });
        }

        let disposition = match choice {
            DispositionChoice::Restock => KitDisposition::Restock {
                missing_items: reconciliation.shortfalls(),
            },
            DispositionChoice::Disassemble => KitDisposition::Disassemble,
        };

        let kit_keys: Vec<SelectionKey> = self
            .selection
            .iter()
            .filter(|k| k.is_kit_sub_item() && k.request_id() == request_id && k.item_id() == item_id)
            .cloned()
            .collect();
        for key in &kit_keys {
            self.forget(key);
        }

        let kit = self
            .view
            .remove_item(request_id, item_id)
            .ok_or_else(|| CoreError::unknown(&SelectionKey::item(request_id, item_id)))?;

        let record = KitDispositionRecord {
            request_number: request_id.to_string(),
            kit_item_id: kit.id,
            kit_sku: kit.sku,
            kit_name: kit.name,
            disposition,
            decided_at: Utc::now(),
        };
        self.kit_dispositions.push(record.clone());
        self.refresh_phase();

        Ok(record)
    }

    fn find_kit(&self, request_id: &str, item_id: &str) -> CoreResult<&LoanItem> {
        let item = self
            .view
            .find_item(request_id, item_id)
            .ok_or_else(|| CoreError::unknown(&SelectionKey::item(request_id, item_id)))?;

        if !item.is_kit {
            return Err(CoreError::NotAKit {
                request_id: request_id.to_string(),
                item_id: item_id.to_string(),
            });
        }
        Ok(item)
    }
}

// =============================================================================
// Restock Sheet
// =============================================================================

/// Renders a printable restock sheet, or `None` for a disassembled kit.
pub fn render_restock_sheet(record: &KitDispositionRecord) -> Option<String> {
    let missing_items = match &record.disposition {
        KitDisposition::Restock { missing_items } => missing_items,
        KitDisposition::Disassemble => return None,
    };

    let mut sheet = String::new();
    sheet.push_str("RESTOCK SHEET\n");
    sheet.push_str(&format!("Kit:     {} ({})\n", record.kit_name, record.kit_sku));
    sheet.push_str(&format!("Request: {}\n", record.request_number));
    sheet.push_str(&format!("Date:    {}\n", record.decided_at.format("%Y-%m-%d %H:%M UTC")));
    sheet.push_str(&"-".repeat(60));
    sheet.push('\n');

    if missing_items.is_empty() {
        sheet.push_str("Kit is complete; nothing to restock.\n");
        return Some(sheet);
    }

    sheet.push_str(&format!("{:<28} {:<16} {:>8} {:<6}\n", "Item", "Category", "Missing", "Unit"));
    for item in missing_items {
        sheet.push_str(&format!(
            "{:<28} {:<16} {:>8} {:<6}\n",
            item.name, item.category, item.missing_quantity, item.unit
        ));
    }

    let total: i64 = missing_items.iter().map(|i| i.missing_quantity).sum();
    sheet.push_str(&"-".repeat(60));
    sheet.push('\n');
    sheet.push_str(&format!("{:<45} {:>8}\n", "Total missing", total));

    Some(sheet)
}

// =============================================================================
// Unit Tests
// =============================================================================
