//! # Domain Types
//!
//! Core domain types used throughout the return engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Backend wire (read)            Active view              Session        │
//! │  ───────────────────            ───────────              ───────        │
//! │  EngineerHoldings ──project──►  LoanRequest      ◄── SelectionKey       │
//! │   └ WarehouseHoldings            └ LoanItem           Allocation        │
//! │      └ HoldingItem                  └ KitItem         ConditionCounts   │
//! │         └ HoldingSource                                                 │
//! │                                                                         │
//! │  Backend wire (write)           Kit outcome                             │
//! │  ────────────────────           ───────────                             │
//! │  ReturnPayload                  KitDisposition                          │
//! │   └ ReturnLineItem               └ KitItemShortfall                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! A loan request is identified by its request number string. There are no
//! derived numeric ids, so two request numbers can never collide.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::DEFAULT_AVAILABLE_QUANTITY;

// =============================================================================
// Backend Holdings (wire format)
// =============================================================================

/// Response of `GetEngineerHoldings(engineerId, warehouseId)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct EngineerHoldings {
    pub engineer: Engineer,

    #[serde(default)]
    pub holdings_by_warehouse: Vec<WarehouseHoldings>,
}

/// The engineer currently holding the equipment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Engineer {
    pub id: String,

    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct Warehouse {
    pub id: String,

    #[serde(default)]
    pub name: String,
}

/// Holdings of one engineer in one warehouse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct WarehouseHoldings {
    pub warehouse: Warehouse,

    #[serde(default)]
    pub items: Vec<HoldingItem>,
}

/// One catalog item held by the engineer, possibly from several requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct HoldingItem {
    pub item_id: String,
    pub sku: String,
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub image_url: Option<String>,

    /// Unit of measure ("pcs" when the backend omits it).
    #[serde(default)]
    pub unit: Option<String>,

    #[serde(default)]
    pub is_kit: bool,

    #[serde(default)]
    pub kit_items: Vec<KitItem>,

    /// One entry per originating loan request.
    #[serde(default)]
    pub sources: Vec<HoldingSource>,
}

/// The share of a holding that came from one loan request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct HoldingSource {
    pub source_request_number: String,
    pub quantity: i64,

    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub date_received: Option<DateTime<Utc>>,

    #[serde(default)]
    pub project_id: Option<String>,

    #[serde(default)]
    #[ts(as = "Option<String>")]
    pub expected_return_date: Option<DateTime<Utc>>,
}

// =============================================================================
// Active View
// =============================================================================

/// One originating loan request, as seen by the return screen.
///
/// `id` and `request_number` carry the same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoanRequest {
    pub id: String,
    pub request_number: String,
    pub requester_id: String,
    pub project: Option<String>,
    pub warehouse: String,
    pub items: Vec<LoanItem>,
}

impl LoanRequest {
    pub fn find_item(&self, item_id: &str) -> Option<&LoanItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// Regular (non-kit) items of the request.
    pub fn regular_items(&self) -> impl Iterator<Item = &LoanItem> {
        self.items.iter().filter(|i| !i.is_kit)
    }
}

/// A returnable line of a loan request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct LoanItem {
    pub id: String,
    pub sku: String,
    pub name: String,
    pub quantity_requested: Option<i64>,
    pub quantity_fulfilled: Option<i64>,
    pub unit: String,
    pub is_kit: bool,

    #[serde(default)]
    pub kit_items: Vec<KitItem>,
}

impl LoanItem {
    /// Quantity the engineer can return: fulfilled, else requested, else 1.
    pub fn available_quantity(&self) -> i64 {
        self.quantity_fulfilled
            .or(self.quantity_requested)
            .unwrap_or(DEFAULT_AVAILABLE_QUANTITY)
    }

    pub fn find_kit_item(&self, kit_item_id: &str) -> Option<&KitItem> {
        self.kit_items.iter().find(|k| k.id == kit_item_id)
    }
}

/// A sub-item of a kit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct KitItem {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub category: String,

    pub quantity: i64,

    #[serde(default)]
    pub unit: String,
}

// =============================================================================
// Occurrences & Selection Keys
// =============================================================================

/// One concrete returnable line: `(request, item)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
    pub request_id: String,
    pub item_id: String,
}

impl Occurrence {
    pub fn new(request_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Occurrence {
            request_id: request_id.into(),
            item_id: item_id.into(),
        }
    }

    pub fn key(&self) -> SelectionKey {
        SelectionKey::item(&self.request_id, &self.item_id)
    }
}

/// Identifies a selectable line of the session.
///
/// Request numbers may themselves contain `-`, so the key is kept typed and
/// the `"requestId-itemId[-kitItemId]"` text is only produced for display.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SelectionKey {
    /// A regular item occurrence.
    #[serde(rename_all = "camelCase")]
    Item { request_id: String, item_id: String },

    /// A sub-item of a kit.
    #[serde(rename_all = "camelCase")]
    KitSubItem {
        request_id: String,
        item_id: String,
        kit_item_id: String,
    },
}

impl SelectionKey {
    pub fn item(request_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        SelectionKey::Item {
            request_id: request_id.into(),
            item_id: item_id.into(),
        }
    }

    pub fn kit_sub_item(
        request_id: impl Into<String>,
        item_id: impl Into<String>,
        kit_item_id: impl Into<String>,
    ) -> Self {
        SelectionKey::KitSubItem {
            request_id: request_id.into(),
            item_id: item_id.into(),
            kit_item_id: kit_item_id.into(),
        }
    }

    pub fn request_id(&self) -> &str {
        match self {
            SelectionKey::Item { request_id, .. } | SelectionKey::KitSubItem { request_id, .. } => {
                request_id
            }
        }
    }

    pub fn item_id(&self) -> &str {
        match self {
            SelectionKey::Item { item_id, .. } | SelectionKey::KitSubItem { item_id, .. } => item_id,
        }
    }

    #[inline]
    pub fn is_kit_sub_item(&self) -> bool {
        matches!(self, SelectionKey::KitSubItem { .. })
    }

    /// The occurrence this key belongs to (the kit itself for sub-items).
    pub fn occurrence(&self) -> Occurrence {
        Occurrence::new(self.request_id(), self.item_id())
    }
}

impl fmt::Display for SelectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectionKey::Item {
                request_id,
                item_id,
            } => write!(f, "{}-{}", request_id, item_id),
            SelectionKey::KitSubItem {
                request_id,
                item_id,
                kit_item_id,
            } => write!(f, "{}-{}-{}", request_id, item_id, kit_item_id),
        }
    }
}

// =============================================================================
// Allocations
// =============================================================================

/// Good / under-revision / lost split of a returned quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ConditionCounts {
    pub good: i64,
    pub revision: i64,
    pub lost: i64,
}

impl ConditionCounts {
    pub const fn new(good: i64, revision: i64, lost: i64) -> Self {
        ConditionCounts {
            good,
            revision,
            lost,
        }
    }

    /// Everything returned in good condition.
    pub const fn all_good(quantity: i64) -> Self {
        ConditionCounts::new(quantity, 0, 0)
    }

    #[inline]
    pub const fn total(&self) -> i64 {
        self.good + self.revision + self.lost
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Per-line state of a return session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub return_quantity: i64,
    pub condition: Option<ConditionCounts>,
}

// =============================================================================
// Kit Disposition
// =============================================================================

/// A kit sub-item that came back short.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct KitItemShortfall {
    pub kit_item_id: String,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub requested: i64,
    pub returned: i64,
    pub revision: i64,
    pub lost: i64,
    pub missing_quantity: i64,
}

/// The keeper's decision for a returned kit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum KitDisposition {
    /// Put the kit back on the shelf; the missing items must be restocked.
    Restock {
        #[serde(rename = "missingItems")]
        missing_items: Vec<KitItemShortfall>,
    },

    /// Break the kit up into its sub-items.
    Disassemble,
}

/// Which disposition the keeper picked, before shortfalls are attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DispositionChoice {
    Restock,
    Disassemble,
}

// =============================================================================
// Return Payload (wire format)
// =============================================================================

/// Body of `SubmitReturn`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReturnPayload {
    pub engineer_id: String,
    pub warehouse_id: String,
    pub items: Vec<ReturnLineItem>,
    pub general_notes: String,
    pub photo_url: Option<String>,
}

impl ReturnPayload {
    /// Total quantity across all lines and buckets.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(ReturnLineItem::total).sum()
    }
}

/// One returned occurrence split into disposition buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReturnLineItem {
    pub item_id: String,
    pub quantity_returned: i64,
    pub quantity_damaged: i64,
    pub quantity_lost: i64,
    pub notes: String,
}

impl ReturnLineItem {
    #[inline]
    pub fn total(&self) -> i64 {
        self.quantity_returned + self.quantity_damaged + self.quantity_lost
    }
}

// =============================================================================
// Evidence Photo
// =============================================================================

/// Photo of the returned equipment, uploaded before the return is submitted.
#[derive(Clone, PartialEq, Eq)]
pub struct PhotoEvidence {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,

    /// Set once the upload succeeded; a retry skips the upload.
    pub uploaded_url: Option<String>,
}

impl PhotoEvidence {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        PhotoEvidence {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
            uploaded_url: None,
        }
    }

    #[inline]
    pub fn is_uploaded(&self) -> bool {
        self.uploaded_url.is_some()
    }
}

// Image bytes are noise in debug output.
impl fmt::Debug for PhotoEvidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhotoEvidence")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("size", &self.bytes.len())
            .field("uploaded_url", &self.uploaded_url)
            .finish()
    }
}

// =============================================================================
// Session Phase
// =============================================================================

/// Where a return session is in its lifecycle.
///
/// ```text
/// Idle ──► Selecting ──► Allocating ⟲ ──► PhotoCaptured ──► Submitting
///  ▲                         ▲                                  │
///  │                         └──────────── failed ──────────────┤
///  └────────────────────── success (refreshed) ─────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    #[default]
    Idle,
    Selecting,
    Allocating,
    PhotoCaptured,
    Submitting,
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::Idle => write!(f, "idle"),
            SessionPhase::Selecting => write!(f, "selecting"),
            SessionPhase::Allocating => write!(f, "allocating"),
            SessionPhase::PhotoCaptured => write!(f, "photo_captured"),
            SessionPhase::Submitting => write!(f, "submitting"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn item(fulfilled: Option<i64>, requested: Option<i64>) -> LoanItem {
        LoanItem {
            id: "item-1".to_string(),
            sku: "DRL-001".to_string(),
            name: "Drill".to_string(),
            quantity_requested: requested,
            quantity_fulfilled: fulfilled,
            unit: "pcs".to_string(),
            is_kit: false,
            kit_items: Vec::new(),
        }
    }

    #[test]
    fn test_available_quantity_fallbacks() {
        assert_eq!(item(Some(3), Some(5)).available_quantity(), 3);
        assert_eq!(item(None, Some(5)).available_quantity(), 5);
        assert_eq!(item(None, None).available_quantity(), 1);
    }

    #[test]
    fn test_selection_key_display() {
        let key = SelectionKey::item("REQ-7", "item-1");
        assert_eq!(key.to_string(), "REQ-7-item-1");

        let kit = SelectionKey::kit_sub_item("REQ-7", "kit-1", "k2");
        assert_eq!(kit.to_string(), "REQ-7-kit-1-k2");
        assert!(kit.is_kit_sub_item());
        assert_eq!(kit.occurrence(), Occurrence::new("REQ-7", "kit-1"));
    }

    #[test]
    fn test_holdings_deserialize_camel_case() {
        let json = r#"{
            "engineer": { "id": "eng-1", "name": "Ana" },
            "holdingsByWarehouse": [{
                "warehouse": { "id": "wh-1" },
                "items": [{
                    "itemId": "item-1",
                    "sku": "DRL-001",
                    "name": "Drill",
                    "sources": [{ "sourceRequestNumber": "REQ-1", "quantity": 2 }]
                }]
            }]
        }"#;

        let holdings: EngineerHoldings = serde_json::from_str(json).unwrap();
        let item = &holdings.holdings_by_warehouse[0].items[0];
        assert_eq!(item.sources[0].source_request_number, "REQ-1");
        assert!(!item.is_kit);
        assert!(item.unit.is_none());
    }

    #[test]
    fn test_payload_serializes_camel_case() {
        let payload = ReturnPayload {
            engineer_id: "eng-1".to_string(),
            warehouse_id: "wh-1".to_string(),
            items: vec![ReturnLineItem {
                item_id: "item-1".to_string(),
                quantity_returned: 2,
                quantity_damaged: 0,
                quantity_lost: 0,
                notes: String::new(),
            }],
            general_notes: String::new(),
            photo_url: None,
        };

        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["engineerId"], "eng-1");
        assert_eq!(value["items"][0]["quantityReturned"], 2);
        assert!(value["photoUrl"].is_null());
    }

    #[test]
    fn test_kit_disposition_is_tagged() {
        let value = serde_json::to_value(KitDisposition::Disassemble).unwrap();
        assert_eq!(value["kind"], "disassemble");

        let restock = KitDisposition::Restock {
            missing_items: Vec::new(),
        };
        let value = serde_json::to_value(restock).unwrap();
        assert_eq!(value["kind"], "restock");
        assert!(value["missingItems"].as_array().unwrap().is_empty());
    }
}
