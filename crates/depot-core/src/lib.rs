//! # depot-core: Pure Return Reconciliation Logic
//!
//! This crate is the heart of the equipment return engine. It lets a
//! warehouse keeper take back items and kits from an engineer, split each
//! returned quantity into good / under-revision / lost, and build an exact
//! payload for the inventory backend. Everything here is a pure function of
//! its inputs.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Depot Returns Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Presentation (out of scope)                     │   │
//! │  │    Holdings list ──► Quantities ──► Conditions ──► Photo        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ depot-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │ holdings  │  │ selection │  │ quantity  │  │ condition │  │   │
//! │  │   │ projector │  │   state   │  │ allocator │  │ allocator │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │   ┌───────────┐  ┌───────────┐                                 │   │
//! │  │   │    kit    │  │submission │   NO I/O • NO NETWORK           │   │
//! │  │   │reconciler │  │ (payload) │                                 │   │
//! │  │   └───────────┘  └───────────┘                                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            depot-client (backend calls, ReturnDesk)             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Wire and view types (LoanRequest, ReturnPayload, ...)
//! - [`holdings`] - Backend holdings → loan requests, SKU aggregation
//! - [`session`] - The return session value type and its phase machine
//! - [`selection`] - Which lines are being returned
//! - [`quantity`] - Return quantities and proportional redistribution
//! - [`condition`] - Good / revision / lost splits
//! - [`kit`] - Kit shortfalls and disposition
//! - [`submission`] - Session validation and payload building
//! - [`validation`] - Field-level validators
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use depot_core::holdings::HoldingsView;
//! use depot_core::session::ReturnSession;
//! use depot_core::types::{ConditionCounts, LoanItem, LoanRequest, SelectionKey};
//!
//! let request = LoanRequest {
//!     id: "REQ-1".to_string(),
//!     request_number: "REQ-1".to_string(),
//!     requester_id: "eng-1".to_string(),
//!     project: None,
//!     warehouse: "wh-1".to_string(),
//!     items: vec![LoanItem {
//!         id: "item-1".to_string(),
//!         sku: "DRL-001".to_string(),
//!         name: "Drill".to_string(),
//!         quantity_requested: Some(2),
//!         quantity_fulfilled: Some(2),
//!         unit: "pcs".to_string(),
//!         is_kit: false,
//!         kit_items: Vec::new(),
//!     }],
//! };
//!
//! let view = HoldingsView::new("eng-1", "wh-1", vec![request]);
//! let mut session = ReturnSession::new(view);
//!
//! let key = SelectionKey::item("REQ-1", "item-1");
//! session.toggle_item(&key).unwrap();
//! session.set_return_quantity(&key, 2).unwrap();
//! session.save_line_condition(&key, ConditionCounts::all_good(2)).unwrap();
//!
//! let payload = session.build_payload().unwrap();
//! assert_eq!(payload.items[0].quantity_returned, 2);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod condition;
pub mod error;
pub mod holdings;
pub mod kit;
pub mod quantity;
pub mod selection;
pub mod session;
pub mod submission;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use holdings::{AggregatedItem, HoldingsView};
pub use session::{ReturnSession, ReturnSummary};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Returnable quantity of a line whose fulfilled and requested quantities
/// are both unknown.
pub const DEFAULT_AVAILABLE_QUANTITY: i64 = 1;

/// Unit shown when the backend does not report one.
pub const DEFAULT_UNIT: &str = "pcs";

/// Maximum length of item and general notes.
pub const MAX_NOTES_LEN: usize = 1000;

/// Maximum length of engineer, warehouse and request identifiers.
pub const MAX_IDENTIFIER_LEN: usize = 100;
