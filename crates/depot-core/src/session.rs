//! # Return Session
//!
//! The explicit state of one return: which lines are selected, how much of
//! each comes back, and in what condition.
//!
//! ## Session Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Return Session Operations                            │
//! │                                                                         │
//! │  Keeper Action            Session Method              State Change      │
//! │  ─────────────            ──────────────              ────────────      │
//! │                                                                         │
//! │  Tick item ──────────────► toggle_item() ────────────► selection ± key  │
//! │                                                                         │
//! │  Type quantity ──────────► set_return_quantity() ────► allocations[key] │
//! │                                                                         │
//! │  Edit SKU total ─────────► set_aggregated() ─────────► allocations[*]   │
//! │                                                                         │
//! │  Split condition ────────► save_condition() ─────────► condition        │
//! │                                                                         │
//! │  Finalize kit ───────────► dispose_kit() ────────────► view − kit       │
//! │                                                                         │
//! │  Take photo ─────────────► capture_photo() ──────────► photo            │
//! │                                                                         │
//! │  NOTE: While a submit is in flight every edit fails with                │
//! │        CoreError::SessionLocked.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The operations live next to the component they belong to
//! ([`crate::selection`], [`crate::quantity`], [`crate::condition`],
//! [`crate::kit`], [`crate::submission`]); this module owns the data and
//! the phase machine.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};
use crate::holdings::HoldingsView;
use crate::kit::KitDispositionRecord;
use crate::types::{Allocation, ConditionCounts, PhotoEvidence, SelectionKey, SessionPhase};

// =============================================================================
// Return Session
// =============================================================================

/// One keeper's return session for an `(engineer, warehouse)` pair.
///
/// ## Invariants
/// - Every key in `allocations` is in `selection`, and vice versa
/// - `0 <= return_quantity <= available` for every allocation
/// - A registered SKU group holds at most one shared condition
#[derive(Debug, Clone)]
pub struct ReturnSession {
    pub(crate) id: Uuid,
    pub(crate) started_at: DateTime<Utc>,
    pub(crate) view: HoldingsView,
    pub(crate) phase: SessionPhase,
    pub(crate) selection: BTreeSet<SelectionKey>,
    pub(crate) allocations: BTreeMap<SelectionKey, Allocation>,

    /// SKUs edited as one aggregate, with their shared condition.
    pub(crate) sku_groups: BTreeMap<String, Option<ConditionCounts>>,

    pub(crate) item_notes: BTreeMap<SelectionKey, String>,
    pub(crate) general_notes: String,
    pub(crate) photo: Option<PhotoEvidence>,
    pub(crate) kit_dispositions: Vec<KitDispositionRecord>,
}

impl ReturnSession {
    /// Starts an empty session over a freshly fetched view.
    pub fn new(view: HoldingsView) -> Self {
        ReturnSession {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            view,
            phase: SessionPhase::Idle,
            selection: BTreeSet::new(),
            allocations: BTreeMap::new(),
            sku_groups: BTreeMap::new(),
            item_notes: BTreeMap::new(),
            general_notes: String::new(),
            photo: None,
            kit_dispositions: Vec::new(),
        }
    }

    #[inline]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[inline]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[inline]
    pub fn view(&self) -> &HoldingsView {
        &self.view
    }

    #[inline]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[inline]
    pub fn selection(&self) -> &BTreeSet<SelectionKey> {
        &self.selection
    }

    #[inline]
    pub fn allocations(&self) -> &BTreeMap<SelectionKey, Allocation> {
        &self.allocations
    }

    pub fn allocation(&self, key: &SelectionKey) -> Option<&Allocation> {
        self.allocations.get(key)
    }

    #[inline]
    pub fn is_selected(&self, key: &SelectionKey) -> bool {
        self.selection.contains(key)
    }

    /// SKUs currently edited as aggregates.
    pub fn sku_groups(&self) -> impl Iterator<Item = &str> {
        self.sku_groups.keys().map(String::as_str)
    }

    pub fn kit_dispositions(&self) -> &[KitDispositionRecord] {
        &self.kit_dispositions
    }

    pub fn is_locked(&self) -> bool {
        self.phase == SessionPhase::Submitting
    }

    /// True when nothing has been entered yet.
    pub fn is_pristine(&self) -> bool {
        self.selection.is_empty()
            && self.sku_groups.is_empty()
            && self.photo.is_none()
            && self.general_notes.is_empty()
    }

    // =========================================================================
    // Notes & Photo
    // =========================================================================

    pub fn general_notes(&self) -> &str {
        &self.general_notes
    }

    pub fn set_general_notes(&mut self, notes: impl Into<String>) -> CoreResult<()> {
        self.ensure_editable()?;
        self.general_notes = notes.into();
        Ok(())
    }

    pub fn item_notes(&self, key: &SelectionKey) -> Option<&str> {
        self.item_notes.get(key).map(String::as_str)
    }

    /// Attaches a note to a selected line; an empty note removes it.
    pub fn set_item_notes(&mut self, key: &SelectionKey, notes: impl Into<String>) -> CoreResult<()> {
        self.ensure_editable()?;
        if !self.is_selected(key) {
            return Err(CoreError::NotSelected(self.view.line_name(key)));
        }

        let notes = notes.into();
        if notes.trim().is_empty() {
            self.item_notes.remove(key);
        } else {
            self.item_notes.insert(key.clone(), notes);
        }
        Ok(())
    }

    pub fn photo(&self) -> Option<&PhotoEvidence> {
        self.photo.as_ref()
    }

    /// Stores the evidence photo, replacing any earlier one.
    pub fn capture_photo(&mut self, photo: PhotoEvidence) -> CoreResult<()> {
        self.ensure_editable()?;
        self.photo = Some(photo);
        self.refresh_phase();
        Ok(())
    }

    pub fn clear_photo(&mut self) -> CoreResult<()> {
        self.ensure_editable()?;
        self.photo = None;
        self.refresh_phase();
        Ok(())
    }

    /// Records the URL of an uploaded photo.
    ///
    /// Allowed while submitting: the submitter itself calls this between the
    /// upload and the return call, so a retry can skip the upload.
    pub fn mark_photo_uploaded(&mut self, photo_url: impl Into<String>) {
        if let Some(photo) = self.photo.as_mut() {
            photo.uploaded_url = Some(photo_url.into());
        }
    }

    // =========================================================================
    // Phase Machine
    // =========================================================================

    /// Fails with `SessionLocked` while a submit is in flight.
    pub fn ensure_editable(&self) -> CoreResult<()> {
        if self.is_locked() {
            return Err(CoreError::SessionLocked);
        }
        Ok(())
    }

    /// Locks the session for submission.
    pub fn begin_submit(&mut self) -> CoreResult<()> {
        self.ensure_editable()?;
        self.phase = SessionPhase::Submitting;
        Ok(())
    }

    /// Unlocks the session after a failed or cancelled submit.
    ///
    /// All entered data stays as it was so the keeper can retry; the session
    /// goes back to `Allocating` (or `Idle` when nothing is selected).
    pub fn abort_submit(&mut self) {
        if self.is_locked() {
            self.phase = if self.selection.is_empty() {
                SessionPhase::Idle
            } else {
                SessionPhase::Allocating
            };
        }
    }

    /// Clears all entered data after a successful submit, keeping the view.
    ///
    /// Used when the follow-up holdings refresh fails; the view may be stale
    /// until the next refresh.
    pub fn clear_after_submit(&mut self) {
        self.selection.clear();
        self.allocations.clear();
        self.sku_groups.clear();
        self.item_notes.clear();
        self.general_notes.clear();
        self.photo = None;
        self.kit_dispositions.clear();
        self.phase = SessionPhase::Idle;
    }

    /// Recomputes the phase from the session contents.
    pub(crate) fn refresh_phase(&mut self) {
        if self.is_locked() {
            return;
        }

        self.phase = if self.selection.is_empty() {
            SessionPhase::Idle
        } else if self.photo.is_some() {
            SessionPhase::PhotoCaptured
        } else if self.has_allocation_input() {
            SessionPhase::Allocating
        } else {
            SessionPhase::Selecting
        };
    }

    fn has_allocation_input(&self) -> bool {
        self.allocations
            .values()
            .any(|a| a.return_quantity > 0 || a.condition.is_some())
            || self.sku_groups.values().any(Option::is_some)
    }

    /// Removes every trace of a key.
    pub(crate) fn forget(&mut self, key: &SelectionKey) {
        self.selection.remove(key);
        self.allocations.remove(key);
        self.item_notes.remove(key);
    }

    /// Drops SKU groups that no longer have a selected occurrence.
    pub(crate) fn prune_groups(&mut self) {
        let view = &self.view;
        let selection = &self.selection;
        self.sku_groups.retain(|sku, _| {
            view.aggregate_sku(sku)
                .map(|a| a.keys().any(|k| selection.contains(&k)))
                .unwrap_or(false)
        });
    }

    /// The SKU group a regular line is edited under, if any.
    pub(crate) fn group_of(&self, key: &SelectionKey) -> Option<&str> {
        if key.is_kit_sub_item() {
            return None;
        }
        let item = self.view.find_item(key.request_id(), key.item_id())?;
        self.sku_groups
            .get_key_value(&item.sku)
            .map(|(sku, _)| sku.as_str())
    }
}

// =============================================================================
// Summary
// =============================================================================

/// Session totals for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct ReturnSummary {
    #[ts(as = "String")]
    pub session_id: Uuid,
    pub phase: SessionPhase,
    pub selected_lines: usize,
    pub total_return_quantity: i64,
    pub lines_missing_condition: Vec<String>,
    pub has_photo: bool,
    pub photo_uploaded: bool,
    pub kits_disposed: usize,
}

impl From<&ReturnSession> for ReturnSummary {
    fn from(session: &ReturnSession) -> Self {
        ReturnSummary {
            session_id: session.id,
            phase: session.phase,
            selected_lines: session.selection.len(),
            total_return_quantity: session
                .allocations
                .iter()
                .filter(|(k, _)| !k.is_kit_sub_item())
                .map(|(_, a)| a.return_quantity)
                .sum(),
            lines_missing_condition: session.lines_missing_condition(),
            has_photo: session.photo.is_some(),
            photo_uploaded: session.photo.as_ref().is_some_and(PhotoEvidence::is_uploaded),
            kits_disposed: session.kit_dispositions.len(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
