//! # Return Desk
//!
//! Drives one return session against the inventory backend: loads the
//! engineer's holdings, hands the session out for editing, and submits it.
//!
//! ## Submit Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  submit()                                                               │
//! │    │                                                                    │
//! │    ├─ validate session + photo ───────────── error: nothing sent        │
//! │    ├─ lock session (Submitting)                                         │
//! │    ├─ UploadPhoto (skipped if already uploaded)                         │
//! │    │     └─ URL kept on the session, even if the return fails later     │
//! │    ├─ SubmitReturn ───────────────────────── error: unlock, keep data   │
//! │    │                                                                    │
//! │    └─ success: refetch holdings ──► fresh session                       │
//! │                    └─ refetch fails ──► cleared session, stale view     │
//! │                                                                         │
//! │  Every backend call races the request timeout and the cancel handle.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use depot_core::kit::KitDispositionRecord;
use depot_core::validation::validate_photo;
use depot_core::{ReturnPayload, ReturnSession, ReturnSummary, ValidationError};

use crate::backend::InventoryBackend;
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::events::{NoOpEmitter, ReturnEventEmitter};
use crate::holdings::fetch_holdings;

// =============================================================================
// Cancellation
// =============================================================================

/// Cancels the submit currently in flight on a desk.
///
/// Cancelling while no submit runs has no effect.
#[derive(Clone)]
pub struct SubmitCancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl SubmitCancelHandle {
    pub fn cancel(&self) {
        debug!("Submit cancellation requested");
        self.tx.send_replace(true);
    }
}

// =============================================================================
// Submit Outcome
// =============================================================================

/// Result of a successful submit.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    /// The payload the backend accepted.
    pub payload: ReturnPayload,

    /// Kit dispositions recorded in the submitted session.
    pub kit_dispositions: Vec<KitDispositionRecord>,

    /// Whether holdings were refetched after the submit.
    pub refreshed: bool,

    /// Why the refetch failed. The return itself stands.
    pub refresh_error: Option<String>,
}

// =============================================================================
// Return Desk
// =============================================================================

/// One keeper's return session for one engineer in one warehouse.
pub struct ReturnDesk {
    backend: Arc<dyn InventoryBackend>,
    config: Arc<ClientConfig>,
    engineer_id: String,
    warehouse_id: String,
    session: ReturnSession,
    emitter: Arc<dyn ReturnEventEmitter>,
    cancel_tx: Arc<watch::Sender<bool>>,
}

impl ReturnDesk {
    /// Fetches the engineer's holdings and starts a session on them.
    pub async fn open(
        backend: Arc<dyn InventoryBackend>,
        config: Arc<ClientConfig>,
        engineer_id: impl Into<String>,
        warehouse_id: impl Into<String>,
    ) -> ClientResult<Self> {
        let engineer_id = engineer_id.into();
        let warehouse_id = warehouse_id.into();

        let view = fetch_holdings(backend.as_ref(), &engineer_id, &warehouse_id, &config).await?;
        info!(%engineer_id, %warehouse_id, requests = view.requests().len(), "Return desk opened");

        let (cancel_tx, _) = watch::channel(false);
        Ok(ReturnDesk {
            backend,
            config,
            engineer_id,
            warehouse_id,
            session: ReturnSession::new(view),
            emitter: Arc::new(NoOpEmitter),
            cancel_tx: Arc::new(cancel_tx),
        })
    }

    /// Replaces the event emitter.
    pub fn with_emitter(mut self, emitter: Arc<dyn ReturnEventEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    pub fn engineer_id(&self) -> &str {
        &self.engineer_id
    }

    pub fn warehouse_id(&self) -> &str {
        &self.warehouse_id
    }

    pub fn session(&self) -> &ReturnSession {
        &self.session
    }

    /// Mutable access for selection, quantity and condition edits.
    pub fn session_mut(&mut self) -> &mut ReturnSession {
        &mut self.session
    }

    pub fn summary(&self) -> ReturnSummary {
        ReturnSummary::from(&self.session)
    }

    pub fn cancel_handle(&self) -> SubmitCancelHandle {
        SubmitCancelHandle {
            tx: Arc::clone(&self.cancel_tx),
        }
    }

    /// Refetches holdings and starts a fresh session, discarding any input.
    pub async fn refresh(&mut self) -> ClientResult<()> {
        self.session.ensure_editable()?;

        if !self.session.is_pristine() {
            warn!(session_id = %self.session.id(), "Discarding session input on refresh");
        }

        let view = fetch_holdings(
            self.backend.as_ref(),
            &self.engineer_id,
            &self.warehouse_id,
            &self.config,
        )
        .await?;
        self.session = ReturnSession::new(view);
        self.emitter.emit_phase(self.session.phase());
        Ok(())
    }

    // =========================================================================
    // Submit
    // =========================================================================

    /// Validates, uploads the photo and submits the return.
    ///
    /// Never retried automatically: a repeated SubmitReturn would return the
    /// same equipment twice. When the error reports `may_have_applied()` the
    /// caller should refresh before trying again.
    pub async fn submit(&mut self) -> ClientResult<SubmitOutcome> {
        self.check_ready()?;

        self.session.begin_submit()?;
        self.emitter.emit_phase(self.session.phase());
        info!(session_id = %self.session.id(), engineer_id = %self.engineer_id, "Submitting return");

        self.cancel_tx.send_replace(false);
        let mut cancel = self.cancel_tx.subscribe();

        match self.dispatch(&mut cancel).await {
            Ok(payload) => Ok(self.complete(payload).await),
            Err(e) => {
                self.session.abort_submit();
                if e.may_have_applied() {
                    warn!(error = %e, "Submit interrupted after dispatch; return may have been applied");
                } else {
                    warn!(error = %e, "Submit failed");
                }
                self.emitter.emit_error(&e.to_string(), e.is_retryable());
                self.emitter.emit_phase(self.session.phase());
                Err(e)
            }
        }
    }

    /// Everything that can be checked without the network.
    fn check_ready(&self) -> ClientResult<()> {
        self.session.validate()?;

        match self.session.photo() {
            None if self.config.returns.require_photo => Err(ValidationError::PhotoRequired.into()),
            Some(photo) if !photo.is_uploaded() => {
                validate_photo(photo, self.config.returns.max_photo_bytes)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn dispatch(&mut self, cancel: &mut watch::Receiver<bool>) -> ClientResult<ReturnPayload> {
        let limit = self.config.request_timeout();

        let uploaded = match self.session.photo() {
            Some(photo) if !photo.is_uploaded() => Some(
                guarded("UploadPhoto", limit, false, cancel, self.backend.upload_photo(photo)).await?,
            ),
            _ => None,
        };
        if let Some(photo_url) = uploaded {
            debug!(%photo_url, "Photo uploaded");
            self.session.mark_photo_uploaded(photo_url);
        }

        let payload = self.session.build_payload()?;
        guarded("SubmitReturn", limit, true, cancel, self.backend.submit_return(&payload)).await?;
        Ok(payload)
    }

    async fn complete(&mut self, payload: ReturnPayload) -> SubmitOutcome {
        info!(
            lines = payload.items.len(),
            total = payload.total_quantity(),
            "Return accepted"
        );
        self.emitter.emit_submitted(&payload);
        let kit_dispositions = self.session.kit_dispositions().to_vec();

        let refreshed = fetch_holdings(
            self.backend.as_ref(),
            &self.engineer_id,
            &self.warehouse_id,
            &self.config,
        )
        .await;

        let outcome = match refreshed {
            Ok(view) => {
                self.session = ReturnSession::new(view);
                SubmitOutcome {
                    payload,
                    kit_dispositions,
                    refreshed: true,
                    refresh_error: None,
                }
            }
            Err(e) => {
                warn!(error = %e, "Return accepted but holdings refresh failed");
                self.session.clear_after_submit();
                self.emitter
                    .emit_error(&format!("Return submitted; refresh failed: {}", e), e.is_retryable());
                SubmitOutcome {
                    payload,
                    kit_dispositions,
                    refreshed: false,
                    refresh_error: Some(e.to_string()),
                }
            }
        };

        self.emitter.emit_phase(self.session.phase());
        outcome
    }
}

/// Runs a backend call under the timeout and the cancel signal.
async fn guarded<T, F>(
    operation: &str,
    limit: Duration,
    dispatched: bool,
    cancel: &mut watch::Receiver<bool>,
    call: F,
) -> ClientResult<T>
where
    F: Future<Output = ClientResult<T>>,
{
    let result = tokio::select! {
        result = tokio::time::timeout(limit, call) => match result {
            Ok(result) => result,
            Err(_) => Err(ClientError::Timeout {
                operation: operation.to_string(),
                secs: limit.as_secs(),
                dispatched: false,
            }),
        },
        Ok(_) = cancel.wait_for(|cancelled| *cancelled) => {
            warn!(operation, dispatched, "Backend call cancelled");
            Err(ClientError::Cancelled { dispatched })
        }
    };

    if dispatched {
        result.map_err(ClientError::after_dispatch)
    } else {
        result
    }
}
