//! # Return Events
//!
//! Notifications the desk sends to a presentation layer.
//!
//! ```text
//! "returns://phase"     - { phase: "submitting" }
//! "returns://submitted" - { lines: 2, total: 7 }
//! "returns://error"     - { message: "...", retryable: true }
//! ```

use depot_core::{ReturnPayload, SessionPhase};

/// Receives return-desk events.
pub trait ReturnEventEmitter: Send + Sync {
    /// The session moved to a new phase.
    fn emit_phase(&self, phase: SessionPhase);

    /// A return was accepted by the backend.
    fn emit_submitted(&self, payload: &ReturnPayload);

    /// A submit or refresh failed.
    fn emit_error(&self, message: &str, retryable: bool);
}

/// No-op event emitter for testing.
pub struct NoOpEmitter;

impl ReturnEventEmitter for NoOpEmitter {
    fn emit_phase(&self, _phase: SessionPhase) {}
    fn emit_submitted(&self, _payload: &ReturnPayload) {}
    fn emit_error(&self, _message: &str, _retryable: bool) {}
}
