//! # depot-client: Backend Client for Depot Returns
//!
//! Connects the pure return engine in `depot-core` to the inventory backend.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Return Desk Architecture                        │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │                  ReturnDesk (session controller)                  │  │
//! │  │                                                                  │  │
//! │  │  Owns one ReturnSession, submits it, refreshes holdings          │  │
//! │  │  Timeout + cancel handle around every backend call               │  │
//! │  └────────────────────────────┬─────────────────────────────────────┘  │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                  │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐    │
//! │  │ fetch_holdings │  │InventoryBackend│  │  ReturnEventEmitter    │    │
//! │  │                │  │                │  │                        │    │
//! │  │ Exponential    │  │ HttpBackend    │  │ phase / submitted /    │    │
//! │  │ backoff on     │  │ (reqwest)      │  │ error notifications    │    │
//! │  │ retryable errs │  │ InMemoryBackend│  │                        │    │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//! - [`backend`] - `InventoryBackend` trait
//! - [`config`] - Client configuration (backend URL, retry, photo rules)
//! - [`desk`] - `ReturnDesk` session controller
//! - [`error`] - Client error types
//! - [`events`] - Event emitter trait
//! - [`holdings`] - Holdings fetch with backoff
//! - [`http`] - HTTP backend
//! - [`memory`] - In-memory backend
//! - [`telemetry`] - Tracing setup
//!
//! ## Usage
//! ```rust,no_run
//! use std::sync::Arc;
//! use depot_client::{ClientConfig, HttpBackend, ReturnDesk};
//! use depot_core::{ConditionCounts, PhotoEvidence, SelectionKey};
//!
//! # async fn run() -> depot_client::ClientResult<()> {
//! let config = ClientConfig::load(None)?;
//! let backend = Arc::new(HttpBackend::new(&config)?);
//! let mut desk = ReturnDesk::open(backend, Arc::new(config), "eng-1", "wh-1").await?;
//!
//! let key = SelectionKey::item("REQ-1", "drill");
//! let session = desk.session_mut();
//! session.toggle_item(&key)?;
//! session.set_return_quantity(&key, 2)?;
//! session.save_line_condition(&key, ConditionCounts::new(1, 1, 0))?;
//! session.capture_photo(PhotoEvidence::new("return.jpg", "image/jpeg", vec![0xFF, 0xD8]))?;
//!
//! let outcome = desk.submit().await?;
//! println!("returned {} items", outcome.payload.total_quantity());
//! # Ok(())
//! # }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod backend;
pub mod config;
pub mod desk;
pub mod error;
pub mod events;
pub mod holdings;
pub mod http;
pub mod memory;
pub mod telemetry;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use backend::InventoryBackend;
pub use config::ClientConfig;
pub use desk::{ReturnDesk, SubmitCancelHandle, SubmitOutcome};
pub use error::{ClientError, ClientResult};
pub use events::{NoOpEmitter, ReturnEventEmitter};
pub use holdings::fetch_holdings;
pub use http::HttpBackend;
pub use memory::InMemoryBackend;
pub use telemetry::init_tracing;
