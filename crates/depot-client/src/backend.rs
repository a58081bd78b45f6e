//! # Inventory Backend
//!
//! The three calls the return engine makes against the inventory backend.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  GetEngineerHoldings  GET  {base}/api/engineers/{id}/holdings          │
//! │                            ?warehouseId={warehouse}                     │
//! │  UploadPhoto          POST {base}/api/uploads/photos   (multipart)     │
//! │  SubmitReturn         POST {base}/api/inventory/returns (JSON)         │
//! │                                                                         │
//! │  Implementations: HttpBackend (reqwest), InMemoryBackend (tests, demos) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use depot_core::{EngineerHoldings, PhotoEvidence, ReturnPayload};

use crate::error::ClientResult;

/// Operations offered by the inventory backend.
#[async_trait]
pub trait InventoryBackend: Send + Sync {
    /// Everything the engineer currently holds, grouped by warehouse.
    async fn engineer_holdings(&self, engineer_id: &str, warehouse_id: &str) -> ClientResult<EngineerHoldings>;

    /// Uploads an evidence photo and returns its URL.
    async fn upload_photo(&self, photo: &PhotoEvidence) -> ClientResult<String>;

    /// Applies a return. Not idempotent.
    async fn submit_return(&self, payload: &ReturnPayload) -> ClientResult<()>;
}
