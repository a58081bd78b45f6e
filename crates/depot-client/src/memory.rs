//! # In-Memory Backend
//!
//! An `InventoryBackend` that keeps holdings in memory and applies returns
//! to them. Used by tests and demos; supports injected faults and latency.
//!
//! Returned quantities are taken from an item's sources in listed order; a
//! return is rejected as a whole if any line exceeds what is held.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use depot_core::{EngineerHoldings, PhotoEvidence, ReturnPayload};

use crate::backend::InventoryBackend;
use crate::error::{ClientError, ClientResult};

/// Backend operations, for fault injection and call counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Holdings,
    UploadPhoto,
    SubmitReturn,
}

/// A failure to inject into the next call of an operation.
#[derive(Debug, Clone)]
pub enum Fault {
    Network(String),
    Timeout,
    Backend { status: u16, message: String },
}

impl Fault {
    fn into_error(self, operation: Operation) -> ClientError {
        match self {
            Fault::Network(message) => ClientError::network(message),
            Fault::Timeout => ClientError::Timeout {
                operation: format!("{:?}", operation),
                secs: 0,
                dispatched: false,
            },
            Fault::Backend { status, message } => ClientError::Backend { status, message },
        }
    }
}

#[derive(Default)]
struct State {
    holdings: HashMap<String, EngineerHoldings>,
    returns: Vec<ReturnPayload>,
    uploads: Vec<String>,
    faults: HashMap<Operation, VecDeque<Fault>>,
    delays: HashMap<Operation, Duration>,
    calls: HashMap<Operation, usize>,
}

/// In-memory inventory backend.
#[derive(Default)]
pub struct InMemoryBackend {
    state: Mutex<State>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds (or replaces) the holdings of one engineer.
    pub async fn set_holdings(&self, holdings: EngineerHoldings) {
        let mut state = self.state.lock().await;
        state.holdings.insert(holdings.engineer.id.clone(), holdings);
    }

    /// Queues a failure for the next call of `operation`.
    pub async fn fail_next(&self, operation: Operation, fault: Fault) {
        let mut state = self.state.lock().await;
        state.faults.entry(operation).or_default().push_back(fault);
    }

    /// Delays every call of `operation`.
    pub async fn set_delay(&self, operation: Operation, delay: Duration) {
        self.state.lock().await.delays.insert(operation, delay);
    }

    /// Returns applied so far.
    pub async fn returns(&self) -> Vec<ReturnPayload> {
        self.state.lock().await.returns.clone()
    }

    /// File names of uploaded photos.
    pub async fn uploads(&self) -> Vec<String> {
        self.state.lock().await.uploads.clone()
    }

    /// Number of calls made to `operation`, failed ones included.
    pub async fn calls(&self, operation: Operation) -> usize {
        self.state.lock().await.calls.get(&operation).copied().unwrap_or(0)
    }

    /// Counts the call, waits out any delay, then pops a queued fault.
    async fn enter(&self, operation: Operation) -> ClientResult<()> {
        let delay = {
            let mut state = self.state.lock().await;
            *state.calls.entry(operation).or_default() += 1;
            state.delays.get(&operation).copied()
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        match state.faults.get_mut(&operation).and_then(VecDeque::pop_front) {
            Some(fault) => {
                debug!(?operation, ?fault, "Injecting fault");
                Err(fault.into_error(operation))
            }
            None => Ok(()),
        }
    }
}

#[async_trait]
impl InventoryBackend for InMemoryBackend {
    async fn engineer_holdings(&self, engineer_id: &str, _warehouse_id: &str) -> ClientResult<EngineerHoldings> {
        self.enter(Operation::Holdings).await?;

        let state = self.state.lock().await;
        state
            .holdings
            .get(engineer_id)
            .cloned()
            .ok_or_else(|| ClientError::Backend {
                status: 404,
                message: format!("Engineer {} not found", engineer_id),
            })
    }

    async fn upload_photo(&self, photo: &PhotoEvidence) -> ClientResult<String> {
        self.enter(Operation::UploadPhoto).await?;

        let mut state = self.state.lock().await;
        state.uploads.push(photo.file_name.clone());
        Ok(format!("memory://photos/{}/{}", state.uploads.len(), photo.file_name))
    }

    async fn submit_return(&self, payload: &ReturnPayload) -> ClientResult<()> {
        self.enter(Operation::SubmitReturn).await?;

        let mut state = self.state.lock().await;
        let holdings = state
            .holdings
            .get_mut(&payload.engineer_id)
            .ok_or_else(|| ClientError::Backend {
                status: 404,
                message: format!("Engineer {} not found", payload.engineer_id),
            })?;

        apply_return(holdings, payload)?;
        state.returns.push(payload.clone());
        Ok(())
    }
}

/// Decrements the returned quantities from the warehouse's holdings.
fn apply_return(holdings: &mut EngineerHoldings, payload: &ReturnPayload) -> ClientResult<()> {
    let warehouse = holdings
        .holdings_by_warehouse
        .iter_mut()
        .find(|w| w.warehouse.id == payload.warehouse_id)
        .ok_or_else(|| ClientError::Backend {
            status: 404,
            message: format!("Nothing held in warehouse {}", payload.warehouse_id),
        })?;

    let mut requested: BTreeMap<&str, i64> = BTreeMap::new();
    for line in &payload.items {
        *requested.entry(line.item_id.as_str()).or_default() += line.total();
    }

    // Check everything before touching anything
    for (item_id, quantity) in &requested {
        let held: i64 = warehouse
            .items
            .iter()
            .filter(|i| i.item_id == *item_id)
            .flat_map(|i| i.sources.iter())
            .map(|s| s.quantity.max(0))
            .sum();
        if *quantity > held {
            return Err(ClientError::Backend {
                status: 422,
                message: format!("Cannot return {} of {}; only {} held", quantity, item_id, held),
            });
        }
    }

    for (item_id, quantity) in requested {
        let mut remaining = quantity;
        for item in warehouse.items.iter_mut().filter(|i| i.item_id == item_id) {
            for source in item.sources.iter_mut() {
                let taken = remaining.min(source.quantity.max(0));
                source.quantity -= taken;
                remaining -= taken;
            }
            item.sources.retain(|s| s.quantity > 0);
        }
    }
    warehouse.items.retain(|i| !i.sources.is_empty());

    Ok(())
}
