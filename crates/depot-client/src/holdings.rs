//! # Holdings Fetch
//!
//! Fetches an engineer's holdings with exponential backoff and projects them
//! onto the warehouse the keeper works in.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  attempt 1 ──► Network/Timeout ──► wait 500ms ──► attempt 2 ──► ...     │
//! │                                                                         │
//! │  • only retryable errors are retried (GET is idempotent)                │
//! │  • Backend / Decode errors fail immediately                             │
//! │  • gives up after retry.max_attempts                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use depot_core::HoldingsView;
use tracing::{debug, warn};

use crate::backend::InventoryBackend;
use crate::config::ClientConfig;
use crate::error::ClientResult;

/// Fetches the holdings of `engineer_id` and projects them onto
/// `warehouse_id`.
pub async fn fetch_holdings(
    backend: &dyn InventoryBackend,
    engineer_id: &str,
    warehouse_id: &str,
    config: &ClientConfig,
) -> ClientResult<HoldingsView> {
    let mut backoff = create_backoff(config);
    let mut attempt = 1u32;

    loop {
        match backend.engineer_holdings(engineer_id, warehouse_id).await {
            Ok(holdings) => {
                let view = HoldingsView::project(&holdings, warehouse_id);
                debug!(
                    engineer_id,
                    warehouse_id,
                    requests = view.requests().len(),
                    attempt,
                    "Holdings fetched"
                );
                return Ok(view);
            }
            Err(e) if e.is_retryable() && attempt < config.retry.max_attempts => {
                let Some(wait) = backoff.next_backoff() else {
                    return Err(e);
                };
                warn!(error = %e, attempt, ?wait, "Holdings fetch failed, retrying");
                tokio::time::sleep(wait).await;
                attempt += 1;
            }
            Err(e) => {
                warn!(error = %e, attempt, "Holdings fetch failed");
                return Err(e);
            }
        }
    }
}

fn create_backoff(config: &ClientConfig) -> ExponentialBackoff {
    ExponentialBackoff {
        initial_interval: config.initial_backoff(),
        max_interval: config.max_backoff(),
        multiplier: 2.0,
        max_elapsed_time: None,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use crate::memory::{Fault, InMemoryBackend, Operation};
    use depot_core::{Engineer, EngineerHoldings};

    fn fast_config(max_attempts: u32) -> ClientConfig {
        let mut config = ClientConfig::default();
        config.retry.max_attempts = max_attempts;
        config.retry.initial_backoff_ms = 1;
        config.retry.max_backoff_secs = 1;
        config
    }

    async fn backend() -> InMemoryBackend {
        let backend = InMemoryBackend::new();
        backend
            .set_holdings(EngineerHoldings {
                engineer: Engineer {
                    id: "eng-1".into(),
                    name: "Ana".into(),
                },
                holdings_by_warehouse: Vec::new(),
            })
            .await;
        backend
    }

    #[tokio::test]
    async fn test_retries_network_errors() {
        let backend = backend().await;
        backend.fail_next(Operation::Holdings, Fault::Network("reset".into())).await;
        backend.fail_next(Operation::Holdings, Fault::Timeout).await;

        let view = fetch_holdings(&backend, "eng-1", "wh-1", &fast_config(3)).await.unwrap();
        assert!(view.is_empty());
        assert_eq!(backend.calls(Operation::Holdings).await, 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let backend = backend().await;
        for _ in 0..3 {
            backend.fail_next(Operation::Holdings, Fault::Network("reset".into())).await;
        }

        let err = fetch_holdings(&backend, "eng-1", "wh-1", &fast_config(2)).await.unwrap_err();
        assert!(matches!(err, ClientError::Network { .. }));
        assert_eq!(backend.calls(Operation::Holdings).await, 2);
    }

    #[tokio::test]
    async fn test_backend_errors_are_not_retried() {
        let backend = backend().await;
        backend
            .fail_next(
                Operation::Holdings,
                Fault::Backend {
                    status: 403,
                    message: "Forbidden".into(),
                },
            )
            .await;

        let err = fetch_holdings(&backend, "eng-1", "wh-1", &fast_config(3)).await.unwrap_err();
        assert!(matches!(err, ClientError::Backend { status: 403, .. }));
        assert_eq!(backend.calls(Operation::Holdings).await, 1);
    }
}
