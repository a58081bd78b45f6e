//! End-to-end return flows against the in-memory backend.

use std::sync::Arc;
use std::time::Duration;

use depot_client::memory::{Fault, Operation};
use depot_client::{ClientConfig, ClientError, InMemoryBackend, ReturnDesk};
use depot_core::kit::render_restock_sheet;
use depot_core::{
    ConditionCounts, DispositionChoice, EngineerHoldings, KitDisposition, PhotoEvidence,
    SelectionKey, SessionPhase, ValidationError,
};
use serde_json::json;

fn holdings() -> EngineerHoldings {
    serde_json::from_value(json!({
        "engineer": { "id": "eng-1", "name": "Ana Ruiz" },
        "holdingsByWarehouse": [{
            "warehouse": { "id": "wh-1", "name": "Main Depot" },
            "items": [
                {
                    "itemId": "drill",
                    "sku": "DRL-001",
                    "name": "Cordless Drill",
                    "sources": [
                        { "sourceRequestNumber": "REQ-1", "quantity": 2, "dateReceived": "2024-03-01T09:00:00Z" }
                    ]
                },
                {
                    "itemId": "saw",
                    "sku": "SAW-010",
                    "name": "Circular Saw",
                    "unit": "pcs",
                    "sources": [
                        { "sourceRequestNumber": "REQ-1", "quantity": 1 },
                        { "sourceRequestNumber": "REQ-2", "quantity": 3, "projectId": "PRJ-7" }
                    ]
                },
                {
                    "itemId": "survey",
                    "sku": "KIT-SRV",
                    "name": "Survey Kit",
                    "isKit": true,
                    "kitItems": [
                        { "id": "tripod", "name": "Tripod", "category": "Optics", "quantity": 2, "unit": "pcs" },
                        { "id": "level", "name": "Level", "category": "Optics", "quantity": 1, "unit": "pcs" }
                    ],
                    "sources": [
                        { "sourceRequestNumber": "REQ-5", "quantity": 1 }
                    ]
                }
            ]
        }]
    }))
    .unwrap()
}

async fn backend() -> Arc<InMemoryBackend> {
    let backend = Arc::new(InMemoryBackend::new());
    backend.set_holdings(holdings()).await;
    backend
}

async fn open(backend: &Arc<InMemoryBackend>, config: ClientConfig) -> ReturnDesk {
    ReturnDesk::open(backend.clone(), Arc::new(config), "eng-1", "wh-1")
        .await
        .unwrap()
}

fn photo() -> PhotoEvidence {
    PhotoEvidence::new("return.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0])
}

fn drill() -> SelectionKey {
    SelectionKey::item("REQ-1", "drill")
}

fn prepare_drill(desk: &mut ReturnDesk) {
    let session = desk.session_mut();
    session.toggle_item(&drill()).unwrap();
    session.set_return_quantity(&drill(), 2).unwrap();
    session.save_line_condition(&drill(), ConditionCounts::all_good(2)).unwrap();
    session.capture_photo(photo()).unwrap();
}

#[tokio::test]
async fn test_return_single_line_and_refetch() {
    let backend = backend().await;
    let mut desk = open(&backend, ClientConfig::default()).await;
    prepare_drill(&mut desk);
    assert_eq!(desk.session().phase(), SessionPhase::PhotoCaptured);

    let outcome = desk.submit().await.unwrap();

    assert!(outcome.refreshed);
    assert_eq!(outcome.payload.items.len(), 1);
    let line = &outcome.payload.items[0];
    assert_eq!(line.item_id, "drill");
    assert_eq!(
        (line.quantity_returned, line.quantity_damaged, line.quantity_lost),
        (2, 0, 0)
    );
    assert_eq!(outcome.payload.photo_url.as_deref(), Some("memory://photos/1/return.jpg"));

    // Fresh session on the refetched holdings
    let session = desk.session();
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert!(session.view().find_item("REQ-1", "drill").is_none());
    assert!(session.view().aggregate_sku("DRL-001").is_none());
    assert_eq!(backend.returns().await.len(), 1);
}

#[tokio::test]
async fn test_aggregated_sku_return() {
    let backend = backend().await;
    let mut desk = open(&backend, ClientConfig::default()).await;

    let session = desk.session_mut();
    let saw = session.view().aggregate_sku("SAW-010").unwrap();
    assert!(saw.is_multi_request());
    assert_eq!(saw.total_available, 4);

    session.select_aggregated(&saw, true).unwrap();
    assert_eq!(session.set_aggregated("SAW-010", 3).unwrap(), 3);
    assert_eq!(session.return_quantity(&SelectionKey::item("REQ-1", "saw")), 1);
    assert_eq!(session.return_quantity(&SelectionKey::item("REQ-2", "saw")), 2);

    session
        .save_group_condition("SAW-010", ConditionCounts::new(2, 0, 1))
        .unwrap();
    session.capture_photo(photo()).unwrap();

    let outcome = desk.submit().await.unwrap();
    let items = &outcome.payload.items;
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| i.item_id == "saw"));
    assert_eq!(items.iter().map(|i| i.quantity_returned).sum::<i64>(), 2);
    assert_eq!(items.iter().map(|i| i.quantity_damaged).sum::<i64>(), 0);
    assert_eq!(items.iter().map(|i| i.quantity_lost).sum::<i64>(), 1);
    assert_eq!(outcome.payload.total_quantity(), 3);

    let saw = desk.session().view().aggregate_sku("SAW-010").unwrap();
    assert_eq!(saw.total_available, 1);
    assert!(!saw.is_multi_request());
}

#[tokio::test]
async fn test_failed_submit_keeps_session_and_uploaded_photo() {
    let backend = backend().await;
    let mut desk = open(&backend, ClientConfig::default()).await;
    prepare_drill(&mut desk);

    backend
        .fail_next(
            Operation::SubmitReturn,
            Fault::Backend {
                status: 500,
                message: "ledger unavailable".into(),
            },
        )
        .await;

    let err = desk.submit().await.unwrap_err();
    assert!(matches!(err, ClientError::Backend { status: 500, .. }));
    assert!(!err.is_retryable());

    let session = desk.session();
    assert!(!session.is_locked());
    assert_eq!(session.phase(), SessionPhase::Allocating);
    assert!(session.is_selected(&drill()));
    assert_eq!(session.return_quantity(&drill()), 2);
    assert!(session.photo().unwrap().is_uploaded());

    // The retry reuses the uploaded photo
    let outcome = desk.submit().await.unwrap();
    assert_eq!(outcome.payload.total_quantity(), 2);
    assert_eq!(backend.calls(Operation::UploadPhoto).await, 1);
    assert_eq!(backend.calls(Operation::SubmitReturn).await, 2);
    assert_eq!(backend.returns().await.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_while_return_in_flight() {
    let backend = backend().await;
    backend.set_delay(Operation::SubmitReturn, Duration::from_secs(10)).await;
    let mut desk = open(&backend, ClientConfig::default()).await;
    prepare_drill(&mut desk);

    let handle = desk.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel();
    });

    let err = desk.submit().await.unwrap_err();
    assert!(matches!(err, ClientError::Cancelled { dispatched: true }));
    assert!(err.may_have_applied());
    assert!(!desk.session().is_locked());
    assert!(desk.session().is_selected(&drill()));
    assert!(backend.returns().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_upload_is_not_dispatched() {
    let backend = backend().await;
    backend.set_delay(Operation::UploadPhoto, Duration::from_secs(10)).await;
    let mut desk = open(&backend, ClientConfig::default()).await;
    prepare_drill(&mut desk);

    let handle = desk.cancel_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.cancel();
    });

    let err = desk.submit().await.unwrap_err();
    assert!(matches!(err, ClientError::Cancelled { dispatched: false }));
    assert!(!err.may_have_applied());
    assert!(!desk.session().photo().unwrap().is_uploaded());
    assert_eq!(backend.calls(Operation::SubmitReturn).await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_submit_times_out() {
    let backend = backend().await;
    backend.set_delay(Operation::SubmitReturn, Duration::from_secs(60)).await;
    let mut config = ClientConfig::default();
    config.backend.request_timeout_secs = 5;
    let mut desk = open(&backend, config).await;
    prepare_drill(&mut desk);

    let err = desk.submit().await.unwrap_err();
    match &err {
        ClientError::Timeout {
            operation,
            secs,
            dispatched,
        } => {
            assert_eq!(operation, "SubmitReturn");
            assert_eq!(*secs, 5);
            assert!(*dispatched);
        }
        other => panic!("expected timeout, got {:?}", other),
    }
    assert!(err.is_retryable());
    assert!(err.may_have_applied());
    assert_eq!(desk.session().phase(), SessionPhase::Allocating);
}

#[tokio::test(start_paused = true)]
async fn test_upload_timeout_did_not_apply() {
    let backend = backend().await;
    backend.set_delay(Operation::UploadPhoto, Duration::from_secs(60)).await;
    let mut config = ClientConfig::default();
    config.backend.request_timeout_secs = 5;
    let mut desk = open(&backend, config).await;
    prepare_drill(&mut desk);

    let err = desk.submit().await.unwrap_err();
    assert!(matches!(
        &err,
        ClientError::Timeout { operation, dispatched: false, .. } if operation == "UploadPhoto"
    ));
    assert!(err.is_retryable());
    assert!(!err.may_have_applied());
    assert_eq!(backend.calls(Operation::SubmitReturn).await, 0);
    assert!(!desk.session().photo().unwrap().is_uploaded());
}

#[tokio::test]
async fn test_photo_policy() {
    let backend = backend().await;
    let mut desk = open(&backend, ClientConfig::default()).await;
    prepare_drill(&mut desk);
    desk.session_mut().clear_photo().unwrap();

    let err = desk.submit().await.unwrap_err();
    assert_eq!(err.validation(), Some(&ValidationError::PhotoRequired));
    assert_eq!(backend.calls(Operation::SubmitReturn).await, 0);

    let mut config = ClientConfig::default();
    config.returns.require_photo = false;
    let mut desk = open(&backend, config).await;
    let session = desk.session_mut();
    session.toggle_item(&drill()).unwrap();
    session.set_return_quantity(&drill(), 1).unwrap();
    session.save_line_condition(&drill(), ConditionCounts::new(0, 1, 0)).unwrap();

    let outcome = desk.submit().await.unwrap();
    assert_eq!(outcome.payload.photo_url, None);
    assert_eq!(outcome.payload.items[0].quantity_damaged, 1);
    assert_eq!(backend.calls(Operation::UploadPhoto).await, 0);
}

#[tokio::test]
async fn test_condition_mismatch_blocks_submit() {
    let backend = backend().await;
    let mut desk = open(&backend, ClientConfig::default()).await;
    let session = desk.session_mut();
    session.toggle_item(&drill()).unwrap();
    session.set_return_quantity(&drill(), 2).unwrap();
    session.capture_photo(photo()).unwrap();

    let err = session
        .save_line_condition(&drill(), ConditionCounts::new(1, 0, 0))
        .unwrap_err();
    assert!(matches!(
        err,
        depot_core::CoreError::Validation(ValidationError::ConditionSumMismatch { expected: 2, actual: 1, .. })
    ));

    let err = desk.submit().await.unwrap_err();
    assert!(matches!(err.validation(), Some(ValidationError::ConditionIncomplete { .. })));
    assert_eq!(backend.calls(Operation::UploadPhoto).await, 0);
}

#[tokio::test]
async fn test_kit_disposition_is_reported_with_return() {
    let backend = backend().await;
    let mut desk = open(&backend, ClientConfig::default()).await;

    let tripod = SelectionKey::kit_sub_item("REQ-5", "survey", "tripod");
    let session = desk.session_mut();
    session.select_all_kit_sub_items("REQ-5", "survey", true).unwrap();
    session.set_return_quantity(&tripod, 1).unwrap();
    session.save_line_condition(&tripod, ConditionCounts::all_good(1)).unwrap();

    let reconciliation = session.compute_missing("REQ-5", "survey").unwrap();
    assert!(reconciliation.is_consistent());
    assert_eq!(reconciliation.shortfalls().len(), 1);

    let record = session
        .dispose_kit("REQ-5", "survey", DispositionChoice::Restock)
        .unwrap();
    match &record.disposition {
        KitDisposition::Restock { missing_items } => {
            assert_eq!(missing_items[0].kit_item_id, "tripod");
            assert_eq!(missing_items[0].missing_quantity, 1);
        }
        other => panic!("expected restock, got {:?}", other),
    }
    let sheet = render_restock_sheet(&record).unwrap();
    assert!(sheet.contains("Survey Kit (KIT-SRV)"));
    assert!(sheet.contains("Tripod"));

    // Kit lines never reach the payload
    let err = desk.submit().await.unwrap_err();
    assert_eq!(err.validation(), Some(&ValidationError::EmptySelection));

    prepare_drill(&mut desk);
    let outcome = desk.submit().await.unwrap();
    assert_eq!(outcome.kit_dispositions.len(), 1);
    assert!(outcome.payload.items.iter().all(|i| i.item_id == "drill"));

    // Dispositions are not applied to holdings
    assert!(desk.session().view().find_item("REQ-5", "survey").is_some());
}

#[tokio::test]
async fn test_kit_disposition_not_reported_twice_after_failed_refresh() {
    let backend = backend().await;
    let mut desk = open(&backend, ClientConfig::default()).await;

    let session = desk.session_mut();
    session.select_all_kit_sub_items("REQ-5", "survey", true).unwrap();
    session
        .dispose_kit("REQ-5", "survey", DispositionChoice::Disassemble)
        .unwrap();
    prepare_drill(&mut desk);

    backend
        .fail_next(
            Operation::Holdings,
            Fault::Backend {
                status: 503,
                message: "holdings unavailable".into(),
            },
        )
        .await;

    let outcome = desk.submit().await.unwrap();
    assert!(!outcome.refreshed);
    assert_eq!(outcome.kit_dispositions.len(), 1);
    assert!(desk.session().kit_dispositions().is_empty());

    // Second return from the stale view: a saw line from another request
    let saw = SelectionKey::item("REQ-2", "saw");
    let session = desk.session_mut();
    session.toggle_item(&saw).unwrap();
    session.set_return_quantity(&saw, 1).unwrap();
    session.save_line_condition(&saw, ConditionCounts::all_good(1)).unwrap();
    session.capture_photo(photo()).unwrap();

    let outcome = desk.submit().await.unwrap();
    assert!(outcome.refreshed);
    assert!(outcome.kit_dispositions.is_empty());
    assert_eq!(backend.returns().await.len(), 2);
}

#[tokio::test]
async fn test_items_sharing_sku_on_one_request_submit_separately() {
    let backend = Arc::new(InMemoryBackend::new());
    backend
        .set_holdings(
            serde_json::from_value(json!({
                "engineer": { "id": "eng-1", "name": "Ana Ruiz" },
                "holdingsByWarehouse": [{
                    "warehouse": { "id": "wh-1", "name": "Main Depot" },
                    "items": [
                        {
                            "itemId": "drill-a",
                            "sku": "DRL-001",
                            "name": "Cordless Drill",
                            "sources": [{ "sourceRequestNumber": "REQ-1", "quantity": 1 }]
                        },
                        {
                            "itemId": "drill-b",
                            "sku": "DRL-001",
                            "name": "Cordless Drill",
                            "sources": [{ "sourceRequestNumber": "REQ-1", "quantity": 2 }]
                        }
                    ]
                }]
            }))
            .unwrap(),
        )
        .await;
    let mut desk = open(&backend, ClientConfig::default()).await;

    let session = desk.session_mut();
    assert_eq!(session.view().requests()[0].items.len(), 2);
    let drills = session.view().aggregate_sku("DRL-001").unwrap();
    assert_eq!(drills.total_available, 3);

    session.select_aggregated(&drills, true).unwrap();
    assert_eq!(session.set_aggregated("DRL-001", 3).unwrap(), 3);
    session
        .save_group_condition("DRL-001", ConditionCounts::all_good(3))
        .unwrap();
    session.capture_photo(photo()).unwrap();

    let outcome = desk.submit().await.unwrap();
    let mut lines: Vec<(&str, i64)> = outcome
        .payload
        .items
        .iter()
        .map(|i| (i.item_id.as_str(), i.quantity_returned))
        .collect();
    lines.sort();
    assert_eq!(lines, vec![("drill-a", 1), ("drill-b", 2)]);

    assert!(outcome.refreshed);
    assert!(desk.session().view().aggregate_sku("DRL-001").is_none());
}
