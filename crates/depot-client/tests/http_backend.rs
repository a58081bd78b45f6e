//! `HttpBackend` against a throwaway axum server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use depot_client::{ClientConfig, ClientError, HttpBackend, InventoryBackend, ReturnDesk};
use depot_core::{ConditionCounts, PhotoEvidence, ReturnLineItem, ReturnPayload, SelectionKey};

const TOKEN: &str = "keeper-token";

#[derive(Default)]
struct Recorded {
    authorization: Vec<Option<String>>,
    warehouse_queries: Vec<String>,
    uploads: Vec<(String, String, usize)>,
    returns: Vec<Value>,
    returned: HashMap<String, i64>,
}

type Shared = Arc<Mutex<Recorded>>;

struct TestServer {
    base_url: String,
    recorded: Shared,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        let recorded = Shared::default();
        let app = Router::new()
            .route("/api/engineers/{engineer_id}/holdings", get(holdings))
            .route("/api/uploads/photos", post(upload))
            .route("/api/inventory/returns", post(submit))
            .with_state(recorded.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            recorded,
            handle,
        }
    }

    fn backend(&self) -> HttpBackend {
        HttpBackend::new(&self.config()).unwrap()
    }

    fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::for_backend(&self.base_url);
        config.backend.api_token = Some(TOKEN.to_string());
        config.retry.initial_backoff_ms = 1;
        config
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn record_auth(state: &Shared, headers: &HeaderMap) {
    let value = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.lock().unwrap().authorization.push(value);
}

async fn holdings(
    State(state): State<Shared>,
    Path(engineer_id): Path<String>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    record_auth(&state, &headers);
    let warehouse_id = query.get("warehouseId").cloned().unwrap_or_default();
    state.lock().unwrap().warehouse_queries.push(warehouse_id.clone());

    match engineer_id.as_str() {
        "eng-404" => (
            StatusCode::NOT_FOUND,
            Json(json!({ "message": "Engineer eng-404 not found" })),
        )
            .into_response(),
        "eng-500" => (StatusCode::INTERNAL_SERVER_ERROR, "upstream exploded").into_response(),
        "eng-bad" => (StatusCode::OK, "{ not json").into_response(),
        _ => {
            let returned = state.lock().unwrap().returned.get("drill").copied().unwrap_or(0);
            let remaining = 2 - returned;
            let items = if remaining > 0 {
                json!([{
                    "itemId": "drill",
                    "sku": "DRL-001",
                    "name": "Cordless Drill",
                    "sources": [{ "sourceRequestNumber": "REQ-1", "quantity": remaining }]
                }])
            } else {
                json!([])
            };
            Json(json!({
                "engineer": { "id": engineer_id, "name": "Ana Ruiz" },
                "holdingsByWarehouse": [{
                    "warehouse": { "id": warehouse_id, "name": "Main Depot" },
                    "items": items
                }]
            }))
            .into_response()
        }
    }
}

async fn upload(State(state): State<Shared>, headers: HeaderMap, mut multipart: Multipart) -> Response {
    record_auth(&state, &headers);

    while let Some(field) = multipart.next_field().await.unwrap() {
        if field.name() != Some("photo") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let size = field.bytes().await.unwrap().len();

        state
            .lock()
            .unwrap()
            .uploads
            .push((file_name.clone(), content_type, size));
        return Json(json!({ "photoUrl": format!("https://cdn.test/photos/{}", file_name) })).into_response();
    }

    (StatusCode::BAD_REQUEST, Json(json!({ "error": "photo field missing" }))).into_response()
}

async fn submit(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    record_auth(&state, &headers);

    if body["warehouseId"] == "wh-closed" {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "", "error": "Warehouse wh-closed is closed" })),
        )
            .into_response();
    }

    let mut recorded = state.lock().unwrap();
    if let Some(items) = body["items"].as_array() {
        for item in items {
            let item_id = item["itemId"].as_str().unwrap_or_default().to_string();
            let total = ["quantityReturned", "quantityDamaged", "quantityLost"]
                .iter()
                .map(|f| item[*f].as_i64().unwrap_or(0))
                .sum::<i64>();
            *recorded.returned.entry(item_id).or_default() += total;
        }
    }
    recorded.returns.push(body);
    StatusCode::CREATED.into_response()
}

fn payload(warehouse_id: &str) -> ReturnPayload {
    ReturnPayload {
        engineer_id: "eng-1".to_string(),
        warehouse_id: warehouse_id.to_string(),
        items: vec![ReturnLineItem {
            item_id: "drill".to_string(),
            quantity_returned: 1,
            quantity_damaged: 1,
            quantity_lost: 0,
            notes: "chuck loose".to_string(),
        }],
        general_notes: String::new(),
        photo_url: None,
    }
}

#[tokio::test]
async fn test_fetch_holdings_sends_token_and_query() {
    let server = TestServer::spawn().await;
    let holdings = server.backend().engineer_holdings("eng-1", "wh-1").await.unwrap();

    assert_eq!(holdings.engineer.name, "Ana Ruiz");
    assert_eq!(holdings.holdings_by_warehouse[0].items[0].sku, "DRL-001");

    let recorded = server.recorded.lock().unwrap();
    assert_eq!(recorded.warehouse_queries, vec!["wh-1".to_string()]);
    assert_eq!(
        recorded.authorization,
        vec![Some(format!("Bearer {}", TOKEN))]
    );
}

#[tokio::test]
async fn test_backend_error_messages() {
    let server = TestServer::spawn().await;
    let backend = server.backend();

    match backend.engineer_holdings("eng-404", "wh-1").await.unwrap_err() {
        ClientError::Backend { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Engineer eng-404 not found");
        }
        other => panic!("expected backend error, got {:?}", other),
    }

    match backend.engineer_holdings("eng-500", "wh-1").await.unwrap_err() {
        ClientError::Backend { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "upstream exploded");
        }
        other => panic!("expected backend error, got {:?}", other),
    }

    match backend.submit_return(&payload("wh-closed")).await.unwrap_err() {
        ClientError::Backend { status, message } => {
            assert_eq!(status, 409);
            assert_eq!(message, "Warehouse wh-closed is closed");
        }
        other => panic!("expected backend error, got {:?}", other),
    }

    let err = backend.engineer_holdings("eng-bad", "wh-1").await.unwrap_err();
    assert!(matches!(err, ClientError::Decode(_)));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_unreachable_backend_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let backend = HttpBackend::new(&ClientConfig::for_backend(format!("http://{}", addr))).unwrap();
    let err = backend.engineer_holdings("eng-1", "wh-1").await.unwrap_err();
    assert!(matches!(err, ClientError::Network { dispatched: false, .. }));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_upload_and_submit_wire_format() {
    let server = TestServer::spawn().await;
    let backend = server.backend();

    let url = backend
        .upload_photo(&PhotoEvidence::new("dock.png", "image/png", vec![0x89, 0x50, 0x4E, 0x47]))
        .await
        .unwrap();
    assert_eq!(url, "https://cdn.test/photos/dock.png");

    backend.submit_return(&payload("wh-1")).await.unwrap();

    let recorded = server.recorded.lock().unwrap();
    assert_eq!(
        recorded.uploads,
        vec![("dock.png".to_string(), "image/png".to_string(), 4)]
    );
    assert_eq!(
        recorded.returns[0],
        json!({
            "engineerId": "eng-1",
            "warehouseId": "wh-1",
            "items": [{
                "itemId": "drill",
                "quantityReturned": 1,
                "quantityDamaged": 1,
                "quantityLost": 0,
                "notes": "chuck loose"
            }],
            "generalNotes": "",
            "photoUrl": null
        })
    );
}

#[tokio::test]
async fn test_desk_over_http() {
    let server = TestServer::spawn().await;
    let backend = Arc::new(server.backend());
    let mut desk = ReturnDesk::open(backend, Arc::new(server.config()), "eng-1", "wh-1")
        .await
        .unwrap();

    let key = SelectionKey::item("REQ-1", "drill");
    let session = desk.session_mut();
    session.toggle_item(&key).unwrap();
    session.set_return_quantity(&key, 2).unwrap();
    session.save_line_condition(&key, ConditionCounts::new(1, 0, 1)).unwrap();
    session.set_item_notes(&key, "one lost on site").unwrap();
    session.set_general_notes("end of project").unwrap();
    session
        .capture_photo(PhotoEvidence::new("return.jpg", "image/jpeg", vec![0xFF, 0xD8]))
        .unwrap();

    let outcome = desk.submit().await.unwrap();
    assert!(outcome.refreshed);
    assert!(desk.session().view().is_empty());

    let recorded = server.recorded.lock().unwrap();
    let body = &recorded.returns[0];
    assert_eq!(body["photoUrl"], "https://cdn.test/photos/return.jpg");
    assert_eq!(body["generalNotes"], "end of project");
    assert_eq!(body["items"][0]["quantityReturned"], 1);
    assert_eq!(body["items"][0]["quantityLost"], 1);
    assert_eq!(body["items"][0]["notes"], "one lost on site");
    assert!(recorded
        .authorization
        .iter()
        .all(|a| a.as_deref() == Some("Bearer keeper-token")));
}
