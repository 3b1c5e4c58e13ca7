//! HttpImportTransport against a local axum server

mod helpers;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use coco_import::models::EntityKind;
use coco_import::services::{
    HttpImportTransport, ImportRequest, ImportTransport, ListingClient, ServerPayload,
    SuccessRange, TransportError,
};
use helpers::*;

/// One multipart field as the server saw it
#[derive(Debug, Clone)]
struct Field {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    data: Vec<u8>,
}

#[derive(Clone)]
struct Scripted {
    status: StatusCode,
    body: &'static str,
    seen: Arc<Mutex<Vec<Field>>>,
}

async fn capture(State(state): State<Scripted>, mut multipart: Multipart) -> impl IntoResponse {
    while let Some(field) = multipart.next_field().await.unwrap() {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.unwrap().to_vec();
        state.seen.lock().unwrap().push(Field {
            name,
            file_name,
            content_type,
            data,
        });
    }
    (state.status, state.body)
}

async fn listing() -> impl IntoResponse {
    (
        StatusCode::OK,
        r#"{"count": 12, "results": [{"id": 1}, {"id": 2}]}"#,
    )
}

/// Serve one scripted response on an ephemeral port
async fn spawn_server(status: StatusCode, body: &'static str) -> (String, Arc<Mutex<Vec<Field>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let state = Scripted {
        status,
        body,
        seen: seen.clone(),
    };
    let app = Router::new()
        .route("/api/import/", post(capture))
        .route("/api/organizations/", get(listing))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), seen)
}

fn transport(base: &str, success: SuccessRange) -> HttpImportTransport {
    HttpImportTransport::new(format!("{}/api/import/", base), success, Duration::from_secs(5)).unwrap()
}

fn request(preview: bool) -> ImportRequest {
    ImportRequest {
        entity_kind: EntityKind::Organization,
        primary_file: universities_csv(),
        asset_files: vec![png("mit.png"), png("cmu.png")],
        preview,
    }
}

#[tokio::test]
async fn preview_sends_multipart_fields_and_parses_records() {
    let (base, seen) = spawn_server(
        StatusCode::OK,
        r#"[{"name": "MIT"}, {"name": "CMU"}, {"name": "Rice"}]"#,
    )
    .await;

    let payload = transport(&base, SuccessRange::default())
        .submit(&request(true))
        .await
        .unwrap();

    match payload {
        ServerPayload::Records(rows) => assert_eq!(rows.len(), 3),
        other => panic!("unexpected payload {:?}", other),
    }

    let fields = seen.lock().unwrap().clone();
    let by_name = |name: &str| -> Vec<Field> {
        fields.iter().filter(|f| f.name == name).cloned().collect()
    };

    let file = by_name("file");
    assert_eq!(file.len(), 1);
    assert_eq!(file[0].file_name.as_deref(), Some("universities.csv"));
    assert_eq!(file[0].content_type.as_deref(), Some("text/csv"));
    assert_eq!(file[0].data, universities_csv().bytes());

    let documents = by_name("document_file");
    let names: Vec<_> = documents.iter().map(|f| f.file_name.clone().unwrap()).collect();
    assert_eq!(names, vec!["mit.png", "cmu.png"]);

    assert_eq!(by_name("type")[0].data, b"educational_organizations_app");
    assert_eq!(by_name("preview")[0].data, b"true");
}

#[tokio::test]
async fn commit_sends_preview_false_and_parses_receipt() {
    let (base, seen) = spawn_server(
        StatusCode::OK,
        r#"{"status": 200, "message": "Imported 3 organizations"}"#,
    )
    .await;

    let payload = transport(&base, SuccessRange::default())
        .submit(&request(false))
        .await
        .unwrap();

    match payload {
        ServerPayload::Receipt(receipt) => {
            assert_eq!(receipt.display_message(), Some("Imported 3 organizations"))
        }
        other => panic!("unexpected payload {:?}", other),
    }

    let fields = seen.lock().unwrap().clone();
    let preview = fields.iter().find(|f| f.name == "preview").unwrap();
    assert_eq!(preview.data, b"false");
}

#[tokio::test]
async fn error_status_carries_server_message() {
    let (base, _) = spawn_server(
        StatusCode::BAD_REQUEST,
        r#"{"message": "Row 2: name is required"}"#,
    )
    .await;

    let err = transport(&base, SuccessRange::default())
        .submit(&request(false))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        TransportError::Status {
            status: 400,
            message: Some("Row 2: name is required".to_string())
        }
    );
}

#[tokio::test]
async fn error_status_without_json_has_no_message() {
    let (base, _) = spawn_server(StatusCode::INTERNAL_SERVER_ERROR, "<html>oops</html>").await;

    let err = transport(&base, SuccessRange::default())
        .submit(&request(true))
        .await
        .unwrap_err();

    assert_eq!(err.server_message(), None);
    assert!(matches!(err, TransportError::Status { status: 500, .. }));
}

#[tokio::test]
async fn success_range_is_configurable() {
    let (base, _) = spawn_server(StatusCode::CREATED, r#"{"status": 201, "message": "ok"}"#).await;

    let strict = transport(&base, SuccessRange::new(200, 201));
    assert!(matches!(
        strict.submit(&request(false)).await,
        Err(TransportError::Status { status: 201, .. })
    ));

    let relaxed = transport(&base, SuccessRange::new(200, 300));
    assert!(relaxed.submit(&request(false)).await.is_ok());
}

#[tokio::test]
async fn success_status_with_non_json_body_is_decode_error() {
    let (base, _) = spawn_server(StatusCode::OK, "not json").await;

    let err = transport(&base, SuccessRange::default())
        .submit(&request(true))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Decode(_)));
}

#[tokio::test]
async fn connection_refused_is_network_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = transport(&format!("http://{}", addr), SuccessRange::default())
        .submit(&request(true))
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Network(_)));
}

#[tokio::test]
async fn listing_client_reads_paginated_page() {
    let (base, _) = spawn_server(StatusCode::OK, "[]").await;

    let client = ListingClient::new(
        format!("{}/api/organizations/", base),
        10,
        SuccessRange::default(),
        Duration::from_secs(5),
    )
    .unwrap();

    let page = client.fetch_page(1).await.unwrap();
    assert_eq!(page.count, Some(12));
    assert_eq!(page.results.len(), 2);
}
