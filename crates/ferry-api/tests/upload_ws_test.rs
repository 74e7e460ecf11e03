mod helpers;

use base64::{engine::general_purpose::STANDARD, Engine};
use helpers::{api_path, expect_frame, setup_test_app, setup_test_app_with};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

fn chunk(byte: u8, len: usize) -> Vec<u8> {
    vec![byte; len]
}

#[tokio::test]
async fn test_out_of_order_upload_completes_and_is_retrievable() {
    let app = setup_test_app().await;
    let room_id = Uuid::new_v4();
    let uploader_id = Uuid::new_v4();
    let mut feed = app.rooms.subscribe();
    let mut socket = app.connect(room_id, uploader_id).await;

    socket
        .send_json(&json!({
            "type": "begin",
            "fileName": "report.pdf",
            "contentType": "application/pdf",
            "totalSize": 300,
            "totalChunks": 3
        }))
        .await;

    let started = expect_frame(&mut socket, "started").await;
    assert_eq!(started["chunkSize"], 100);
    assert_eq!(started["totalChunks"], 3);
    let upload_id = started["uploadId"].as_str().unwrap().to_string();

    for sequence in [1u8, 0, 2] {
        socket
            .send_json(&json!({
                "type": "chunk",
                "uploadId": upload_id,
                "sequenceNumber": sequence,
                "payload": STANDARD.encode(chunk(b'a' + sequence, 100)),
            }))
            .await;
    }

    let completed = expect_frame(&mut socket, "completed").await;
    assert_eq!(completed["uploadId"], upload_id.as_str());
    assert_eq!(completed["sizeBytes"], 300);
    assert_eq!(completed["contentType"], "application/pdf");
    let public_reference = completed["publicReference"].as_str().unwrap().to_string();
    assert!(completed["url"]
        .as_str()
        .unwrap()
        .ends_with(&format!("/artifacts/{}", public_reference)));

    let mut expected = chunk(b'a', 100);
    expected.extend(chunk(b'b', 100));
    expected.extend(chunk(b'c', 100));

    let response = app
        .client()
        .get(&api_path(&format!("/artifacts/{}", public_reference)))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.header("content-type"), "application/pdf");
    assert_eq!(response.as_bytes().as_ref(), expected.as_slice());

    // The room turns the artifact into a message carrying it.
    let message = tokio::time::timeout(Duration::from_secs(5), feed.recv())
        .await
        .expect("timed out waiting for the room message")
        .unwrap();
    assert_eq!(message.room_id, room_id);
    assert_eq!(
        message.attachment.as_ref().unwrap().public_reference,
        public_reference
    );

    let response = app
        .client()
        .get(&api_path(&format!("/messages/{}/attachment", message.id)))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.as_bytes().as_ref(), expected.as_slice());

    let status = app
        .client()
        .get(&api_path(&format!("/uploads/{}", upload_id)))
        .add_header("x-user-id", uploader_id.to_string())
        .await;
    assert_eq!(status.status_code(), 200);
    let view: serde_json::Value = status.json();
    assert_eq!(view["state"], "completed");
}

#[tokio::test]
async fn test_single_chunk_without_upload_id_opens_session() {
    let app = setup_test_app().await;
    let mut socket = app.connect(Uuid::new_v4(), Uuid::new_v4()).await;

    // Generic content type; the extension decides the category.
    socket
        .send_json(&json!({
            "type": "chunk",
            "sequenceNumber": 0,
            "fileName": "photo.jpg",
            "contentType": "application/octet-stream",
            "totalSize": 10,
            "totalChunks": 1,
            "payload": STANDARD.encode(chunk(0xff, 10)),
        }))
        .await;

    expect_frame(&mut socket, "started").await;
    let completed = expect_frame(&mut socket, "completed").await;
    assert_eq!(completed["contentType"], "image/jpeg");
    assert_eq!(app.state.uploads.catalog.len().await, 1);
}

#[tokio::test]
async fn test_oversized_declaration_rejected() {
    let app = setup_test_app_with(|config| {
        config.uploads.limits.max_artifact_size = 100;
    })
    .await;
    let mut socket = app.connect(Uuid::new_v4(), Uuid::new_v4()).await;

    socket
        .send_json(&json!({
            "type": "begin",
            "fileName": "movie.mp4",
            "contentType": "video/mp4",
            "totalSize": 250,
            "totalChunks": 3
        }))
        .await;

    let failed = expect_frame(&mut socket, "failed").await;
    assert_eq!(failed["errorKind"], "SIZE_EXCEEDED");
    assert!(failed.get("uploadId").is_none());
    assert!(app.state.uploads.store.is_empty().await);
}

#[tokio::test]
async fn test_chunk_for_unknown_upload_rejected() {
    let app = setup_test_app().await;
    let mut socket = app.connect(Uuid::new_v4(), Uuid::new_v4()).await;
    let upload_id = Uuid::new_v4();

    socket
        .send_json(&json!({
            "type": "chunk",
            "uploadId": upload_id,
            "sequenceNumber": 0,
            "payload": STANDARD.encode(b"abc"),
        }))
        .await;

    let failed = expect_frame(&mut socket, "failed").await;
    assert_eq!(failed["errorKind"], "UNKNOWN_OR_CLOSED_SESSION");
    assert_eq!(failed["uploadId"], upload_id.to_string());
}

#[tokio::test]
async fn test_cancel_then_late_chunk_rejected() {
    let app = setup_test_app().await;
    let mut socket = app.connect(Uuid::new_v4(), Uuid::new_v4()).await;

    socket
        .send_json(&json!({
            "type": "begin",
            "fileName": "notes.txt",
            "contentType": "text/plain",
            "totalSize": 4,
            "totalChunks": 2
        }))
        .await;
    let started = expect_frame(&mut socket, "started").await;
    let upload_id = started["uploadId"].as_str().unwrap().to_string();

    socket
        .send_json(&json!({"type": "cancel", "uploadId": upload_id}))
        .await;
    let cancelled = expect_frame(&mut socket, "cancelled").await;
    assert_eq!(cancelled["uploadId"], upload_id.as_str());

    socket
        .send_json(&json!({
            "type": "chunk",
            "uploadId": upload_id,
            "sequenceNumber": 0,
            "payload": STANDARD.encode(b"ab"),
        }))
        .await;
    let failed = expect_frame(&mut socket, "failed").await;
    assert_eq!(failed["errorKind"], "UNKNOWN_OR_CLOSED_SESSION");
}

#[tokio::test]
async fn test_malformed_frame_keeps_connection_open() {
    let app = setup_test_app().await;
    let mut socket = app.connect(Uuid::new_v4(), Uuid::new_v4()).await;

    socket.send_text("{not json").await;
    let failed = expect_frame(&mut socket, "failed").await;
    assert_eq!(failed["errorKind"], "INVALID_CHUNK");

    socket
        .send_json(&json!({"type": "message", "content": "still here"}))
        .await;
    expect_frame(&mut socket, "messageAccepted").await;
}

#[tokio::test]
async fn test_upload_socket_requires_identity() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get(&api_path(&format!("/rooms/{}/uploads/ws", Uuid::new_v4())))
        .expect_failure()
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_resent_chunk_acknowledged_with_progress() {
    let app = setup_test_app().await;
    let mut socket = app.connect(Uuid::new_v4(), Uuid::new_v4()).await;

    socket
        .send_json(&json!({
            "type": "begin",
            "fileName": "notes.txt",
            "contentType": "text/plain",
            "totalSize": 4,
            "totalChunks": 2
        }))
        .await;
    let started = expect_frame(&mut socket, "started").await;
    let upload_id = started["uploadId"].as_str().unwrap().to_string();

    let first = json!({
        "type": "chunk",
        "uploadId": upload_id,
        "sequenceNumber": 0,
        "payload": STANDARD.encode(b"ab"),
    });
    socket.send_json(&first).await;
    let progress = expect_frame(&mut socket, "progress").await;
    assert_eq!(progress["bytesReceived"], 2);

    // Same sequence again, different bytes: acknowledged, not applied.
    socket
        .send_json(&json!({
            "type": "chunk",
            "uploadId": upload_id,
            "sequenceNumber": 0,
            "payload": STANDARD.encode(b"XY"),
        }))
        .await;
    let ack = expect_frame(&mut socket, "progress").await;
    assert_eq!(ack["uploadId"], upload_id.as_str());
    assert_eq!(ack["bytesReceived"], 2);
    assert_eq!(ack["totalSize"], 4);

    socket
        .send_json(&json!({
            "type": "chunk",
            "uploadId": upload_id,
            "sequenceNumber": 1,
            "payload": STANDARD.encode(b"cd"),
        }))
        .await;
    let completed = expect_frame(&mut socket, "completed").await;
    let public_reference = completed["publicReference"].as_str().unwrap().to_string();

    let response = app
        .client()
        .get(&api_path(&format!("/artifacts/{}", public_reference)))
        .await;
    assert_eq!(response.as_bytes().as_ref(), b"abcd");
}

#[tokio::test]
async fn test_open_session_limit_enforced_per_uploader() {
    let app = setup_test_app_with(|config| {
        config.uploads.max_open_sessions_per_uploader = 1;
    })
    .await;
    let uploader_id = Uuid::new_v4();
    let mut socket = app.connect(Uuid::new_v4(), uploader_id).await;

    let begin = json!({
        "type": "begin",
        "fileName": "notes.txt",
        "contentType": "text/plain",
        "totalSize": 4,
        "totalChunks": 2
    });
    socket.send_json(&begin).await;
    let started = expect_frame(&mut socket, "started").await;
    let upload_id = started["uploadId"].as_str().unwrap().to_string();

    socket.send_json(&begin).await;
    let failed = expect_frame(&mut socket, "failed").await;
    assert_eq!(failed["errorKind"], "SIZE_EXCEEDED");
    assert_eq!(app.state.uploads.store.len().await, 1);

    // Another uploader has its own allowance.
    let mut other = app.connect(Uuid::new_v4(), Uuid::new_v4()).await;
    other.send_json(&begin).await;
    expect_frame(&mut other, "started").await;

    socket
        .send_json(&json!({"type": "cancel", "uploadId": upload_id}))
        .await;
    expect_frame(&mut socket, "cancelled").await;
    socket.send_json(&begin).await;
    expect_frame(&mut socket, "started").await;
}

#[tokio::test]
async fn test_chunks_complete_with_single_inflight_slot() {
    let app = setup_test_app_with(|config| {
        config.uploads.max_inflight_chunks = 1;
    })
    .await;
    let mut socket = app.connect(Uuid::new_v4(), Uuid::new_v4()).await;

    socket
        .send_json(&json!({
            "type": "begin",
            "fileName": "clip.mp4",
            "contentType": "video/mp4",
            "totalSize": 40,
            "totalChunks": 4
        }))
        .await;
    let started = expect_frame(&mut socket, "started").await;
    let upload_id = started["uploadId"].as_str().unwrap().to_string();

    for sequence in [3u8, 1, 0, 2] {
        socket
            .send_json(&json!({
                "type": "chunk",
                "uploadId": upload_id,
                "sequenceNumber": sequence,
                "payload": STANDARD.encode(chunk(sequence, 10)),
            }))
            .await;
    }

    let completed = expect_frame(&mut socket, "completed").await;
    assert_eq!(completed["sizeBytes"], 40);
}
