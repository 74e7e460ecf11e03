mod helpers;

use ferry_api::identity::USER_ID_HEADER;
use helpers::{api_path, expect_frame, setup_test_app};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_health_check() {
    let app = setup_test_app().await;

    let response = app.client().get("/health").await;
    assert_eq!(response.status_code(), 200);

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "healthy");
}

#[tokio::test]
async fn test_unknown_artifact_returns_not_found() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get(&api_path("/artifacts/art_00000000000000000000000000000000"))
        .expect_failure()
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_upload_status_hidden_from_other_uploaders() {
    let app = setup_test_app().await;
    let owner = Uuid::new_v4();
    let mut socket = app.connect(Uuid::new_v4(), owner).await;

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
    let status_path = api_path(&format!("/uploads/{}", upload_id));

    let response = app
        .client()
        .get(&status_path)
        .add_header(USER_ID_HEADER, Uuid::new_v4().to_string())
        .expect_failure()
        .await;
    assert_eq!(response.status_code(), 404);

    let response = app
        .client()
        .get(&status_path)
        .add_header(USER_ID_HEADER, owner.to_string())
        .await;
    assert_eq!(response.status_code(), 200);
    let body: serde_json::Value = response.json();
    assert_eq!(body["uploadId"], upload_id.as_str());
    assert_eq!(body["state"], "open");
    assert_eq!(body["bytesReceived"], 0);

    let response = app.client().get(&status_path).expect_failure().await;
    assert_eq!(response.status_code(), 401);
}
