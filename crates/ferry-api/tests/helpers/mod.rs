#![allow(dead_code)]

use axum_test::{TestServer, TestWebSocket};
use ferry_api::identity::USER_ID_HEADER;
use ferry_api::setup::{routes, services};
use ferry_api::{AppState, InMemoryRoomLog};
use ferry_core::constants::API_PREFIX;
use ferry_core::FerryConfig;
use ferry_storage::{LocalStorage, Storage};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use uuid::Uuid;

/// Returns the versioned API path.
/// Usage: `api_path("/artifacts/art_x")` -> `/api/v0/artifacts/art_x`.
pub fn api_path(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

/// Test application backed by a temporary storage root
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub rooms: Arc<InMemoryRoomLog>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    /// Get the HTTP test client
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Open the upload socket of `room_id` as `uploader_id`.
    pub async fn connect(&self, room_id: Uuid, uploader_id: Uuid) -> TestWebSocket {
        self.server
            .get_websocket(&api_path(&format!("/rooms/{}/uploads/ws", room_id)))
            .add_header(USER_ID_HEADER, uploader_id.to_string())
            .await
            .into_websocket()
            .await
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Setup a test application, letting the caller adjust the configuration first.
pub async fn setup_test_app_with(configure: impl FnOnce(&mut FerryConfig)) -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");

    let mut config = FerryConfig::default();
    config.uploads.storage_root = temp_dir.path().to_path_buf();
    config.uploads.limits.max_artifact_size = 1024 * 1024;
    configure(&mut config);

    let storage: Arc<dyn Storage> = Arc::new(
        LocalStorage::new(temp_dir.path())
            .await
            .expect("Failed to create local storage"),
    );
    let rooms = Arc::new(InMemoryRoomLog::new());

    let state = services::initialize_services(&config, storage, rooms.clone());
    let router = routes::setup_routes(&config, state.clone()).expect("Failed to build routes");

    let server = TestServer::builder()
        .http_transport()
        .build(router)
        .expect("Failed to create test server");

    TestApp {
        server,
        state,
        rooms,
        _temp_dir: temp_dir,
    }
}

/// Read frames until one of type `frame_type` arrives, skipping progress frames.
///
/// Panics on any other frame, so an unexpected `failed` shows up in the test output.
pub async fn expect_frame(socket: &mut TestWebSocket, frame_type: &str) -> Value {
    let wait = async {
        loop {
            let frame: Value = socket.receive_json().await;
            if frame["type"] == frame_type {
                return frame;
            }
            if frame["type"] != "progress" {
                panic!("expected a {} frame, got {}", frame_type, frame);
            }
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for a {} frame", frame_type))
}
