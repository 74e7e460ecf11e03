//! Ferry API Library
//!
//! HTTP and WebSocket surface of the upload service: the upload gateway, artifact
//! retrieval handlers, the room collaborator boundary and application setup.

pub mod error;
pub mod gateway;
pub mod handlers;
pub mod identity;
pub mod rooms;
pub mod setup;
pub mod state;
pub mod telemetry;

// Re-exports
pub use error::{ErrorResponse, HttpAppError};
pub use rooms::{InMemoryRoomLog, RoomNotifier};
pub use state::AppState;
