//! Ferry upload core
//!
//! The chunked-upload session protocol: declaration checks, the session store, chunk
//! assembly, artifact finalization and the reaper that bounds abandoned sessions.
//!
//! Nothing in this crate knows about the transport. Callers feed it decoded chunks and
//! receive [`UploadEvent`]s through the [`EventSink`] they registered with the session.

pub mod assembler;
pub mod catalog;
pub mod events;
pub mod finalizer;
pub mod reaper;
pub mod session;
pub mod store;
pub mod validator;

pub use assembler::{AssemblyOutcome, ChunkAssembler};
pub use catalog::ArtifactCatalog;
pub use events::{EventSink, UploadEvent};
pub use finalizer::{ArtifactFinalizer, FinalizeRequest};
pub use reaper::{ReapReport, SessionReaper};
pub use session::UploadSession;
pub use store::{SessionHandle, UploadSessionStore};
pub use validator::{BeginUpload, DeclaredUpload};
