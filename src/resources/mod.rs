//! Resource handler collections.
//!
//! # Data Flow
//! ```text
//! Resolved route (registration, action, id)
//!     → ViewSet method for that action
//!     → Record(s) or ApiError
//!     → serialized by the HTTP layer
//! ```
//!
//! # Design Decisions
//! - One `ViewSet` per registered resource, shared via Arc
//! - Handlers speak JSON values; schema belongs to the implementation
//! - `MemoryViewSet` is the default backing store; real persistence plugs in
//!   by implementing the trait

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::http::error::ApiError;

pub use memory::MemoryViewSet;

/// A single serialized resource record.
pub type Record = Value;

/// The CRUD operations a registered resource must answer.
///
/// `id` is the raw path segment; implementations decide how to parse it and
/// return [`ApiError::NotFound`] when it names nothing.
#[async_trait]
pub trait ViewSet: Send + Sync + std::fmt::Debug {
    async fn list(&self) -> Result<Vec<Record>, ApiError>;

    async fn create(&self, body: Value) -> Result<Record, ApiError>;

    async fn retrieve(&self, id: &str) -> Result<Record, ApiError>;

    /// Replace every field of the record.
    async fn update(&self, id: &str, body: Value) -> Result<Record, ApiError>;

    /// Overwrite only the fields present in `body`.
    async fn partial_update(&self, id: &str, body: Value) -> Result<Record, ApiError>;

    async fn destroy(&self, id: &str) -> Result<(), ApiError>;
}
