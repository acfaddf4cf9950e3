//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID assigned / propagated)
//!     → root.rs          for `/` and `/api/`
//!     → dispatch handler for everything else (route table → ViewSet)
//!     → error.rs (ApiError → JSON `detail` body)
//!     → Send to client
//! ```

pub mod error;
pub mod request;
pub mod root;
pub mod server;

pub use error::ApiError;
pub use request::{RequestIdExt, UuidRequestId, X_REQUEST_ID};
pub use root::{resolve_base_url, RequestOrigin, SANDBOX_ENV_VAR};
pub use server::{AppState, HttpServer};
