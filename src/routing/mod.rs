//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (method, path)
//!     → router.rs (route lookup)
//!     → matcher.rs (collection or detail shape, id capture)
//!     → Return: Matched { registration, action, id } | MethodNotAllowed | NotFound
//!
//! Route Table Construction (at startup):
//!     (prefix, ViewSet, basename)[]
//!     → validate prefix, reject duplicates
//!     → expand into CRUD endpoints
//!     → Freeze as immutable RouteTable
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: same input always matches same route
//! - First match wins (registration order)

pub mod matcher;
pub mod router;

pub use router::{
    Action, Endpoint, Registration, RegistryError, Resolution, RouteTable, RouteTableBuilder,
    FITNESS_RESOURCES,
};
