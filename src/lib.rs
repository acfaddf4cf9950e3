//! OctoFit Tracker API
//!
//! REST routing for a fitness tracker: five resource collections (users, teams,
//! activities, leaderboard, workouts) with generated CRUD endpoints, plus a root
//! endpoint listing their absolute URLs.

pub mod client;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resources;
pub mod routing;

pub use config::AppConfig;
pub use http::{AppState, HttpServer};
pub use lifecycle::Shutdown;
pub use routing::RouteTable;
