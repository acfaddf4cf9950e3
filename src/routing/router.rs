//! Route table construction and lookup.
//!
//! # Responsibilities
//! - Register resource handler collections under unique path prefixes
//! - Expand each registration into its CRUD endpoint set
//! - Resolve (method, path) to a registration and action
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Registration errors surface at startup, never at request time
//! - O(n) path scan (n is the number of registered resources)
//! - Explicit NotFound / MethodNotAllowed rather than silent default

use axum::http::Method;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::resources::{MemoryViewSet, ViewSet};
use crate::routing::matcher::{PathMatch, ResourcePathMatcher};

/// The fitness resources served by default, as (prefix, basename) pairs.
pub const FITNESS_RESOURCES: [(&str, &str); 5] = [
    ("users", "user"),
    ("teams", "team"),
    ("activities", "activity"),
    ("leaderboard", "leaderboard"),
    ("workouts", "workout"),
];

/// A CRUD operation on a resource collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Create,
    Retrieve,
    Update,
    PartialUpdate,
    Destroy,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::List,
        Action::Create,
        Action::Retrieve,
        Action::Update,
        Action::PartialUpdate,
        Action::Destroy,
    ];

    const COLLECTION: [Action; 2] = [Action::List, Action::Create];
    const DETAIL: [Action; 4] = [
        Action::Retrieve,
        Action::Update,
        Action::PartialUpdate,
        Action::Destroy,
    ];

    pub fn method(self) -> Method {
        match self {
            Action::List | Action::Retrieve => Method::GET,
            Action::Create => Method::POST,
            Action::Update => Method::PUT,
            Action::PartialUpdate => Method::PATCH,
            Action::Destroy => Method::DELETE,
        }
    }

    /// Whether the action addresses a single record (`/<id>/`).
    pub fn is_detail(self) -> bool {
        !matches!(self, Action::List | Action::Create)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Create => "create",
            Action::Retrieve => "retrieve",
            Action::Update => "update",
            Action::PartialUpdate => "partial_update",
            Action::Destroy => "destroy",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One generated endpoint: an action bound to a method and path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub action: Action,
    pub method: Method,
    pub path: String,
    /// `<basename>-list` or `<basename>-detail`.
    pub name: String,
}

/// Errors raised while building the route table.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("prefix {0:?} is already registered")]
    DuplicatePrefix(String),

    #[error("basename {0:?} is already registered")]
    DuplicateBasename(String),

    #[error("invalid prefix {prefix:?}: {reason}")]
    InvalidPrefix { prefix: String, reason: &'static str },

    #[error("basename must not be empty (prefix {0:?})")]
    EmptyBasename(String),
}

/// A resource handler collection bound to a path prefix.
#[derive(Debug)]
pub struct Registration {
    prefix: String,
    basename: String,
    handler: Arc<dyn ViewSet>,
    matcher: ResourcePathMatcher,
}

impl Registration {
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn basename(&self) -> &str {
        &self.basename
    }

    pub fn handler(&self) -> &Arc<dyn ViewSet> {
        &self.handler
    }

    pub fn collection_path(&self) -> &str {
        self.matcher.collection_path()
    }

    /// The six CRUD endpoints generated for this registration.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        Action::ALL
            .iter()
            .map(|&action| {
                let (path, suffix) = if action.is_detail() {
                    (self.matcher.detail_pattern(), "detail")
                } else {
                    (self.collection_path().to_string(), "list")
                };
                Endpoint {
                    action,
                    method: action.method(),
                    path,
                    name: format!("{}-{}", self.basename, suffix),
                }
            })
            .collect()
    }
}

/// Result of looking a request up in the route table.
#[derive(Debug)]
pub enum Resolution<'a> {
    Matched {
        registration: &'a Registration,
        action: Action,
        id: Option<String>,
    },
    MethodNotAllowed {
        allowed: Vec<Method>,
    },
    NotFound,
}

/// Accumulates registrations, rejecting duplicates and malformed prefixes.
#[derive(Debug)]
pub struct RouteTableBuilder {
    api_prefix: String,
    registrations: Vec<Registration>,
}

impl RouteTableBuilder {
    /// Register `handler` under `prefix`, naming its endpoints after `basename`.
    pub fn register(
        mut self,
        prefix: &str,
        handler: Arc<dyn ViewSet>,
        basename: &str,
    ) -> Result<Self, RegistryError> {
        validate_prefix(prefix)?;
        if basename.is_empty() {
            return Err(RegistryError::EmptyBasename(prefix.to_string()));
        }
        if self.registrations.iter().any(|r| r.prefix == prefix) {
            return Err(RegistryError::DuplicatePrefix(prefix.to_string()));
        }
        if self.registrations.iter().any(|r| r.basename == basename) {
            return Err(RegistryError::DuplicateBasename(basename.to_string()));
        }

        self.registrations.push(Registration {
            prefix: prefix.to_string(),
            basename: basename.to_string(),
            handler,
            matcher: ResourcePathMatcher::new(&self.api_prefix, prefix),
        });
        Ok(self)
    }

    /// Freeze the registrations into an immutable table.
    pub fn build(self) -> RouteTable {
        tracing::info!(
            api_prefix = %self.api_prefix,
            resources = self.registrations.len(),
            "Route table built"
        );
        RouteTable {
            api_prefix: self.api_prefix,
            registrations: self.registrations,
        }
    }
}

fn validate_prefix(prefix: &str) -> Result<(), RegistryError> {
    let reason = if prefix.is_empty() {
        Some("must not be empty")
    } else if prefix.contains('/') {
        Some("must be a single path segment")
    } else if !prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        Some("may only contain ASCII letters, digits, '-' and '_'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(RegistryError::InvalidPrefix {
            prefix: prefix.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}

/// Immutable mapping from path prefix to resource handler collection.
#[derive(Debug)]
pub struct RouteTable {
    api_prefix: String,
    registrations: Vec<Registration>,
}

impl RouteTable {
    /// Start building a table mounted under `api_prefix` (e.g. `/api/`).
    pub fn builder(api_prefix: impl Into<String>) -> RouteTableBuilder {
        RouteTableBuilder {
            api_prefix: api_prefix.into(),
            registrations: Vec::new(),
        }
    }

    /// Register the five fitness resources, creating each handler with `factory`.
    pub fn fitness<F>(api_prefix: impl Into<String>, factory: F) -> Result<Self, RegistryError>
    where
        F: Fn(&str) -> Arc<dyn ViewSet>,
    {
        FITNESS_RESOURCES
            .iter()
            .try_fold(Self::builder(api_prefix), |builder, (prefix, basename)| {
                builder.register(prefix, factory(prefix), basename)
            })
            .map(RouteTableBuilder::build)
    }

    /// The fitness resources backed by in-memory stores.
    pub fn in_memory(api_prefix: impl Into<String>) -> Result<Self, RegistryError> {
        Self::fitness(api_prefix, |name| Arc::new(MemoryViewSet::new(name)))
    }

    pub fn api_prefix(&self) -> &str {
        &self.api_prefix
    }

    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    /// Registered prefixes in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.registrations.iter().map(|r| r.prefix.as_str())
    }

    pub fn get(&self, prefix: &str) -> Option<&Registration> {
        self.registrations.iter().find(|r| r.prefix == prefix)
    }

    /// Collection path for a registered prefix, e.g. `/api/users/`.
    pub fn collection_path(&self, prefix: &str) -> Option<&str> {
        self.get(prefix).map(Registration::collection_path)
    }

    /// Every generated endpoint, grouped by registration.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.registrations
            .iter()
            .flat_map(Registration::endpoints)
            .collect()
    }

    /// Look up the registration and action for a request.
    /// `HEAD` resolves like `GET`.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution<'_> {
        let head = *method == Method::HEAD;

        for registration in &self.registrations {
            let Some(shape) = registration.matcher.match_path(path) else {
                continue;
            };

            let (candidates, id): (&[Action], Option<String>) = match shape {
                PathMatch::Collection => (&Action::COLLECTION[..], None),
                PathMatch::Detail { id } => (&Action::DETAIL[..], Some(id.to_string())),
            };

            let found = candidates
                .iter()
                .find(|a| a.method() == *method || (head && a.method() == Method::GET));
            return match found {
                Some(&action) => Resolution::Matched {
                    registration,
                    action,
                    id,
                },
                None => Resolution::MethodNotAllowed {
                    allowed: allowed_methods(candidates),
                },
            };
        }

        Resolution::NotFound
    }
}

fn allowed_methods(actions: &[Action]) -> Vec<Method> {
    let mut methods: Vec<Method> = actions.iter().map(|a| a.method()).collect();
    if methods.contains(&Method::GET) {
        methods.push(Method::HEAD);
    }
    methods
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RouteTable {
        RouteTable::in_memory("/api/").unwrap()
    }

    #[test]
    fn test_fitness_table_registers_five_resources() {
        let table = table();
        let names: Vec<_> = table.names().collect();
        assert_eq!(
            names,
            vec!["users", "teams", "activities", "leaderboard", "workouts"]
        );
        assert_eq!(table.collection_path("leaderboard"), Some("/api/leaderboard/"));
        assert_eq!(table.collection_path("coaches"), None);
    }

    #[test]
    fn test_endpoint_expansion() {
        let table = table();
        let endpoints = table.endpoints();
        assert_eq!(endpoints.len(), 30);

        let users: Vec<_> = endpoints
            .iter()
            .filter(|e| e.name.starts_with("user-"))
            .map(|e| (e.method.as_str(), e.path.as_str(), e.name.as_str()))
            .collect();
        assert_eq!(
            users,
            vec![
                ("GET", "/api/users/", "user-list"),
                ("POST", "/api/users/", "user-list"),
                ("GET", "/api/users/{id}/", "user-detail"),
                ("PUT", "/api/users/{id}/", "user-detail"),
                ("PATCH", "/api/users/{id}/", "user-detail"),
                ("DELETE", "/api/users/{id}/", "user-detail"),
            ]
        );
    }

    #[test]
    fn test_resolve_every_action_for_every_resource() {
        let table = table();
        for (prefix, _) in FITNESS_RESOURCES {
            for action in Action::ALL {
                let path = if action.is_detail() {
                    format!("/api/{prefix}/7/")
                } else {
                    format!("/api/{prefix}/")
                };
                match table.resolve(&action.method(), &path) {
                    Resolution::Matched {
                        registration,
                        action: resolved,
                        id,
                    } => {
                        assert_eq!(registration.prefix(), prefix);
                        assert_eq!(resolved, action);
                        assert_eq!(id.is_some(), action.is_detail());
                    }
                    other => panic!("{} {} resolved to {:?}", action.method(), path, other),
                }
            }
        }
    }

    #[test]
    fn test_head_resolves_like_get() {
        let table = table();
        assert!(matches!(
            table.resolve(&Method::HEAD, "/api/teams/"),
            Resolution::Matched { action: Action::List, .. }
        ));
    }

    #[test]
    fn test_method_not_allowed_lists_allowed_methods() {
        let table = table();
        match table.resolve(&Method::DELETE, "/api/users/") {
            Resolution::MethodNotAllowed { allowed } => {
                assert_eq!(allowed, vec![Method::GET, Method::POST, Method::HEAD]);
            }
            other => panic!("unexpected {:?}", other),
        }
        match table.resolve(&Method::POST, "/api/users/3/") {
            Resolution::MethodNotAllowed { allowed } => {
                assert!(allowed.contains(&Method::PATCH));
                assert!(!allowed.contains(&Method::POST));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_unknown_paths_not_found() {
        let table = table();
        assert!(matches!(table.resolve(&Method::GET, "/api/coaches/"), Resolution::NotFound));
        assert!(matches!(table.resolve(&Method::GET, "/admin/"), Resolution::NotFound));
        assert!(matches!(table.resolve(&Method::GET, "/api/users"), Resolution::NotFound));
    }

    #[test]
    fn test_duplicate_prefix_fails_at_build() {
        let builder = FITNESS_RESOURCES
            .iter()
            .try_fold(RouteTable::builder("/api/"), |b, (prefix, basename)| {
                b.register(prefix, Arc::new(MemoryViewSet::new(*prefix)), basename)
            })
            .unwrap();

        let err = builder
            .register("users", Arc::new(MemoryViewSet::new("users")), "member")
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicatePrefix(p) if p == "users"));
    }

    #[test]
    fn test_duplicate_basename_rejected() {
        let err = RouteTable::builder("/api/")
            .register("users", Arc::new(MemoryViewSet::new("users")), "user")
            .unwrap()
            .register("members", Arc::new(MemoryViewSet::new("members")), "user")
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateBasename(_)));
    }

    #[test]
    fn test_malformed_prefix_rejected() {
        for prefix in ["", "users/teams", "us ers", "übung"] {
            let err = RouteTable::builder("/api/")
                .register(prefix, Arc::new(MemoryViewSet::new("x")), "x")
                .unwrap_err();
            assert!(
                matches!(err, RegistryError::InvalidPrefix { .. }),
                "{prefix:?} should be rejected"
            );
        }
    }
}
