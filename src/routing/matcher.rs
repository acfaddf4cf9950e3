//! Resource path matching.
//!
//! # Responsibilities
//! - Match the collection path (`/api/<prefix>/`)
//! - Match the detail path (`/api/<prefix>/<id>/`) and capture the id
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - Trailing slash is required on both shapes
//! - An id is one non-empty segment containing neither `/` nor `.`
//! - No regex to guarantee O(n) matching

/// Which URL shape of a resource a path hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathMatch<'a> {
    /// `/api/<prefix>/`
    Collection,
    /// `/api/<prefix>/<id>/`
    Detail { id: &'a str },
}

/// Matches request paths against one registered resource.
#[derive(Debug, Clone)]
pub struct ResourcePathMatcher {
    collection: String,
}

impl ResourcePathMatcher {
    /// Create a matcher for `prefix` mounted under `api_prefix`.
    /// `api_prefix` must start and end with `/`.
    pub fn new(api_prefix: &str, prefix: &str) -> Self {
        Self {
            collection: format!("{api_prefix}{prefix}/"),
        }
    }

    /// The collection path, e.g. `/api/users/`.
    pub fn collection_path(&self) -> &str {
        &self.collection
    }

    /// The detail path pattern, e.g. `/api/users/{id}/`.
    pub fn detail_pattern(&self) -> String {
        format!("{}{{id}}/", self.collection)
    }

    /// Match `path`, returning the shape it hit.
    pub fn match_path<'a>(&self, path: &'a str) -> Option<PathMatch<'a>> {
        let rest = path.strip_prefix(self.collection.as_str())?;
        if rest.is_empty() {
            return Some(PathMatch::Collection);
        }

        let id = rest.strip_suffix('/')?;
        if is_lookup_segment(id) {
            Some(PathMatch::Detail { id })
        } else {
            None
        }
    }
}

fn is_lookup_segment(segment: &str) -> bool {
    !segment.is_empty() && !segment.contains(['/', '.'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collection_match() {
        let matcher = ResourcePathMatcher::new("/api/", "users");
        assert_eq!(matcher.collection_path(), "/api/users/");
        assert_eq!(matcher.match_path("/api/users/"), Some(PathMatch::Collection));
        assert_eq!(matcher.match_path("/api/users"), None);
        assert_eq!(matcher.match_path("/API/users/"), None); // Case sensitive
    }

    #[test]
    fn test_detail_match_captures_id() {
        let matcher = ResourcePathMatcher::new("/api/", "teams");
        assert_eq!(
            matcher.match_path("/api/teams/42/"),
            Some(PathMatch::Detail { id: "42" })
        );
        assert_eq!(
            matcher.match_path("/api/teams/blue-team/"),
            Some(PathMatch::Detail { id: "blue-team" })
        );
        assert_eq!(matcher.detail_pattern(), "/api/teams/{id}/");
    }

    #[test]
    fn test_rejects_bad_id_segments() {
        let matcher = ResourcePathMatcher::new("/api/", "workouts");
        assert_eq!(matcher.match_path("/api/workouts/42"), None);
        assert_eq!(matcher.match_path("/api/workouts/1/2/"), None);
        assert_eq!(matcher.match_path("/api/workouts/1.json/"), None);
        assert_eq!(matcher.match_path("/api/workouts//"), None);
    }

    #[test]
    fn test_prefix_is_not_a_substring_match() {
        let matcher = ResourcePathMatcher::new("/api/", "user");
        assert_eq!(matcher.match_path("/api/users/"), None);
    }
}
