use once_cell::sync::Lazy;
use regex::Regex;

/// Hyphenated 8-4-4-4-12 hex, the only broadcast id shape the admin routes accept
static BROADCAST_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("broadcast id pattern is valid")
});

/// What a location points at, as far as the log viewer cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/broadcasts/{id}`, the page a broadcast is published from
    Broadcast(String),
    Other,
}

pub fn is_broadcast_id(candidate: &str) -> bool {
    BROADCAST_ID.is_match(candidate)
}

pub fn broadcast_path(broadcast_id: &str) -> String {
    format!("/broadcasts/{}", broadcast_id)
}

/// True when the CLI target should be treated as a location rather than an id
pub fn looks_like_location(target: &str) -> bool {
    target.starts_with('/') || target.contains("://")
}

/// Resolves a location (path or full URL) to a route.
/// Query strings and fragments are ignored.
pub fn resolve(location: &str) -> Route {
    let mut path = location.trim().split(['?', '#']).next().unwrap_or("");

    if let Some((_, rest)) = path.split_once("://") {
        path = rest.find('/').map(|i| &rest[i..]).unwrap_or("");
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        ["broadcasts", id] if is_broadcast_id(id) => Route::Broadcast((*id).to_string()),
        _ => Route::Other,
    }
}
