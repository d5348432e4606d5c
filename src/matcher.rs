/// Decide whether a stored pattern answers a request path.
///
/// Patterns are literal paths: no wildcards, no parameter segments. The
/// request path must already have its query string stripped.
pub fn matches(stored_pattern: &str, request_path: &str) -> bool {
    stored_pattern == request_path
}
