//! API endpoint URL builders
//!
//! Helper functions to construct request paths and absolute URLs.

/// Join the configured base URL with a request path
pub fn join_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if path.starts_with('/') {
        format!("{}{}", base, path)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Build the path for one page of an endpoint
///
/// Existing query parameters on `endpoint` are preserved.
pub fn page_path(endpoint: &str, limit_param: &str, skip_param: &str, limit: u32, skip: u64) -> String {
    let separator = if endpoint.contains('?') { '&' } else { '?' };
    format!(
        "{}{}{}={}&{}={}",
        endpoint,
        separator,
        urlencoding::encode(limit_param),
        limit,
        urlencoding::encode(skip_param),
        skip
    )
}
