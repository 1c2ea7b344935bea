//! URL utilities for consistent endpoint handling
//!
//! The server address can arrive from a flag, an environment variable or the
//! config file, in any of the shapes the model server itself accepts
//! (`http://host:port/`, `host:port`, `host`). Everything is funnelled through
//! here before an endpoint path is appended.

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use ollama_tui::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:11434"), "http://localhost:11434");
/// assert_eq!(normalize_base_url("http://localhost:11434///"), "http://localhost:11434");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Turn a user-supplied host into a base URL.
///
/// A host without a scheme gets `http://` prepended, matching how the model
/// server interprets its own `OLLAMA_HOST` variable.
///
/// ```
/// use ollama_tui::utils::url::normalize_host;
///
/// assert_eq!(normalize_host("localhost:11434"), "http://localhost:11434");
/// assert_eq!(normalize_host(" https://gpu-box:11434/ "), "https://gpu-box:11434");
/// ```
pub fn normalize_host(host: &str) -> String {
    let trimmed = host.trim();
    if trimmed.contains("://") {
        normalize_base_url(trimmed)
    } else {
        normalize_base_url(&format!("http://{trimmed}"))
    }
}

/// Construct a complete API endpoint URL from a base URL and endpoint path
///
/// ```
/// use ollama_tui::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:11434/", "/api/chat"),
///     "http://localhost:11434/api/chat"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}
