use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use crate::api::{ModelInfo, TagsResponse};
use crate::utils::url::construct_api_url;

const UNKNOWN: &str = "unknown";

/// A model installed on the server, as shown in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDescriptor {
    pub name: String,
    pub size_bytes: u64,
    pub family: String,
    pub format: String,
}

impl ModelDescriptor {
    fn from_info(info: ModelInfo) -> Option<Self> {
        let name = info
            .model
            .or(info.name)
            .filter(|name| !name.trim().is_empty())?;
        let details = info.details.unwrap_or_default();
        Some(Self {
            name,
            size_bytes: info.size,
            family: details.family.unwrap_or_else(|| UNKNOWN.to_string()),
            format: details.format.unwrap_or_else(|| UNKNOWN.to_string()),
        })
    }

    /// Size in decimal gigabytes, two places.
    pub fn size_gb(&self) -> String {
        format!("{:.2}", self.size_bytes as f64 / 1e9)
    }
}

/// Failure modes of the catalog query.
///
/// `Unreachable` is kept apart from every other failure so callers can tell
/// "server not running" from "server answered but something went wrong". An
/// empty catalog is not an error at all.
#[derive(Debug)]
pub enum CatalogError {
    /// Connection refused, DNS failure, or no answer within the timeout.
    Unreachable { host: String, source: reqwest::Error },
    /// Non-success status, undecodable body or any other transport failure.
    Protocol(String),
}

impl fmt::Display for CatalogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CatalogError::Unreachable { host, .. } => write!(
                f,
                "Could not connect to Ollama server at {host}. Is it running?"
            ),
            CatalogError::Protocol(message) => write!(f, "{message}"),
        }
    }
}

impl StdError for CatalogError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            CatalogError::Unreachable { source, .. } => Some(source),
            CatalogError::Protocol(_) => None,
        }
    }
}

fn classify_transport_error(base_url: &str, error: reqwest::Error) -> CatalogError {
    if error.is_connect() || error.is_timeout() {
        CatalogError::Unreachable {
            host: base_url.to_string(),
            source: error,
        }
    } else {
        CatalogError::Protocol(format!("Request to {base_url} failed: {error}"))
    }
}

pub fn parse_tags_response(body: &str) -> Result<Vec<ModelDescriptor>, CatalogError> {
    let tags: TagsResponse = serde_json::from_str(body)
        .map_err(|e| CatalogError::Protocol(format!("Unexpected model list response: {e}")))?;
    Ok(tags
        .models
        .into_iter()
        .filter_map(ModelDescriptor::from_info)
        .collect())
}

/// Query the server for its installed models.
///
/// Returns an empty vector when the server is up but has nothing pulled.
/// `timeout` bounds the whole request, body included.
pub async fn fetch_models(
    client: &reqwest::Client,
    base_url: &str,
    timeout: Duration,
) -> Result<Vec<ModelDescriptor>, CatalogError> {
    let tags_url = construct_api_url(base_url, "api/tags");
    let response = client
        .get(tags_url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| classify_transport_error(base_url, e))?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(CatalogError::Protocol(format!(
            "Model list request failed with status {status}: {}",
            error_text.trim()
        )));
    }

    let body = response
        .text()
        .await
        .map_err(|e| classify_transport_error(base_url, e))?;
    parse_tags_response(&body)
}
