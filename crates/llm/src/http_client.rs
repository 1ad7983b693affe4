//! HTTP Client Factory
//!
//! Builds reqwest clients with optional proxy support.

use crate::types::{LlmError, LlmResult};

/// Build a `reqwest::Client` with the given proxy URL.
///
/// - `Some(url)` -> route all traffic through the proxy
/// - `None` -> explicitly disable proxy (`no_proxy`), ignoring env vars
pub fn build_http_client(proxy: Option<&str>) -> LlmResult<reqwest::Client> {
    let mut builder = reqwest::Client::builder();
    match proxy {
        Some(url) => {
            let p = reqwest::Proxy::all(url).map_err(|e| LlmError::InvalidRequest {
                message: format!("Invalid proxy URL '{}': {}", url, e),
            })?;
            builder = builder.proxy(p);
        }
        None => {
            builder = builder.no_proxy();
        }
    }
    builder.build().map_err(|e| LlmError::NetworkError {
        message: format!("Failed to build HTTP client: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_http_client_no_proxy() {
        assert!(build_http_client(None).is_ok());
    }

    #[test]
    fn test_build_http_client_with_proxy() {
        assert!(build_http_client(Some("http://127.0.0.1:8080")).is_ok());
    }

    #[test]
    fn test_build_http_client_rejects_bad_proxy() {
        let err = build_http_client(Some("not a url")).unwrap_err();
        assert!(matches!(err, LlmError::InvalidRequest { .. }));
    }
}
