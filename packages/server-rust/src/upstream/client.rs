//! reqwest-backed [`Upstream`] implementation.

use async_trait::async_trait;
use postman_mcp_core::UpstreamError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde_json::Value;

use super::config::UpstreamConfig;
use super::request::UpstreamRequest;
use crate::traits::Upstream;

const API_KEY_HEADER: &str = "x-api-key";
const JSON: &str = "application/json";

/// Shared HTTP client configured once with credentials and base address.
///
/// Every failure is classified into [`UpstreamError`] here; callers never
/// inspect status codes.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
}

impl HttpUpstream {
    /// # Errors
    ///
    /// Returns [`UpstreamError::RequestSetup`] if the API key is not a valid
    /// header value or the TLS backend fails to initialize.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let mut api_key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| UpstreamError::RequestSetup {
                message: "API key contains characters not allowed in a header".to_string(),
            })?;
        api_key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(API_KEY_HEADER), api_key);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
        headers.insert(ACCEPT, HeaderValue::from_static(JSON));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| UpstreamError::RequestSetup {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn call(&self, request: UpstreamRequest) -> Result<Value, UpstreamError> {
        let UpstreamRequest {
            method,
            path,
            query,
            body,
            accept,
        } = request;

        let mut builder = self.client.request(method.clone(), self.url(&path));
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(body) = &body {
            builder = builder.json(body);
        }
        if let Some(accept) = accept {
            builder = builder.header(ACCEPT, accept);
        }

        tracing::debug!(%method, %path, "upstream request");

        let response = builder.send().await.map_err(|e| {
            let err = if e.is_builder() {
                UpstreamError::RequestSetup {
                    message: e.to_string(),
                }
            } else {
                UpstreamError::NoResponse {
                    message: e.to_string(),
                }
            };
            tracing::warn!(%method, %path, error = %err, "upstream call failed");
            err
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| UpstreamError::NoResponse {
                message: format!("failed to read response body: {e}"),
            })?;

        if !status.is_success() {
            let err = UpstreamError::from_status(status.as_u16(), &text);
            tracing::warn!(
                %method,
                %path,
                status = status.as_u16(),
                error = %err,
                "upstream rejected call"
            );
            return Err(err);
        }

        Ok(decode_body(text))
    }
}

/// Empty body is `null`; JSON is parsed; anything else is kept as a string.
fn decode_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::extract::{Path, RawQuery};
    use axum::http::{HeaderMap as AxumHeaders, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;

    use super::*;

    async fn spawn_upstream() -> String {
        async fn echo(
            headers: AxumHeaders,
            RawQuery(query): RawQuery,
            body: String,
        ) -> Json<Value> {
            let header = |name: &str| {
                headers
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            Json(json!({
                "apiKey": header("x-api-key"),
                "accept": header("accept"),
                "contentType": header("content-type"),
                "query": query,
                "body": serde_json::from_str::<Value>(&body).ok(),
            }))
        }

        async fn status(Path(code): Path<u16>) -> (StatusCode, Json<Value>) {
            let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                Json(json!({
                    "error": { "name": "testError", "message": format!("failed with {code}") }
                })),
            )
        }

        async fn html_error() -> (StatusCode, &'static str) {
            (StatusCode::BAD_GATEWAY, "<html>bad gateway</html>")
        }

        async fn slow() -> &'static str {
            tokio::time::sleep(Duration::from_millis(500)).await;
            "late"
        }

        let app = Router::new()
            .route("/echo", get(echo).post(echo).put(echo))
            .route("/status/{code}", get(status))
            .route("/empty", get(|| async { StatusCode::NO_CONTENT }))
            .route("/text", get(|| async { "plain words" }))
            .route("/html-error", get(html_error))
            .route("/slow", get(slow));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base_url: &str) -> HttpUpstream {
        HttpUpstream::new(&UpstreamConfig::new("PMAK-test").with_base_url(base_url)).unwrap()
    }

    #[tokio::test]
    async fn attaches_credentials_and_default_headers() {
        let upstream = client(&spawn_upstream().await);
        let value = upstream
            .call(UpstreamRequest::get("/echo").query("workspace", "ws 1"))
            .await
            .unwrap();
        assert_eq!(value["apiKey"], "PMAK-test");
        assert_eq!(value["accept"], "application/json");
        assert_eq!(value["contentType"], "application/json");
        assert_eq!(value["query"], "workspace=ws+1");
    }

    #[tokio::test]
    async fn per_call_accept_overrides_default_and_body_is_sent() {
        let base = spawn_upstream().await;
        let upstream = client(&format!("{base}/"));
        let value = upstream
            .call(
                UpstreamRequest::post("/echo")
                    .json(json!({ "name": "x" }))
                    .accept("application/vnd.api.v10+json"),
            )
            .await
            .unwrap();
        assert_eq!(value["accept"], "application/vnd.api.v10+json");
        assert_eq!(value["body"], json!({ "name": "x" }));
    }

    #[tokio::test]
    async fn classifies_error_statuses_with_body_message() {
        let upstream = client(&spawn_upstream().await);
        let err = upstream
            .call(UpstreamRequest::get("/status/404"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            UpstreamError::NotFound {
                message: "failed with 404".to_string()
            }
        );

        let err = upstream
            .call(UpstreamRequest::get("/status/429"))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::RateLimited { .. }));

        let err = upstream
            .call(UpstreamRequest::get("/status/422"))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::BadRequest { status: 422, .. }));

        let err = upstream
            .call(UpstreamRequest::get("/html-error"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Upstream error (502): Bad Gateway");
    }

    #[tokio::test]
    async fn decodes_empty_and_text_bodies() {
        let upstream = client(&spawn_upstream().await);
        assert_eq!(
            upstream.call(UpstreamRequest::get("/empty")).await.unwrap(),
            Value::Null
        );
        assert_eq!(
            upstream.call(UpstreamRequest::get("/text")).await.unwrap(),
            Value::String("plain words".to_string())
        );
    }

    #[tokio::test]
    async fn timeout_is_no_response() {
        let base = spawn_upstream().await;
        let config = UpstreamConfig::new("PMAK-test")
            .with_base_url(base)
            .with_request_timeout(Duration::from_millis(50));
        let upstream = HttpUpstream::new(&config).unwrap();
        let err = upstream
            .call(UpstreamRequest::get("/slow"))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::NoResponse { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn malformed_base_url_is_request_setup() {
        let upstream = client("not a url");
        let err = upstream
            .call(UpstreamRequest::get("/me"))
            .await
            .unwrap_err();
        assert!(matches!(err, UpstreamError::RequestSetup { .. }), "{err:?}");
    }

    #[test]
    fn invalid_api_key_is_rejected_at_construction() {
        let err = HttpUpstream::new(&UpstreamConfig::new("bad\nkey")).unwrap_err();
        assert!(matches!(err, UpstreamError::RequestSetup { .. }));
    }
}
