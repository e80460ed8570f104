//! WeatherAPI.com current-conditions client.
//!
//! See: https://www.weatherapi.com/docs/

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

use crate::config::WeatherApiConfig;

/// Max characters of an upstream error body carried into an error message.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Raw JSON body returned by the provider.
///
/// Passed through untouched; only `services::metrics::project` looks inside.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct WeatherPayload(Value);

impl WeatherPayload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    pub fn into_value(self) -> Value {
        self.0
    }
}

/// Why a weather fetch failed. `Display` is the message shown to the user.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("weather request failed: {0}")]
    Request(String),

    #[error("weather provider returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("weather response was not valid JSON: {0}")]
    Decode(String),
}

/// The `{"error": "<message>"}` mapping shown in place of a payload.
pub fn error_result(message: &str) -> Value {
    serde_json::json!({ "error": message })
}

/// Source of current weather for a free-text location.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch(&self, location: &str) -> Result<WeatherPayload, FetchError>;
}

/// Client for the WeatherAPI.com `current.json` endpoint.
#[derive(Debug, Clone)]
pub struct WeatherApiClient {
    client: reqwest::Client,
    config: WeatherApiConfig,
}

impl WeatherApiClient {
    pub fn new(client: reqwest::Client, config: WeatherApiConfig) -> Self {
        Self { client, config }
    }

    /// Fetch current conditions for `location`.
    ///
    /// The provider does its own fuzzy matching, so the location is sent as-is.
    pub async fn fetch_current(&self, location: &str) -> Result<WeatherPayload, FetchError> {
        let url = format!("{}/current.json", self.config.base_url.trim_end_matches('/'));
        let api_key = self.config.api_key.as_deref().unwrap_or_default();

        let response = self
            .client
            .get(&url)
            .query(&[("q", location), ("key", api_key)])
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| FetchError::Request(describe_reqwest_error(e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| FetchError::Request(describe_reqwest_error(e)))?;

        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                message: provider_error_message(&body)
                    .unwrap_or_else(|| fallback_status_message(status, &body)),
            });
        }

        let value: Value =
            serde_json::from_str(&body).map_err(|e| FetchError::Decode(e.to_string()))?;

        Ok(WeatherPayload::new(value))
    }
}

#[async_trait]
impl WeatherSource for WeatherApiClient {
    async fn fetch(&self, location: &str) -> Result<WeatherPayload, FetchError> {
        tracing::debug!("Fetching current weather for '{}'", location);
        self.fetch_current(location).await
    }
}

/// WeatherAPI.com wraps failures as `{"error": {"code": 1006, "message": "..."}}`.
fn provider_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(|s| s.to_string())
}

fn fallback_status_message(status: reqwest::StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string();
    }
    truncate_error_body(body)
}

/// Trim an upstream error body to `MAX_ERROR_BODY_CHARS`, marking the cut.
pub(crate) fn truncate_error_body(body: &str) -> String {
    let body = body.trim();
    if body.chars().count() > MAX_ERROR_BODY_CHARS {
        let truncated: String = body.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}...", truncated)
    } else {
        body.to_string()
    }
}

// reqwest errors embed the full URL, which includes the API key.
fn describe_reqwest_error(err: reqwest::Error) -> String {
    let kind = if err.is_timeout() {
        "timed out"
    } else if err.is_connect() {
        "connection failed"
    } else if err.is_body() || err.is_decode() {
        "could not read response body"
    } else {
        "request error"
    };
    format!("{}: {}", kind, err.without_url())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, timeout: Duration) -> WeatherApiClient {
        WeatherApiClient::new(
            reqwest::Client::new(),
            WeatherApiConfig {
                api_key: Some("test-key".to_string()),
                base_url: server.uri(),
                timeout,
            },
        )
    }

    #[tokio::test]
    async fn test_fetch_current_success() {
        let server = MockServer::start().await;
        let body = json!({
            "location": {"name": "Lahore", "country": "Pakistan"},
            "current": {"temp_c": 30, "condition": {"text": "Sunny"}}
        });

        Mock::given(method("GET"))
            .and(path("/current.json"))
            .and(query_param("q", "Lahore"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let payload = client.fetch("Lahore").await.unwrap();
        assert_eq!(payload.as_value(), &body);
    }

    #[tokio::test]
    async fn test_fetch_current_passes_free_text_location() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/current.json"))
            .and(query_param("q", "New York, NY"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"location": {}})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        assert!(client.fetch("New York, NY").await.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_current_provider_error_message() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/current.json"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": 1006, "message": "No matching location found."}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client.fetch("Atlantis").await.unwrap_err();

        match &err {
            FetchError::Status { status, message } => {
                assert_eq!(*status, 400);
                assert_eq!(message, "No matching location found.");
            }
            other => panic!("expected Status error, got {:?}", other),
        }
        assert_eq!(
            error_result(&err.to_string()),
            json!({"error": "weather provider returned HTTP 400: No matching location found."})
        );
    }

    #[tokio::test]
    async fn test_fetch_current_server_error_without_body() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client.fetch("Lahore").await.unwrap_err();
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("Service Unavailable"));
    }

    #[tokio::test]
    async fn test_fetch_current_invalid_json() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client.fetch("Lahore").await.unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[tokio::test]
    async fn test_fetch_current_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(50));
        let err = client.fetch("Lahore").await.unwrap_err();
        assert!(matches!(err, FetchError::Request(_)));
        assert!(!err.to_string().contains("test-key"));
    }

    #[tokio::test]
    async fn test_fetch_current_unreachable_host() {
        let client = WeatherApiClient::new(
            reqwest::Client::new(),
            WeatherApiConfig {
                api_key: Some("secret".to_string()),
                // Port 9 (discard) on localhost is not expected to accept HTTP.
                base_url: "http://127.0.0.1:9".to_string(),
                timeout: Duration::from_secs(2),
            },
        );
        let err = client.fetch("Lahore").await.unwrap_err();
        assert!(matches!(err, FetchError::Request(_)));
        assert!(!err.to_string().contains("secret"));
    }

    #[test]
    fn test_fallback_status_message_truncates() {
        let body = "x".repeat(500);
        let msg = fallback_status_message(reqwest::StatusCode::BAD_GATEWAY, &body);
        assert_eq!(msg.len(), MAX_ERROR_BODY_CHARS + 3);
    }
}
