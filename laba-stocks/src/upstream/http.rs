//! Forecast API client.
//!
//! GET `<base_url>/<SYMBOL>` with a browser-like User-Agent. The API answers
//! with a one-element JSON array; the first element is the payload.

use async_trait::async_trait;
use laba_common::config::UpstreamConfig;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use super::{HttpCollaborator, UpstreamError};

/// Forecast API client.
pub struct ForecastClient {
    client: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
}

impl ForecastClient {
    /// Build a client from upstream configuration.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| UpstreamError::Http(format!("invalid user agent: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| UpstreamError::Http(e.to_string()))?;

        let base_url = Url::parse(&config.forecast_base_url)
            .map_err(|e| UpstreamError::Http(format!("invalid forecast base url: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(UpstreamError::Http(format!(
                "forecast base url cannot carry a path: {base_url}"
            )));
        }

        Ok(Self {
            client,
            base_url,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Append the symbol as one percent-encoded path segment.
    fn url_for(&self, symbol: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push(symbol);
        }
        url
    }
}

/// Unwrap the first element of an array body; other bodies pass through.
fn extract_payload(body: Value) -> Result<Value, UpstreamError> {
    match body {
        Value::Array(items) => items.into_iter().next().ok_or(UpstreamError::EmptyPayload),
        other => Ok(other),
    }
}

#[async_trait]
impl HttpCollaborator for ForecastClient {
    async fn get_json(&self, symbol: &str) -> Result<Value, UpstreamError> {
        let url = self.url_for(symbol);
        tracing::debug!(url = %url, "Fetching forecast");

        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                UpstreamError::Timeout(self.timeout_secs)
            } else {
                UpstreamError::Http(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(
                url = %url,
                status = status.as_u16(),
                "Forecast API returned error status"
            );
            return Err(UpstreamError::Status {
                status: status.as_u16(),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| UpstreamError::InvalidJson(e.to_string()))?;

        extract_payload(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ForecastClient {
        let config = UpstreamConfig {
            forecast_base_url: format!("{}/quote/forecast/", server.uri()),
            timeout_secs: 5,
            ..UpstreamConfig::default()
        };
        ForecastClient::new(&config).unwrap()
    }

    #[test]
    fn test_extract_payload() {
        assert_eq!(extract_payload(json!([{"a": 1}, {"b": 2}])).unwrap(), json!({"a": 1}));
        assert_eq!(extract_payload(json!({"a": 1})).unwrap(), json!({"a": 1}));
        assert!(matches!(extract_payload(json!([])), Err(UpstreamError::EmptyPayload)));
    }

    #[test]
    fn test_symbol_is_a_single_encoded_segment() {
        let config = UpstreamConfig {
            forecast_base_url: "https://forecast.test/quote/forecast/".into(),
            ..UpstreamConfig::default()
        };
        let client = ForecastClient::new(&config).unwrap();

        assert_eq!(
            client.url_for("AAPL").as_str(),
            "https://forecast.test/quote/forecast/AAPL"
        );
        assert_eq!(
            client.url_for("../X").as_str(),
            "https://forecast.test/quote/forecast/..%2FX"
        );
        assert_eq!(
            client.url_for("BRK B?x=1").as_str(),
            "https://forecast.test/quote/forecast/BRK%20B%3Fx=1"
        );
    }

    #[test]
    fn test_rejects_unparsable_base_url() {
        let config = UpstreamConfig {
            forecast_base_url: "not a url".into(),
            ..UpstreamConfig::default()
        };
        assert!(matches!(ForecastClient::new(&config), Err(UpstreamError::Http(_))));
    }

    #[tokio::test]
    async fn test_fetch_first_element() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/quote/forecast/AAPL"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"target": 210.5}])))
            .expect(1)
            .mount(&server)
            .await;

        let value = client_for(&server).get_json("AAPL").await.unwrap();
        assert_eq!(value, json!({"target": 210.5}));
    }

    #[tokio::test]
    async fn test_sends_configured_user_agent() {
        let server = MockServer::start().await;
        let ua = UpstreamConfig::default().user_agent;
        Mock::given(method("GET"))
            .and(header("user-agent", ua.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let value = client_for(&server).get_json("MSFT").await.unwrap();
        assert_eq!(value, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_not_found_is_upstream_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client_for(&server).get_json("NOPE").await.unwrap_err();
        assert!(matches!(err, UpstreamError::Status { status: 404 }));
    }

    #[tokio::test]
    async fn test_non_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server).get_json("AAPL").await.unwrap_err();
        assert!(matches!(err, UpstreamError::InvalidJson(_)));
    }
}
