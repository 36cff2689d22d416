use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;
use crate::serde_utils::{
    extract_error_message, parse_body_to_value, sanitize_header_value, summarize_json,
};

/// Client construction knobs. Nothing is configured by default, so requests
/// run with whatever the underlying HTTP client defaults to.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransportConfig {
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Value,
}

impl TransportResponse {
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The one outbound call an adapter makes. Kept as a trait so callers can
/// swap in their own client (or a stub) without touching adapter code.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post_json(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &Value,
    ) -> Result<TransportResponse, AppError>;
}

pub fn build_client(config: &TransportConfig) -> Result<reqwest::Client, AppError> {
    let mut builder = reqwest::Client::builder();
    if let Some(ms) = config.timeout_ms {
        builder = builder.timeout(Duration::from_millis(ms));
    }
    if let Some(agent) = &config.user_agent {
        builder = builder.user_agent(agent.clone());
    }
    builder.build().map_err(AppError::from)
}

#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(config)?,
        })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn request(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &Value,
    ) -> reqwest::RequestBuilder {
        let mut builder = self.client.post(url);
        for (key, value) in headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        builder.json(body)
    }

    /// Opens a streaming POST and hands back the raw body chunks. Non-success
    /// statuses are read in full and reported as [`AppError::Status`].
    pub async fn post_stream(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &Value,
    ) -> Result<BoxStream<'static, Result<Bytes, AppError>>, AppError> {
        log_request(url, headers, body);
        let response = self.request(url, headers, body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let parsed = parse_body_to_value(&text);
            let message = extract_error_message(&parsed)
                .unwrap_or_else(|| status.to_string());
            return Err(AppError::status(status.as_u16(), message));
        }
        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(AppError::from))
            .boxed())
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        body: &Value,
    ) -> Result<TransportResponse, AppError> {
        log_request(url, headers, body);
        let response = self.request(url, headers, body).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        tracing::debug!(status, bytes = text.len(), "transport response received");
        Ok(TransportResponse {
            status,
            body: parse_body_to_value(&text),
        })
    }
}

fn log_request(url: &str, headers: &HashMap<String, String>, body: &Value) {
    if !tracing::enabled!(tracing::Level::DEBUG) {
        return;
    }
    let masked: Vec<String> = headers
        .iter()
        .map(|(k, v)| format!("{}={}", k, sanitize_header_value(k, v)))
        .collect();
    tracing::debug!(
        url,
        headers = %masked.join(", "),
        body = %summarize_json(body),
        "sending request"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_ok_range() {
        let ok = TransportResponse {
            status: 204,
            body: Value::Null,
        };
        let err = TransportResponse {
            status: 500,
            body: json!({ "error": "boom" }),
        };
        assert!(ok.ok());
        assert!(!err.ok());
    }

    #[test]
    fn test_build_client_with_defaults() {
        assert!(build_client(&TransportConfig::default()).is_ok());
    }

    #[test]
    fn test_transport_config_from_json() {
        let config: TransportConfig = serde_json::from_value(json!({ "timeoutMs": 5000 })).unwrap();
        assert_eq!(config.timeout_ms, Some(5000));
        assert!(config.user_agent.is_none());
    }
}
