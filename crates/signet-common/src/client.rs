//! HTTP client for the signature endpoints of the admin API.

use crate::config::Config;
use crate::error::{Result, SignetError};
use crate::models::{RecordId, SignaturePayload, SignatureRecord};

#[derive(Debug, Clone)]
pub struct SignatureClient {
    pub client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl SignatureClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            token,
        }
    }

    /// Build a client with the configured base URL, token and timeout.
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            token: config.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn collection_url(&self) -> String {
        format!("{}/signatures", self.base_url)
    }

    pub fn record_url(&self, id: &RecordId) -> String {
        format!("{}/signatures/{}", self.base_url, id)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// `GET /signatures/{id}`
    #[tracing::instrument(skip(self), fields(id = %id))]
    pub async fn fetch(&self, id: &RecordId) -> Result<SignatureRecord> {
        let response = self
            .authorize(self.client.get(self.record_url(id)))
            .send()
            .await?;
        let response = check_status(response).await?;
        Ok(response.json().await?)
    }

    /// `PUT /signatures/{id}`
    #[tracing::instrument(skip(self, payload), fields(id = %id, bytes = payload.content.len()))]
    pub async fn update(&self, id: &RecordId, payload: &SignaturePayload) -> Result<()> {
        let response = self
            .authorize(self.client.put(self.record_url(id)))
            .json(payload)
            .send()
            .await?;
        check_status(response).await?;
        tracing::debug!("signature updated");
        Ok(())
    }

    /// `POST /signatures`
    #[tracing::instrument(skip(self, payload), fields(bytes = payload.content.len()))]
    pub async fn create(&self, payload: &SignaturePayload) -> Result<()> {
        let response = self
            .authorize(self.client.post(self.collection_url()))
            .json(payload)
            .send()
            .await?;
        check_status(response).await?;
        tracing::debug!("signature created");
        Ok(())
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = api_error_message(status.as_u16(), &body);
    tracing::warn!(status = status.as_u16(), %message, "api rejected request");
    Err(SignetError::Api {
        status: status.as_u16(),
        message,
    })
}

/// Pull a human-readable message out of an error response body.
///
/// Looks for `detail`, `message` or `error` string fields in a JSON object,
/// then falls back to the raw body, then to the status code.
pub fn api_error_message(status: u16, body: &str) -> String {
    if let Ok(serde_json::Value::Object(map)) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["detail", "message", "error"] {
            if let Some(serde_json::Value::String(msg)) = map.get(key) {
                if !msg.trim().is_empty() {
                    return msg.trim().to_owned();
                }
            }
        }
    }
    let body = body.trim();
    if !body.is_empty() && !body.starts_with('{') {
        return body.chars().take(200).collect();
    }
    format!("request failed with status {status}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        let client = SignatureClient::new("https://admin.example.com/api/", None);
        assert_eq!(
            client.collection_url(),
            "https://admin.example.com/api/signatures"
        );
        assert_eq!(
            client.record_url(&RecordId::from(42)),
            "https://admin.example.com/api/signatures/42"
        );
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            api_base_url: "http://api.test".into(),
            api_token: Some("secret".into()),
            ..Config::default()
        };
        let client = SignatureClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "http://api.test");
    }

    #[test]
    fn test_error_message_fields() {
        assert_eq!(
            api_error_message(400, r#"{"detail": "Name taken"}"#),
            "Name taken"
        );
        assert_eq!(
            api_error_message(500, r#"{"message": "", "error": "boom"}"#),
            "boom"
        );
        assert_eq!(api_error_message(502, "Bad Gateway\n"), "Bad Gateway");
        assert_eq!(
            api_error_message(404, r#"{"code": 1}"#),
            "request failed with status 404"
        );
        assert_eq!(api_error_message(503, ""), "request failed with status 503");
    }
}
