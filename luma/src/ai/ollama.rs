use std::time::Duration;

use reqwest::{Client, header};
use serde::{Deserialize, Serialize};

use crate::context::COMPANION_NAME;

/// Local fallback provider: Ollama's generate endpoint. Slower than the
/// hosted provider, so the timeout is much longer.
pub struct OllamaClient {
    client: Client,
    auth_headers: header::HeaderMap,
    endpoint: String,
    model: String,
    partner_name: String,
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

impl OllamaClient {
    pub fn new(endpoint: &str, model: &str, partner_name: &str) -> Result<Self, String> {
        let mut auth_headers = header::HeaderMap::new();
        auth_headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(Self {
            client: Client::new(),
            auth_headers,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            partner_name: partner_name.to_string(),
        })
    }

    /// One generate round trip. Any failure is an `Err`; the caller
    /// degrades to the canned-reply table.
    pub async fn generate(&self, system_prompt: &str, user_text: &str) -> Result<String, String> {
        let request = GenerateRequest {
            model: self.model.clone(),
            prompt: format!(
                "{}\n\n{}: {}\n{}:",
                system_prompt, self.partner_name, user_text, COMPANION_NAME
            ),
            stream: false,
        };

        log::debug!("Sending generate request to {} ({})", self.endpoint, self.model);

        let response = self
            .client
            .post(&self.endpoint)
            .headers(self.auth_headers.clone())
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Ollama request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Ollama returned {}: {}", status, body));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| format!("failed to decode Ollama response: {}", e))?;

        Ok(body.response)
    }
}
