use std::time::Duration;

use reqwest::{Client, header};
use serde::{Deserialize, Serialize};

use crate::ai::{Message, MessageRole};

/// Primary provider: OpenAI-compatible chat completions hosted by Groq.
/// Short timeout, no retries; every failure mode is turned into a
/// user-facing string at this boundary.
pub struct GroqClient {
    client: Client,
    auth_headers: header::HeaderMap,
    endpoint: String,
    model: String,
}

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const TEMPERATURE: f32 = 0.8;
const MAX_TOKENS: u32 = 500;
const TOP_P: f32 = 0.9;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
    #[serde(rename = "type", default)]
    error_type: String,
}

impl GroqClient {
    pub fn new(api_key: &str, endpoint: &str, model: &str) -> Result<Self, String> {
        let mut auth_headers = header::HeaderMap::new();
        auth_headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let bearer = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
            .map_err(|e| format!("Invalid API key format: {}", e))?;
        auth_headers.insert(header::AUTHORIZATION, bearer);

        Ok(Self {
            client: Client::new(),
            auth_headers,
            endpoint: endpoint.to_string(),
            model: model.to_string(),
        })
    }

    /// One completion round trip.
    ///
    /// `Ok` carries the text to show the user: the reply on success, a
    /// diagnostic for HTTP and network failures. `Err` is reserved for
    /// unexpected failures (a success body that cannot be decoded) and
    /// tells the caller to fall back to the canned table.
    pub async fn generate(&self, system_prompt: &str, user_text: &str) -> Result<String, String> {
        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                Message {
                    role: MessageRole::System,
                    content: system_prompt.to_string(),
                },
                Message {
                    role: MessageRole::User,
                    content: user_text.to_string(),
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            top_p: TOP_P,
        };

        log::debug!("Sending completion request to {} ({})", self.endpoint, self.model);

        let result = self
            .client
            .post(&self.endpoint)
            .headers(self.auth_headers.clone())
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await;

        let response = match result {
            Ok(r) => r,
            Err(e) => {
                log::warn!("Completion request failed: {}", e);
                return Ok(connection_diagnostic(&e));
            }
        };

        let status = response.status();
        if status.is_success() {
            let body: ChatCompletionResponse = response
                .json()
                .await
                .map_err(|e| format!("failed to decode completion response: {}", e))?;
            let reply = body
                .choices
                .into_iter()
                .next()
                .map(|c| c.message.content)
                .ok_or_else(|| "completion response contained no choices".to_string())?;
            return Ok(reply);
        }

        let raw = response.text().await.unwrap_or_default();
        log::warn!("Completion endpoint returned {}: {}", status, raw);
        Ok(format_api_error(status.as_u16(), &raw))
    }
}

/// User-facing diagnostic for a non-200 response. Pulls the structured
/// message and type out of the body when it parses, otherwise embeds a
/// truncated slice of the raw body.
pub(crate) fn format_api_error(status: u16, body: &str) -> String {
    if let Ok(parsed) = serde_json::from_str::<ApiErrorResponse>(body) {
        return format!(
            "Hit an API error and couldn't reply properly.\n\n\
             Status code: {}\n\
             Error type: {}\n\
             Message: {}\n\n\
             Usually one of:\n\
             1. API key wrong or has stray whitespace\n\
             2. Out of credits or quota\n\
             3. Model name not available on this key",
            status, parsed.error.error_type, parsed.error.message
        );
    }

    let snippet: String = body.chars().take(200).collect();
    format!(
        "The API returned an error I couldn't parse.\n\n\
         Status code: {}\n\
         Raw response: {}\n\n\
         Check the logs for the full body.",
        status, snippet
    )
}

/// User-facing diagnostic for a network-level failure (timeout, refused
/// connection, DNS).
pub(crate) fn connection_diagnostic(error: &reqwest::Error) -> String {
    let kind = if error.is_timeout() {
        "the request timed out"
    } else if error.is_connect() {
        "the connection failed"
    } else {
        "the request failed"
    };

    format!(
        "Couldn't reach the completion endpoint — {}.\n\n\
         Error: {}\n\n\
         Check:\n\
         1. Internet connection\n\
         2. Firewall or proxy settings\n\
         3. Provider status page\n\n\
         Or switch to the local provider: set USE_REMOTE_COMPLETION=false \
         and run an Ollama model.",
        kind, error
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_api_error_structured_body() {
        let body = r#"{"error":{"message":"bad key","type":"invalid_request_error"}}"#;
        let diagnostic = format_api_error(401, body);
        assert!(diagnostic.contains("bad key"));
        assert!(diagnostic.contains("invalid_request_error"));
        assert!(diagnostic.contains("401"));
    }

    #[test]
    fn test_format_api_error_unparseable_body() {
        let long_body = "x".repeat(500);
        let diagnostic = format_api_error(502, &long_body);
        assert!(diagnostic.contains("502"));
        // Raw body is truncated to 200 chars
        assert!(diagnostic.contains(&"x".repeat(200)));
        assert!(!diagnostic.contains(&"x".repeat(201)));
    }

    #[test]
    fn test_format_api_error_missing_fields_default_empty() {
        let diagnostic = format_api_error(429, r#"{"error":{}}"#);
        assert!(diagnostic.contains("429"));
        assert!(diagnostic.contains("Status code"));
    }
}
