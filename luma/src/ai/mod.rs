pub mod fallback;
pub mod groq;
pub mod ollama;

pub use groq::GroqClient;
pub use ollama::OllamaClient;

use serde::{Deserialize, Serialize};

use crate::config::Config;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

/// Unified completion client over the configured provider.
///
/// `respond` always yields text to show the user: a model reply when the
/// call succeeds, a diagnostic string for HTTP or network failures on the
/// primary provider, and a canned fallback reply for anything unexpected.
pub enum CompletionClient {
    Groq(GroqClient),
    Ollama(OllamaClient),
}

impl CompletionClient {
    pub fn from_config(config: &Config) -> Result<Self, String> {
        if config.remote_completion_ready() {
            let api_key = config
                .groq_api_key
                .as_deref()
                .ok_or_else(|| "remote completion enabled without an API key".to_string())?;
            let client = GroqClient::new(api_key, &config.groq_endpoint, &config.groq_model)?;
            Ok(CompletionClient::Groq(client))
        } else {
            let client = OllamaClient::new(
                &config.ollama_endpoint,
                &config.ollama_model,
                &config.partner_name,
            )?;
            Ok(CompletionClient::Ollama(client))
        }
    }

    pub fn provider_name(&self) -> &'static str {
        match self {
            CompletionClient::Groq(_) => "groq",
            CompletionClient::Ollama(_) => "ollama",
        }
    }

    /// Run one completion. Never fails: unexpected errors degrade to the
    /// local canned-reply table.
    pub async fn respond(&self, system_prompt: &str, user_text: &str) -> String {
        let result = match self {
            CompletionClient::Groq(client) => client.generate(system_prompt, user_text).await,
            CompletionClient::Ollama(client) => client.generate(system_prompt, user_text).await,
        };

        match result {
            Ok(text) => text,
            Err(e) => {
                log::warn!(
                    "{} completion failed unexpectedly, using canned reply: {}",
                    self.provider_name(),
                    e
                );
                fallback::fallback_response(user_text)
            }
        }
    }
}
