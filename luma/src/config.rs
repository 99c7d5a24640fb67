use std::env;
use std::path::PathBuf;

use crate::speech::VoiceEngine;

/// Runtime configuration, resolved once at startup from the environment
/// (after `.env` is loaded). Every field has a default; nothing here is
/// fatal when unset.
#[derive(Clone)]
pub struct Config {
    /// Name the companion addresses the user by.
    pub partner_name: String,
    /// Route turns through the remote completion endpoint. When false (or
    /// when no API key is configured) the local Ollama provider is used.
    pub use_remote_completion: bool,
    pub groq_api_key: Option<String>,
    pub groq_endpoint: String,
    pub groq_model: String,
    pub ollama_endpoint: String,
    pub ollama_model: String,
    /// Synthesize speech for each reply.
    pub enable_voice: bool,
    /// Preferred TTS engine; the capability probe falls back in priority
    /// order when the preferred one is unavailable.
    pub voice_engine: Option<VoiceEngine>,
    pub elevenlabs_api_key: Option<String>,
    pub elevenlabs_voice_id: String,
    /// Local Stable Diffusion txt2img endpoint (image fallback).
    pub sd_endpoint: String,
    /// Directory holding the two persisted JSON documents.
    pub data_dir: PathBuf,
    /// Directory scanned for trained style-model weights.
    pub style_model_dir: PathBuf,
    /// Directory of user-supplied training images for `/train`.
    pub examples_dir: PathBuf,
    /// Where synthesized audio files are written.
    pub audio_dir: PathBuf,
    /// Where generated images are written.
    pub image_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let groq_api_key = env::var("GROQ_API_KEY").ok().filter(|k| !k.trim().is_empty());
        let use_remote = env::var("USE_REMOTE_COMPLETION")
            .map(|v| parse_bool(&v))
            .unwrap_or(true);

        Self {
            partner_name: env::var("PARTNER_NAME").unwrap_or_else(|_| "friend".to_string()),
            use_remote_completion: use_remote,
            groq_api_key,
            groq_endpoint: env::var("GROQ_ENDPOINT")
                .unwrap_or_else(|_| "https://api.groq.com/openai/v1/chat/completions".to_string()),
            groq_model: env::var("GROQ_MODEL")
                .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string()),
            ollama_endpoint: env::var("OLLAMA_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:11434/api/generate".to_string()),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.3".to_string()),
            enable_voice: env::var("ENABLE_VOICE").map(|v| parse_bool(&v)).unwrap_or(true),
            voice_engine: env::var("VOICE_ENGINE").ok().and_then(|v| VoiceEngine::from_str(&v)),
            elevenlabs_api_key: env::var("ELEVENLABS_API_KEY")
                .ok()
                .filter(|k| !k.trim().is_empty()),
            elevenlabs_voice_id: env::var("ELEVENLABS_VOICE_ID")
                .unwrap_or_else(|_| "21m00Tcm4TlvDq8ikWAM".to_string()),
            sd_endpoint: env::var("SD_ENDPOINT")
                .unwrap_or_else(|_| "http://localhost:7860/sdapi/v1/txt2img".to_string()),
            data_dir: resolve_data_dir(),
            style_model_dir: env::var("STYLE_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("luma_style_model")),
            examples_dir: env::var("TRAINING_EXAMPLES_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("training_examples")),
            audio_dir: env::var("AUDIO_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("voice_outputs")),
            image_dir: env::var("IMAGE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("generated_images")),
        }
    }

    /// Whether the primary remote provider is actually usable.
    pub fn remote_completion_ready(&self) -> bool {
        self.use_remote_completion && self.groq_api_key.is_some()
    }
}

/// Data directory: `$LUMA_DATA_DIR`, else `~/.luma_data`, else the working
/// directory when the home-relative one cannot be created.
fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = env::var("LUMA_DATA_DIR") {
        let path = PathBuf::from(dir);
        if std::fs::create_dir_all(&path).is_ok() {
            return path;
        }
        log::warn!("Cannot create data dir {}, falling back", path.display());
    }

    if let Some(home) = dirs::home_dir() {
        let path = home.join(".luma_data");
        if std::fs::create_dir_all(&path).is_ok() {
            return path;
        }
        log::warn!("Cannot create data dir {}, using working directory", path.display());
    }

    PathBuf::from(".")
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("true"));
        assert!(parse_bool("1"));
        assert!(parse_bool(" YES "));
        assert!(!parse_bool("false"));
        assert!(!parse_bool("0"));
        assert!(!parse_bool("nope"));
    }
}
