use reqwest::{Client, header};
use serde::Serialize;

use super::{Emotion, SpeechSynthesizer};
use async_trait::async_trait;

/// Remote HTTP TTS. Emotion is expressed through the voice stability
/// setting: lower is more expressive. The request carries no timeout;
/// synthesis is awaited to completion.
pub struct ElevenLabsSynthesizer {
    client: Client,
    api_key: String,
    voice_id: String,
}

const MODEL_ID: &str = "eleven_multilingual_v2";
const SIMILARITY_BOOST: f32 = 0.8;
const STYLE: f32 = 0.5;

#[derive(Debug, Serialize)]
struct SpeechRequest {
    text: String,
    model_id: String,
    voice_settings: VoiceSettings,
}

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    style: f32,
}

impl ElevenLabsSynthesizer {
    pub fn new(api_key: &str, voice_id: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            voice_id: voice_id.to_string(),
        }
    }

    fn stability_for(emotion: Emotion) -> f32 {
        match emotion {
            Emotion::Excited => 0.3,
            Emotion::Sad => 0.7,
            _ => 0.6,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    fn name(&self) -> &'static str {
        "elevenlabs"
    }

    fn file_extension(&self) -> &'static str {
        "mp3"
    }

    async fn synthesize(&self, text: &str, emotion: Emotion) -> Result<Vec<u8>, String> {
        let request = SpeechRequest {
            text: text.to_string(),
            model_id: MODEL_ID.to_string(),
            voice_settings: VoiceSettings {
                stability: Self::stability_for(emotion),
                similarity_boost: SIMILARITY_BOOST,
                style: STYLE,
            },
        };

        let url = format!("https://api.elevenlabs.io/v1/text-to-speech/{}", self.voice_id);
        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.api_key)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("speech request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("speech endpoint returned {}: {}", status, body));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| format!("failed to read audio body: {}", e))?;
        Ok(audio.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stability_tracks_emotion() {
        assert_eq!(ElevenLabsSynthesizer::stability_for(Emotion::Excited), 0.3);
        assert_eq!(ElevenLabsSynthesizer::stability_for(Emotion::Sad), 0.7);
        assert_eq!(ElevenLabsSynthesizer::stability_for(Emotion::Neutral), 0.6);
        assert_eq!(ElevenLabsSynthesizer::stability_for(Emotion::Loving), 0.6);
    }
}
