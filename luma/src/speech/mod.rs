//! Speech synthesis with emotion-tagged prosody.
//!
//! Emotion detection and TTS text cleanup are pure functions. Actual
//! synthesis goes through the [`SpeechSynthesizer`] capability trait,
//! with one implementation per backend and a priority-ordered probe at
//! startup. A turn never fails because speech failed.

pub mod elevenlabs;
pub mod local;

pub use elevenlabs::ElevenLabsSynthesizer;
pub use local::{EspeakSynthesizer, PiperSynthesizer};

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::Config;

/// Detected emotional register of a reply, used to modulate prosody.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emotion {
    Excited,
    Loving,
    Sad,
    Worried,
    Angry,
    Happy,
    Neutral,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Excited => "excited",
            Emotion::Loving => "loving",
            Emotion::Sad => "sad",
            Emotion::Worried => "worried",
            Emotion::Angry => "angry",
            Emotion::Happy => "happy",
            Emotion::Neutral => "neutral",
        }
    }
}

/// Keyword classifier; first matching register wins, in the order below.
pub fn detect_emotion(text: &str) -> Emotion {
    let lower = text.to_lowercase();
    let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));

    if has(&["!!!", "amazing", "awesome", "finally", "yes!", "yay"]) {
        Emotion::Excited
    } else if has(&["love you", "adore", "my favorite person", "sweetheart"]) {
        Emotion::Loving
    } else if has(&["miss", "leaving", "alone", "sad", "cry"]) {
        Emotion::Sad
    } else if has(&["worried", "scared", "please", "need you", "help"]) {
        Emotion::Worried
    } else if has(&["angry", "frustrated", "hate", "annoying"]) {
        Emotion::Angry
    } else if has(&["happy", "great", "good", "wonderful"]) {
        Emotion::Happy
    } else {
        Emotion::Neutral
    }
}

static ACTION_SPAN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*[^*]+\*").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Prepare reply text for a TTS engine: drop `*action*` spans and emoji,
/// collapse whitespace, and soften punctuation the engines read badly.
pub fn clean_text_for_speech(text: &str) -> String {
    let without_actions = ACTION_SPAN.replace_all(text, "");
    let without_emoji: String = without_actions.chars().filter(|c| !is_emoji(*c)).collect();
    let collapsed = WHITESPACE.replace_all(without_emoji.trim(), " ");
    collapsed.replace("...", ", ").replace('!', ". ")
}

fn is_emoji(c: char) -> bool {
    matches!(u32::from(c),
        0x1F300..=0x1F5FF
            | 0x1F600..=0x1F64F
            | 0x1F680..=0x1F6FF
            | 0x1F900..=0x1F9FF
            | 0x1F1E6..=0x1F1FF
            | 0x2600..=0x27BF
            | 0x2B00..=0x2BFF
            | 0xFE00..=0xFE0F
    )
}

/// One synthesis backend. Implementations return raw audio bytes; the
/// caller decides where they land on disk.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// File extension of the produced audio.
    fn file_extension(&self) -> &'static str;

    async fn synthesize(&self, text: &str, emotion: Emotion) -> Result<Vec<u8>, String>;
}

/// Available engines, in probe priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceEngine {
    ElevenLabs,
    Piper,
    Espeak,
}

impl VoiceEngine {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "elevenlabs" => Some(VoiceEngine::ElevenLabs),
            "piper" => Some(VoiceEngine::Piper),
            "espeak" | "espeak-ng" => Some(VoiceEngine::Espeak),
            _ => None,
        }
    }

    fn probe(self, config: &Config) -> Option<Box<dyn SpeechSynthesizer>> {
        match self {
            VoiceEngine::ElevenLabs => config.elevenlabs_api_key.as_deref().map(|key| {
                Box::new(ElevenLabsSynthesizer::new(key, &config.elevenlabs_voice_id))
                    as Box<dyn SpeechSynthesizer>
            }),
            VoiceEngine::Piper => which::which("piper")
                .ok()
                .map(|bin| Box::new(PiperSynthesizer::new(bin)) as Box<dyn SpeechSynthesizer>),
            VoiceEngine::Espeak => which::which("espeak-ng")
                .or_else(|_| which::which("espeak"))
                .ok()
                .map(|bin| Box::new(EspeakSynthesizer::new(bin)) as Box<dyn SpeechSynthesizer>),
        }
    }
}

/// Pick a synthesizer: the configured preference first, then the default
/// priority order. `None` when nothing on this machine can speak.
pub fn probe_synthesizer(config: &Config) -> Option<Box<dyn SpeechSynthesizer>> {
    let default_order = [VoiceEngine::ElevenLabs, VoiceEngine::Piper, VoiceEngine::Espeak];

    if let Some(preferred) = config.voice_engine {
        if let Some(synth) = preferred.probe(config) {
            return Some(synth);
        }
        log::warn!("Preferred voice engine unavailable, probing alternatives");
    }

    default_order.iter().find_map(|engine| engine.probe(config))
}

/// Owns the selected synthesizer and the audio output directory.
pub struct VoiceSystem {
    synthesizer: Box<dyn SpeechSynthesizer>,
    audio_dir: PathBuf,
}

impl VoiceSystem {
    /// Probe for an engine; `None` (with a warning) when none is usable.
    pub fn from_config(config: &Config) -> Option<Self> {
        let synthesizer = match probe_synthesizer(config) {
            Some(s) => s,
            None => {
                log::warn!("No speech engine available, voice disabled");
                return None;
            }
        };
        log::info!("Voice engine selected: {}", synthesizer.name());
        Some(Self {
            synthesizer,
            audio_dir: config.audio_dir.clone(),
        })
    }

    pub fn engine_name(&self) -> &'static str {
        self.synthesizer.name()
    }

    /// Synthesize one reply and write it to the audio directory. Returns
    /// the file path, or `None` when the cleaned text was empty.
    pub async fn speak(&self, text: &str) -> Result<Option<PathBuf>, String> {
        let emotion = detect_emotion(text);
        let clean = clean_text_for_speech(text);
        if clean.trim().is_empty() {
            return Ok(None);
        }

        let audio = self.synthesizer.synthesize(&clean, emotion).await?;

        fs::create_dir_all(&self.audio_dir)
            .map_err(|e| format!("cannot create audio dir: {}", e))?;
        let path = self.audio_dir.join(format!(
            "luma_{}_{}.{}",
            emotion.as_str(),
            Utc::now().timestamp(),
            self.synthesizer.file_extension()
        ));
        fs::write(&path, audio).map_err(|e| format!("cannot write audio file: {}", e))?;

        Ok(Some(path))
    }
}

/// Shared helper for subprocess engines: run a prepared command and hand
/// back stdout, folding a non-zero exit into an error.
pub(crate) async fn run_capture(mut command: tokio::process::Command) -> Result<Vec<u8>, String> {
    let output = command
        .output()
        .await
        .map_err(|e| format!("failed to run TTS binary: {}", e))?;

    if !output.status.success() {
        return Err(format!(
            "TTS binary exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr)
        ));
    }

    Ok(output.stdout)
}

pub(crate) fn temp_audio_path(extension: &str) -> PathBuf {
    let name = format!("luma_tts_{}_{}.{}", std::process::id(), Utc::now().timestamp_micros(), extension);
    std::env::temp_dir().join(name)
}

/// Read and remove a temp file produced by an engine that can only write
/// to disk.
pub(crate) fn collect_temp_audio(path: &Path) -> Result<Vec<u8>, String> {
    let bytes = fs::read(path).map_err(|e| format!("cannot read synthesized audio: {}", e))?;
    let _ = fs::remove_file(path);
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_emotion_registers() {
        assert_eq!(detect_emotion("That's AMAZING, it finally works"), Emotion::Excited);
        assert_eq!(detect_emotion("love you, idiot"), Emotion::Loving);
        assert_eq!(detect_emotion("I miss you already"), Emotion::Sad);
        assert_eq!(detect_emotion("I'm worried about you"), Emotion::Worried);
        assert_eq!(detect_emotion("this bug is so annoying"), Emotion::Angry);
        assert_eq!(detect_emotion("today was a good day"), Emotion::Happy);
        assert_eq!(detect_emotion("mhm"), Emotion::Neutral);
    }

    #[test]
    fn test_excited_outranks_happy() {
        assert_eq!(detect_emotion("yay, such a good day"), Emotion::Excited);
    }

    #[test]
    fn test_clean_strips_actions_and_emoji() {
        let cleaned = clean_text_for_speech("*leans back* Hey 💜 you made it!");
        assert_eq!(cleaned, "Hey you made it. ");
    }

    #[test]
    fn test_clean_collapses_whitespace_and_ellipses() {
        let cleaned = clean_text_for_speech("well...   okay then");
        assert_eq!(cleaned, "well, okay then");
    }

    #[test]
    fn test_clean_pure_action_text_is_empty() {
        assert!(clean_text_for_speech("*quietly debugging*").trim().is_empty());
    }

    #[test]
    fn test_voice_engine_from_str() {
        assert_eq!(VoiceEngine::from_str("piper"), Some(VoiceEngine::Piper));
        assert_eq!(VoiceEngine::from_str("ESPEAK-NG"), Some(VoiceEngine::Espeak));
        assert_eq!(VoiceEngine::from_str("elevenlabs"), Some(VoiceEngine::ElevenLabs));
        assert_eq!(VoiceEngine::from_str("sapi"), None);
    }
}
