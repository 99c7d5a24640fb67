//! Local subprocess TTS backends, discovered on PATH at startup.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::{Emotion, SpeechSynthesizer, collect_temp_audio, run_capture, temp_audio_path};

/// Neural TTS via the `piper` binary. Text goes in on stdin; piper can
/// only write to a file, so the audio passes through a temp path.
pub struct PiperSynthesizer {
    binary: PathBuf,
    model: Option<String>,
}

impl PiperSynthesizer {
    pub fn new(binary: PathBuf) -> Self {
        Self {
            binary,
            model: std::env::var("PIPER_MODEL").ok(),
        }
    }

    /// Speaking-rate multiplier; >1 is slower.
    fn length_scale_for(emotion: Emotion) -> f32 {
        match emotion {
            Emotion::Excited | Emotion::Happy => 0.9,
            Emotion::Sad | Emotion::Loving => 1.1,
            _ => 1.0,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for PiperSynthesizer {
    fn name(&self) -> &'static str {
        "piper"
    }

    fn file_extension(&self) -> &'static str {
        "wav"
    }

    async fn synthesize(&self, text: &str, emotion: Emotion) -> Result<Vec<u8>, String> {
        let out_path = temp_audio_path("wav");

        let mut command = Command::new(&self.binary);
        if let Some(model) = &self.model {
            command.arg("--model").arg(model);
        }
        command
            .arg("--length_scale")
            .arg(Self::length_scale_for(emotion).to_string())
            .arg("--output_file")
            .arg(&out_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| format!("failed to start piper: {}", e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| format!("failed to feed piper: {}", e))?;
        }

        let status = child
            .wait()
            .await
            .map_err(|e| format!("piper did not finish: {}", e))?;
        if !status.success() {
            let _ = std::fs::remove_file(&out_path);
            return Err(format!("piper exited with {}", status));
        }

        collect_temp_audio(&out_path)
    }
}

/// Formant TTS via `espeak-ng` (or legacy `espeak`). Writes WAV straight
/// to stdout, so no temp file is needed.
pub struct EspeakSynthesizer {
    binary: PathBuf,
}

impl EspeakSynthesizer {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    /// espeak pitch (0-99, default 50) and rate (words per minute).
    fn prosody_for(emotion: Emotion) -> (u32, u32) {
        match emotion {
            Emotion::Excited => (60, 190),
            Emotion::Happy => (55, 180),
            Emotion::Sad => (40, 150),
            Emotion::Loving => (45, 160),
            Emotion::Worried => (48, 170),
            Emotion::Angry => (52, 185),
            Emotion::Neutral => (50, 165),
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for EspeakSynthesizer {
    fn name(&self) -> &'static str {
        "espeak"
    }

    fn file_extension(&self) -> &'static str {
        "wav"
    }

    async fn synthesize(&self, text: &str, emotion: Emotion) -> Result<Vec<u8>, String> {
        let (pitch, rate) = Self::prosody_for(emotion);

        let mut command = Command::new(&self.binary);
        command
            .arg("--stdout")
            .arg("-p")
            .arg(pitch.to_string())
            .arg("-s")
            .arg(rate.to_string())
            .arg(text)
            .stdin(Stdio::null())
            .stderr(Stdio::piped());

        run_capture(command).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_piper_length_scale() {
        assert!(PiperSynthesizer::length_scale_for(Emotion::Excited) < 1.0);
        assert!(PiperSynthesizer::length_scale_for(Emotion::Sad) > 1.0);
        assert_eq!(PiperSynthesizer::length_scale_for(Emotion::Neutral), 1.0);
    }

    #[test]
    fn test_espeak_prosody_spread() {
        let (excited_pitch, excited_rate) = EspeakSynthesizer::prosody_for(Emotion::Excited);
        let (sad_pitch, sad_rate) = EspeakSynthesizer::prosody_for(Emotion::Sad);
        assert!(excited_pitch > sad_pitch);
        assert!(excited_rate > sad_rate);
    }
}
