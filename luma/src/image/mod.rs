//! Image generation: remote templated-URL service first, local Stable
//! Diffusion as fallback. Generation is gated on a trained style model
//! being present on disk.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Utc;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::config::Config;

const REMOTE_ENDPOINT: &str = "https://image.pollinations.ai/prompt";
const REMOTE_TIMEOUT: Duration = Duration::from_secs(60);
const SD_TIMEOUT: Duration = Duration::from_secs(120);

const SD_NEGATIVE_PROMPT: &str = "low quality, blurry, distorted";
const SD_STEPS: u32 = 20;
const SD_SIZE: u32 = 512;
const SD_CFG_SCALE: f32 = 7.5;

/// Weight-file extensions that count as a trained style model.
const WEIGHT_EXTENSIONS: &[&str] = &["safetensors", "bin", "pt", "pth"];

#[derive(Debug, Serialize)]
struct Txt2ImgRequest {
    prompt: String,
    negative_prompt: String,
    steps: u32,
    width: u32,
    height: u32,
    cfg_scale: f32,
}

#[derive(Debug, Deserialize)]
struct Txt2ImgResponse {
    images: Vec<String>,
}

/// Recursively scan the style-model directory for weight files; the first
/// hit unlocks image generation.
pub fn probe_style_model(dir: &Path) -> Option<PathBuf> {
    if !dir.exists() {
        return None;
    }
    WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| WEIGHT_EXTENSIONS.contains(&e))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
}

pub struct ImageGenerator {
    client: Client,
    sd_endpoint: String,
    output_dir: PathBuf,
}

impl ImageGenerator {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client: Client::new(),
            sd_endpoint: config.sd_endpoint.clone(),
            output_dir: config.image_dir.clone(),
        }
    }

    /// Generate one image and return the saved path. Tries the remote
    /// service first, then local Stable Diffusion; the returned error
    /// names whichever failures occurred.
    pub async fn generate(&self, prompt: &str) -> Result<PathBuf, String> {
        let styled_prompt = format!("{}, in custom trained style, high quality, detailed", prompt);

        match self.generate_remote(&styled_prompt).await {
            Ok(path) => return Ok(path),
            Err(e) => log::warn!("Remote image generation failed: {}", e),
        }

        match self.generate_local(&styled_prompt).await {
            Ok(path) => Ok(path),
            Err(e) => {
                log::warn!("Local image generation failed: {}", e);
                Err(format!("both image backends failed (last error: {})", e))
            }
        }
    }

    async fn generate_remote(&self, prompt: &str) -> Result<PathBuf, String> {
        let url = format!("{}/{}", REMOTE_ENDPOINT, urlencoding::encode(prompt));
        log::debug!("Requesting remote image: {}", url);

        let response = self
            .client
            .get(&url)
            .timeout(REMOTE_TIMEOUT)
            .send()
            .await
            .map_err(|e| format!("image request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("image endpoint returned {}", status));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| format!("failed to read image bytes: {}", e))?;

        self.write_image("remote", &bytes)
    }

    async fn generate_local(&self, prompt: &str) -> Result<PathBuf, String> {
        let request = Txt2ImgRequest {
            prompt: prompt.to_string(),
            negative_prompt: SD_NEGATIVE_PROMPT.to_string(),
            steps: SD_STEPS,
            width: SD_SIZE,
            height: SD_SIZE,
            cfg_scale: SD_CFG_SCALE,
        };

        let response = self
            .client
            .post(&self.sd_endpoint)
            .timeout(SD_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("local SD request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("local SD returned {}", status));
        }

        let body: Txt2ImgResponse = response
            .json()
            .await
            .map_err(|e| format!("failed to decode SD response: {}", e))?;
        let encoded = body
            .images
            .first()
            .ok_or_else(|| "SD response contained no images".to_string())?;
        let bytes = BASE64
            .decode(encoded)
            .map_err(|e| format!("failed to decode SD image payload: {}", e))?;

        self.write_image("local", &bytes)
    }

    fn write_image(&self, source: &str, bytes: &[u8]) -> Result<PathBuf, String> {
        fs::create_dir_all(&self.output_dir)
            .map_err(|e| format!("cannot create image dir: {}", e))?;
        let path = self.output_dir.join(format!(
            "luma_{}_{}.png",
            source,
            Utc::now().format("%Y%m%d_%H%M%S")
        ));
        fs::write(&path, bytes).map_err(|e| format!("cannot write image file: {}", e))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_probe_missing_dir_is_none() {
        let dir = tempdir().unwrap();
        assert!(probe_style_model(&dir.path().join("nope")).is_none());
    }

    #[test]
    fn test_probe_ignores_non_weight_files() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("readme.txt"), "hello").unwrap();
        assert!(probe_style_model(dir.path()).is_none());
    }

    #[test]
    fn test_probe_finds_nested_weights() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("model");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("adapter_model.safetensors"), [0u8; 4]).unwrap();

        let found = probe_style_model(dir.path()).unwrap();
        assert!(found.ends_with("adapter_model.safetensors"));
    }
}
