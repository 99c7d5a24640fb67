//! The per-turn pipeline and the state behind the interactive commands.
//!
//! One turn: append a pending record to the log, assemble the system
//! prompt, run the completion, fill in the response, persist both
//! documents, run the learning heuristics, then (optionally) speak.
//! Strictly sequential; nothing here is spawned.

use std::fs;
use std::path::PathBuf;

use crate::ai::CompletionClient;
use crate::config::Config;
use crate::context;
use crate::image::{self, ImageGenerator};
use crate::learning;
use crate::memory::history::HISTORY_FILE;
use crate::memory::store::MEMORY_FILE;
use crate::memory::{BUCKET_SHARED_EXPERIENCES, ConversationLog, MemoryStore};
use crate::speech::VoiceSystem;

pub struct Companion {
    config: Config,
    memory: MemoryStore,
    history: ConversationLog,
    client: CompletionClient,
    voice: Option<VoiceSystem>,
    image: ImageGenerator,
    style_model: Option<PathBuf>,
    /// 1-based total turns seen, seeded from the loaded history so the
    /// periodic learning rule survives restarts.
    turn_count: u64,
}

impl Companion {
    pub fn new(config: Config) -> Result<Self, String> {
        let mut memory = MemoryStore::load(config.data_dir.join(MEMORY_FILE));
        memory.ensure_initialized();

        let history = ConversationLog::load(config.data_dir.join(HISTORY_FILE));
        let client = CompletionClient::from_config(&config)?;

        let voice = if config.enable_voice {
            VoiceSystem::from_config(&config)
        } else {
            None
        };

        let style_model = image::probe_style_model(&config.style_model_dir);
        if let Some(path) = &style_model {
            log::info!("Style model found at {}", path.display());
        }

        let image = ImageGenerator::from_config(&config);
        let turn_count = history.len() as u64;

        Ok(Self {
            config,
            memory,
            history,
            client,
            voice,
            image,
            style_model,
            turn_count,
        })
    }

    /// Run one conversational turn and return the text to print.
    pub async fn chat(&mut self, user_input: &str) -> String {
        self.turn_count += 1;
        self.history.begin_turn(user_input);

        let system_prompt =
            context::build_system_prompt(&self.memory, &self.history, &self.config.partner_name);
        let response = self.client.respond(&system_prompt, user_input).await;

        self.history.complete_turn(&response);
        self.history.save(&self.memory);

        learning::observe(&mut self.memory, user_input, self.turn_count);

        if let Some(voice) = &self.voice {
            match voice.speak(&response).await {
                Ok(Some(path)) => log::info!("Voice saved: {}", path.display()),
                Ok(None) => {}
                Err(e) => log::warn!("Voice error: {}", e),
            }
        }

        response
    }

    /// `/image`: refuse while untrained, otherwise generate and report.
    pub async fn generate_image(&self, prompt: &str) -> String {
        if self.style_model.is_none() {
            return "I haven't learned your style yet — there's no trained model on disk.\n\n\
                    Type '/train' and I'll walk you through training one from your images."
                .to_string();
        }

        match self.image.generate(prompt).await {
            Ok(path) => format!(
                "Done. I made this one for you.\n\n\
                 Saved to: {}\n\n\
                 Generated with your trained style.",
                path.display()
            ),
            Err(e) => format!(
                "Having trouble generating right now.\n\n\
                 Error: {}\n\n\
                 Try:\n\
                 - a simpler prompt\n\
                 - checking the internet connection\n\
                 - running the local Stable Diffusion server with its API enabled",
                e
            ),
        }
    }

    /// `/train`: guidance for training a style model on a hosted GPU.
    pub fn training_guidance(&self) -> String {
        let examples_dir = &self.config.examples_dir;
        let count = count_training_images(examples_dir);

        if count == 0 {
            return format!(
                "I can't find any images in '{}'.\n\
                 I need at least 10-20 images to learn a style properly.\n\
                 Add some and run '/train' again.",
                examples_dir.display()
            );
        }
        if count < 5 {
            return format!(
                "I only found {} images in '{}'. I need at least 5-10 to learn \
                 anything useful — can you add more?",
                count,
                examples_dir.display()
            );
        }

        format!(
            "STYLE MODEL TRAINING\n\
             ====================\n\n\
             Training data: {count} images in '{dir}'\n\n\
             Steps (hosted GPU, free tier works):\n\
             1. Zip the '{dir}' folder as examples.zip\n\
             2. Open a hosted notebook with a GPU runtime\n\
             3. Run a LoRA fine-tune over the zip (30-60 minutes)\n\
             4. Download the resulting weights\n\
             5. Extract them into '{model_dir}'\n\
             6. Restart me — I detect the model automatically\n\n\
             Once trained, '/image <description>' renders in that style.",
            count = count,
            dir = examples_dir.display(),
            model_dir = self.config.style_model_dir.display(),
        )
    }

    /// `/stats`: relationship stats panel.
    pub fn stats(&self) -> String {
        let days = context::elapsed_days(&self.memory);
        let training_images = count_training_images(&self.config.examples_dir);
        let model_status = if self.style_model.is_some() {
            "trained"
        } else {
            "not trained"
        };

        format!(
            "==========================\n\
             {name} — RELATIONSHIP\n\
             ==========================\n\n\
             Partner:          {partner}\n\
             Days together:    {days}\n\
             Conversations:    {turns}\n\
             Shared memories:  {memories}\n\
             Training images:  {images}\n\
             Style model:      {model}\n",
            name = context::COMPANION_NAME,
            partner = self.config.partner_name,
            days = days,
            turns = self.history.len(),
            memories = self.memory.bucket_len(BUCKET_SHARED_EXPERIENCES),
            images = training_images,
            model = model_status,
        )
    }

    /// `/memory`: the last five shared experiences with timestamps.
    pub fn recent_memories(&self) -> Vec<(String, String)> {
        let entries = self.memory.entries(BUCKET_SHARED_EXPERIENCES);
        let start = entries.len().saturating_sub(5);
        entries[start..].to_vec()
    }

    pub fn memory(&self) -> &MemoryStore {
        &self.memory
    }

    pub fn history(&self) -> &ConversationLog {
        &self.history
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn provider_name(&self) -> &'static str {
        self.client.provider_name()
    }

    pub fn voice_engine(&self) -> Option<&'static str> {
        self.voice.as_ref().map(|v| v.engine_name())
    }

    pub fn style_model_available(&self) -> bool {
        self.style_model.is_some()
    }
}

/// Count candidate training images in a directory (non-recursive).
pub fn count_training_images(dir: &std::path::Path) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        return 0;
    };
    entries
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .path()
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| matches!(e.to_lowercase().as_str(), "png" | "jpg" | "jpeg"))
                .unwrap_or(false)
        })
        .count()
}

/// Last-resort recovery for an unreconcilable construction failure:
/// delete both persisted documents so the next run starts fresh.
pub fn reset_data_files(config: &Config) {
    for file in [MEMORY_FILE, HISTORY_FILE] {
        let path = config.data_dir.join(file);
        match fs::remove_file(&path) {
            Ok(()) => println!("  Deleted: {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Cannot delete {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_count_training_images() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.png"), [0u8]).unwrap();
        fs::write(dir.path().join("b.JPG"), [0u8]).unwrap();
        fs::write(dir.path().join("c.jpeg"), [0u8]).unwrap();
        fs::write(dir.path().join("notes.txt"), [0u8]).unwrap();
        assert_eq!(count_training_images(dir.path()), 3);
    }

    #[test]
    fn test_count_training_images_missing_dir() {
        let dir = tempdir().unwrap();
        assert_eq!(count_training_images(&dir.path().join("absent")), 0);
    }
}
