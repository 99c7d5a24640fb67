use dotenv::dotenv;

mod ai;
mod companion;
mod config;
mod context;
mod image;
mod learning;
mod memory;
mod repl;
mod speech;

use companion::{Companion, count_training_images, reset_data_files};
use config::Config;
use context::COMPANION_NAME;
use memory::history::HISTORY_FILE;
use memory::store::MEMORY_FILE;
use memory::{BUCKET_PREFERENCES, BUCKET_SHARED_EXPERIENCES};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::init();

    let config = Config::from_env();

    if config.use_remote_completion && config.groq_api_key.is_none() {
        print_api_key_guide();
        return;
    }

    println!("========================================");
    println!("  {} — conversational companion", COMPANION_NAME);
    println!("========================================\n");

    let mut companion = match Companion::new(config.clone()) {
        Ok(c) => c,
        Err(e) => {
            println!("Error during startup: {}", e);
            println!("\nResetting data files...");
            reset_data_files(&config);
            println!("\nPlease run again.");
            return;
        }
    };

    print_status(&companion);
    print_greeting(&companion);
    repl::print_command_list();

    repl::run(&mut companion).await;
}

fn print_status(companion: &Companion) {
    let config = companion.config();
    println!("Memory system status:");
    println!("  Conversations loaded: {}", companion.history().len());
    println!(
        "  Shared experiences:   {}",
        companion.memory().bucket_len(BUCKET_SHARED_EXPERIENCES)
    );
    println!(
        "  Learned preferences:  {}",
        companion.memory().bucket_len(BUCKET_PREFERENCES)
    );
    println!("  Days together:        {}", context::elapsed_days(companion.memory()));
    println!("  Memory file:          {}", config.data_dir.join(MEMORY_FILE).display());
    println!("  Conversation file:    {}", config.data_dir.join(HISTORY_FILE).display());
    println!("  Completion provider:  {}", companion.provider_name());
    match companion.voice_engine() {
        Some(engine) => println!("  Voice engine:         {}", engine),
        None => println!("  Voice engine:         disabled"),
    }
    println!();
}

fn print_greeting(companion: &Companion) {
    println!("{}: Oh, hey. You're here.", COMPANION_NAME);

    if companion.style_model_available() {
        println!("      I've been working with those images you gave me.");
        println!("      Want me to generate something, or are you just here to chat?\n");
        return;
    }

    let image_count = count_training_images(&companion.config().examples_dir);
    if image_count > 0 {
        println!(
            "      Saw you put {} images in the training folder.",
            image_count
        );
        println!("      Type '/train' if you want me to learn that style. Or don't. Whatever.\n");
    } else {
        println!("      Just working on some stuff. What do you need?\n");
    }
}

fn print_api_key_guide() {
    println!("========================================");
    println!("  API KEY NOT SET");
    println!("========================================\n");
    println!("Remote completion is enabled but GROQ_API_KEY is empty.\n");
    println!("Quick setup:");
    println!("  1. Create a free key at your completion provider's console");
    println!("  2. Put it in the environment or a .env file:");
    println!("       GROQ_API_KEY=<your key>");
    println!("  3. Run again\n");
    println!("Or use a local model instead:");
    println!("  1. Set USE_REMOTE_COMPLETION=false");
    println!("  2. Install Ollama and pull a model");
    println!("  3. Run again");
}
