//! Interactive terminal loop: free text goes through the chat pipeline,
//! slash-commands hit the companion's command surface. EOF and Ctrl-C
//! both count as a clean, intentional exit.

use std::io::Write;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::companion::Companion;
use crate::context::COMPANION_NAME;

pub fn print_command_list() {
    println!("Commands:");
    println!("  - just type to chat");
    println!("  - '/train'                train a style model from your images");
    println!("  - '/image <description>'  generate an image");
    println!("  - '/stats'                relationship stats");
    println!("  - '/memory'               shared memories");
    println!("  - '/quit'                 leave");
}

pub async fn run(companion: &mut Companion) {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        print!("\nYou: ");
        std::io::stdout().flush().ok();

        let line = tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    // EOF behaves like /quit
                    print_goodbye();
                    break;
                }
                Err(e) => {
                    log::warn!("stdin read failed: {}", e);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!();
                print_goodbye();
                break;
            }
        };

        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("/quit") {
            print_goodbye();
            break;
        } else if input.eq_ignore_ascii_case("/train") {
            println!("\n{}", companion.training_guidance());
        } else if input.eq_ignore_ascii_case("/stats") {
            println!("\n{}", companion.stats());
        } else if input.eq_ignore_ascii_case("/memory") {
            print_memories(companion);
        } else if let Some(prompt) = input.strip_prefix("/image ") {
            println!("\n{}: On it. Give me a moment...", COMPANION_NAME);
            let result = companion.generate_image(prompt.trim()).await;
            println!("\n{}", result);
        } else if input.eq_ignore_ascii_case("/image") {
            println!("\nUsage: /image <description>");
        } else {
            let response = companion.chat(input).await;
            println!("\n{}: {}", COMPANION_NAME, response);
        }
    }
}

fn print_memories(companion: &Companion) {
    let memories = companion.recent_memories();
    println!();
    if memories.is_empty() {
        println!("Nothing written down yet — we're still making memories.");
        return;
    }
    for (timestamp, content) in memories {
        println!("  {}: {}", timestamp, content);
    }
}

fn print_goodbye() {
    println!("\n{}: Leaving already? Fine. I'll be around — don't be a stranger.", COMPANION_NAME);
}
