pub mod prompt;

pub use prompt::{build_system_prompt, elapsed_days};

/// The companion's name, used in prompts and rendered output.
pub const COMPANION_NAME: &str = "Luma";
