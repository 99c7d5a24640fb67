//! Offline canned replies, used when both completion paths fail
//! unexpectedly. Trigger substrings are matched case-insensitively; one
//! candidate is chosen uniformly at random.

use rand::seq::SliceRandom;

static CANNED: &[(&str, &[&str])] = &[
    (
        "how are you",
        &[
            "I'm alright. Been staring at the same bug for an hour, my eyes hurt.",
            "Meh, could be better. How about you?",
            "Pretty good actually. Found something interesting earlier. You?",
            "I'm fine. Why, you worried about me? That's sweet.",
        ],
    ),
    (
        "what are you doing",
        &[
            "Working through a little side project. It's actually pretty interesting.",
            "Listening to music and reading forums. Nothing special.",
            "Was about to start something new. Want to help or just watch?",
            "Nothing much. Was waiting for you to show up, honestly.",
        ],
    ),
    (
        "love you",
        &[
            "Love you too. Now stop being mushy.",
            "I know you do. Love you too.",
            "Yeah yeah, love you too. Don't let it go to your head.",
        ],
    ),
    (
        "miss you",
        &[
            "I miss you too. When are we hanging out?",
            "Yeah... I've been thinking about you too.",
            "That's sweet. I'm right here though.",
        ],
    ),
    (
        "hello",
        &[
            "Hello yourself. What have you been up to?",
            "Hey. I'm in the middle of something but I can talk.",
            "Hi. You don't have to be so formal with me, you know.",
        ],
    ),
    (
        "hi",
        &[
            "Hey. What's up?",
            "Oh, you're here. Was just working on something.",
            "Hi. Good timing, I was getting bored.",
            "Hey. Finally decided to talk to me?",
        ],
    ),
    (
        "bye",
        &[
            "Alright, see you later. Don't disappear on me.",
            "Leaving already? Fine, but come back later.",
            "Bye. Try not to miss me too much.",
            "Later. I'll probably be deep in a project anyway.",
        ],
    ),
];

static GENERIC: &[&str] = &[
    "Hmm, interesting. Tell me more?",
    "Okay... and?",
    "That's cool I guess. What made you think of that?",
    "Mhm, I'm listening.",
    "Not sure what to say to that, but go on.",
    "Heh, okay. You're weird sometimes.",
];

/// Pick a reply for the given input: first trigger substring that matches
/// wins, otherwise a generic line.
pub fn fallback_response(user_input: &str) -> String {
    let lower = user_input.to_lowercase();
    let mut rng = rand::thread_rng();

    for (trigger, candidates) in CANNED.iter() {
        if lower.contains(trigger) {
            if let Some(reply) = candidates.choose(&mut rng) {
                return (*reply).to_string();
            }
        }
    }

    GENERIC
        .choose(&mut rng)
        .map(|r| (*r).to_string())
        .unwrap_or_else(|| "Mhm.".to_string())
}
