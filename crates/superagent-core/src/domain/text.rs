//! Text cleanup for model replies.

use std::sync::OnceLock;

use regex::Regex;

const FENCE: &str = "```";

fn fenced_block() -> &'static Regex {
    static FENCED: OnceLock<Regex> = OnceLock::new();
    FENCED.get_or_init(|| {
        Regex::new(r"(?s)```[^\n`]*\n(.*?)```").expect("fence pattern is valid")
    })
}

/// Strip markdown fences from a model reply.
///
/// When the reply contains fenced blocks the longest block wins, which drops
/// any prose around it. Leading and trailing fence lines are then removed
/// until none remain.
pub fn clean_code_fences(raw: &str) -> String {
    let mut text = raw.trim().to_string();

    if let Some(block) = fenced_block()
        .captures_iter(&text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .max_by_key(|body| body.len())
    {
        text = block.trim().to_string();
    }

    loop {
        let mut next: &str = &text;
        if next.starts_with(FENCE) {
            next = match next.find('\n') {
                Some(i) => &next[i + 1..],
                None => "",
            };
        }
        let tail = next.trim_end();
        if tail.ends_with(FENCE) {
            next = &tail[..tail.len() - FENCE.len()];
        }
        let next = next.trim().to_string();
        if next == text {
            return text;
        }
        text = next;
    }
}
