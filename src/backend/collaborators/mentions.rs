//! Mention extraction
//!
//! Mentions are `@name` tokens where the name is made of ASCII letters,
//! digits and underscores. The result keeps first-occurrence order and
//! contains each name once.

use once_cell::sync::Lazy;
use regex::Regex;

static MENTION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@([A-Za-z0-9_]+)").expect("mention pattern is a valid regex"));

/// Derives the mention list of a message from its content
pub trait MentionExtractor: Send + Sync {
    fn extract(&self, content: &str) -> Vec<String>;
}

/// Default extractor matching `@word` tokens
#[derive(Debug, Clone, Copy, Default)]
pub struct AtMentionExtractor;

impl MentionExtractor for AtMentionExtractor {
    fn extract(&self, content: &str) -> Vec<String> {
        let mut mentions: Vec<String> = Vec::new();
        for capture in MENTION_PATTERN.captures_iter(content) {
            let name = &capture[1];
            if !mentions.iter().any(|existing| existing == name) {
                mentions.push(name.to_string());
            }
        }
        mentions
    }
}
