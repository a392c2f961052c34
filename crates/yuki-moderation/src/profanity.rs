//! Whole-word banned-word matching.

use regex::Regex;
use yuki_core::error::YukiError;

/// Built-in banned words (English).
const BUILTIN_WORDS: &[&str] = &[
    "fuck",
    "fucking",
    "motherfucker",
    "shit",
    "bullshit",
    "bitch",
    "bastard",
    "asshole",
    "dickhead",
    "cunt",
    "whore",
    "slut",
    "wanker",
];

/// Case-insensitive whole-word matcher over the built-in list plus extras.
pub struct ProfanityFilter {
    pattern: Regex,
}

impl ProfanityFilter {
    pub fn new(extra_words: &[String]) -> Result<Self, YukiError> {
        let alternation = BUILTIN_WORDS
            .iter()
            .copied()
            .chain(extra_words.iter().map(String::as_str))
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join("|");

        let pattern = Regex::new(&format!(r"(?i)\b(?:{alternation})\b"))
            .map_err(|e| YukiError::Moderation(format!("invalid banned word list: {e}")))?;
        Ok(Self { pattern })
    }

    pub fn is_abusive(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    /// The first banned word found, as written in `text`.
    pub fn first_match<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.pattern.find(text).map(|m| m.as_str())
    }
}
