use std::fs;
use std::path::Path;

use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;

/// Returned instead of an empty reply so the story never goes silent.
pub const PLACEHOLDER_REPLY: &str = "The story continues.";

pub const CENSOR_MASK: &str = "****";

/// Questions the model tacks on to hand the turn back. Only stripped when trailing.
const META_QUESTIONS: &[&str] = &[
    "what will you do",
    "how do you respond",
    "what do you do",
    "what is your next move",
    "what would you like to do",
    "what would you like to say",
    "how will you proceed",
];

static TRAILING_QUESTION_RE: Lazy<Regex> = Lazy::new(|| {
    let alternatives = META_QUESTIONS
        .iter()
        .map(|q| regex::escape(q))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)(?:{alternatives})[.?]?\s*$")).expect("invalid meta-question regex")
});

static TRAILING_PUNCT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,.]+\s*$").expect("invalid trailing punctuation regex"));

/// Banned words, stored lowercase with their whole-word patterns precompiled.
#[derive(Debug, Clone, Default)]
pub struct BanList {
    patterns: Vec<Regex>,
}

impl BanList {
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .filter_map(|w| {
                Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&w)))
                    .map_err(|e| tracing::warn!(word = %w, error = %e, "skipping banned word"))
                    .ok()
            })
            .collect();

        Self { patterns }
    }

    /// One word per line. A missing file yields an empty list.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::warn!(path = %path.display(), "banned word file not found, censorship list is empty");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading banned words from {}", path.display()))?;
        let list = Self::new(raw.lines());
        tracing::info!(count = list.len(), "loaded banned words");
        Ok(list)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn censor(&self, text: &str) -> String {
        self.patterns.iter().fold(text.to_string(), |acc, re| {
            re.replace_all(&acc, CENSOR_MASK).into_owned()
        })
    }
}

/// Cleans a narrator reply before it is shown, spoken or mined for events.
#[derive(Debug, Clone, Default)]
pub struct ResponseSanitizer {
    banned: BanList,
}

impl ResponseSanitizer {
    pub fn new(banned: BanList) -> Self {
        Self { banned }
    }

    pub fn sanitize(&self, text: &str, censored: bool) -> String {
        let mut reply = strip_trailing_prompts(text.trim());

        if reply.is_empty() {
            return PLACEHOLDER_REPLY.to_string();
        }

        if !reply.ends_with(['.', '!', '?']) {
            reply.push('.');
        }

        if censored {
            reply = self.banned.censor(&reply);
        }

        reply
    }
}

/// Repeats until stable so a second pass never finds anything new to strip.
fn strip_trailing_prompts(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let without_question = TRAILING_QUESTION_RE.replace(&current, "");
        let without_punct = TRAILING_PUNCT_RE.replace(without_question.trim_end(), "");
        let next = without_punct.trim().to_string();
        if next == current {
            return next;
        }
        current = next;
    }
}
