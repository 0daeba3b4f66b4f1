//! Text helpers shared by query building and prompting
//!
//! Normalization mirrors what the ingestion side stores in the
//! `normalized_*` columns, so both sides must stay in lockstep.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Greek shorthand users type in chat, keyed by the accent-free lowercase form
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("τρ", "τώρα"),
    ("σμρ", "σήμερα"),
    ("αυρ", "αύριο"),
    ("μθα", "μεθαύριο"),
    ("σκ", "Σάββατο-Κυριακή (Saturday, Sunday)"),
    ("πσκ", "Παρασκευή-Σάββατο-Κυριακή (Friday, Saturday, Sunday)"),
];

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\w+\b").expect("word pattern is valid"));

/// Normalize free text for comparison against `normalized_*` columns.
///
/// NFC, lowercase, strip combining marks, fold final sigma, drop ASCII
/// punctuation plus the Greek question mark and ano teleia, collapse
/// whitespace.
pub fn normalize_text(input: &str) -> String {
    let lowered: String = input.nfc().collect::<String>().to_lowercase();

    let stripped: String = lowered
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c == 'ς' { 'σ' } else { c })
        .filter(|c| !c.is_ascii_punctuation() && *c != '·')
        .collect();

    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase and strip accents without touching punctuation
fn fold_accents(word: &str) -> String {
    word.to_lowercase()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Replace known Greek chat abbreviations with their full forms.
///
/// Matching is whole-word and accent-insensitive; every other word is
/// left exactly as typed.
pub fn expand_abbreviations(input: &str) -> String {
    WORD.replace_all(input, |caps: &regex::Captures<'_>| {
        let word = &caps[0];
        let folded = fold_accents(word);
        ABBREVIATIONS
            .iter()
            .find(|(short, _)| *short == folded)
            .map_or_else(|| word.to_string(), |(_, full)| (*full).to_string())
    })
    .into_owned()
}

/// Language of an utterance, as far as fixed replies are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Greek,
    English,
}

impl Language {
    /// Greek when Greek letters dominate the alphabetic characters.
    /// Anything else gets English fixed texts; the model still mirrors the
    /// user's language for generated replies.
    pub fn detect(text: &str) -> Self {
        let (greek, other) = text
            .chars()
            .filter(|c| c.is_alphabetic())
            .fold((0usize, 0usize), |(g, o), c| {
                if is_greek(c) {
                    (g + 1, o)
                } else {
                    (g, o + 1)
                }
            });
        if greek > 0 && greek >= other {
            Language::Greek
        } else {
            Language::English
        }
    }

    /// Pick the variant for this language
    pub fn pick<'a>(self, greek: &'a str, english: &'a str) -> &'a str {
        match self {
            Language::Greek => greek,
            Language::English => english,
        }
    }
}

fn is_greek(c: char) -> bool {
    matches!(c, '\u{0370}'..='\u{03FF}' | '\u{1F00}'..='\u{1FFF}')
}
