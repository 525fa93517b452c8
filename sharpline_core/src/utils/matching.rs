//! Keyword matching for free-text feed fields.
//!
//! Injury descriptions arrive as free text ("left hamstring strain",
//! "ACL - out for season"). Resolution tries a normalized whole-word
//! match first and falls back to fuzzy (Jaro-Winkler) scoring per word,
//! so minor feed typos still resolve instead of dropping to the
//! status-only default.

use strsim::jaro_winkler;

/// How a keyword matched the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchStrength {
    None,
    Fuzzy,
    Exact,
}

/// Result of matching one keyword against a text.
#[derive(Debug, Clone, Copy)]
pub struct KeywordMatch {
    pub strength: MatchStrength,
    pub score: f64,
}

impl KeywordMatch {
    pub fn none() -> Self {
        Self {
            strength: MatchStrength::None,
            score: 0.0,
        }
    }

    pub fn is_match(&self) -> bool {
        self.strength > MatchStrength::None
    }
}

/// Lowercase and reduce to alphanumeric words.
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Match a keyword (single word or phrase) against free text.
///
/// Multi-word keywords must appear as a contiguous normalized phrase.
/// Single words match exactly, then fuzzily against each word of the
/// text at `fuzzy_threshold`.
pub fn match_keyword(text: &str, keyword: &str, fuzzy_threshold: f64) -> KeywordMatch {
    let text = normalize(text);
    let keyword = normalize(keyword);
    if text.is_empty() || keyword.is_empty() {
        return KeywordMatch::none();
    }

    if keyword.contains(' ') {
        // Phrase keyword: require the whole phrase.
        if text.split(' ').collect::<Vec<_>>().windows(keyword.split(' ').count()).any(|w| w.join(" ") == keyword) {
            return KeywordMatch {
                strength: MatchStrength::Exact,
                score: 1.0,
            };
        }
        return KeywordMatch::none();
    }

    let mut best = 0.0f64;
    for word in text.split(' ') {
        if word == keyword {
            return KeywordMatch {
                strength: MatchStrength::Exact,
                score: 1.0,
            };
        }
        best = best.max(jaro_winkler(word, &keyword));
    }

    if best >= fuzzy_threshold {
        KeywordMatch {
            strength: MatchStrength::Fuzzy,
            score: best,
        }
    } else {
        KeywordMatch::none()
    }
}
