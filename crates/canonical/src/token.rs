//! Shared tokenization for simhash and n-gram comparisons.
//!
//! The dedup cascade needs the same token stream wherever it compares two
//! pieces of text, so there is exactly one tokenizer: split normalized text
//! on runs of characters that are not letters or digits (Unicode-aware),
//! dropping empty tokens.

/// Splits `text` into word tokens on runs of non-alphanumeric characters.
///
/// Expects `text` to already be run through [`crate::normalize`]; this
/// function does not lowercase or trim on its own.
pub fn word_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            current.push(ch);
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Jaccard similarity of the word-token sets of two strings (the spec's
/// "Token Jaccard", used for `title_overlap` in the semantic stage).
pub fn token_jaccard(a: &str, b: &str) -> f64 {
    use std::collections::HashSet;

    let set_a: HashSet<String> = word_tokens(a).into_iter().collect();
    let set_b: HashSet<String> = word_tokens(b).into_iter().collect();

    jaccard(&set_a, &set_b)
}

/// Character trigram set of a string (Unicode scalar values, not bytes).
pub fn trigrams(text: &str) -> std::collections::HashSet<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = std::collections::HashSet::new();
    if chars.len() < 3 {
        if !chars.is_empty() {
            out.insert(chars.iter().collect());
        }
        return out;
    }
    for window in chars.windows(3) {
        out.insert(window.iter().collect());
    }
    out
}

/// Jaccard similarity of the character-trigram sets of two normalized titles
/// (the spec's "Trigram Jaccard").
pub fn trigram_jaccard(a: &str, b: &str) -> f64 {
    jaccard(&trigrams(a), &trigrams(b))
}

fn jaccard(a: &std::collections::HashSet<String>, b: &std::collections::HashSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.union(b).count();
    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}
