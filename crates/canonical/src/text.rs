//! Text normalization for titles and body text.
//!
//! `normalize` is the single source of truth for turning raw scraped text
//! into the form stored as `normalized_title` / `normalized_text` and hashed
//! into `title_hash` / `content_hash`. Every comparison downstream (content
//! hashing, simhash, trigram and token Jaccard) operates on its output, so
//! changing this function changes what counts as "the same article".

use unicode_normalization::UnicodeNormalization;

/// Lowercase, drop ASCII/C0 control characters, collapse whitespace runs to
/// a single space, and trim the result.
///
/// Unicode is first folded through NFKC so that visually identical titles
/// scraped from different sources (composed vs. decomposed accents, full-width
/// punctuation variants) normalize to the same bytes.
pub fn normalize(s: &str) -> String {
    let nfkc: String = s.nfkc().collect();

    let mut stripped = String::with_capacity(nfkc.len());
    for ch in nfkc.chars() {
        if is_control(ch) {
            continue;
        }
        stripped.push(ch);
    }

    collapse_whitespace(&stripped.to_lowercase())
}

fn is_control(ch: char) -> bool {
    ch.is_control()
}

/// Collapses consecutive whitespace into single ASCII spaces and trims the
/// edges. Does not lowercase or strip control characters — see [`normalize`]
/// for the full pipeline.
pub fn collapse_whitespace(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    let mut in_whitespace = true;

    for ch in text.chars() {
        if ch.is_whitespace() {
            if !in_whitespace {
                normalized.push(' ');
                in_whitespace = true;
            }
        } else {
            normalized.push(ch);
            in_whitespace = false;
        }
    }

    if normalized.ends_with(' ') {
        normalized.pop();
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_and_trims() {
        assert_eq!(normalize("  Hello   World  "), "hello world");
    }

    #[test]
    fn strips_control_chars() {
        assert_eq!(normalize("hi\x00\x07there"), "hithere");
    }

    #[test]
    fn normalizes_newlines_and_tabs() {
        assert_eq!(normalize("Line1\n\nLine2\tEnd"), "line1 line2 end");
    }

    #[test]
    fn empty_and_whitespace_only() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   \n\t  "), "");
    }

    #[test]
    fn nfkc_folds_compatibility_forms() {
        // Full-width "Ａ" (U+FF21) folds to ASCII "a" under NFKC + lowercase.
        assert_eq!(normalize("\u{FF21}BC"), "abc");
    }
}
