/*!
 * Dialogue line reformatting.
 *
 * Models sometimes merge a two-speaker subtitle ("-Hi!\n-Hello.") into one
 * line ("-Hi! -Hello."). The formatter puts each speaker back on its own
 * line. Hyphenated words are left alone since the hyphen is not preceded by
 * whitespace.
 */

use once_cell::sync::Lazy;
use regex::Regex;

// @const: A speaker dash after whitespace, followed by speech
static DIALOGUE_DETECT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+-[^\s-]").unwrap()
});

// @const: Split point before each speaker dash
static DIALOGUE_SPLIT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\s+-([^-])").unwrap()
});

/// Put every speaker of a merged dialogue line on its own line
pub fn format_dialogue_lines(text: &str) -> String {
    if !DIALOGUE_DETECT_REGEX.is_match(text) {
        return text.to_string();
    }

    let formatted = DIALOGUE_SPLIT_REGEX.replace_all(text, |caps: &regex::Captures| {
        let next = &caps[1];
        if next.trim().is_empty() {
            "\n-".to_string()
        } else {
            format!("\n-{}", next)
        }
    });

    formatted.trim().to_string()
}
