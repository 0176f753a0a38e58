/*!
 * Token estimation.
 *
 * The batcher only needs a deterministic, monotonic estimate of what a piece
 * of text costs the backend. The heuristic below weights characters by class:
 * latin words tokenize densely, CJK scripts cost roughly one token per glyph.
 */

/// Estimates how many model tokens a text costs
pub trait TokenCounter: Send + Sync {
    /// Token cost of `text`; appending characters never lowers it
    fn count(&self, text: &str) -> usize;
}

/// Character class weighted estimator
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

impl HeuristicTokenCounter {
    pub fn new() -> Self {
        Self
    }

    fn is_cjk(c: char) -> bool {
        matches!(c,
            '\u{4E00}'..='\u{9FFF}'   // CJK unified ideographs
            | '\u{3400}'..='\u{4DBF}' // extension A
            | '\u{3040}'..='\u{30FF}' // hiragana, katakana
            | '\u{AC00}'..='\u{D7AF}' // hangul syllables
            | '\u{F900}'..='\u{FAFF}' // compatibility ideographs
        )
    }

    fn char_weight(c: char) -> f64 {
        if c.is_ascii_alphanumeric() {
            0.25
        } else if c.is_ascii_whitespace() {
            0.05
        } else if c.is_ascii() {
            0.3
        } else if Self::is_cjk(c) {
            1.0
        } else {
            0.8
        }
    }
}

impl TokenCounter for HeuristicTokenCounter {
    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let weight: f64 = text.chars().map(Self::char_weight).sum();
        (weight.round() as usize).max(1)
    }
}
