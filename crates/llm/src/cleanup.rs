//! Speech-safe answer cleanup
//!
//! Raw model output is sanitized before it reaches the synthesizer: markdown
//! markers are stripped, repeated terminal punctuation collapsed, and a
//! closing period appended when missing. The pass is idempotent, so cleaned
//! text survives a second pass unchanged.

/// Sanitize raw model output into text safe to hand to speech synthesis
pub fn clean_for_speech(raw: &str) -> String {
    // Strip markdown emphasis and heading markers line by line
    let mut clean = String::with_capacity(raw.len());
    for (i, line) in raw.lines().enumerate() {
        if i > 0 {
            clean.push('\n');
        }
        let line = line.trim_start().trim_start_matches('#').trim_start();
        clean.push_str(&line.replace("**", "").replace('*', ""));
    }

    // Doubled hashes are heading noise wherever they appear
    while clean.contains("##") {
        clean = clean.replace("##", "");
    }

    // Collapse ellipses and doubled periods to a single period
    while clean.contains("..") {
        clean = clean.replace("..", ".");
    }

    let mut clean = clean.trim().to_string();

    // Guarantee sentence-terminal punctuation
    if !clean.is_empty() && !clean.ends_with(['.', '?', '!']) {
        clean.push('.');
    }

    clean
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_markdown_markers() {
        let cleaned = clean_for_speech("**Two** plus *two* is four");
        assert_eq!(cleaned, "Two plus two is four.");
        assert!(!cleaned.contains("**"));
    }

    #[test]
    fn test_strips_heading_markers() {
        let cleaned = clean_for_speech("## Answer\nFour.");
        assert_eq!(cleaned, "Answer\nFour.");
        assert!(!cleaned.contains("##"));
    }

    #[test]
    fn test_strips_heading_markers_after_indent() {
        assert_eq!(clean_for_speech(" # Heading"), "Heading.");
        assert_eq!(clean_for_speech("   ## Indented\nFour."), "Indented\nFour.");
    }

    #[test]
    fn test_collapses_ellipses() {
        assert_eq!(clean_for_speech("Well... maybe"), "Well. maybe.");
        assert_eq!(clean_for_speech("Four.."), "Four.");
        assert_eq!(clean_for_speech("Wait....."), "Wait.");
    }

    #[test]
    fn test_appends_terminal_period() {
        assert_eq!(clean_for_speech("It is four"), "It is four.");
        assert_eq!(clean_for_speech("Is it four?"), "Is it four?");
        assert_eq!(clean_for_speech("Four!"), "Four!");
    }

    #[test]
    fn test_inline_double_hash_removed() {
        let cleaned = clean_for_speech("Four ## is the answer");
        assert!(!cleaned.contains("##"));
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "**Bold** and... messy##",
            "Already clean text.",
            "Question without ending",
            " # Heading",
        ];
        for input in inputs {
            let once = clean_for_speech(input);
            let twice = clean_for_speech(&once);
            assert_eq!(once, twice, "cleanup not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(clean_for_speech(""), "");
        assert_eq!(clean_for_speech("   "), "");
    }
}
