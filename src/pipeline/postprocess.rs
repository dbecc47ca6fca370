//! Post-processing: deterministic cleanup of model-generated page text.
//!
//! Models sometimes wrap a plain transcription in a code fence, answer with
//! Windows line endings, or sprinkle zero-width characters through CJK text.
//! Every blank line becomes an empty paragraph in the Word document, so long
//! runs of them are squeezed too.
//!
//! ## Rule Order
//!
//! Fences are stripped before line endings are normalised so a fenced CRLF
//! answer still matches; invisible characters are removed before blank-line
//! collapsing so lines holding only a BOM count as blank.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to the raw model output.
///
/// Rules (applied in order):
/// 1. Strip an outer code fence (with or without a language tag)
/// 2. Normalise line endings (CRLF / CR → LF)
/// 3. Remove invisible Unicode (zero-width spaces, BOM, soft hyphens)
/// 4. Trim trailing whitespace per line
/// 5. Collapse 3+ consecutive blank lines down to 2
///
/// The result is not trimmed; the caller decides.
pub fn clean_transcript(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalise_line_endings(&s);
    let s = remove_invisible_chars(&s);
    let s = trim_trailing_whitespace(&s);
    collapse_blank_lines(&s)
}

// ── Rule 1: Strip outer code fence ───────────────────────────────────────────

static RE_OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```[A-Za-z0-9_-]*\r?\n(.*?)\r?\n```\s*$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    match RE_OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Remove invisible Unicode characters ──────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 4: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 5: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{4,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n\n").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fence_with_language() {
        assert_eq!(strip_outer_fence("```text\n第一行\nline\n```"), "第一行\nline");
    }

    #[test]
    fn test_strip_fence_no_lang() {
        assert_eq!(strip_outer_fence("```\nHello\nWorld\n```"), "Hello\nWorld");
    }

    #[test]
    fn test_inner_fence_untouched() {
        let input = "Intro\n```\ncode\n```\nOutro";
        assert_eq!(strip_outer_fence(input), input);
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(trim_trailing_whitespace("  hello   \nworld  "), "  hello\nworld");
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\n\nb"), "a\n\n\nb");
        assert_eq!(collapse_blank_lines("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "中\u{200B}文\u{FEFF}foo\u{00AD}bar";
        assert_eq!(remove_invisible_chars(input), "中文foobar");
    }

    #[test]
    fn test_clean_transcript_full_pipeline() {
        let input = "```markdown\r\n第一段   \r\n\r\n\r\n\r\n\u{FEFF}\r\nSecond\r\n```";
        let result = clean_transcript(input);
        assert!(result.starts_with("第一段\n"));
        assert!(result.ends_with("Second"));
        assert!(!result.contains("\n\n\n\n"));
        assert!(!result.contains('\r'));
    }
}
