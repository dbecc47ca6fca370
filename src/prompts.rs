//! Fixed prompt fragments and transcript placeholders.
//!
//! The primary instruction text lives in `setting/mainprompt.txt` and is
//! owned by the operator; this module only holds the pieces the pipeline
//! itself contributes: the connective phrase used to attach optional
//! instructions, and the placeholders written into the transcript when a page
//! yields no usable text.

/// Connective phrase prepended to a non-empty optional instruction block.
pub const ADDITIONAL_PREFIX: &str = "Additionally, I also need: ";

/// Written to the transcript when the model answered with no text.
pub const NO_TEXT_PLACEHOLDER: &str = "[No text detected]";

/// Marker wrapped around the error placeholder so failed pages stand out when
/// proofreading the document.
pub const ERROR_MARKER: &str = "**********";

/// Build the transcript placeholder for a page whose transcription failed.
pub fn error_placeholder(reason: &str) -> String {
    format!("{ERROR_MARKER}[Error extracting text: {reason}]{ERROR_MARKER}")
}

/// Whether a transcript entry is an error placeholder.
pub fn is_error_placeholder(text: &str) -> bool {
    text.starts_with(ERROR_MARKER)
        && text.ends_with(ERROR_MARKER)
        && text.contains("[Error extracting text: ")
}

/// Prefix an optional instruction block with [`ADDITIONAL_PREFIX`].
///
/// Empty (or whitespace-only) input stays empty so callers can append the
/// result unconditionally.
pub fn additional_instructions(text: &str) -> String {
    let text = text.trim();
    if text.is_empty() {
        String::new()
    } else {
        format!("{ADDITIONAL_PREFIX}{text}")
    }
}

/// Merge the primary prompt with an optional block into the instruction text
/// sent alongside every page image.
pub fn merge_instructions(main_prompt: &str, additional: &str) -> String {
    let main_prompt = main_prompt.trim();
    let additional = additional.trim();
    match (main_prompt.is_empty(), additional.is_empty()) {
        (_, true) => main_prompt.to_string(),
        (true, false) => additional.to_string(),
        (false, false) => format!("{main_prompt}\n{additional}"),
    }
}
