//! Settings directory: `conf.txt`, prompt files, credential store, model list.
//!
//! Everything here is read once at the start of a run and treated as
//! immutable afterwards. Missing `conf.txt` or `mainprompt.txt` is fatal;
//! the credential file and model list are convenience stores for the CLI and
//! degrade to empty values instead.

use crate::error::Pdf2DocxError;
use crate::prompts::{additional_instructions, merge_instructions};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// File name of the key/value settings file inside the settings directory.
pub const CONF_FILE: &str = "conf.txt";
/// File name of the primary instruction text.
pub const MAIN_PROMPT_FILE: &str = "mainprompt.txt";
/// File name of the selectable model list.
pub const MODEL_LIST_FILE: &str = "model.txt";
/// Default name of the single-line credential file.
pub const DEFAULT_KEY_FILE: &str = "API_key.txt";

/// `conf.txt` key holding the directory of the pdfium library.
pub const KEY_PDFIUM_PATH: &str = "pdfium_path";
/// `conf.txt` key naming the LLM provider.
pub const KEY_PROVIDER: &str = "provider";
/// `conf.txt` key naming the font used for CJK characters.
pub const KEY_CJK_FONT: &str = "cjk_font";
/// `conf.txt` key naming the font used for every other character.
pub const KEY_LATIN_FONT: &str = "latin_font";

/// How a prompt file is turned into instruction text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode {
    /// Trimmed content, returned as-is. Used for the primary prompt.
    Verbatim,
    /// Non-empty content is prefixed with
    /// [`crate::prompts::ADDITIONAL_PREFIX`].
    Additional,
}

/// Parsed `conf.txt` contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    /// Look up a value; empty values count as absent.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Directory of the pdfium library, if configured.
    pub fn pdfium_path(&self) -> Option<PathBuf> {
        self.get(KEY_PDFIUM_PATH).map(PathBuf::from)
    }
}

impl FromIterator<(String, String)> for Settings {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Parse `key: "value"` lines. Quotes around the value are optional; lines
/// without a `:` are ignored. Only the first `:` separates, so values may
/// contain colons (Windows paths, URLs).
pub fn parse_config(content: &str) -> Settings {
    content
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| {
            (
                key.trim().to_string(),
                value.trim().trim_matches('"').to_string(),
            )
        })
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Read and parse a settings file. A missing file is an error, never an
/// empty default.
pub fn read_config(path: &Path) -> Result<Settings, Pdf2DocxError> {
    let content = read_required(path)?;
    let settings = parse_config(&content);
    debug!("Loaded {} setting(s) from {}", settings.len(), path.display());
    Ok(settings)
}

/// Read a prompt file according to `mode`.
pub fn read_prompt(path: &Path, mode: PromptMode) -> Result<String, Pdf2DocxError> {
    let content = read_required(path)?;
    Ok(match mode {
        PromptMode::Verbatim => content.trim().to_string(),
        PromptMode::Additional => additional_instructions(&content),
    })
}

/// Everything a run needs from the settings directory.
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub config: Settings,
    /// Primary prompt merged with the operator's optional instructions.
    pub instructions: String,
}

/// Load `conf.txt` and `mainprompt.txt` from `dir` and merge the prompt with
/// the optional instruction block.
pub fn load(dir: &Path, extra_instructions: Option<&str>) -> Result<LoadedSettings, Pdf2DocxError> {
    let config = read_config(&dir.join(CONF_FILE))?;
    let main_prompt = read_prompt(&dir.join(MAIN_PROMPT_FILE), PromptMode::Verbatim)?;
    if main_prompt.is_empty() {
        warn!("{} is empty; pages are sent without instructions", MAIN_PROMPT_FILE);
    }
    let extra = additional_instructions(extra_instructions.unwrap_or(""));
    Ok(LoadedSettings {
        config,
        instructions: merge_instructions(&main_prompt, &extra),
    })
}

/// Load the selectable model identifiers, one per line. A missing file yields
/// an empty list.
pub fn load_models(path: &Path) -> Vec<String> {
    match fs::read_to_string(path) {
        Ok(content) => content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Single-line credential file.
///
/// Reads and writes are independent; there is no locking.
#[derive(Debug, Clone)]
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    /// Open the store, creating an empty file when none exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Pdf2DocxError> {
        let path = path.into();
        if !path.exists() {
            fs::write(&path, "").map_err(|source| Pdf2DocxError::OutputWriteFailed {
                path: path.clone(),
                source,
            })?;
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The stored credential, trimmed. Any read failure yields `""`.
    pub fn read_key(&self) -> String {
        fs::read_to_string(&self.path)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    /// Replace the stored credential.
    pub fn write_key(&self, key: &str) -> Result<(), Pdf2DocxError> {
        fs::write(&self.path, key.trim()).map_err(|source| Pdf2DocxError::OutputWriteFailed {
            path: self.path.clone(),
            source,
        })
    }
}

fn read_required(path: &Path) -> Result<String, Pdf2DocxError> {
    if !path.exists() {
        return Err(Pdf2DocxError::SettingsNotFound {
            path: path.to_path_buf(),
        });
    }
    fs::read_to_string(path).map_err(|source| Pdf2DocxError::SettingsUnreadable {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parse_config_strips_quotes_and_ignores_bare_lines() {
        let s = parse_config(
            "pdfium_path: \"C:\\\\pdfium\\\\bin\"\nprovider: gemini\njust a comment\n  spaced :  \"v\"  \n",
        );
        assert_eq!(s.get("pdfium_path"), Some("C:\\\\pdfium\\\\bin"));
        assert_eq!(s.get("provider"), Some("gemini"));
        assert_eq!(s.get("spaced"), Some("v"));
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn parse_config_splits_on_first_colon() {
        let s = parse_config("endpoint: \"http://localhost:11434\"");
        assert_eq!(s.get("endpoint"), Some("http://localhost:11434"));
    }

    #[test]
    fn empty_value_counts_as_absent() {
        let s = parse_config("pdfium_path: \"\"");
        assert_eq!(s.get("pdfium_path"), None);
        assert!(s.pdfium_path().is_none());
    }

    #[test]
    fn read_config_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        let err = read_config(&dir.path().join("conf.txt")).unwrap_err();
        assert!(matches!(err, Pdf2DocxError::SettingsNotFound { .. }));
    }

    #[test]
    fn read_prompt_modes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prompt.txt");
        fs::write(&path, "  keep the footnotes \n").unwrap();

        assert_eq!(
            read_prompt(&path, PromptMode::Verbatim).unwrap(),
            "keep the footnotes"
        );
        assert_eq!(
            read_prompt(&path, PromptMode::Additional).unwrap(),
            "Additionally, I also need: keep the footnotes"
        );

        fs::write(&path, "\n \n").unwrap();
        assert_eq!(read_prompt(&path, PromptMode::Additional).unwrap(), "");
    }

    #[test]
    fn load_merges_prompt_and_extra() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONF_FILE), "provider: \"gemini\"\n").unwrap();
        fs::write(dir.path().join(MAIN_PROMPT_FILE), "Transcribe the page.\n").unwrap();

        let loaded = load(dir.path(), Some("mark headings")).unwrap();
        assert_eq!(loaded.config.get(KEY_PROVIDER), Some("gemini"));
        assert_eq!(
            loaded.instructions,
            "Transcribe the page.\nAdditionally, I also need: mark headings"
        );

        let loaded = load(dir.path(), None).unwrap();
        assert_eq!(loaded.instructions, "Transcribe the page.");
    }

    #[test]
    fn load_requires_main_prompt() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONF_FILE), "provider: gemini\n").unwrap();
        let err = load(dir.path(), None).unwrap_err();
        assert!(matches!(err, Pdf2DocxError::SettingsNotFound { ref path } if path.ends_with(MAIN_PROMPT_FILE)));
    }

    #[test]
    fn model_list_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(MODEL_LIST_FILE);
        fs::write(&path, "gemini-2.5-flash\n\n  gemini-2.5-pro  \n\n").unwrap();
        assert_eq!(load_models(&path), vec!["gemini-2.5-flash", "gemini-2.5-pro"]);
        assert!(load_models(&dir.path().join("missing.txt")).is_empty());
    }

    #[test]
    fn key_store_creates_reads_and_writes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_KEY_FILE);
        let store = KeyStore::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(store.read_key(), "");

        store.write_key("  secret-key \n").unwrap();
        assert_eq!(store.read_key(), "secret-key");
        assert_eq!(fs::read_to_string(&path).unwrap(), "secret-key");
    }
}
