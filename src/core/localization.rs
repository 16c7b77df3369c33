/// Per-language string tables and `str:<key>` indirection.

use rustc_hash::FxHashMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::core::document::{DocumentError, DocumentFormat, Lenient};

/// Prefix marking a content string as a localization key.
pub const KEY_PREFIX: &str = "str:";

#[derive(Debug, Error)]
pub enum LocalizationError {
    #[error("string table error: {0}")]
    Document(#[from] DocumentError),
}

/// Exact-match key to text mapping for one language.
///
/// Tables are never merged: a key missing here does not fall through to
/// another language.
#[derive(Debug, Clone, Default)]
pub struct LocalizationTable {
    language: String,
    entries: FxHashMap<String, String>,
}

impl LocalizationTable {
    pub fn new(language: &str) -> Self {
        Self {
            language: language.to_string(),
            entries: FxHashMap::default(),
        }
    }

    /// Load a table from a flat `{ key: text }` document.
    pub fn load(language: &str, path: &Path) -> Result<LocalizationTable, LocalizationError> {
        let contents = std::fs::read_to_string(path).map_err(DocumentError::from)?;
        Self::parse(language, &contents, DocumentFormat::from_path(path))
    }

    /// Parse a table. Entries whose value is not a string are skipped.
    pub fn parse(
        language: &str,
        input: &str,
        format: DocumentFormat,
    ) -> Result<LocalizationTable, LocalizationError> {
        let raw: FxHashMap<String, Lenient<String>> = format.parse(input)?;
        let total = raw.len();
        let entries: FxHashMap<String, String> = raw
            .into_iter()
            .filter_map(|(key, value)| value.into_option().map(|text| (key, text)))
            .collect();
        if entries.len() < total {
            debug!(
                language,
                skipped = total - entries.len(),
                "Skipped non-string entries in string table"
            );
        }
        Ok(LocalizationTable {
            language: language.to_string(),
            entries,
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: &str, text: &str) {
        self.entries.insert(key.to_string(), text.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Resolve a content string.
    ///
    /// `"str:<key>"` becomes the table's text for `key`, or the bare key when
    /// the table lacks it. Any other string is returned verbatim.
    pub fn resolve(&self, raw: &str) -> String {
        self.lookup(raw).text
    }

    /// Like [`resolve`](Self::resolve), also reporting a missed key.
    pub fn lookup(&self, raw: &str) -> Resolved {
        match raw.strip_prefix(KEY_PREFIX) {
            Some(key) => match self.get(key) {
                Some(text) => Resolved {
                    text: text.to_string(),
                    missing_key: None,
                },
                None => Resolved {
                    text: key.to_string(),
                    missing_key: Some(key.to_string()),
                },
            },
            None => Resolved {
                text: raw.to_string(),
                missing_key: None,
            },
        }
    }
}

/// Outcome of resolving one content string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub text: String,
    /// The key that had no translation, if the string was an indirection.
    pub missing_key: Option<String>,
}

/// Path of a language's table inside a strings directory.
pub fn table_path(strings_dir: &Path, language: &str) -> std::path::PathBuf {
    strings_dir.join(format!("{language}.json"))
}

/// Load `language`, or `fallback` when that fails.
pub fn load_with_fallback(
    strings_dir: &Path,
    language: &str,
    fallback: &str,
) -> Result<LocalizationTable, LocalizationError> {
    match LocalizationTable::load(language, &table_path(strings_dir, language)) {
        Ok(table) => Ok(table),
        Err(e) if language != fallback => {
            tracing::warn!(language, fallback, error = %e, "String table failed to load, using fallback");
            LocalizationTable::load(fallback, &table_path(strings_dir, fallback))
        }
        Err(e) => Err(e),
    }
}
