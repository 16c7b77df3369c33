/// Structured-document parsing shared by content, string tables and config.

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("RON error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// On-disk syntax of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Ron,
}

impl DocumentFormat {
    /// `.ron` files are RON; everything else is treated as JSON.
    pub fn from_path(path: &Path) -> DocumentFormat {
        match path.extension().and_then(|s| s.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("ron") => DocumentFormat::Ron,
            _ => DocumentFormat::Json,
        }
    }

    pub fn parse<T: DeserializeOwned>(&self, input: &str) -> Result<T, DocumentError> {
        match self {
            DocumentFormat::Json => Ok(serde_json::from_str(input)?),
            DocumentFormat::Ron => Ok(ron::Options::default()
                .with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
                .from_str(input)?),
        }
    }
}

/// Read and parse a file, picking the format from its extension.
pub fn load<T: DeserializeOwned>(path: &Path) -> Result<T, DocumentError> {
    let contents = std::fs::read_to_string(path)?;
    DocumentFormat::from_path(path).parse(&contents)
}

/// A leaf value that tolerates the wrong type.
///
/// Content documents are hand-written; a number where a string belongs
/// should drop that one field, not reject the whole file.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum Lenient<T> {
    Valid(T),
    Invalid(IgnoredAny),
}

impl<T> Default for Lenient<T> {
    fn default() -> Self {
        Lenient::Invalid(IgnoredAny)
    }
}

impl<T> Lenient<T> {
    pub(crate) fn into_option(self) -> Option<T> {
        match self {
            Lenient::Valid(value) => Some(value),
            Lenient::Invalid(_) => None,
        }
    }

    pub(crate) fn as_ref(&self) -> Option<&T> {
        match self {
            Lenient::Valid(value) => Some(value),
            Lenient::Invalid(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::PathBuf;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default)]
        name: Lenient<String>,
        #[serde(default)]
        weight: Lenient<f64>,
    }

    #[test]
    fn format_from_extension() {
        assert_eq!(DocumentFormat::from_path(&PathBuf::from("a/b.ron")), DocumentFormat::Ron);
        assert_eq!(DocumentFormat::from_path(&PathBuf::from("a/b.RON")), DocumentFormat::Ron);
        assert_eq!(DocumentFormat::from_path(&PathBuf::from("a/b.json")), DocumentFormat::Json);
        assert_eq!(DocumentFormat::from_path(&PathBuf::from("noext")), DocumentFormat::Json);
    }

    #[test]
    fn lenient_keeps_valid_values() {
        let sample: Sample = DocumentFormat::Json
            .parse(r#"{"name": "anna", "weight": 2}"#)
            .unwrap();
        assert_eq!(sample.name.into_option().as_deref(), Some("anna"));
        assert_eq!(sample.weight.into_option(), Some(2.0));
    }

    #[test]
    fn lenient_drops_wrong_types() {
        let sample: Sample = DocumentFormat::Json
            .parse(r#"{"name": 17, "weight": "heavy"}"#)
            .unwrap();
        assert!(sample.name.into_option().is_none());
        assert!(sample.weight.into_option().is_none());
    }

    #[test]
    fn lenient_defaults_when_missing() {
        let sample: Sample = DocumentFormat::Json.parse("{}").unwrap();
        assert!(sample.name.as_ref().is_none());
    }

    #[test]
    fn ron_maps_parse() {
        let map: HashMap<String, Lenient<String>> = DocumentFormat::Ron
            .parse(r#"{"greet": "Hi", "count": 3}"#)
            .unwrap();
        assert_eq!(map["greet"].as_ref().map(String::as_str), Some("Hi"));
        assert!(map["count"].as_ref().is_none());
    }

    #[test]
    fn malformed_json_is_an_error() {
        let result: Result<HashMap<String, String>, _> = DocumentFormat::Json.parse("{ nope");
        assert!(matches!(result, Err(DocumentError::Json(_))));
    }
}
