/// A scene graph paired with the string table it was resolved against.

use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::document::DocumentFormat;
use crate::core::graph::{GraphError, SceneGraph};
use crate::core::localization::{load_with_fallback, LocalizationError, LocalizationTable};

/// Language used when the requested one has no string table.
pub const FALLBACK_LANGUAGE: &str = "ua";

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("scene graph error: {0}")]
    Graph(#[from] GraphError),
    #[error("localization error: {0}")]
    Localization(#[from] LocalizationError),
}

/// Where the runtime finds its documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentPaths {
    pub scenes: PathBuf,
    /// Directory holding one `{lang}.json` table per language.
    pub strings_dir: PathBuf,
    pub config: PathBuf,
    pub fallback_language: String,
}

impl Default for ContentPaths {
    fn default() -> Self {
        Self::under(Path::new("assets"))
    }
}

impl ContentPaths {
    /// The standard layout below an assets directory.
    pub fn under(root: &Path) -> Self {
        Self {
            scenes: root.join("content").join("scenes_demo.json"),
            strings_dir: root.join("strings"),
            config: root.join("config.json"),
            fallback_language: FALLBACK_LANGUAGE.to_string(),
        }
    }
}

/// One loaded generation of content. Reloading builds a new value.
#[derive(Debug, Clone, Default)]
pub struct Content {
    pub graph: SceneGraph,
    pub strings: LocalizationTable,
}

impl Content {
    /// Load strings for `language` (or the fallback), then the scene graph.
    pub fn load(paths: &ContentPaths, language: &str) -> Result<Content, ContentError> {
        let strings = load_with_fallback(&paths.strings_dir, language, &paths.fallback_language)?;
        let graph = SceneGraph::load(&paths.scenes, &strings)?;
        Ok(Content { graph, strings })
    }

    /// Build from in-memory documents.
    pub fn parse(
        scenes: &str,
        format: DocumentFormat,
        strings: LocalizationTable,
    ) -> Result<Content, ContentError> {
        let graph = SceneGraph::parse(scenes, format, &strings)?;
        Ok(Content { graph, strings })
    }

    /// Language the graph's text was resolved in.
    pub fn language(&self) -> &str {
        self.strings.language()
    }
}
