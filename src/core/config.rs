/// User settings document and its hot-reload watcher.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::document::{DocumentError, DocumentFormat, Lenient};

/// Languages with shipped string tables. The first is the default.
pub const SUPPORTED_LANGUAGES: [&str; 3] = ["ua", "ru", "en"];

/// Seconds of simulated time between config file checks.
pub const POLL_INTERVAL: f32 = 0.5;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config document error: {0}")]
    Document(#[from] DocumentError),
    #[error("config write error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Position of `code` in [`SUPPORTED_LANGUAGES`], ignoring case.
/// Unknown codes map to the default language.
pub fn language_index(code: &str) -> usize {
    SUPPORTED_LANGUAGES
        .iter()
        .position(|lang| lang.eq_ignore_ascii_case(code))
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineConfig {
    pub lang: String,
    /// Music volume, percent.
    pub music: u8,
    /// Effects volume, percent.
    pub sfx: u8,
    pub resolution: [u32; 2],
    pub fullscreen: bool,
    pub menu_bg: String,
    pub menu_music: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lang: SUPPORTED_LANGUAGES[0].to_string(),
            music: 75,
            sfx: 100,
            resolution: [1280, 720],
            fullscreen: false,
            menu_bg: "backgrounds/menu_bg.png".to_string(),
            menu_music: "music/main_menu.mp3".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    lang: Lenient<String>,
    music: Lenient<f64>,
    sfx: Lenient<f64>,
    resolution: Lenient<[u32; 2]>,
    fullscreen: Lenient<bool>,
    menu_bg: Lenient<String>,
    menu_music: Lenient<String>,
}

fn percent(value: f64) -> u8 {
    value.clamp(0.0, 100.0) as u8
}

impl EngineConfig {
    /// Parse a config document. Missing or mistyped keys keep their defaults.
    pub fn parse(input: &str, format: DocumentFormat) -> Result<EngineConfig, ConfigError> {
        let raw: RawConfig = format.parse(input)?;
        let defaults = EngineConfig::default();
        Ok(EngineConfig {
            lang: raw
                .lang
                .into_option()
                .filter(|lang| !lang.is_empty())
                .unwrap_or(defaults.lang),
            music: raw.music.into_option().map_or(defaults.music, percent),
            sfx: raw.sfx.into_option().map_or(defaults.sfx, percent),
            resolution: raw.resolution.into_option().unwrap_or(defaults.resolution),
            fullscreen: raw.fullscreen.into_option().unwrap_or(defaults.fullscreen),
            menu_bg: raw.menu_bg.into_option().unwrap_or(defaults.menu_bg),
            menu_music: raw.menu_music.into_option().unwrap_or(defaults.menu_music),
        })
    }

    pub fn load(path: &Path) -> Result<EngineConfig, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(DocumentError::from)?;
        Self::parse(&contents, DocumentFormat::from_path(path))
    }

    /// Load, or fall back to defaults when the file is missing or unreadable.
    pub fn load_or_default(path: &Path) -> EngineConfig {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Using default config");
                EngineConfig::default()
            }
        }
    }

    /// Write as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        debug!(path = %path.display(), "Saved config");
        Ok(())
    }

    /// The configured language normalized to a supported code.
    pub fn language(&self) -> &'static str {
        SUPPORTED_LANGUAGES[language_index(&self.lang)]
    }
}

/// Polls a config file's modification time at a fixed simulated-time cadence.
#[derive(Debug, Clone)]
pub struct ConfigWatcher {
    path: PathBuf,
    interval: f32,
    elapsed: f32,
    last_modified: Option<SystemTime>,
}

impl ConfigWatcher {
    /// Start watching, treating the file's current state as already seen.
    pub fn new(path: &Path) -> Self {
        Self::with_interval(path, POLL_INTERVAL)
    }

    pub fn with_interval(path: &Path, interval: f32) -> Self {
        Self {
            path: path.to_path_buf(),
            interval,
            elapsed: 0.0,
            last_modified: modified(path),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record the file's current state as seen, e.g. after writing it ourselves.
    pub fn mark_seen(&mut self) {
        self.last_modified = modified(&self.path);
    }

    /// Advance by `dt`. Returns the re-read config when the file changed.
    pub fn poll(&mut self, dt: f32) -> Result<Option<EngineConfig>, ConfigError> {
        self.elapsed += dt;
        if self.elapsed < self.interval {
            return Ok(None);
        }
        self.elapsed = 0.0;

        let current = modified(&self.path);
        if current.is_none() || current == self.last_modified {
            return Ok(None);
        }
        self.last_modified = current;
        info!(path = %self.path.display(), "Config changed, reloading");
        EngineConfig::load(&self.path).map(Some)
    }
}

fn modified(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn defaults_fill_missing_and_mistyped_keys() {
        let config = EngineConfig::parse(
            r#"{"lang": "en", "music": "loud", "sfx": 250, "resolution": [1920], "fullscreen": true}"#,
            DocumentFormat::Json,
        )
        .unwrap();
        assert_eq!(config.lang, "en");
        assert_eq!(config.music, 75);
        assert_eq!(config.sfx, 100);
        assert_eq!(config.resolution, [1280, 720]);
        assert!(config.fullscreen);
        assert_eq!(config.menu_music, "music/main_menu.mp3");
    }

    #[test]
    fn language_lookup_ignores_case() {
        assert_eq!(language_index("EN"), 2);
        assert_eq!(language_index("ru"), 1);
        assert_eq!(language_index("klingon"), 0);
        let config = EngineConfig {
            lang: "Ru".to_string(),
            ..EngineConfig::default()
        };
        assert_eq!(config.language(), "ru");
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = EngineConfig {
            lang: "en".to_string(),
            resolution: [1600, 900],
            ..EngineConfig::default()
        };
        config.save(&path).unwrap();
        assert_eq!(EngineConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load_or_default(&dir.path().join("absent.json"));
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn watcher_reports_changes_on_cadence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        EngineConfig::default().save(&path).unwrap();
        let mut watcher = ConfigWatcher::new(&path);

        assert!(watcher.poll(0.6).unwrap().is_none());

        std::fs::write(&path, r#"{"lang": "en"}"#).unwrap();
        let file = std::fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(10))
            .unwrap();

        assert!(watcher.poll(0.2).unwrap().is_none());
        let reloaded = watcher.poll(0.4).unwrap().unwrap();
        assert_eq!(reloaded.lang, "en");
        assert!(watcher.poll(0.6).unwrap().is_none());
    }
}
