/// Top-level driver: config, content generations and the session.

use thiserror::Error;
use tracing::{info, warn};

use crate::core::config::{
    language_index, ConfigError, ConfigWatcher, EngineConfig, SUPPORTED_LANGUAGES,
};
use crate::core::content::{Content, ContentError, ContentPaths};
use crate::core::session::{Session, SessionError};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("content error: {0}")]
    Content(#[from] ContentError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

/// Owns everything one running game needs.
///
/// `update` is called once per frame. It polls the config file, rebuilding
/// content when the language changes, and then ticks the session.
pub struct Runtime {
    paths: ContentPaths,
    config: EngineConfig,
    watcher: ConfigWatcher,
    session: Session,
}

impl Runtime {
    /// Read the config (or defaults), load content in its language and
    /// open a session at the main menu.
    pub fn boot(paths: ContentPaths) -> Result<Runtime, RuntimeError> {
        let config = EngineConfig::load_or_default(&paths.config);
        let content = Content::load(&paths, config.language())?;
        info!(
            language = content.language(),
            scenes = content.graph.len(),
            "Runtime booted"
        );
        let watcher = ConfigWatcher::new(&paths.config);
        Ok(Runtime {
            paths,
            config,
            watcher,
            session: Session::new(content),
        })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn paths(&self) -> &ContentPaths {
        &self.paths
    }

    /// Advance one frame of `dt` seconds.
    pub fn update(&mut self, dt: f32) -> Result<(), RuntimeError> {
        match self.watcher.poll(dt) {
            Ok(Some(config)) => self.apply_config(config),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Config reload failed, keeping current settings"),
        }
        self.session.tick(dt)?;
        Ok(())
    }

    /// Switch language now and persist the choice.
    ///
    /// The code is matched case-insensitively against the supported
    /// languages; unknown codes select the default. On failure the current
    /// content and config stay in place.
    pub fn set_language(&mut self, language: &str) -> Result<(), RuntimeError> {
        let code = SUPPORTED_LANGUAGES[language_index(language)];
        let content = Content::load(&self.paths, code)?;
        let config = EngineConfig {
            lang: code.to_string(),
            ..self.config.clone()
        };
        config.save(&self.paths.config)?;

        self.session.replace_content(content);
        self.config = config;
        self.watcher.mark_seen();
        Ok(())
    }

    /// Persist the config and hand back the final session.
    pub fn shutdown(self) -> Result<Session, RuntimeError> {
        self.config.save(&self.paths.config)?;
        info!("Runtime shut down");
        Ok(self.session)
    }

    fn apply_config(&mut self, config: EngineConfig) {
        if !config.lang.eq_ignore_ascii_case(&self.config.lang) {
            match Content::load(&self.paths, config.language()) {
                Ok(content) => self.session.replace_content(content),
                Err(e) => warn!(
                    language = %config.lang,
                    error = %e,
                    "Content reload failed, keeping previous content"
                ),
            }
        }
        self.config = config;
    }
}
