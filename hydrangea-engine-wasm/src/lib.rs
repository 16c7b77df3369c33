//! WASM bindings for hydrangea-engine, powering the browser build.

use wasm_bindgen::prelude::*;

use hydrangea_engine::core::config::{language_index, SUPPORTED_LANGUAGES};
use hydrangea_engine::core::content::Content;
use hydrangea_engine::core::document::DocumentFormat;
use hydrangea_engine::core::localization::LocalizationTable;
use hydrangea_engine::core::session::{Command, Session};
use hydrangea_engine::schema::stats::StatKind;

// ---------------------------------------------------------------------------
// Embedded demo content, compiled into the WASM binary
// ---------------------------------------------------------------------------
mod data {
    pub const SCENES: &str = include_str!("../../assets/content/scenes_demo.json");
    pub const STRINGS_UA: &str = include_str!("../../assets/strings/ua.json");
    pub const STRINGS_RU: &str = include_str!("../../assets/strings/ru.json");
    pub const STRINGS_EN: &str = include_str!("../../assets/strings/en.json");

    pub fn strings(language: &str) -> &'static str {
        match language {
            "ru" => STRINGS_RU,
            "en" => STRINGS_EN,
            _ => STRINGS_UA,
        }
    }
}

// ---------------------------------------------------------------------------
// JSON helpers for communication across the WASM boundary
// ---------------------------------------------------------------------------
fn parse_stat(s: &str) -> Option<StatKind> {
    match s.to_lowercase().as_str() {
        "clarity" | "cl" => Some(StatKind::Clarity),
        "anxiety" | "anx" => Some(StatKind::Anxiety),
        "balance" | "bal" => Some(StatKind::Balance),
        _ => None,
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Encode error: {e}")))
}

/// Serialized name of a unit enum variant, without the JSON quotes.
fn to_label<T: serde::Serialize>(value: &T) -> Result<String, JsError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(label)) => Ok(label),
        Ok(other) => Err(JsError::new(&format!("Expected a label, got {other}"))),
        Err(e) => Err(JsError::new(&format!("Encode error: {e}"))),
    }
}

fn load_content(language: &str) -> Result<Content, JsError> {
    let code = SUPPORTED_LANGUAGES[language_index(language)];
    let strings = LocalizationTable::parse(code, data::strings(code), DocumentFormat::Json)
        .map_err(|e| JsError::new(&format!("String table error: {e}")))?;
    Content::parse(data::SCENES, DocumentFormat::Json, strings)
        .map_err(|e| JsError::new(&format!("Content error: {e}")))
}

/// Route `tracing` output to the browser console.
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() {
    tracing_wasm::set_as_global_default();
}

// ---------------------------------------------------------------------------
// HydrangeaDemo: the main exported struct
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct HydrangeaDemo {
    session: Session,
}

#[wasm_bindgen]
impl HydrangeaDemo {
    /// Open a session at the main menu. Unknown languages fall back to `ua`.
    #[wasm_bindgen(constructor)]
    pub fn new(language: &str) -> Result<HydrangeaDemo, JsError> {
        let content = load_content(language)?;
        tracing::info!(language = content.language(), "Demo session created");
        Ok(HydrangeaDemo {
            session: Session::new(content),
        })
    }

    /// Advance simulated time by `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> Result<(), JsError> {
        self.session
            .tick(dt)
            .map_err(|e| JsError::new(&format!("Session error: {e}")))
    }

    pub fn menu_up(&mut self) -> Result<(), JsError> {
        self.command(Command::MenuUp)
    }

    pub fn menu_down(&mut self) -> Result<(), JsError> {
        self.command(Command::MenuDown)
    }

    pub fn menu_activate(&mut self) -> Result<(), JsError> {
        self.command(Command::MenuActivate)
    }

    /// Pick a choice of the visible dialog (zero-based).
    pub fn choose(&mut self, index: usize) -> Result<(), JsError> {
        self.command(Command::Choose(index))
    }

    pub fn restart(&mut self) -> Result<(), JsError> {
        self.command(Command::Restart)
    }

    pub fn back(&mut self) -> Result<(), JsError> {
        self.command(Command::Back)
    }

    pub fn quit(&mut self) -> Result<(), JsError> {
        self.command(Command::Quit)
    }

    /// Shift a stat target by `amount`. `stat` is "clarity", "anxiety" or "balance".
    pub fn nudge(&mut self, stat: &str, amount: f32) -> Result<(), JsError> {
        let kind = parse_stat(stat).ok_or_else(|| JsError::new(&format!("Unknown stat: {stat}")))?;
        self.command(Command::NudgeStat { kind, amount })
    }

    /// Rebuild content in another language, keeping the playthrough.
    pub fn set_language(&mut self, language: &str) -> Result<(), JsError> {
        let content = load_content(language)?;
        self.session.replace_content(content);
        Ok(())
    }

    pub fn language(&self) -> String {
        self.session.language().to_string()
    }

    /// `menu`, `settings`, `playing` or `ended`.
    pub fn mode(&self) -> Result<String, JsError> {
        to_label(&self.session.mode())
    }

    pub fn menu_selection(&self) -> String {
        self.session.menu_selection().label().to_string()
    }

    pub fn fade_level(&self) -> f32 {
        self.session.fade_level()
    }

    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }

    /// The visible dialog as JSON, or `null`.
    pub fn dialog(&self) -> Result<String, JsError> {
        to_json(&self.session.dialog())
    }

    /// Current and target of every stat as JSON.
    pub fn stats(&self) -> Result<String, JsError> {
        to_json(self.session.stats())
    }

    pub fn notices(&self) -> Result<String, JsError> {
        to_json(&self.session.notices())
    }

    /// Sorted flag names as a JSON array.
    pub fn flags(&self) -> Result<String, JsError> {
        to_json(&self.session.flags().sorted())
    }

    /// Events since the last call, as a JSON array.
    pub fn drain_events(&mut self) -> Result<String, JsError> {
        to_json(&self.session.drain_events())
    }

    pub fn available_languages() -> String {
        serde_json::to_string(&SUPPORTED_LANGUAGES).unwrap_or_else(|_| "[]".to_string())
    }
}

// Private helpers
impl HydrangeaDemo {
    fn command(&mut self, command: Command) -> Result<(), JsError> {
        self.session
            .handle_command(command)
            .map_err(|e| JsError::new(&format!("Session error: {e}")))
    }
}
