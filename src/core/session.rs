/// The playthrough state machine.
///
/// A [`Session`] owns one generation of [`Content`] together with the
/// player's flags and stats. Scene changes never happen synchronously:
/// [`Session::request_transition`] queues a target behind a fade and the
/// scene is entered from [`Session::tick`] once the fade is fully in.
/// Entering runs the auto-checks before any dialog is exposed.

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::branch::{resolve_entry, BranchError};
use crate::core::content::Content;
use crate::core::flags::FlagStore;
use crate::core::graph::SceneGraph;
use crate::core::simulation::StatSimulator;
use crate::schema::scene::{Scene, SceneIndex};
use crate::schema::stats::{StatKind, Stats};

/// Fade units per second; a full fade-in takes `1 / FADE_SPEED` seconds.
pub const FADE_SPEED: f32 = 4.5;
/// Seconds a stat notice stays up.
pub const NOTICE_LIFETIME: f32 = 1.4;
pub const MAX_NOTICES: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("scene {0} is not in the loaded graph")]
    SceneOutOfRange(SceneIndex),
    #[error("no scene with choices is showing")]
    NoActiveChoices,
    #[error("choice {index} out of range, {available} available")]
    ChoiceOutOfRange { index: usize, available: usize },
    #[error("auto-checks redirect in a cycle: {}", .chain.join(" -> "))]
    RedirectCycle { chain: Vec<String> },
    #[error("content has no start scene")]
    NoStartScene,
}

impl From<BranchError> for SessionError {
    fn from(err: BranchError) -> Self {
        match err {
            BranchError::SceneOutOfRange(index) => SessionError::SceneOutOfRange(index),
            BranchError::RedirectCycle { chain } => SessionError::RedirectCycle { chain },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Menu,
    Settings,
    Playing,
    /// A scene with nowhere to go has been reached, or a choice ended the story.
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuItem {
    NewGame,
    Continue,
    Settings,
    Quit,
}

impl MenuItem {
    pub const ALL: [MenuItem; 4] = [
        MenuItem::NewGame,
        MenuItem::Continue,
        MenuItem::Settings,
        MenuItem::Quit,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::NewGame => "New game",
            Self::Continue => "Continue",
            Self::Settings => "Settings",
            Self::Quit => "Quit",
        }
    }
}

/// One discrete input from the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    MenuUp,
    MenuDown,
    MenuActivate,
    /// Pick a choice of the visible dialog, zero-based.
    Choose(usize),
    Restart,
    Back,
    Quit,
    /// Move a stat target directly, for debugging content.
    NudgeStat { kind: StatKind, amount: f32 },
}

/// What the player currently sees of a scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dialog {
    pub scene: SceneIndex,
    pub scene_id: String,
    pub speaker: Option<String>,
    pub title: Option<String>,
    pub text: Option<String>,
    pub choices: Vec<String>,
    pub background: Option<String>,
    pub music: Option<String>,
    pub cinematic: bool,
}

impl Dialog {
    fn from_scene(index: SceneIndex, scene: &Scene) -> Self {
        Self {
            scene: index,
            scene_id: scene.id.clone(),
            speaker: scene.speaker.clone(),
            title: scene.title.clone(),
            text: scene.text.clone(),
            choices: scene
                .choices
                .iter()
                .map(|c| c.text.clone().unwrap_or_default())
                .collect(),
            background: scene.background.clone(),
            music: scene.music.clone(),
            cinematic: scene.cinematic,
        }
    }
}

/// A short-lived "+5 CL" style message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notice {
    pub stat: StatKind,
    pub amount: i32,
    pub text: String,
    /// Seconds left before it disappears.
    pub remaining: f32,
}

impl Notice {
    fn new(stat: StatKind, amount: i32) -> Self {
        Self {
            stat,
            amount,
            text: format!("{amount:+} {}", stat.abbrev()),
            remaining: NOTICE_LIFETIME,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SessionEvent {
    SceneEntered {
        scene: SceneIndex,
        id: String,
        background: Option<String>,
        music: Option<String>,
    },
    TransitionRequested {
        target: SceneIndex,
    },
    Ended,
    ContentReloaded {
        language: String,
    },
    FlagDropped {
        name: String,
    },
    Quit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum FadeDirection {
    #[default]
    Idle,
    In,
    Out,
}

/// The fade that hides a scene change.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Transition {
    level: f32,
    direction: FadeDirection,
    queued: Option<SceneIndex>,
}

impl Transition {
    /// Start (or redirect) a fade toward `target`.
    pub fn begin(&mut self, target: SceneIndex) {
        self.direction = FadeDirection::In;
        self.queued = Some(target);
    }

    /// Advance the fade. Returns the queued scene at the moment the screen
    /// is fully covered.
    pub fn advance(&mut self, dt: f32) -> Option<SceneIndex> {
        match self.direction {
            FadeDirection::Idle => None,
            FadeDirection::In => {
                self.level += FADE_SPEED * dt;
                if self.level < 1.0 {
                    return None;
                }
                self.level = 1.0;
                self.direction = FadeDirection::Out;
                self.queued.take()
            }
            FadeDirection::Out => {
                self.level -= FADE_SPEED * dt;
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.direction = FadeDirection::Idle;
                }
                None
            }
        }
    }

    /// Cover amount in `[0, 1]`.
    pub fn level(&self) -> f32 {
        self.level
    }

    pub fn queued(&self) -> Option<SceneIndex> {
        self.queued
    }

    pub fn is_active(&self) -> bool {
        self.direction != FadeDirection::Idle
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct AutoAdvance {
    remaining: f32,
    next: SceneIndex,
}

pub struct Session {
    content: Content,
    flags: FlagStore,
    stats: Stats,
    simulator: StatSimulator,
    mode: Mode,
    menu_index: usize,
    current: Option<SceneIndex>,
    transition: Transition,
    auto_advance: Option<AutoAdvance>,
    dialog: Option<Dialog>,
    notices: Vec<Notice>,
    events: Vec<SessionEvent>,
    running: bool,
}

impl Session {
    /// A fresh session sitting in the main menu.
    pub fn new(content: Content) -> Self {
        Self::with_simulator(content, StatSimulator::default())
    }

    pub fn with_simulator(content: Content, simulator: StatSimulator) -> Self {
        Self {
            content,
            flags: FlagStore::new(),
            stats: Stats::default(),
            simulator,
            mode: Mode::Menu,
            menu_index: 0,
            current: None,
            transition: Transition::default(),
            auto_advance: None,
            dialog: None,
            notices: Vec::new(),
            events: Vec::new(),
            running: true,
        }
    }

    // --- Accessors ---

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.content.graph
    }

    pub fn language(&self) -> &str {
        self.content.language()
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn menu_selection(&self) -> MenuItem {
        MenuItem::ALL[self.menu_index % MenuItem::ALL.len()]
    }

    pub fn current(&self) -> Option<SceneIndex> {
        self.current
    }

    /// Scene queued behind the fade, not yet entered.
    pub fn pending(&self) -> Option<SceneIndex> {
        self.transition.queued()
    }

    pub fn transition(&self) -> &Transition {
        &self.transition
    }

    pub fn fade_level(&self) -> f32 {
        self.transition.level()
    }

    /// The visible dialog, if any.
    pub fn dialog(&self) -> Option<&Dialog> {
        self.dialog.as_ref()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn flags(&self) -> &FlagStore {
        &self.flags
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    // --- Flags and stats ---

    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.has(name)
    }

    /// Set a flag. A full store drops it with a warning.
    pub fn add_flag(&mut self, name: &str) -> bool {
        match self.flags.add(name) {
            Ok(changed) => changed,
            Err(e) => {
                warn!(flag = name, capacity = e.capacity, "Flag store full, dropping flag");
                self.events.push(SessionEvent::FlagDropped {
                    name: name.to_string(),
                });
                false
            }
        }
    }

    pub fn remove_flag(&mut self, name: &str) -> bool {
        self.flags.remove(name)
    }

    /// Shift a stat target, clamped into range.
    pub fn nudge_stat(&mut self, kind: StatKind, amount: f32) {
        self.stats.nudge(kind, amount);
    }

    // --- Scene flow ---

    /// Enter `index` right away, following auto-checks.
    ///
    /// On a redirect cycle the dialog is hidden and no scene is current.
    pub fn enter(&mut self, index: SceneIndex) -> Result<&Dialog, SessionError> {
        let resolution = match resolve_entry(
            &self.content.graph,
            index,
            self.stats.sample(),
            &self.flags,
        ) {
            Ok(resolution) => resolution,
            Err(BranchError::RedirectCycle { chain }) => {
                warn!(chain = ?chain, "Auto-check redirect cycle");
                self.current = None;
                self.dialog = None;
                self.auto_advance = None;
                return Err(SessionError::RedirectCycle { chain });
            }
            Err(e) => return Err(e.into()),
        };

        let landed = resolution.landed;
        let scene = self
            .content
            .graph
            .scene(landed)
            .ok_or(SessionError::SceneOutOfRange(landed))?;
        debug!(
            scene = %scene.id,
            redirects = resolution.passed.len(),
            "Entered scene"
        );

        self.current = Some(landed);
        self.auto_advance = scene
            .auto_advance()
            .map(|(remaining, next)| AutoAdvance { remaining, next });
        self.events.push(SessionEvent::SceneEntered {
            scene: landed,
            id: scene.id.clone(),
            background: scene.background.clone(),
            music: scene.music.clone(),
        });
        if scene.is_ending() {
            info!(scene = %scene.id, "Story ended");
            self.mode = Mode::Ended;
            self.events.push(SessionEvent::Ended);
        } else {
            self.mode = Mode::Playing;
        }
        Ok(self.dialog.insert(Dialog::from_scene(landed, scene)))
    }

    /// Queue `target` behind a fade. Replaces any target already queued.
    pub fn request_transition(&mut self, target: SceneIndex) -> Result<(), SessionError> {
        if self.content.graph.scene(target).is_none() {
            return Err(SessionError::SceneOutOfRange(target));
        }
        debug!(target = %target, "Transition requested");
        self.transition.begin(target);
        self.events.push(SessionEvent::TransitionRequested { target });
        Ok(())
    }

    /// Apply choice `index` of the visible dialog.
    ///
    /// Stat targets move first, then flags are added and removed, then the
    /// transition is queued. A choice without `next` ends the story. The
    /// dialog is hidden either way. Returns the queued scene.
    pub fn apply_choice(&mut self, index: usize) -> Result<Option<SceneIndex>, SessionError> {
        let current = match (self.current, &self.dialog) {
            (Some(current), Some(_)) => current,
            _ => return Err(SessionError::NoActiveChoices),
        };
        let scene = self
            .content
            .graph
            .scene(current)
            .ok_or(SessionError::SceneOutOfRange(current))?;
        if scene.choices.is_empty() {
            return Err(SessionError::NoActiveChoices);
        }
        let choice = scene
            .choices
            .get(index)
            .cloned()
            .ok_or(SessionError::ChoiceOutOfRange {
                index,
                available: scene.choices.len(),
            })?;

        self.stats.apply(choice.effects);
        for name in &choice.add_flags {
            self.add_flag(name);
        }
        for name in &choice.remove_flags {
            self.remove_flag(name);
        }
        for (kind, amount) in [
            (StatKind::Clarity, choice.effects.clarity),
            (StatKind::Anxiety, choice.effects.anxiety),
            (StatKind::Balance, choice.effects.balance),
        ] {
            if amount != 0 {
                self.push_notice(Notice::new(kind, amount));
            }
        }

        self.dialog = None;
        match choice.next {
            Some(next) => {
                self.request_transition(next)?;
                Ok(Some(next))
            }
            None => {
                info!("Choice ended the story");
                self.current = None;
                self.auto_advance = None;
                self.mode = Mode::Ended;
                self.events.push(SessionEvent::Ended);
                Ok(None)
            }
        }
    }

    /// Advance simulated time by `dt` seconds.
    ///
    /// Order: fade (which may enter the queued scene), stat drift, notice
    /// ageing, then the current scene's auto-advance countdown. A redirect
    /// cycle on entry is returned after the rest of the tick has run.
    ///
    /// The fade holds while the menu or settings screen is up, so a queued
    /// scene is only entered once the player is back in the story. A
    /// non-positive or NaN `dt` does nothing.
    pub fn tick(&mut self, dt: f32) -> Result<(), SessionError> {
        if !(dt > 0.0) {
            return Ok(());
        }

        let in_story = matches!(self.mode, Mode::Playing | Mode::Ended);
        let arrived = if in_story {
            self.transition.advance(dt)
        } else {
            None
        };
        let entered = match arrived {
            Some(target) => self.enter(target).map(|_| ()),
            None => Ok(()),
        };

        self.simulator.step(&mut self.stats, dt);

        self.notices.retain_mut(|notice| {
            notice.remaining -= dt;
            notice.remaining > 0.0
        });

        if self.mode == Mode::Playing && self.dialog.is_some() {
            if let Some(auto) = self.auto_advance.as_mut() {
                auto.remaining -= dt;
                if auto.remaining <= 0.0 {
                    let next = auto.next;
                    self.auto_advance = None;
                    self.dialog = None;
                    self.request_transition(next)?;
                }
            }
        }

        entered
    }

    // --- Menu-level flow ---

    /// Reset stats and flags and fade to the start scene.
    pub fn new_game(&mut self) -> Result<(), SessionError> {
        let start = self.content.graph.start().ok_or(SessionError::NoStartScene)?;
        info!(start = %self.content.graph.start_id(), "New game");
        self.stats = Stats::default();
        self.flags.clear();
        self.notices.clear();
        self.current = None;
        self.dialog = None;
        self.auto_advance = None;
        self.request_transition(start)?;
        self.mode = Mode::Playing;
        Ok(())
    }

    /// Fade to the start scene keeping stats and flags.
    pub fn continue_game(&mut self) -> Result<(), SessionError> {
        let start = self.content.graph.start().ok_or(SessionError::NoStartScene)?;
        self.request_transition(start)?;
        self.mode = Mode::Playing;
        Ok(())
    }

    /// Fade back to the start scene from anywhere in the story.
    pub fn restart(&mut self) -> Result<(), SessionError> {
        let start = self.content.graph.start().ok_or(SessionError::NoStartScene)?;
        self.dialog = None;
        self.auto_advance = None;
        self.request_transition(start)
    }

    pub fn quit(&mut self) {
        if self.running {
            info!("Session quit");
            self.running = false;
            self.events.push(SessionEvent::Quit);
        }
    }

    /// Apply one input. Commands that mean nothing in the current mode are
    /// ignored.
    pub fn handle_command(&mut self, command: Command) -> Result<(), SessionError> {
        let count = MenuItem::ALL.len();
        match (self.mode, command) {
            (_, Command::Quit) => self.quit(),
            (Mode::Menu, Command::MenuUp) => self.menu_index = (self.menu_index + count - 1) % count,
            (Mode::Menu, Command::MenuDown) => self.menu_index = (self.menu_index + 1) % count,
            (Mode::Menu, Command::MenuActivate) => match self.menu_selection() {
                MenuItem::NewGame => self.new_game()?,
                MenuItem::Continue => self.continue_game()?,
                MenuItem::Settings => self.mode = Mode::Settings,
                MenuItem::Quit => self.quit(),
            },
            (Mode::Settings, Command::Back) => self.mode = Mode::Menu,
            (Mode::Playing | Mode::Ended, Command::Choose(index)) => {
                self.apply_choice(index)?;
            }
            (Mode::Playing | Mode::Ended, Command::Restart) => self.restart()?,
            (Mode::Playing | Mode::Ended, Command::Back) => self.mode = Mode::Menu,
            (Mode::Playing | Mode::Ended, Command::NudgeStat { kind, amount }) => {
                self.nudge_stat(kind, amount)
            }
            (mode, command) => debug!(?mode, ?command, "Command ignored"),
        }
        Ok(())
    }

    // --- Reload ---

    /// Swap in a freshly loaded content generation.
    ///
    /// Scene indices from the old graph are carried over by id; ids that no
    /// longer exist become none. The visible dialog is rebuilt from the new
    /// graph without re-running auto-checks. Stats and flags are untouched.
    pub fn replace_content(&mut self, content: Content) {
        let old = std::mem::replace(&mut self.content, content);
        let remap = |index: Option<SceneIndex>| {
            index
                .and_then(|i| old.graph.scene(i))
                .and_then(|scene| self.content.graph.index_of(&scene.id))
        };

        let current = remap(self.current);
        let queued = remap(self.transition.queued);
        let auto_next = remap(self.auto_advance.map(|auto| auto.next));

        self.transition.queued = queued;
        self.current = current;
        self.auto_advance = match (self.auto_advance, auto_next) {
            (Some(auto), Some(next)) => Some(AutoAdvance { next, ..auto }),
            _ => None,
        };
        self.dialog = match (self.dialog.is_some(), current) {
            (true, Some(index)) => self
                .content
                .graph
                .scene(index)
                .map(|scene| Dialog::from_scene(index, scene)),
            _ => None,
        };

        info!(
            language = self.content.language(),
            scenes = self.content.graph.len(),
            current = ?self.current.map(|i| i.0),
            "Content replaced"
        );
        self.events.push(SessionEvent::ContentReloaded {
            language: self.content.language().to_string(),
        });
    }

    /// Take every event queued since the last call.
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    fn push_notice(&mut self, notice: Notice) {
        if self.notices.len() < MAX_NOTICES {
            self.notices.push(notice);
        }
    }
}
