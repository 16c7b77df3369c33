/// Scene graph loading: parse every node, then link references by id.
///
/// Pass one turns each raw scene into a [`Scene`] with its localizable
/// strings already resolved, parking every `next`, `auto_next` and `goto`
/// id as text. Pass two runs once the id table is complete and swaps those
/// ids for dense [`SceneIndex`] values. A reference that does not resolve is
/// a dead end, recorded as a [`Diagnostic`] rather than an error.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::document::{DocumentError, DocumentFormat, Lenient};
use crate::core::localization::LocalizationTable;
use crate::schema::bounded::Bounded;
use crate::schema::condition::{Comparison, Condition};
use crate::schema::scene::{
    AutoCheck, Choice, Scene, SceneIndex, StatDelta, MAX_CHECKS, MAX_CHOICES,
};

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("content document error: {0}")]
    Document(#[from] DocumentError),
    #[error("content has no string `start` field")]
    MissingStart,
    #[error("content has no `scenes` array")]
    MissingScenes,
    #[error("scene at position {position} has no string `id`")]
    SceneWithoutId { position: usize },
}

/// Where in a scene a reference lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSite {
    Start,
    ChoiceNext { choice: usize },
    AutoNext,
    CheckGoto { check: usize },
}

impl std::fmt::Display for ReferenceSite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::ChoiceNext { choice } => write!(f, "choices[{choice}].next"),
            Self::AutoNext => write!(f, "auto_next"),
            Self::CheckGoto { check } => write!(f, "checks[{check}].goto"),
        }
    }
}

/// Which bounded list overflowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Choices,
    Checks,
    AddFlags { choice: usize },
    RemoveFlags { choice: usize },
}

impl std::fmt::Display for Slot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Choices => write!(f, "choices"),
            Self::Checks => write!(f, "checks"),
            Self::AddFlags { choice } => write!(f, "choices[{choice}].flags+"),
            Self::RemoveFlags { choice } => write!(f, "choices[{choice}].flags-"),
        }
    }
}

/// A non-fatal problem found while loading content.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Diagnostic {
    #[error("scene '{scene}': {site} refers to unknown scene '{target}'")]
    UnresolvedReference {
        scene: String,
        site: ReferenceSite,
        target: String,
    },
    #[error("scene '{scene}': {slot} holds too many entries, {dropped} dropped")]
    CapacityExceeded {
        scene: String,
        slot: Slot,
        dropped: usize,
    },
    #[error("scene id '{id}' at position {position} duplicates an earlier scene")]
    DuplicateSceneId { id: String, position: usize },
    #[error("scene '{scene}': check {check} lacks an `if` object or a `goto` id, skipped")]
    MalformedCheck { scene: String, check: usize },
    #[error("scene '{scene}': no translation for key '{key}'")]
    MissingTranslation { scene: String, key: String },
}

impl Diagnostic {
    /// Whether this changes where the story can go, as opposed to what it shows.
    pub fn affects_flow(&self) -> bool {
        matches!(
            self,
            Diagnostic::UnresolvedReference { .. } | Diagnostic::DuplicateSceneId { .. }
        )
    }
}

// Raw document shapes. Every leaf is lenient so a mistyped field only drops
// that field; only the top-level `start`/`scenes` and scene ids are mandatory.

#[derive(Debug, Deserialize)]
struct RawContent {
    #[serde(default)]
    start: Lenient<String>,
    #[serde(default)]
    scenes: Option<Vec<RawScene>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawScene {
    id: Lenient<String>,
    speaker: Lenient<String>,
    text: Lenient<String>,
    title: Lenient<String>,
    background: Lenient<String>,
    music: Lenient<String>,
    auto_time: Lenient<f64>,
    auto_next: Lenient<String>,
    cinematic: Lenient<bool>,
    checks: Lenient<Vec<Lenient<RawCheck>>>,
    choices: Lenient<Vec<Lenient<RawChoice>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCheck {
    #[serde(rename = "if")]
    condition: Lenient<RawCondition>,
    goto: Lenient<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawCondition {
    clarity: Lenient<String>,
    anxiety: Lenient<String>,
    balance: Lenient<String>,
    flag: Lenient<String>,
    flag2: Lenient<String>,
    not_flag: Lenient<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawChoice {
    text: Lenient<String>,
    effects: Lenient<RawEffects>,
    next: Lenient<String>,
    #[serde(rename = "flags+", alias = "flags_add")]
    add_flags: Lenient<Vec<Lenient<String>>>,
    #[serde(rename = "flags-", alias = "flags_remove")]
    remove_flags: Lenient<Vec<Lenient<String>>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEffects {
    clarity: Lenient<f64>,
    anxiety: Lenient<f64>,
    balance: Lenient<f64>,
}

/// Reference ids parked during pass one, keyed by slot position.
#[derive(Debug, Default)]
struct PendingLinks {
    choice_next: Vec<Option<String>>,
    auto_next: Option<String>,
    check_goto: Vec<String>,
}

/// A fully linked scene graph for one (content, language) pair.
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    scenes: Vec<Scene>,
    index: FxHashMap<String, SceneIndex>,
    start: Option<SceneIndex>,
    start_id: String,
    language: String,
    diagnostics: Vec<Diagnostic>,
}

impl SceneGraph {
    /// Load content from a file, choosing JSON or RON by extension.
    pub fn load(path: &Path, strings: &LocalizationTable) -> Result<SceneGraph, GraphError> {
        let contents = std::fs::read_to_string(path).map_err(DocumentError::from)?;
        let graph = Self::parse(&contents, DocumentFormat::from_path(path), strings)?;
        info!(
            path = %path.display(),
            language = strings.language(),
            scenes = graph.len(),
            "Loaded scene graph"
        );
        Ok(graph)
    }

    /// Parse and link a content document.
    ///
    /// Fails without producing a graph when the document is malformed,
    /// lacks `start`/`scenes`, or holds a scene without an id.
    pub fn parse(
        input: &str,
        format: DocumentFormat,
        strings: &LocalizationTable,
    ) -> Result<SceneGraph, GraphError> {
        let raw: RawContent = format.parse(input)?;
        let start_id = raw.start.into_option().ok_or(GraphError::MissingStart)?;
        let raw_scenes = raw.scenes.ok_or(GraphError::MissingScenes)?;

        let mut diagnostics = Vec::new();
        let mut scenes = Vec::with_capacity(raw_scenes.len());
        let mut pending = Vec::with_capacity(raw_scenes.len());

        // Pass one: build scenes, park reference ids.
        for (position, raw_scene) in raw_scenes.into_iter().enumerate() {
            let (scene, links) = build_scene(position, raw_scene, strings, &mut diagnostics)?;
            scenes.push(scene);
            pending.push(links);
        }

        let mut index = FxHashMap::default();
        for (position, scene) in scenes.iter().enumerate() {
            if index.contains_key(&scene.id) {
                diagnostics.push(Diagnostic::DuplicateSceneId {
                    id: scene.id.clone(),
                    position,
                });
            } else {
                index.insert(scene.id.clone(), SceneIndex(position));
            }
        }

        // Pass two: swap parked ids for indices.
        let mut link = |scene: &str, site: ReferenceSite, target: &str| -> Option<SceneIndex> {
            let resolved = index.get(target).copied();
            if resolved.is_none() {
                diagnostics.push(Diagnostic::UnresolvedReference {
                    scene: scene.to_string(),
                    site,
                    target: target.to_string(),
                });
            }
            resolved
        };

        for (scene, links) in scenes.iter_mut().zip(pending) {
            let id = scene.id.clone();
            for (slot, next) in links.choice_next.iter().enumerate() {
                if let Some(target) = next {
                    let resolved = link(&id, ReferenceSite::ChoiceNext { choice: slot }, target);
                    scene.choices[slot].next = resolved;
                }
            }
            if let Some(target) = &links.auto_next {
                scene.auto_next = link(&id, ReferenceSite::AutoNext, target);
            }
            for (slot, target) in links.check_goto.iter().enumerate() {
                scene.checks[slot].target = link(&id, ReferenceSite::CheckGoto { check: slot }, target);
            }
        }
        let start = link(&start_id, ReferenceSite::Start, &start_id);

        for diagnostic in &diagnostics {
            if diagnostic.affects_flow() {
                warn!("{diagnostic}");
            } else {
                debug!("{diagnostic}");
            }
        }

        Ok(SceneGraph {
            scenes,
            index,
            start,
            start_id,
            language: strings.language().to_string(),
            diagnostics,
        })
    }

    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }

    pub fn scene(&self, index: SceneIndex) -> Option<&Scene> {
        self.scenes.get(index.0)
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    /// Scenes paired with their indices, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (SceneIndex, &Scene)> {
        self.scenes
            .iter()
            .enumerate()
            .map(|(i, scene)| (SceneIndex(i), scene))
    }

    /// Index of the first scene declared with `id`.
    pub fn index_of(&self, id: &str) -> Option<SceneIndex> {
        self.index.get(id).copied()
    }

    pub fn start(&self) -> Option<SceneIndex> {
        self.start
    }

    pub fn start_id(&self) -> &str {
        &self.start_id
    }

    /// Language the localizable fields were resolved with.
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

fn build_scene(
    position: usize,
    raw: RawScene,
    strings: &LocalizationTable,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<(Scene, PendingLinks), GraphError> {
    let id = raw
        .id
        .into_option()
        .ok_or(GraphError::SceneWithoutId { position })?;

    let speaker = localize(&id, raw.speaker, strings, diagnostics);
    let text = localize(&id, raw.text, strings, diagnostics);
    let title = localize(&id, raw.title, strings, diagnostics);

    let mut links = PendingLinks {
        auto_next: raw.auto_next.into_option(),
        ..PendingLinks::default()
    };

    let mut raw_choices = Vec::new();
    for raw_choice in raw.choices.into_option().unwrap_or_default() {
        // A choice that is not an object still occupies its slot, empty.
        raw_choices.push(raw_choice.into_option().unwrap_or_default());
    }
    if raw_choices.len() > MAX_CHOICES {
        diagnostics.push(Diagnostic::CapacityExceeded {
            scene: id.clone(),
            slot: Slot::Choices,
            dropped: raw_choices.len() - MAX_CHOICES,
        });
        raw_choices.truncate(MAX_CHOICES);
    }

    let mut choices = Vec::with_capacity(raw_choices.len());
    for (slot, raw_choice) in raw_choices.into_iter().enumerate() {
        let effects = raw_choice.effects.into_option().unwrap_or_default();
        let (add_flags, dropped_add) = Bounded::truncating(flag_names(raw_choice.add_flags));
        let (remove_flags, dropped_remove) =
            Bounded::truncating(flag_names(raw_choice.remove_flags));
        if dropped_add > 0 {
            diagnostics.push(Diagnostic::CapacityExceeded {
                scene: id.clone(),
                slot: Slot::AddFlags { choice: slot },
                dropped: dropped_add,
            });
        }
        if dropped_remove > 0 {
            diagnostics.push(Diagnostic::CapacityExceeded {
                scene: id.clone(),
                slot: Slot::RemoveFlags { choice: slot },
                dropped: dropped_remove,
            });
        }
        links.choice_next.push(raw_choice.next.into_option());
        choices.push(Choice {
            text: localize(&id, raw_choice.text, strings, diagnostics),
            effects: StatDelta {
                clarity: whole(effects.clarity),
                anxiety: whole(effects.anxiety),
                balance: whole(effects.balance),
            },
            next: None,
            add_flags,
            remove_flags,
        });
    }

    let mut checks = Vec::new();
    let mut dropped_checks = 0;
    for (position, raw_check) in raw
        .checks
        .into_option()
        .unwrap_or_default()
        .into_iter()
        .enumerate()
    {
        let raw_check = raw_check.into_option().unwrap_or_default();
        let (Some(condition), Some(goto)) =
            (raw_check.condition.into_option(), raw_check.goto.into_option())
        else {
            diagnostics.push(Diagnostic::MalformedCheck {
                scene: id.clone(),
                check: position,
            });
            continue;
        };
        if checks.len() >= MAX_CHECKS {
            dropped_checks += 1;
            continue;
        }
        links.check_goto.push(goto);
        checks.push(AutoCheck {
            condition: build_condition(condition),
            target: None,
        });
    }
    if dropped_checks > 0 {
        diagnostics.push(Diagnostic::CapacityExceeded {
            scene: id.clone(),
            slot: Slot::Checks,
            dropped: dropped_checks,
        });
    }

    let scene = Scene {
        speaker,
        text,
        title,
        background: raw.background.into_option(),
        music: raw.music.into_option(),
        choices: Bounded::truncating(choices).0,
        checks: Bounded::truncating(checks).0,
        auto_time: raw.auto_time.into_option().unwrap_or(0.0) as f32,
        auto_next: None,
        cinematic: raw.cinematic.into_option().unwrap_or(false),
        id,
    };
    Ok((scene, links))
}

/// Resolve a localizable field, noting any key the table lacks.
fn localize(
    scene: &str,
    value: Lenient<String>,
    strings: &LocalizationTable,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<String> {
    let resolved = strings.lookup(&value.into_option()?);
    if let Some(key) = resolved.missing_key {
        diagnostics.push(Diagnostic::MissingTranslation {
            scene: scene.to_string(),
            key,
        });
    }
    Some(resolved.text)
}

fn build_condition(raw: RawCondition) -> Condition {
    let comparison = |value: Lenient<String>| value.into_option().map(|s| Comparison::parse(&s));
    let flag = |value: Lenient<String>| value.into_option().filter(|name| !name.is_empty());
    Condition {
        clarity: comparison(raw.clarity),
        anxiety: comparison(raw.anxiety),
        balance: comparison(raw.balance),
        flag: flag(raw.flag),
        flag2: flag(raw.flag2),
        not_flag: flag(raw.not_flag),
    }
}

fn flag_names(raw: Lenient<Vec<Lenient<String>>>) -> impl Iterator<Item = String> {
    raw.into_option()
        .unwrap_or_default()
        .into_iter()
        .filter_map(Lenient::into_option)
        .filter(|name| !name.is_empty())
}

fn whole(value: Lenient<f64>) -> i32 {
    value.into_option().map_or(0, |v| v as i32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(input: &str) -> Result<SceneGraph, GraphError> {
        SceneGraph::parse(input, DocumentFormat::Json, &LocalizationTable::new("en"))
    }

    #[test]
    fn links_forward_references() {
        let graph = parse(
            r#"{"start": "a", "scenes": [
                {"id": "a", "choices": [{"text": "go", "next": "b"}]},
                {"id": "b", "text": "end"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.start(), Some(SceneIndex(0)));
        let a = graph.scene(SceneIndex(0)).unwrap();
        assert_eq!(a.choices[0].next, Some(SceneIndex(1)));
        assert!(graph.diagnostics().is_empty());
    }

    #[test]
    fn unresolved_references_become_dead_ends() {
        let graph = parse(
            r#"{"start": "nowhere", "scenes": [
                {"id": "a", "auto_time": 1.5, "auto_next": "ghost",
                 "choices": [{"next": "ghost"}],
                 "checks": [{"if": {"flag": "x"}, "goto": "ghost"}]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(graph.start(), None);
        assert_eq!(graph.start_id(), "nowhere");
        let a = graph.scene(SceneIndex(0)).unwrap();
        assert_eq!(a.choices[0].next, None);
        assert_eq!(a.auto_next, None);
        assert_eq!(a.checks[0].target, None);
        let unresolved = graph
            .diagnostics()
            .iter()
            .filter(|d| matches!(d, Diagnostic::UnresolvedReference { .. }))
            .count();
        assert_eq!(unresolved, 4);
    }

    #[test]
    fn missing_top_level_fields_fail() {
        assert!(matches!(parse(r#"{"scenes": []}"#), Err(GraphError::MissingStart)));
        assert!(matches!(parse(r#"{"start": 3, "scenes": []}"#), Err(GraphError::MissingStart)));
        assert!(matches!(parse(r#"{"start": "a"}"#), Err(GraphError::MissingScenes)));
        assert!(matches!(parse("{ broken"), Err(GraphError::Document(_))));
    }

    #[test]
    fn scene_without_id_aborts_load() {
        let result = parse(r#"{"start": "a", "scenes": [{"id": "a"}, {"text": "orphan"}]}"#);
        assert!(matches!(result, Err(GraphError::SceneWithoutId { position: 1 })));
    }

    #[test]
    fn duplicate_ids_first_wins() {
        let graph = parse(
            r#"{"start": "a", "scenes": [
                {"id": "a", "text": "first"},
                {"id": "a", "text": "second"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(graph.index_of("a"), Some(SceneIndex(0)));
        assert_eq!(
            graph.diagnostics(),
            &[Diagnostic::DuplicateSceneId {
                id: "a".to_string(),
                position: 1
            }]
        );
    }

    #[test]
    fn capacities_are_enforced() {
        let graph = parse(
            r#"{"start": "a", "scenes": [{"id": "a",
                "choices": [
                    {"text": "1", "flags+": ["f1", "f2", "f3", "f4", "f5"]},
                    {"text": "2"}, {"text": "3"}, {"text": "4"}, {"text": "5"}
                ],
                "checks": [
                    {"if": {}, "goto": "a"}, {"if": {}, "goto": "a"},
                    {"if": {}, "goto": "a"}, {"if": {}, "goto": "a"},
                    {"if": {}, "goto": "a"}
                ]}]}"#,
        )
        .unwrap();
        let a = graph.scene(SceneIndex(0)).unwrap();
        assert_eq!(a.choices.len(), MAX_CHOICES);
        assert_eq!(a.checks.len(), MAX_CHECKS);
        assert_eq!(a.choices[0].add_flags.len(), 4);
        assert_eq!(a.choices[3].text.as_deref(), Some("4"));
        let dropped: Vec<Slot> = graph
            .diagnostics()
            .iter()
            .filter_map(|d| match d {
                Diagnostic::CapacityExceeded { slot, .. } => Some(*slot),
                _ => None,
            })
            .collect();
        assert_eq!(
            dropped,
            vec![Slot::Choices, Slot::AddFlags { choice: 0 }, Slot::Checks]
        );
    }

    #[test]
    fn malformed_checks_are_skipped_without_using_a_slot() {
        let graph = parse(
            r#"{"start": "a", "scenes": [{"id": "a", "checks": [
                {"if": "clarity>5", "goto": "a"},
                {"if": {"clarity": ">=5"}, "goto": 7},
                "nonsense",
                {"if": {"clarity": ">=5"}, "goto": "a"}
            ]}]}"#,
        )
        .unwrap();
        let a = graph.scene(SceneIndex(0)).unwrap();
        assert_eq!(a.checks.len(), 1);
        assert_eq!(a.checks[0].target, Some(SceneIndex(0)));
        assert_eq!(
            a.checks[0].condition.clarity,
            Some(Comparison::parse(">=5"))
        );
    }

    #[test]
    fn wrong_typed_leaves_are_ignored() {
        let graph = parse(
            r#"{"start": "a", "scenes": [{"id": "a",
                "speaker": 5, "auto_time": "soon", "cinematic": "yes",
                "choices": [{"text": "ok", "effects": {"clarity": 3.9, "anxiety": "lots", "balance": -2.7},
                             "flags-": ["x", 4, ""]}],
                "checks": [{"if": {"clarity": 50, "flag": "met"}, "goto": "a"}]
            }]}"#,
        )
        .unwrap();
        let a = graph.scene(SceneIndex(0)).unwrap();
        assert_eq!(a.speaker, None);
        assert_eq!(a.auto_time, 0.0);
        assert!(!a.cinematic);
        let choice = &a.choices[0];
        assert_eq!(
            choice.effects,
            StatDelta {
                clarity: 3,
                anxiety: 0,
                balance: -2
            }
        );
        assert_eq!(&*choice.remove_flags, &["x".to_string()]);
        // A numeric comparison is not a string, so it is unspecified.
        assert_eq!(a.checks[0].condition.clarity, None);
        assert_eq!(a.checks[0].condition.flag.as_deref(), Some("met"));
    }

    #[test]
    fn localizable_fields_resolve_through_table() {
        let mut strings = LocalizationTable::new("en");
        strings.insert("hello", "Hello there");
        let graph = SceneGraph::parse(
            r#"{"start": "a", "scenes": [{"id": "a", "speaker": "str:anna",
                "text": "str:hello", "background": "str:not_localized",
                "choices": [{"text": "plain"}]}]}"#,
            DocumentFormat::Json,
            &strings,
        )
        .unwrap();
        let a = graph.scene(SceneIndex(0)).unwrap();
        assert_eq!(a.text.as_deref(), Some("Hello there"));
        assert_eq!(a.speaker.as_deref(), Some("anna"));
        assert_eq!(a.background.as_deref(), Some("str:not_localized"));
        assert_eq!(a.choices[0].text.as_deref(), Some("plain"));
        assert_eq!(graph.language(), "en");
        assert_eq!(
            graph.diagnostics(),
            &[Diagnostic::MissingTranslation {
                scene: "a".to_string(),
                key: "anna".to_string()
            }]
        );
    }

    #[test]
    fn empty_scene_list_loads() {
        let graph = parse(r#"{"start": "a", "scenes": []}"#).unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.start(), None);
    }
}
