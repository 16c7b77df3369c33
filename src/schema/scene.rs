use serde::Serialize;

use super::bounded::Bounded;
use super::condition::Condition;

/// Most choices a scene offers.
pub const MAX_CHOICES: usize = 4;
/// Most auto-checks a scene carries.
pub const MAX_CHECKS: usize = 4;
/// Most flags a single choice adds (or removes).
pub const MAX_CHOICE_FLAGS: usize = 4;

/// Dense index of a scene within one loaded graph.
///
/// Only meaningful relative to the graph that produced it; a reload
/// invalidates every index handed out before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SceneIndex(pub usize);

impl std::fmt::Display for SceneIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Integer stat effects of a choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatDelta {
    pub clarity: i32,
    pub anxiety: i32,
    pub balance: i32,
}

impl StatDelta {
    pub fn is_zero(&self) -> bool {
        *self == StatDelta::default()
    }
}

/// A player-selectable option.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Choice {
    pub text: Option<String>,
    pub effects: StatDelta,
    /// `None` ends the story when chosen.
    pub next: Option<SceneIndex>,
    pub add_flags: Bounded<String, MAX_CHOICE_FLAGS>,
    pub remove_flags: Bounded<String, MAX_CHOICE_FLAGS>,
}

/// A guarded automatic transition, evaluated on scene entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AutoCheck {
    pub condition: Condition,
    /// `None` when the `goto` id did not resolve; such a check never fires.
    pub target: Option<SceneIndex>,
}

/// One node of the dialogue graph, with every reference already linked.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Scene {
    pub id: String,
    pub speaker: Option<String>,
    pub text: Option<String>,
    pub title: Option<String>,
    pub background: Option<String>,
    pub music: Option<String>,
    pub choices: Bounded<Choice, MAX_CHOICES>,
    pub checks: Bounded<AutoCheck, MAX_CHECKS>,
    /// Seconds a choiceless scene stays up before following `auto_next`.
    pub auto_time: f32,
    pub auto_next: Option<SceneIndex>,
    /// Presentation hint: hide HUD and choice chrome.
    pub cinematic: bool,
}

impl Scene {
    /// Delay and target when this scene advances on its own.
    pub fn auto_advance(&self) -> Option<(f32, SceneIndex)> {
        if !self.choices.is_empty() || self.auto_time <= 0.0 {
            return None;
        }
        self.auto_next.map(|next| (self.auto_time, next))
    }

    /// A scene the player cannot leave: nothing to pick, nowhere to go.
    pub fn is_ending(&self) -> bool {
        self.choices.is_empty() && self.auto_advance().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_advance_requires_choiceless_timed_scene() {
        let mut scene = Scene {
            id: "intro".to_string(),
            auto_time: 2.0,
            auto_next: Some(SceneIndex(1)),
            ..Scene::default()
        };
        assert_eq!(scene.auto_advance(), Some((2.0, SceneIndex(1))));
        assert!(!scene.is_ending());

        scene.auto_time = 0.0;
        assert_eq!(scene.auto_advance(), None);
        assert!(scene.is_ending());

        scene.auto_time = 2.0;
        scene.choices.try_push(Choice::default()).unwrap();
        assert_eq!(scene.auto_advance(), None);
        assert!(!scene.is_ending());
    }

    #[test]
    fn unresolved_auto_next_is_an_ending() {
        let scene = Scene {
            id: "lost".to_string(),
            auto_time: 3.0,
            auto_next: None,
            ..Scene::default()
        };
        assert!(scene.is_ending());
    }

    #[test]
    fn zero_delta() {
        assert!(StatDelta::default().is_zero());
        assert!(!StatDelta {
            clarity: 1,
            ..StatDelta::default()
        }
        .is_zero());
    }

    #[test]
    fn index_display() {
        assert_eq!(SceneIndex(3).to_string(), "#3");
    }
}
