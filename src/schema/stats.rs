use serde::{Deserialize, Serialize};

use super::scene::StatDelta;

/// Which mood statistic a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatKind {
    Clarity,
    Anxiety,
    Balance,
}

impl StatKind {
    pub const ALL: [StatKind; 3] = [StatKind::Clarity, StatKind::Anxiety, StatKind::Balance];

    /// Inclusive value range.
    pub fn range(&self) -> (f32, f32) {
        match self {
            Self::Clarity | Self::Anxiety => (0.0, 100.0),
            Self::Balance => (-100.0, 100.0),
        }
    }

    /// Short label used in stat notices ("CL", "ANX", "BAL").
    pub fn abbrev(&self) -> &'static str {
        match self {
            Self::Clarity => "CL",
            Self::Anxiety => "ANX",
            Self::Balance => "BAL",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Clarity => "clarity",
            Self::Anxiety => "anxiety",
            Self::Balance => "balance",
        }
    }

    pub fn clamp(&self, value: f32) -> f32 {
        let (lo, hi) = self.range();
        value.clamp(lo, hi)
    }
}

/// A `(current, target)` pair.
///
/// `target` is the authoritative value that choices and drift mutate and that
/// branch conditions read. `current` is a display shadow chasing `target`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stat {
    pub current: f32,
    pub target: f32,
}

impl Stat {
    pub fn settled(value: f32) -> Self {
        Self {
            current: value,
            target: value,
        }
    }
}

/// Integer snapshot of the three targets, as seen by branch conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StatSample {
    pub clarity: i32,
    pub anxiety: i32,
    pub balance: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub clarity: Stat,
    pub anxiety: Stat,
    pub balance: Stat,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new(20.0, 12.0, 5.0)
    }
}

impl Stats {
    /// Start with every display value already settled on its target.
    pub fn new(clarity: f32, anxiety: f32, balance: f32) -> Self {
        Self {
            clarity: Stat::settled(StatKind::Clarity.clamp(clarity)),
            anxiety: Stat::settled(StatKind::Anxiety.clamp(anxiety)),
            balance: Stat::settled(StatKind::Balance.clamp(balance)),
        }
    }

    pub fn get(&self, kind: StatKind) -> &Stat {
        match kind {
            StatKind::Clarity => &self.clarity,
            StatKind::Anxiety => &self.anxiety,
            StatKind::Balance => &self.balance,
        }
    }

    pub fn get_mut(&mut self, kind: StatKind) -> &mut Stat {
        match kind {
            StatKind::Clarity => &mut self.clarity,
            StatKind::Anxiety => &mut self.anxiety,
            StatKind::Balance => &mut self.balance,
        }
    }

    /// Add `amount` to a target and clamp it into range.
    pub fn nudge(&mut self, kind: StatKind, amount: f32) {
        let stat = self.get_mut(kind);
        stat.target = kind.clamp(stat.target + amount);
    }

    /// Apply a choice's effects to the targets.
    pub fn apply(&mut self, delta: StatDelta) {
        self.nudge(StatKind::Clarity, delta.clarity as f32);
        self.nudge(StatKind::Anxiety, delta.anxiety as f32);
        self.nudge(StatKind::Balance, delta.balance as f32);
    }

    /// Clamp all three targets into range.
    pub fn clamp_targets(&mut self) {
        for kind in StatKind::ALL {
            let stat = self.get_mut(kind);
            stat.target = kind.clamp(stat.target);
        }
    }

    /// Targets truncated toward zero.
    pub fn sample(&self) -> StatSample {
        StatSample {
            clarity: self.clarity.target as i32,
            anxiety: self.anxiety.target as i32,
            balance: self.balance.target as i32,
        }
    }
}
