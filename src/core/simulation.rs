/// Passive stat drift and display smoothing.
///
/// Each step works on the targets first (drift, damping, clarity feed,
/// anxiety decay, clamp) and then moves the displayed values toward the
/// new targets at a bounded rate.

use serde::{Deserialize, Serialize};

use crate::schema::stats::{StatKind, Stats};

/// Tunables of the drift model. Defaults reproduce the shipped game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftParams {
    /// Anxiety above this drags balance down.
    pub high_anxiety: f32,
    pub high_anxiety_pull: f32,
    /// Anxiety below this lifts balance up.
    pub low_anxiety: f32,
    pub low_anxiety_push: f32,
    /// Per-second pull of balance toward zero.
    pub balance_damping: f32,
    /// Clarity gained per second per unit of positive balance fraction.
    pub clarity_gain: f32,
    /// Clarity lost per second per unit of negative balance fraction.
    pub clarity_loss: f32,
    pub anxiety_decay: f32,
    /// Display rates, units per second.
    pub clarity_rate: f32,
    pub anxiety_rate: f32,
    pub balance_rate: f32,
}

impl Default for DriftParams {
    fn default() -> Self {
        Self {
            high_anxiety: 60.0,
            high_anxiety_pull: 0.20,
            low_anxiety: 30.0,
            low_anxiety_push: 0.12,
            balance_damping: 0.20,
            clarity_gain: 0.30,
            clarity_loss: 0.60,
            anxiety_decay: 0.05,
            clarity_rate: 220.0,
            anxiety_rate: 220.0,
            balance_rate: 500.0,
        }
    }
}

impl DriftParams {
    pub fn display_rate(&self, kind: StatKind) -> f32 {
        match kind {
            StatKind::Clarity => self.clarity_rate,
            StatKind::Anxiety => self.anxiety_rate,
            StatKind::Balance => self.balance_rate,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StatSimulator {
    params: DriftParams,
}

impl StatSimulator {
    pub fn new(params: DriftParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &DriftParams {
        &self.params
    }

    /// Balance drift caused by the given anxiety level.
    pub fn drift(&self, anxiety: f32) -> f32 {
        let p = &self.params;
        if anxiety > p.high_anxiety {
            -(anxiety - p.high_anxiety) * p.high_anxiety_pull
        } else if anxiety < p.low_anxiety {
            (p.low_anxiety - anxiety) * p.low_anxiety_push
        } else {
            0.0
        }
    }

    /// Advance `stats` by `dt` seconds. Non-positive or NaN `dt` does nothing.
    pub fn step(&self, stats: &mut Stats, dt: f32) {
        if !(dt > 0.0) {
            return;
        }
        let p = &self.params;

        let velocity = self.drift(stats.anxiety.target) - p.balance_damping * stats.balance.target;
        stats.balance.target += velocity * dt;

        let fraction = stats.balance.target / 100.0;
        let feed = if stats.balance.target >= 0.0 {
            p.clarity_gain
        } else {
            p.clarity_loss
        };
        stats.clarity.target += fraction * feed * dt;

        stats.anxiety.target -= p.anxiety_decay * dt;
        stats.clamp_targets();

        for kind in StatKind::ALL {
            let max_step = p.display_rate(kind) * dt;
            let stat = stats.get_mut(kind);
            stat.current = approach(stat.current, stat.target, max_step);
        }
    }
}

/// Move `current` toward `target` by at most `max_step`, landing exactly on
/// `target` when it is within reach.
pub fn approach(current: f32, target: f32, max_step: f32) -> f32 {
    let gap = target - current;
    if gap.abs() <= max_step {
        target
    } else {
        current + max_step.copysign(gap)
    }
}
