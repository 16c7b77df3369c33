/// Auto-check evaluation on scene entry.

use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::debug;

use crate::core::flags::FlagStore;
use crate::core::graph::SceneGraph;
use crate::schema::scene::{Scene, SceneIndex};
use crate::schema::stats::StatSample;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BranchError {
    #[error("scene {0} is not in the graph")]
    SceneOutOfRange(SceneIndex),
    #[error("auto-checks redirect in a cycle: {}", .chain.join(" -> "))]
    RedirectCycle { chain: Vec<String> },
}

/// Where an entry actually lands after following auto-checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// The scene whose dialog becomes visible.
    pub landed: SceneIndex,
    /// Scenes redirected away from, in order. Their dialog is never shown.
    pub passed: Vec<SceneIndex>,
}

/// The target of the first auto-check that fires, if any.
///
/// Checks whose `goto` did not resolve are skipped so a later check can
/// still fire.
pub fn evaluate_checks(scene: &Scene, stats: StatSample, flags: &FlagStore) -> Option<SceneIndex> {
    scene
        .checks
        .iter()
        .filter_map(|check| check.target.map(|target| (check, target)))
        .find(|(check, _)| check.condition.holds(stats, |name| flags.has(name)))
        .map(|(_, target)| target)
}

/// Follow auto-check redirects from `entry` until a scene keeps the player.
///
/// Stats and flags are fixed for the whole chain, so reaching a scene twice
/// means the chain never ends; that is reported as [`BranchError::RedirectCycle`].
pub fn resolve_entry(
    graph: &SceneGraph,
    entry: SceneIndex,
    stats: StatSample,
    flags: &FlagStore,
) -> Result<Resolution, BranchError> {
    let mut visited = FxHashSet::default();
    let mut passed = Vec::new();
    let mut current = entry;

    loop {
        let scene = graph
            .scene(current)
            .ok_or(BranchError::SceneOutOfRange(current))?;
        if !visited.insert(current) {
            let mut chain: Vec<String> = passed
                .iter()
                .filter_map(|&idx| graph.scene(idx).map(|s| s.id.clone()))
                .collect();
            chain.push(scene.id.clone());
            return Err(BranchError::RedirectCycle { chain });
        }

        match evaluate_checks(scene, stats, flags) {
            Some(next) => {
                debug!(from = %scene.id, to = %next, "Auto-check redirect");
                passed.push(current);
                current = next;
            }
            None => {
                return Ok(Resolution {
                    landed: current,
                    passed,
                })
            }
        }
    }
}
