//! Decision-core configuration.

use crate::battle::state::MAX_TEAM_SIZE;
use serde::{Deserialize, Serialize};

/// Tunables for one agent instance. Every field has a sensible default, so a
/// partial JSON document (or none at all) configures the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// MCTS rounds per decision.
    pub iterations: u32,
    /// UCT exploration constant.
    pub exploration_c: f64,
    /// Horizon of the heuristic rollout.
    pub rollout_turns: u32,
    /// Level assumed for opponents with unknown stats.
    pub default_level: u8,
    /// Target opponent team size when filling unrevealed slots.
    pub team_size: usize,
    /// Consult the pruning oracle at the root.
    pub enable_pruner: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            iterations: 100,
            exploration_c: 1.4,
            rollout_turns: 1,
            default_level: 80,
            team_size: MAX_TEAM_SIZE,
            enable_pruner: false,
        }
    }
}
