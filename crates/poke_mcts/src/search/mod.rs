//! Decision search: rollout policies, the MCTS tree, and root pruning.

pub mod mcts;
pub mod pruner;
pub mod rollout;

use serde::{Deserialize, Serialize};

/// An abstract action from the agent's perspective. This is also the shape
/// the facade hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Action {
    Move { id: String },
    Switch { species: String },
}

impl Action {
    /// Stable identifier used on the pruning wire: `move:<id>` or
    /// `switch:<species>`.
    pub fn identifier(&self) -> String {
        match self {
            Action::Move { id } => format!("move:{id}"),
            Action::Switch { species } => format!("switch:{species}"),
        }
    }
}
