//! Rollout policies: short playouts from a freshly expanded leaf.
//!
//! The default policy plays a single greedy turn. The engine's stochastic
//! accuracy/crit/damage rolls compound quickly, so deeper deterministic
//! playouts add noise faster than signal.

use crate::battle::engine::{BattleEngine, TurnAction};
use crate::battle::state::{BattleState, Player};
use crate::heuristics::{best_attack_index, evaluate_state};
use rand::rngs::StdRng;

/// A playout strategy; returns a reward in [0, 1] from the agent's
/// perspective.
pub trait RolloutPolicy {
    fn rollout(&self, state: &BattleState, engine: &BattleEngine, rng: &mut StdRng) -> f64;
}

/// Both sides pick their strongest attack for a bounded number of turns.
pub struct SmartRollout {
    pub max_turns: u32,
}

impl SmartRollout {
    pub fn new(max_turns: u32) -> SmartRollout {
        SmartRollout { max_turns }
    }
}

impl Default for SmartRollout {
    fn default() -> Self {
        SmartRollout { max_turns: 1 }
    }
}

impl RolloutPolicy for SmartRollout {
    fn rollout(&self, state: &BattleState, engine: &BattleEngine, rng: &mut StdRng) -> f64 {
        if state.finished {
            return evaluate_state(state);
        }

        let mut rollout_state = state.clone();
        for _ in 0..self.max_turns {
            if rollout_state.finished {
                break;
            }

            let (agent_action, opponent_action) = {
                let me = rollout_state.active_of(Player::Agent);
                let opp = rollout_state.active_of(Player::Opponent);
                let mine = me
                    .and_then(|p| best_attack_index(p, opp, engine.chart(), rng))
                    .map(TurnAction::Move)
                    .unwrap_or(TurnAction::None);
                let theirs = opp
                    .and_then(|p| best_attack_index(p, me, engine.chart(), rng))
                    .map(TurnAction::Move)
                    .unwrap_or(TurnAction::None);
                (mine, theirs)
            };

            engine.simulate_turn(&mut rollout_state, agent_action, opponent_action, rng);
        }

        evaluate_state(&rollout_state)
    }
}

/// Both sides act at random for the same bounded horizon. Kept as the
/// baseline alternative to the greedy policy.
pub struct RandomRollout {
    pub max_turns: u32,
}

impl Default for RandomRollout {
    fn default() -> Self {
        RandomRollout { max_turns: 1 }
    }
}

impl RolloutPolicy for RandomRollout {
    fn rollout(&self, state: &BattleState, engine: &BattleEngine, rng: &mut StdRng) -> f64 {
        if state.finished {
            return evaluate_state(state);
        }

        let mut rollout_state = state.clone();
        for _ in 0..self.max_turns {
            if rollout_state.finished {
                break;
            }
            engine.simulate_turn(&mut rollout_state, TurnAction::None, TurnAction::None, rng);
        }
        evaluate_state(&rollout_state)
    }
}
