//! Agent facade: observation in, one action out.
//!
//! `choose_action` wires the adapter, the search, and the action translation
//! together. Every recoverable failure collapses to a uniformly random legal
//! action; the facade never surfaces an error for a turn it can still play.

use crate::battle::engine::BattleEngine;
use crate::config::SearchConfig;
use crate::core_data::normalize_id;
use crate::dex::Dex;
use crate::obs::{build_state, Observation};
use crate::search::mcts::MctsSearcher;
use crate::search::pruner::PruningOracle;
use crate::search::rollout::{RolloutPolicy, SmartRollout};
use crate::search::Action;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

pub struct Agent {
    dex: Dex,
    engine: BattleEngine,
    policy: Box<dyn RolloutPolicy>,
    pruner: Option<Box<dyn PruningOracle>>,
    config: SearchConfig,
}

impl Agent {
    /// Agent over the embedded data tables.
    pub fn new(config: SearchConfig) -> Agent {
        Agent::with_dex(Dex::builtin().clone(), config)
    }

    pub fn with_dex(dex: Dex, config: SearchConfig) -> Agent {
        let engine = BattleEngine::new(dex.chart);
        let policy = Box::new(SmartRollout::new(config.rollout_turns));
        Agent {
            dex,
            engine,
            policy,
            pruner: None,
            config,
        }
    }

    /// Swap in an alternative rollout policy.
    pub fn set_rollout_policy(&mut self, policy: Box<dyn RolloutPolicy>) {
        self.policy = policy;
    }

    /// Attach a pruning oracle; it only runs when the config enables it.
    pub fn set_pruner(&mut self, pruner: Box<dyn PruningOracle>) {
        self.pruner = Some(pruner);
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Decide one turn. `None` only when the observation offers no legal
    /// action at all.
    pub fn choose_action(&self, obs: &Observation, rng: &mut StdRng) -> Option<Action> {
        let legal = legal_from_observation(obs);
        if legal.is_empty() {
            return None;
        }

        let state = build_state(obs, &self.dex, &self.config, rng);

        // Invalid observation: a side without an active makes the engine a
        // no-op, so searching is pointless.
        if state.active_pokemon().is_none() || state.opponent_active_pokemon().is_none() {
            warn!("observation missing an active, answering at random");
            return legal.choose(rng).cloned();
        }

        // Nothing to attack with: defer to a random switch.
        if obs.available_moves.is_empty() && !obs.available_switches.is_empty() {
            let switches: Vec<Action> = legal
                .iter()
                .filter(|a| matches!(a, Action::Switch { .. }))
                .cloned()
                .collect();
            return switches.choose(rng).cloned();
        }

        let pruner = if self.config.enable_pruner {
            self.pruner.as_deref()
        } else {
            None
        };
        let searcher = MctsSearcher::new(&self.engine, self.policy.as_ref(), pruner, &self.config);
        let chosen = searcher.search(&state, rng);

        match chosen.and_then(|a| translate_back(&a, &legal)) {
            Some(action) => Some(action),
            None => {
                debug!("search produced no translatable action, answering at random");
                legal.choose(rng).cloned()
            }
        }
    }
}

/// The observation's own legal-action list, as abstract actions.
fn legal_from_observation(obs: &Observation) -> Vec<Action> {
    let mut legal: Vec<Action> = obs
        .available_moves
        .iter()
        .map(|id| Action::Move { id: normalize_id(id) })
        .collect();
    legal.extend(obs.available_switches.iter().map(|s| Action::Switch {
        species: normalize_id(s),
    }));
    legal
}

/// Map the search's choice back onto the observation's action space.
fn translate_back(chosen: &Action, legal: &[Action]) -> Option<Action> {
    legal
        .iter()
        .find(|candidate| match (candidate, chosen) {
            (Action::Move { id: a }, Action::Move { id: b }) => {
                normalize_id(a) == normalize_id(b)
            }
            (Action::Switch { species: a }, Action::Switch { species: b }) => {
                normalize_id(a) == normalize_id(b)
            }
            _ => false,
        })
        .cloned()
}
