//! Monte Carlo tree search over one decision.
//!
//! Nodes live in a flat arena and point at each other by index, so the tree
//! owns every cloned `BattleState` without reference cycles. Selection is
//! UCT, expansion applies one untried agent action against a heuristic
//! opponent model, rollouts come from the configured policy, and the same
//! reward is added at every level on the way back up.

use crate::battle::engine::{BattleEngine, TurnAction};
use crate::battle::state::{BattleState, Player};
use crate::config::SearchConfig;
use crate::heuristics::best_attack_index;
use crate::search::pruner::PruningOracle;
use crate::search::rollout::RolloutPolicy;
use crate::search::Action;
use rand::rngs::StdRng;
use rand::Rng;
use tracing::warn;

struct Node {
    state: BattleState,
    parent: Option<usize>,
    action: Option<Action>,
    visits: u32,
    wins: f64,
    children: Vec<usize>,
    untried: Vec<Action>,
}

impl Node {
    fn new(state: BattleState, parent: Option<usize>, action: Option<Action>) -> Node {
        let untried = legal_actions(&state);
        Node {
            state,
            parent,
            action,
            visits: 0,
            wins: 0.0,
            children: Vec::new(),
            untried,
        }
    }
}

/// The agent's legal actions in a state: moves with PP on the active, plus
/// living bench members.
fn legal_actions(state: &BattleState) -> Vec<Action> {
    let mut actions = Vec::new();
    if let Some(active) = state.active_of(Player::Agent) {
        for mv in &active.moves {
            if mv.has_pp() {
                actions.push(Action::Move { id: mv.id.clone() });
            }
        }
    }
    for p in state.team_of(Player::Agent) {
        if !p.is_active && !p.is_fainted() {
            actions.push(Action::Switch {
                species: p.species.clone(),
            });
        }
    }
    actions
}

/// The observation's own legal-action lists, used for the root where they
/// are authoritative.
fn root_actions(state: &BattleState) -> Vec<Action> {
    let mut actions: Vec<Action> = state
        .available_moves
        .iter()
        .map(|id| Action::Move { id: id.clone() })
        .collect();
    actions.extend(state.available_switches.iter().map(|species| Action::Switch {
        species: species.clone(),
    }));
    if actions.is_empty() {
        // Fall back to deriving from the state itself.
        return legal_actions(state);
    }
    actions
}

/// One explored root candidate in a search report.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionStats {
    pub action: Action,
    pub visits: u32,
    pub win_rate: f64,
}

pub struct MctsSearcher<'a> {
    engine: &'a BattleEngine,
    policy: &'a dyn RolloutPolicy,
    pruner: Option<&'a dyn PruningOracle>,
    config: &'a SearchConfig,
}

impl<'a> MctsSearcher<'a> {
    pub fn new(
        engine: &'a BattleEngine,
        policy: &'a dyn RolloutPolicy,
        pruner: Option<&'a dyn PruningOracle>,
        config: &'a SearchConfig,
    ) -> MctsSearcher<'a> {
        MctsSearcher {
            engine,
            policy,
            pruner,
            config,
        }
    }

    /// Run the configured number of iterations and return the most-visited
    /// root action. `None` when the root has no legal actions at all.
    pub fn search(&self, root_state: &BattleState, rng: &mut StdRng) -> Option<Action> {
        self.run(root_state, rng).0
    }

    /// Like [`search`](Self::search), but also report every explored root
    /// candidate with its visit count and mean reward, best first.
    pub fn search_with_report(
        &self,
        root_state: &BattleState,
        rng: &mut StdRng,
    ) -> (Option<Action>, Vec<ActionStats>) {
        let (chosen, arena) = self.run(root_state, rng);

        let mut report: Vec<ActionStats> = arena[0]
            .children
            .iter()
            .filter_map(|&c| {
                let node = &arena[c];
                let action = node.action.clone()?;
                let win_rate = if node.visits > 0 {
                    node.wins / node.visits as f64
                } else {
                    0.0
                };
                Some(ActionStats {
                    action,
                    visits: node.visits,
                    win_rate,
                })
            })
            .collect();
        report.sort_by(|a, b| b.visits.cmp(&a.visits));

        (chosen, report)
    }

    fn run(&self, root_state: &BattleState, rng: &mut StdRng) -> (Option<Action>, Vec<Node>) {
        let mut root = Node::new(root_state.clone(), None, None);
        root.untried = root_actions(&root.state);

        self.apply_root_pruning(&mut root);

        let all_actions = root.untried.clone();
        if all_actions.is_empty() {
            return (None, vec![root]);
        }
        if all_actions.len() == 1 {
            return (Some(all_actions[0].clone()), vec![root]);
        }

        let mut arena = vec![root];

        for _ in 0..self.config.iterations {
            let mut node = 0usize;

            // Selection: descend while fully expanded and non-terminal.
            while !arena[node].state.finished
                && arena[node].untried.is_empty()
                && !arena[node].children.is_empty()
            {
                match self.select_best(&arena, node) {
                    Some(child) => node = child,
                    None => break,
                }
            }

            // Expansion: try one untried action.
            if !arena[node].state.finished && !arena[node].untried.is_empty() {
                node = self.expand(&mut arena, node, rng);
            }

            // Rollout and backpropagation.
            let reward = self
                .policy
                .rollout(&arena[node].state, self.engine, rng);
            backpropagate(&mut arena, node, reward);
        }

        let best = arena[0]
            .children
            .iter()
            .copied()
            .max_by_key(|&c| arena[c].visits)
            .and_then(|c| arena[c].action.clone());

        let chosen = match best {
            Some(action) => Some(action),
            // No iteration expanded anything; any legal action will do.
            None => Some(all_actions[rng.gen_range(0..all_actions.len())].clone()),
        };
        (chosen, arena)
    }

    /// UCT child selection. `ln(parent.visits)` is hoisted out of the loop;
    /// unvisited children are not candidates (expansion owns them).
    fn select_best(&self, arena: &[Node], node: usize) -> Option<usize> {
        let parent_visits = arena[node].visits.max(1) as f64;
        let log_n = parent_visits.ln();
        let c = self.config.exploration_c;

        let mut best: Option<(usize, f64)> = None;
        for &child in &arena[node].children {
            let visits = arena[child].visits;
            if visits == 0 {
                continue;
            }
            let exploit = arena[child].wins / visits as f64;
            let explore = c * (log_n / visits as f64).sqrt();
            let score = exploit + explore;
            if best.map(|(_, s)| score > s).unwrap_or(true) {
                best = Some((child, score));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Pop a random untried action, simulate it against the modeled
    /// opponent, and attach the resulting child.
    fn expand(&self, arena: &mut Vec<Node>, parent: usize, rng: &mut StdRng) -> usize {
        let pick = rng.gen_range(0..arena[parent].untried.len());
        let action = arena[parent].untried.swap_remove(pick);

        let mut state = arena[parent].state.clone();
        let agent_action = translate_action(&state, &action);

        // The opponent is assumed to pick its strongest attack.
        let opponent_action = {
            let opp = state.active_of(Player::Opponent);
            let me = state.active_of(Player::Agent);
            opp.and_then(|p| best_attack_index(p, me, self.engine.chart(), rng))
                .map(TurnAction::Move)
                .unwrap_or(TurnAction::None)
        };

        self.engine
            .simulate_turn(&mut state, agent_action, opponent_action, rng);

        let child = Node::new(state, Some(parent), Some(action));
        arena.push(child);
        let child_idx = arena.len() - 1;
        arena[parent].children.push(child_idx);
        child_idx
    }

    /// Root-only pruning. Failures and unavailable oracles prune nothing.
    fn apply_root_pruning(&self, root: &mut Node) {
        let Some(oracle) = self.pruner else {
            return;
        };
        if !oracle.is_available() {
            return;
        }

        match oracle.prune(&root.state, &root.untried) {
            Ok(pruned) if !pruned.is_empty() => {
                root.untried.retain(|a| !pruned.contains(&a.identifier()));
            }
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "pruning oracle failed, keeping all actions");
            }
        }
    }
}

/// Resolve an abstract action against a cloned state's own move list.
fn translate_action(state: &BattleState, action: &Action) -> TurnAction {
    match action {
        Action::Move { id } => {
            let slot = state.active_of(Player::Agent).and_then(|active| {
                active
                    .moves
                    .iter()
                    .position(|m| m.id.eq_ignore_ascii_case(id))
            });
            match slot {
                Some(idx) => TurnAction::Move(idx),
                None => TurnAction::MoveNamed(id.clone()),
            }
        }
        Action::Switch { species } => TurnAction::Switch(species.clone()),
    }
}

fn backpropagate(arena: &mut [Node], mut node: usize, reward: f64) {
    loop {
        arena[node].visits += 1;
        arena[node].wins += reward;
        match arena[node].parent {
            Some(parent) => node = parent,
            None => break,
        }
    }
}
