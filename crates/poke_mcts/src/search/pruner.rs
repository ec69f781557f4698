//! Root-action pruning oracle interface.
//!
//! An oracle may strike candidate actions from the root's search space
//! before the first MCTS iteration. The contract is strict: per candidate it
//! answers Keep or Prune, never a ranking, and it prunes only actions with
//! zero realistic win-improvement potential in the exact current state.
//! The search stays correct when no oracle is configured, when it returns
//! the empty set, and when it fails outright — every failure collapses to
//! "nothing pruned".

use crate::battle::pokemon::Pokemon;
use crate::battle::state::{BattleState, Player};
use crate::search::Action;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Oracle failure. Callers treat any of these as "no actions pruned".
#[derive(Debug)]
pub enum PrunerError {
    /// The oracle could not be reached.
    Transport(String),
    /// The oracle answered with something that does not parse.
    Malformed(serde_json::Error),
}

impl fmt::Display for PrunerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrunerError::Transport(msg) => write!(f, "pruner unreachable: {msg}"),
            PrunerError::Malformed(err) => write!(f, "pruner response malformed: {err}"),
        }
    }
}

impl std::error::Error for PrunerError {}

/// A root-only action filter.
pub trait PruningOracle {
    /// Quick liveness check; unavailable oracles are skipped without a call.
    fn is_available(&self) -> bool {
        true
    }

    /// Identifiers (`move:<id>` / `switch:<species>`) of candidates to drop.
    fn prune(
        &self,
        state: &BattleState,
        candidates: &[Action],
    ) -> Result<HashSet<String>, PrunerError>;
}

// ============================================================================
// Wire representation
// ============================================================================

#[derive(Serialize)]
struct WirePokemon {
    species: String,
    level: u8,
    hp: u16,
    max_hp: u16,
    status: Option<String>,
    moves: Vec<String>,
}

impl WirePokemon {
    fn from_pokemon(p: &Pokemon) -> WirePokemon {
        WirePokemon {
            species: p.species.clone(),
            level: p.level,
            hp: p.current_hp,
            max_hp: p.max_hp,
            status: p.status.map(|s| s.as_str().to_string()),
            moves: p.moves.iter().map(|m| m.id.clone()).collect(),
        }
    }
}

/// The state digest shipped to the oracle.
#[derive(Serialize)]
struct PruneRequest {
    turn: u16,
    weather: String,
    active: Option<WirePokemon>,
    opponent_active: Option<WirePokemon>,
    bench: Vec<WirePokemon>,
    opponent_bench: Vec<WirePokemon>,
    candidate_actions: Vec<CandidateAction>,
}

#[derive(Serialize)]
struct CandidateAction {
    id: String,
    action: Action,
}

/// Reference response shape: `{ "pruned_action_ids": [...] }`.
#[derive(Deserialize)]
struct PruneResponse {
    #[serde(default)]
    pruned_action_ids: Vec<String>,
}

fn build_request(state: &BattleState, candidates: &[Action]) -> PruneRequest {
    let bench = |player: Player| {
        state
            .team_of(player)
            .iter()
            .filter(|p| !p.is_active && !p.is_fainted())
            .map(WirePokemon::from_pokemon)
            .collect()
    };

    PruneRequest {
        turn: state.turn,
        weather: state.weather.as_str().to_string(),
        active: state.active_pokemon().map(WirePokemon::from_pokemon),
        opponent_active: state.opponent_active_pokemon().map(WirePokemon::from_pokemon),
        bench: bench(Player::Agent),
        opponent_bench: bench(Player::Opponent),
        candidate_actions: candidates
            .iter()
            .map(|a| CandidateAction {
                id: a.identifier(),
                action: a.clone(),
            })
            .collect(),
    }
}

/// Oracle speaking JSON over a caller-supplied transport (an external
/// process behind HTTP/RPC; the transport closure hides which).
pub struct WirePruner<F>
where
    F: Fn(&str) -> Result<String, String>,
{
    transport: F,
}

impl<F> WirePruner<F>
where
    F: Fn(&str) -> Result<String, String>,
{
    pub fn new(transport: F) -> WirePruner<F> {
        WirePruner { transport }
    }
}

impl<F> PruningOracle for WirePruner<F>
where
    F: Fn(&str) -> Result<String, String>,
{
    fn prune(
        &self,
        state: &BattleState,
        candidates: &[Action],
    ) -> Result<HashSet<String>, PrunerError> {
        let request = build_request(state, candidates);
        let body = serde_json::to_string(&request).map_err(PrunerError::Malformed)?;
        let reply = (self.transport)(&body).map_err(PrunerError::Transport)?;
        let response: PruneResponse =
            serde_json::from_str(&reply).map_err(PrunerError::Malformed)?;
        Ok(response.pruned_action_ids.into_iter().collect())
    }
}
