//! poke_mcts - decision core for a turn-based Pokemon battle agent.
//!
//! Given an observed battle state at the start of the agent's turn, the core
//! returns the single action (use a move, or switch) that maximizes its
//! estimated win probability. Three pieces make that work: a cheap-to-clone
//! value model, a deterministic-per-seed one-turn simulation engine, and an
//! MCTS search whose root can optionally be narrowed by an external pruning
//! oracle.

/// Shared enums and stat blocks
pub mod core_data;

/// Type effectiveness chart
pub mod typechart;

/// Move and species tables (JSON, loaded at startup)
pub mod dex;

/// Value model and one-turn simulation
pub mod battle;

/// Best-attack picker and state evaluation
pub mod heuristics;

/// MCTS, rollout policies, pruning oracle interface
pub mod search;

/// Observation boundary and state adapter
pub mod obs;

/// Configuration knobs
pub mod config;

/// `choose_action` facade
pub mod agent;

// Re-export commonly used types
pub use agent::Agent;
pub use battle::engine::{BattleEngine, TurnAction};
pub use battle::moves::Move;
pub use battle::pokemon::{Boosts, Pokemon, Volatiles};
pub use battle::state::{BattleState, Player, SideConditions, MAX_MOVES, MAX_TEAM_SIZE};
pub use config::SearchConfig;
pub use core_data::{BoostStat, MoveCategory, Stat, Stats, Status, Terrain, Type, Weather};
pub use dex::{Dex, DexError, MoveData, MoveFlags, SpeciesData};
pub use obs::{Observation, ObservedMove, ObservedPokemon};
pub use search::mcts::{ActionStats, MctsSearcher};
pub use search::pruner::{PruningOracle, WirePruner};
pub use search::rollout::{RandomRollout, RolloutPolicy, SmartRollout};
pub use search::Action;
pub use typechart::TypeChart;
