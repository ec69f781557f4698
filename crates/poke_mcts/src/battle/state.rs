//! Battle state snapshot.
//!
//! A `BattleState` owns everything it references: both teams, their moves,
//! and the field maps. The active Pokémon of a side is a slot index into that
//! side's team, so a clone re-aliases for free and mutations through the
//! active are always visible through team iteration.

use crate::battle::pokemon::Pokemon;
use crate::core_data::{Terrain, Weather};

/// Maximum team size per side.
pub const MAX_TEAM_SIZE: usize = 6;

/// Move slots per Pokémon.
pub const MAX_MOVES: usize = 4;

/// Which side of the battle an operation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Player {
    Agent,
    Opponent,
}

impl Player {
    pub const BOTH: [Player; 2] = [Player::Agent, Player::Opponent];

    #[inline]
    pub const fn other(self) -> Player {
        match self {
            Player::Agent => Player::Opponent,
            Player::Opponent => Player::Agent,
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Player::Agent => 0,
            Player::Opponent => 1,
        }
    }
}

/// Per-side condition timers (turns remaining, 0 = inactive).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SideConditions {
    pub reflect_turns: u8,
    pub light_screen_turns: u8,
    pub tailwind_turns: u8,
    pub safeguard_turns: u8,
}

#[derive(Debug, PartialEq)]
pub struct BattleState {
    pub turn: u16,

    // Teams, slot-ordered
    pub team: Vec<Pokemon>,
    pub opponent_team: Vec<Pokemon>,

    /// Slot index of each side's active Pokémon (`None` when the side has
    /// nothing left on the field).
    pub active: Option<usize>,
    pub opponent_active: Option<usize>,

    // Field
    pub weather: Weather,
    pub weather_turns: u8,
    pub terrain: Terrain,
    pub terrain_turns: u8,
    pub side_conditions: [SideConditions; 2],

    // Agent view: the legal actions this turn
    pub available_moves: Vec<String>,
    pub available_switches: Vec<String>,

    // Terminal
    pub finished: bool,
    pub won: bool,
    pub lost: bool,
}

impl Default for BattleState {
    fn default() -> Self {
        Self::new()
    }
}

impl BattleState {
    pub fn new() -> BattleState {
        BattleState {
            turn: 0,
            team: Vec::new(),
            opponent_team: Vec::new(),
            active: None,
            opponent_active: None,
            weather: Weather::None,
            weather_turns: 0,
            terrain: Terrain::None,
            terrain_turns: 0,
            side_conditions: [SideConditions::default(); 2],
            available_moves: Vec::new(),
            available_switches: Vec::new(),
            finished: false,
            won: false,
            lost: false,
        }
    }

    // ========================================================================
    // Side accessors
    // ========================================================================

    pub fn team_of(&self, player: Player) -> &[Pokemon] {
        match player {
            Player::Agent => &self.team,
            Player::Opponent => &self.opponent_team,
        }
    }

    pub fn team_of_mut(&mut self, player: Player) -> &mut Vec<Pokemon> {
        match player {
            Player::Agent => &mut self.team,
            Player::Opponent => &mut self.opponent_team,
        }
    }

    pub fn active_slot(&self, player: Player) -> Option<usize> {
        match player {
            Player::Agent => self.active,
            Player::Opponent => self.opponent_active,
        }
    }

    pub fn active_of(&self, player: Player) -> Option<&Pokemon> {
        self.active_slot(player)
            .and_then(|slot| self.team_of(player).get(slot))
    }

    pub fn active_of_mut(&mut self, player: Player) -> Option<&mut Pokemon> {
        let slot = self.active_slot(player)?;
        match player {
            Player::Agent => self.team.get_mut(slot),
            Player::Opponent => self.opponent_team.get_mut(slot),
        }
    }

    /// The agent's active Pokémon.
    pub fn active_pokemon(&self) -> Option<&Pokemon> {
        self.active_of(Player::Agent)
    }

    /// The opponent's active Pokémon.
    pub fn opponent_active_pokemon(&self) -> Option<&Pokemon> {
        self.active_of(Player::Opponent)
    }

    /// Install `slot` as `player`'s active Pokémon, maintaining the
    /// `is_active` flags across the whole team.
    pub fn set_active(&mut self, player: Player, slot: Option<usize>) {
        if let Some(s) = slot {
            debug_assert!(s < self.team_of(player).len(), "active slot out of range");
        }
        for p in self.team_of_mut(player).iter_mut() {
            p.is_active = false;
        }
        if let Some(s) = slot {
            if let Some(p) = self.team_of_mut(player).get_mut(s) {
                p.is_active = true;
            }
        }
        match player {
            Player::Agent => self.active = slot,
            Player::Opponent => self.opponent_active = slot,
        }
    }

    pub fn alive_count(&self, player: Player) -> usize {
        self.team_of(player)
            .iter()
            .filter(|p| !p.is_fainted())
            .count()
    }

    pub fn has_alive(&self, player: Player) -> bool {
        self.team_of(player).iter().any(|p| !p.is_fainted())
    }

    /// Average HP ratio over the side's surviving members.
    pub fn team_hp_ratio(&self, player: Player) -> f64 {
        let mut total = 0.0;
        let mut count = 0usize;
        for p in self.team_of(player) {
            if !p.is_fainted() && p.max_hp > 0 {
                total += p.hp_ratio();
                count += 1;
            }
        }
        if count == 0 {
            0.0
        } else {
            total / count as f64
        }
    }

    // ========================================================================
    // Invariant checks (debug builds only)
    // ========================================================================

    /// The active index must point at a living team member whose `is_active`
    /// flag is set, and no other member may carry the flag. With slot-index
    /// actives this cannot drift in release builds; the check guards against
    /// future refactors.
    pub fn assert_active_coherent(&self) {
        #[cfg(debug_assertions)]
        for player in Player::BOTH {
            let team = self.team_of(player);
            let slot = self.active_slot(player);
            if let Some(s) = slot {
                assert!(s < team.len(), "active slot {s} out of range");
                assert!(team[s].is_active, "active slot {s} not flagged active");
            }
            let flagged = team.iter().filter(|p| p.is_active).count();
            match slot {
                Some(_) => assert_eq!(flagged, 1, "exactly one active flag per side"),
                None => assert_eq!(flagged, 0, "no active flag without an active slot"),
            }
        }
    }
}

impl Clone for BattleState {
    /// Hand-written clone: primitives by value, condition maps by copy, every
    /// Pokémon (and its moves) cloned, active slots carried over so the clone
    /// aliases its own team entries.
    fn clone(&self) -> BattleState {
        BattleState {
            turn: self.turn,
            team: self.team.iter().cloned().collect(),
            opponent_team: self.opponent_team.iter().cloned().collect(),
            active: self.active,
            opponent_active: self.opponent_active,
            weather: self.weather,
            weather_turns: self.weather_turns,
            terrain: self.terrain,
            terrain_turns: self.terrain_turns,
            side_conditions: self.side_conditions,
            available_moves: self.available_moves.clone(),
            available_switches: self.available_switches.clone(),
            finished: self.finished,
            won: self.won,
            lost: self.lost,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::battle::moves::Move;
    use crate::core_data::{Stats, Type};
    use crate::dex::Dex;

    /// Build a battle-ready Pokémon with flat stats and the given moves.
    pub fn make_pokemon(
        species: &str,
        level: u8,
        types: (Type, Option<Type>),
        hp: u16,
        stats: [u16; 5],
        move_ids: &[&str],
    ) -> Pokemon {
        let dex = Dex::builtin();
        let mut p = Pokemon::new(species, level, types);
        p.max_hp = hp;
        p.current_hp = hp;
        p.stats = Stats {
            hp,
            atk: stats[0],
            def: stats[1],
            spa: stats[2],
            spd: stats[3],
            spe: stats[4],
        };
        p.base_stats = p.stats;
        p.moves = move_ids
            .iter()
            .map(|id| Move::from_data(dex.get_move(id)))
            .collect();
        p
    }

    /// One-vs-one battle state from two prepared Pokémon.
    pub fn one_on_one(agent: Pokemon, opponent: Pokemon) -> BattleState {
        let mut state = BattleState::new();
        state.available_moves = agent.moves.iter().map(|m| m.id.clone()).collect();
        state.team = vec![agent];
        state.opponent_team = vec![opponent];
        state.set_active(Player::Agent, Some(0));
        state.set_active(Player::Opponent, Some(0));
        state
    }
}
