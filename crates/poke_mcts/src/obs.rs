//! Observation boundary and state adapter.
//!
//! The observation is an opaque, serde-shaped record of what the protocol
//! layer knows at the start of the agent's turn: the own side in full, the
//! opponent's side as far as it has been revealed. The adapter materializes
//! a self-consistent `BattleState` from it, filling the opponent's holes
//! with the standard random-battle assumptions. Filling happens once here;
//! the simulation engine treats the result as ground truth.

use crate::battle::moves::Move;
use crate::battle::pokemon::{Pokemon, Volatiles};
use crate::battle::state::{BattleState, Player, SideConditions, MAX_MOVES};
use crate::config::SearchConfig;
use crate::core_data::{normalize_id, Stats, Status, Terrain, Type, Weather};
use crate::dex::{Dex, SpeciesData};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Number of moves a filled-out Pokémon carries.
const FULL_MOVESET: usize = MAX_MOVES;

/// Assumed IVs for recomputed opponent stats.
const ASSUMED_IV: u16 = 31;

/// Assumed EVs for recomputed opponent stats.
const ASSUMED_EV: u16 = 84;

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservedMove {
    pub id: String,
    pub current_pp: Option<u8>,
    pub max_pp: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservedPokemon {
    pub species: String,
    pub level: u8,
    pub types: Vec<Type>,
    /// Absolute HP, or a percentage in [0, 100] when `hp_is_percent`.
    pub current_hp: f64,
    pub max_hp: f64,
    pub hp_is_percent: bool,
    pub status: Option<Status>,
    pub status_counter: u8,
    pub boosts: BTreeMap<String, i8>,
    /// Computed stats when known (own side); absent for most opponents.
    pub stats: Option<Stats>,
    pub item: Option<String>,
    pub ability: Option<String>,
    pub moves: Vec<ObservedMove>,
    pub is_active: bool,
    /// Volatile tags, e.g. `mustrecharge`, `firstturn`, `focusenergy`.
    pub volatiles: Vec<String>,
}

impl Default for ObservedPokemon {
    fn default() -> Self {
        ObservedPokemon {
            species: String::new(),
            level: 0,
            types: Vec::new(),
            current_hp: 100.0,
            max_hp: 0.0,
            hp_is_percent: true,
            status: None,
            status_counter: 0,
            boosts: BTreeMap::new(),
            stats: None,
            item: None,
            ability: None,
            moves: Vec::new(),
            is_active: false,
            volatiles: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Observation {
    pub turn: u16,
    pub team: Vec<ObservedPokemon>,
    pub opponent_team: Vec<ObservedPokemon>,
    pub weather: Option<String>,
    pub weather_turns: u8,
    pub terrain: Option<String>,
    pub terrain_turns: u8,
    /// Condition tag -> remaining turns, per side.
    pub side_conditions: BTreeMap<String, u8>,
    pub opponent_side_conditions: BTreeMap<String, u8>,
    pub available_moves: Vec<String>,
    pub available_switches: Vec<String>,
    pub finished: bool,
    pub won: bool,
    pub lost: bool,
}

// ============================================================================
// Stat recomputation (standard random-battle assumption)
// ============================================================================

fn recomputed_hp(base: u16, level: u8) -> u16 {
    ((2 * base as u32 + ASSUMED_IV as u32 + ASSUMED_EV as u32 / 4) * level as u32 / 100
        + level as u32
        + 10) as u16
}

fn recomputed_stat(base: u16, level: u8) -> u16 {
    ((2 * base as u32 + ASSUMED_IV as u32 + ASSUMED_EV as u32 / 4) * level as u32 / 100 + 5) as u16
}

/// Materialize a self-consistent `BattleState` from an observation, with the
/// opponent's holes filled.
pub fn build_state(
    obs: &Observation,
    dex: &Dex,
    config: &SearchConfig,
    rng: &mut StdRng,
) -> BattleState {
    let mut state = BattleState::new();
    state.turn = obs.turn;
    state.finished = obs.finished;
    state.won = obs.won;
    state.lost = obs.lost;

    state.weather = obs
        .weather
        .as_deref()
        .and_then(Weather::from_str)
        .unwrap_or(Weather::None);
    state.weather_turns = obs.weather_turns;
    state.terrain = obs
        .terrain
        .as_deref()
        .and_then(Terrain::from_str)
        .unwrap_or(Terrain::None);
    state.terrain_turns = obs.terrain_turns;
    state.side_conditions = [
        convert_side_conditions(&obs.side_conditions),
        convert_side_conditions(&obs.opponent_side_conditions),
    ];

    state.team = obs
        .team
        .iter()
        .map(|o| convert_pokemon(o, dex, config, false))
        .collect();
    state.opponent_team = obs
        .opponent_team
        .iter()
        .map(|o| convert_pokemon(o, dex, config, true))
        .collect();

    fill_opponent_holes(&mut state, dex, config, rng);

    // Install actives: the flagged member, else the first survivor.
    for player in Player::BOTH {
        let slot = state
            .team_of(player)
            .iter()
            .position(|p| p.is_active && !p.is_fainted())
            .or_else(|| state.team_of(player).iter().position(|p| !p.is_fainted()));
        state.set_active(player, slot);
    }

    state.available_moves = obs.available_moves.iter().map(|m| normalize_id(m)).collect();
    state.available_switches = obs
        .available_switches
        .iter()
        .map(|s| normalize_id(s))
        .collect();

    state.assert_active_coherent();
    state
}

fn convert_side_conditions(map: &BTreeMap<String, u8>) -> SideConditions {
    let mut conditions = SideConditions::default();
    for (tag, &turns) in map {
        match normalize_id(tag).as_str() {
            "reflect" => conditions.reflect_turns = turns,
            "lightscreen" => conditions.light_screen_turns = turns,
            "tailwind" => conditions.tailwind_turns = turns,
            "safeguard" => conditions.safeguard_turns = turns,
            _ => {}
        }
    }
    conditions
}

fn convert_pokemon(obs: &ObservedPokemon, dex: &Dex, config: &SearchConfig, opponent: bool) -> Pokemon {
    let species_id = normalize_id(&obs.species);
    let species = dex.get_species(&species_id);

    // Opponents with unknown stats are recomputed at the fixed assumed level.
    let level = if obs.level == 0 || (opponent && obs.stats.is_none()) {
        config.default_level
    } else {
        obs.level
    };

    let (primary, secondary) = if obs.types.is_empty() {
        (species.primary_type(), species.secondary_type())
    } else {
        (obs.types[0], obs.types.get(1).copied())
    };

    let mut p = Pokemon::new(species_id, level, (primary, secondary));
    p.base_stats = species.base_stats;
    p.status = obs.status;
    p.status_counter = obs.status_counter;
    p.ability = obs.ability.clone().or_else(|| species.abilities.first().cloned());
    p.item = obs.item.clone();
    p.is_active = obs.is_active;

    // Known computed stats, or the standard recomputation.
    p.stats = obs.stats.unwrap_or_else(|| Stats {
        hp: recomputed_hp(species.base_stats.hp, level),
        atk: recomputed_stat(species.base_stats.atk, level),
        def: recomputed_stat(species.base_stats.def, level),
        spa: recomputed_stat(species.base_stats.spa, level),
        spd: recomputed_stat(species.base_stats.spd, level),
        spe: recomputed_stat(species.base_stats.spe, level),
    });

    // HP: absolute, or a percentage scaled onto the (re)computed maximum.
    if obs.hp_is_percent {
        p.max_hp = p.stats.hp;
        let fraction = (obs.current_hp / 100.0).clamp(0.0, 1.0);
        p.current_hp = (p.max_hp as f64 * fraction).round() as u16;
    } else {
        p.max_hp = if obs.max_hp > 0.0 {
            obs.max_hp as u16
        } else {
            p.stats.hp
        };
        p.current_hp = (obs.current_hp.max(0.0) as u16).min(p.max_hp);
    }
    p.stats.hp = p.max_hp;
    if p.is_fainted() {
        p.is_active = false;
    }

    for (tag, &stage) in &obs.boosts {
        if let Some(stat) = crate::core_data::BoostStat::from_str(tag) {
            p.boosts.set(stat, stage);
        }
    }

    for tag in &obs.volatiles {
        match normalize_id(tag).as_str() {
            "mustrecharge" => p.volatiles.insert(Volatiles::MUST_RECHARGE),
            "firstturn" => p.volatiles.insert(Volatiles::FIRST_TURN),
            "focusenergy" => p.volatiles.insert(Volatiles::FOCUS_ENERGY),
            _ => {}
        }
    }

    p.moves = obs
        .moves
        .iter()
        .map(|m| {
            let data = dex.get_move(&m.id);
            let max = m.max_pp.unwrap_or(data.pp);
            Move::with_pp(data, m.current_pp.unwrap_or(max), max)
        })
        .take(FULL_MOVESET)
        .collect();

    p
}

// ============================================================================
// Hole filling
// ============================================================================

/// Steps 2 and 3 of the hole-filling policy; step 1 (stat recomputation at
/// the assumed level, HP ratio preserved) happens during conversion.
fn fill_opponent_holes(
    state: &mut BattleState,
    dex: &Dex,
    config: &SearchConfig,
    rng: &mut StdRng,
) {
    for pokemon in &mut state.opponent_team {
        if pokemon.moves.len() < FULL_MOVESET {
            let known: Vec<String> = pokemon.moves.iter().map(|m| m.id.clone()).collect();
            let missing = FULL_MOVESET - pokemon.moves.len();
            let synthesized = synthesize_moves(pokemon, dex, missing, &known, rng);
            pokemon.moves.extend(synthesized);
        }
    }

    // Pad the roster with plausible dummies up to the format's team size.
    if state.opponent_team.len() < config.team_size {
        let revealed: Vec<String> = state
            .opponent_team
            .iter()
            .map(|p| p.species.clone())
            .collect();

        let mut pool: Vec<&SpeciesData> = dex
            .species_iter()
            .filter(|s| {
                !s.nonstandard
                    && s.num > 0
                    && s.evos.is_empty()
                    && !revealed.iter().any(|r| r.eq_ignore_ascii_case(&s.id))
            })
            .collect();
        pool.shuffle(rng);

        let missing = config.team_size - state.opponent_team.len();
        let added = pool.len().min(missing);
        for species in pool.into_iter().take(missing) {
            let mut dummy = make_dummy(species, config.default_level, rng);
            dummy.moves = synthesize_moves(&dummy, dex, FULL_MOVESET, &[], rng);
            state.opponent_team.push(dummy);
        }
        debug!(added, "padded opponent roster with dummies");
    }
}

/// A bench filler: random IVs, competitively biased random EVs, full HP.
fn make_dummy(species: &SpeciesData, level: u8, rng: &mut StdRng) -> Pokemon {
    let mut p = Pokemon::new(
        species.id.clone(),
        level,
        (species.primary_type(), species.secondary_type()),
    );
    p.base_stats = species.base_stats;
    p.ability = species.abilities.first().cloned();

    let mut roll_stat = |base: u16, is_hp: bool| -> u16 {
        let iv = rng.gen_range(0..=31u32);
        let ev: u32 = if rng.gen::<f64>() < 0.75 {
            rng.gen_range(150..=252)
        } else {
            rng.gen_range(0..=100)
        };
        let core = (2 * base as u32 + iv + ev / 4) * level as u32 / 100;
        if is_hp {
            (core + level as u32 + 10) as u16
        } else {
            (core + 5) as u16
        }
    };

    p.stats = Stats {
        hp: roll_stat(species.base_stats.hp, true),
        atk: roll_stat(species.base_stats.atk, false),
        def: roll_stat(species.base_stats.def, false),
        spa: roll_stat(species.base_stats.spa, false),
        spd: roll_stat(species.base_stats.spd, false),
        spe: roll_stat(species.base_stats.spe, false),
    };
    p.max_hp = p.stats.hp;
    p.current_hp = p.max_hp;
    p
}

/// Sample plausible moves from the species' learnset.
///
/// Priority: STAB attacks with >= 70 power (capped at two), then coverage by
/// power bracket (>= 80, 60-79, 50-59), then status moves; tackle pads out
/// whatever is left.
fn synthesize_moves(
    pokemon: &Pokemon,
    dex: &Dex,
    count: usize,
    existing: &[String],
    rng: &mut StdRng,
) -> Vec<Move> {
    if count == 0 {
        return Vec::new();
    }

    let learnset = dex.learnset(&pokemon.species);
    if learnset.is_empty() {
        debug!(species = %pokemon.species, "no learnset, falling back to tackle");
        return vec![Move::fallback(); count];
    }

    let mut stab: Vec<&str> = Vec::new();
    let mut strong: Vec<&str> = Vec::new();
    let mut medium: Vec<&str> = Vec::new();
    let mut weak: Vec<&str> = Vec::new();
    let mut status: Vec<&str> = Vec::new();

    for id in learnset {
        if existing.iter().any(|e| e == id) {
            continue;
        }
        let Some(data) = dex.find_move(id) else {
            continue;
        };
        if data.base_power > 0 {
            if pokemon.has_type(data.move_type) {
                stab.push(id);
            } else if data.base_power >= 80 {
                strong.push(id);
            } else if data.base_power >= 60 {
                medium.push(id);
            } else if data.base_power >= 50 {
                weak.push(id);
            }
        } else {
            status.push(id);
        }
    }

    let mut selected: Vec<&str> = Vec::new();

    // STAB first: up to two of the strongest >= 70 power, else one at random.
    let mut strong_stab: Vec<&str> = stab
        .iter()
        .copied()
        .filter(|id| dex.get_move(id).base_power >= 70)
        .collect();
    strong_stab.sort_by_key(|id| std::cmp::Reverse(dex.get_move(id).base_power));
    if !strong_stab.is_empty() {
        selected.extend(strong_stab.into_iter().take(2.min(count)));
    } else if let Some(&pick) = stab.choose(rng) {
        selected.push(pick);
    }

    // Coverage brackets, then status as the last resort.
    for bucket in [&strong, &medium, &weak, &status] {
        if selected.len() >= count {
            break;
        }
        let need = count - selected.len();
        selected.extend(bucket.choose_multiple(rng, need).copied());
    }

    let mut moves: Vec<Move> = selected
        .into_iter()
        .take(count)
        .map(|id| Move::from_data(dex.get_move(id)))
        .collect();

    while moves.len() < count {
        moves.push(Move::fallback());
    }
    moves
}
