//! Static move and species tables.
//!
//! Tables are pokemon-showdown shaped JSON documents read once at startup,
//! either from disk (`Dex::load`) or from the copies embedded in the crate
//! (`Dex::builtin`). Lookups past the loaders never fail: unknown ids resolve
//! to a tackle-class move or a dummy species, logged once per id.

use crate::core_data::{normalize_id, BoostStat, MoveCategory, Stats, Status, Type};
use crate::typechart::TypeChart;
use bitflags::bitflags;
use lazy_static::lazy_static;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Mutex;
use tracing::warn;

bitflags! {
    /// Move flags the engine cares about. Unrecognized flag keys in the JSON
    /// are ignored.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct MoveFlags: u16 {
        const CONTACT  = 1 << 0;
        const PROTECT  = 1 << 1;
        const RECHARGE = 1 << 2;
        const CHARGE   = 1 << 3;
        const HEAL     = 1 << 4;
        const SOUND    = 1 << 5;
    }
}

impl MoveFlags {
    fn from_key(key: &str) -> Option<MoveFlags> {
        match key {
            "contact" => Some(MoveFlags::CONTACT),
            "protect" => Some(MoveFlags::PROTECT),
            "recharge" => Some(MoveFlags::RECHARGE),
            "charge" => Some(MoveFlags::CHARGE),
            "heal" => Some(MoveFlags::HEAL),
            "sound" => Some(MoveFlags::SOUND),
            _ => None,
        }
    }
}

/// Stage deltas a move applies, e.g. `{"atk": -1, "def": -1}`.
pub type BoostDeltas = Vec<(BoostStat, i8)>;

/// Static description of a move, as loaded from `moves.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct MoveData {
    pub id: String,
    pub name: String,
    pub base_power: u16,
    pub move_type: Type,
    pub category: MoveCategory,
    /// `None` means the move always hits.
    pub accuracy: Option<f64>,
    pub priority: i8,
    pub pp: u8,
    pub status: Option<Status>,
    pub target_boosts: BoostDeltas,
    pub self_boosts: BoostDeltas,
    pub recoil: Option<(u8, u8)>,
    pub drain: Option<(u8, u8)>,
    /// Extra crit stages on top of the per-move-id table in the engine.
    pub crit_ratio: u8,
    /// Carried from the data but not folded into damage.
    pub expected_hits: f32,
    pub flags: MoveFlags,
}

/// Static description of a species, as loaded from `pokedex.json`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesData {
    pub id: String,
    pub name: String,
    pub num: i32,
    /// One or two types.
    pub types: Vec<Type>,
    pub base_stats: Stats,
    pub abilities: Vec<String>,
    pub nonstandard: bool,
    pub evos: Vec<String>,
    pub learnset: Vec<String>,
}

impl SpeciesData {
    pub fn primary_type(&self) -> Type {
        self.types.first().copied().unwrap_or_default()
    }

    pub fn secondary_type(&self) -> Option<Type> {
        match self.types.get(1).copied() {
            Some(t) if Some(t) != self.types.first().copied() => Some(t),
            _ => None,
        }
    }
}

// ============================================================================
// Raw JSON shapes
// ============================================================================

/// `accuracy` in showdown data is either `true` (always hits) or 1-100.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAccuracy {
    AlwaysHits(bool),
    Percent(f64),
}

impl Default for RawAccuracy {
    fn default() -> Self {
        RawAccuracy::AlwaysHits(true)
    }
}

impl RawAccuracy {
    /// Normalize to a hit chance in (0, 1], `None` for always-hits.
    fn normalize(self) -> Option<f64> {
        match self {
            RawAccuracy::AlwaysHits(_) => None,
            RawAccuracy::Percent(p) if p >= 1.0 => {
                let frac = if p > 1.0 { p / 100.0 } else { p };
                if frac >= 1.0 {
                    None
                } else {
                    Some(frac)
                }
            }
            RawAccuracy::Percent(p) => Some(p.clamp(0.01, 1.0)),
        }
    }
}

fn default_pp() -> u8 {
    16
}

fn default_crit_ratio() -> u8 {
    1
}

fn default_expected_hits() -> f32 {
    1.0
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMove {
    name: Option<String>,
    #[serde(default)]
    base_power: u16,
    #[serde(rename = "type")]
    move_type: Type,
    category: MoveCategory,
    #[serde(default)]
    accuracy: RawAccuracy,
    #[serde(default)]
    priority: i8,
    #[serde(default = "default_pp")]
    pp: u8,
    #[serde(default)]
    status: Option<Status>,
    #[serde(default)]
    boosts: Option<BTreeMap<String, i8>>,
    #[serde(default)]
    self_boost: Option<BTreeMap<String, i8>>,
    #[serde(default)]
    recoil: Option<(u8, u8)>,
    #[serde(default)]
    drain: Option<(u8, u8)>,
    #[serde(default = "default_crit_ratio")]
    crit_ratio: u8,
    #[serde(default = "default_expected_hits")]
    expected_hits: f32,
    #[serde(default)]
    flags: BTreeMap<String, u8>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSpecies {
    name: Option<String>,
    #[serde(default)]
    num: i32,
    types: Vec<Type>,
    base_stats: Stats,
    #[serde(default)]
    abilities: BTreeMap<String, String>,
    #[serde(default)]
    is_nonstandard: Option<String>,
    #[serde(default)]
    evos: Vec<String>,
    #[serde(default)]
    learnset: Vec<String>,
}

fn convert_deltas(raw: Option<BTreeMap<String, i8>>) -> BoostDeltas {
    raw.map(|map| {
        map.iter()
            .filter_map(|(k, &v)| BoostStat::from_str(k).map(|s| (s, v)))
            .collect()
    })
    .unwrap_or_default()
}

impl RawMove {
    fn into_data(self, id: String) -> MoveData {
        let flags = self
            .flags
            .keys()
            .filter_map(|k| MoveFlags::from_key(k))
            .fold(MoveFlags::empty(), |acc, f| acc | f);

        MoveData {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            base_power: if self.category == MoveCategory::Status {
                0
            } else {
                self.base_power
            },
            move_type: self.move_type,
            category: self.category,
            accuracy: self.accuracy.normalize(),
            priority: self.priority,
            pp: self.pp,
            status: self.status,
            target_boosts: convert_deltas(self.boosts),
            self_boosts: convert_deltas(self.self_boost),
            recoil: self.recoil.filter(|&(_, den)| den != 0),
            drain: self.drain.filter(|&(_, den)| den != 0),
            crit_ratio: self.crit_ratio.saturating_sub(1),
            expected_hits: self.expected_hits.max(1.0),
            flags,
        }
    }
}

impl RawSpecies {
    fn into_data(self, id: String) -> SpeciesData {
        // Slot order "0", "1", then hidden "H".
        let mut abilities: Vec<String> = Vec::new();
        for slot in ["0", "1", "H"] {
            if let Some(name) = self.abilities.get(slot) {
                if !name.is_empty() {
                    abilities.push(name.clone());
                }
            }
        }

        SpeciesData {
            name: self.name.unwrap_or_else(|| id.clone()),
            id,
            num: self.num,
            types: self.types,
            base_stats: self.base_stats,
            abilities,
            nonstandard: self.is_nonstandard.is_some(),
            evos: self.evos,
            learnset: self.learnset.iter().map(|m| normalize_id(m)).collect(),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Table loading failure. The only recoverable error the data layer surfaces.
#[derive(Debug)]
pub enum DexError {
    Io {
        path: String,
        source: std::io::Error,
    },
    Parse {
        file: &'static str,
        source: serde_json::Error,
    },
}

impl fmt::Display for DexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DexError::Io { path, source } => write!(f, "failed to read {path}: {source}"),
            DexError::Parse { file, source } => write!(f, "failed to parse {file}: {source}"),
        }
    }
}

impl std::error::Error for DexError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DexError::Io { source, .. } => Some(source),
            DexError::Parse { source, .. } => Some(source),
        }
    }
}

// ============================================================================
// Dex
// ============================================================================

lazy_static! {
    static ref BUILTIN_DEX: Dex = Dex::from_json(
        include_str!("../../data/moves.json"),
        include_str!("../../data/pokedex.json"),
        include_str!("../../data/typechart.json"),
    )
    .expect("embedded data tables must parse");

    /// Canonical fallback for unknown move ids.
    static ref FALLBACK_MOVE: MoveData = MoveData {
        id: "tackle".to_string(),
        name: "Tackle".to_string(),
        base_power: 40,
        move_type: Type::Normal,
        category: MoveCategory::Physical,
        accuracy: None,
        priority: 0,
        pp: 35,
        status: None,
        target_boosts: Vec::new(),
        self_boosts: Vec::new(),
        recoil: None,
        drain: None,
        crit_ratio: 0,
        expected_hits: 1.0,
        flags: MoveFlags::CONTACT | MoveFlags::PROTECT,
    };

    /// Canonical fallback for unknown species ids.
    static ref FALLBACK_SPECIES: SpeciesData = SpeciesData {
        id: "unknown".to_string(),
        name: "Unknown".to_string(),
        num: 0,
        types: vec![Type::Normal],
        base_stats: Stats { hp: 100, atk: 100, def: 100, spa: 100, spd: 100, spe: 100 },
        abilities: Vec::new(),
        nonstandard: true,
        evos: Vec::new(),
        learnset: vec!["tackle".to_string()],
    };

    static ref WARNED_IDS: Mutex<HashSet<String>> = Mutex::new(HashSet::new());
}

/// Log a substitution warning once per id.
fn warn_once(kind: &str, id: &str) {
    let key = format!("{kind}:{id}");
    let mut warned = WARNED_IDS.lock().expect("warned-id set poisoned");
    if warned.insert(key) {
        warn!(kind, id, "unknown id, substituting fallback");
    }
}

/// All static tables bundled together.
#[derive(Debug, Clone)]
pub struct Dex {
    moves: HashMap<String, MoveData>,
    species: HashMap<String, SpeciesData>,
    pub chart: TypeChart,
}

impl Dex {
    /// Parse the three table documents.
    pub fn from_json(
        moves_json: &str,
        pokedex_json: &str,
        typechart_json: &str,
    ) -> Result<Dex, DexError> {
        let raw_moves: BTreeMap<String, RawMove> =
            serde_json::from_str(moves_json).map_err(|source| DexError::Parse {
                file: "moves.json",
                source,
            })?;
        let raw_species: BTreeMap<String, RawSpecies> =
            serde_json::from_str(pokedex_json).map_err(|source| DexError::Parse {
                file: "pokedex.json",
                source,
            })?;
        let chart =
            TypeChart::from_showdown_json(typechart_json).map_err(|source| DexError::Parse {
                file: "typechart.json",
                source,
            })?;

        let moves = raw_moves
            .into_iter()
            .map(|(id, raw)| {
                let id = normalize_id(&id);
                (id.clone(), raw.into_data(id))
            })
            .collect();
        let species = raw_species
            .into_iter()
            .map(|(id, raw)| {
                let id = normalize_id(&id);
                (id.clone(), raw.into_data(id))
            })
            .collect();

        Ok(Dex {
            moves,
            species,
            chart,
        })
    }

    /// Read `moves.json`, `pokedex.json` and `typechart.json` from a directory.
    pub fn load(dir: &Path) -> Result<Dex, DexError> {
        let read = |name: &str| {
            let path = dir.join(name);
            fs::read_to_string(&path).map_err(|source| DexError::Io {
                path: path.display().to_string(),
                source,
            })
        };
        Dex::from_json(&read("moves.json")?, &read("pokedex.json")?, &read("typechart.json")?)
    }

    /// The tables embedded in the crate.
    pub fn builtin() -> &'static Dex {
        &BUILTIN_DEX
    }

    /// Exact lookup, `None` if the id is unknown.
    pub fn find_move(&self, id: &str) -> Option<&MoveData> {
        self.moves.get(&normalize_id(id))
    }

    /// Lookup with the tackle-class fallback for unknown ids.
    pub fn get_move(&self, id: &str) -> &MoveData {
        match self.find_move(id) {
            Some(data) => data,
            None => {
                warn_once("move", id);
                &FALLBACK_MOVE
            }
        }
    }

    pub fn find_species(&self, id: &str) -> Option<&SpeciesData> {
        self.species.get(&normalize_id(id))
    }

    /// Lookup with the dummy-species fallback for unknown ids.
    pub fn get_species(&self, id: &str) -> &SpeciesData {
        match self.find_species(id) {
            Some(data) => data,
            None => {
                warn_once("species", id);
                &FALLBACK_SPECIES
            }
        }
    }

    /// Learnset of a species; empty slice when unknown.
    pub fn learnset(&self, species_id: &str) -> &[String] {
        self.find_species(species_id)
            .map(|s| s.learnset.as_slice())
            .unwrap_or(&[])
    }

    pub fn species_iter(&self) -> impl Iterator<Item = &SpeciesData> {
        self.species.values()
    }

    pub fn move_count(&self) -> usize {
        self.moves.len()
    }

    pub fn species_count(&self) -> usize {
        self.species.len()
    }

    /// The tackle-class move substituted for unknown ids.
    pub fn fallback_move() -> &'static MoveData {
        &FALLBACK_MOVE
    }
}
