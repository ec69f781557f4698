//! Core data definitions shared across the crate.
//!
//! Closed sum types for elemental types, move categories, status conditions,
//! weather and terrain. String ids exist only at the table/wire boundary;
//! everything past the loaders matches on these enums.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Implement string-based serde for a boundary enum with `from_str`/`as_str`.
macro_rules! string_enum_serde {
    ($ty:ty, $expecting:literal) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                struct V;
                impl<'de> Visitor<'de> for V {
                    type Value = $ty;
                    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                        f.write_str($expecting)
                    }
                    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                        <$ty>::from_str(v)
                            .ok_or_else(|| E::custom(format!("unknown {}: {v}", $expecting)))
                    }
                }
                deserializer.deserialize_str(V)
            }
        }
    };
}

// ============================================================================
// Elemental Types
// ============================================================================

/// Number of elemental types in the chart.
pub const TYPE_COUNT: usize = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Type {
    Normal = 0,
    Fighting = 1,
    Flying = 2,
    Poison = 3,
    Ground = 4,
    Rock = 5,
    Bug = 6,
    Ghost = 7,
    Steel = 8,
    Fire = 9,
    Water = 10,
    Grass = 11,
    Electric = 12,
    Psychic = 13,
    Ice = 14,
    Dragon = 15,
    Dark = 16,
    Fairy = 17,
}

impl Default for Type {
    fn default() -> Self {
        Type::Normal
    }
}

impl Type {
    /// All types in chart order.
    pub const ALL: [Type; TYPE_COUNT] = [
        Type::Normal,
        Type::Fighting,
        Type::Flying,
        Type::Poison,
        Type::Ground,
        Type::Rock,
        Type::Bug,
        Type::Ghost,
        Type::Steel,
        Type::Fire,
        Type::Water,
        Type::Grass,
        Type::Electric,
        Type::Psychic,
        Type::Ice,
        Type::Dragon,
        Type::Dark,
        Type::Fairy,
    ];

    /// Case-insensitive lookup from a string key.
    pub fn from_str(s: &str) -> Option<Type> {
        let key = s.trim();
        Type::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(key))
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Type::Normal => "Normal",
            Type::Fighting => "Fighting",
            Type::Flying => "Flying",
            Type::Poison => "Poison",
            Type::Ground => "Ground",
            Type::Rock => "Rock",
            Type::Bug => "Bug",
            Type::Ghost => "Ghost",
            Type::Steel => "Steel",
            Type::Fire => "Fire",
            Type::Water => "Water",
            Type::Grass => "Grass",
            Type::Electric => "Electric",
            Type::Psychic => "Psychic",
            Type::Ice => "Ice",
            Type::Dragon => "Dragon",
            Type::Dark => "Dark",
            Type::Fairy => "Fairy",
        }
    }
}

string_enum_serde!(Type, "elemental type");

// ============================================================================
// Move Category
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveCategory {
    Physical,
    Special,
    Status,
}

impl Default for MoveCategory {
    fn default() -> Self {
        MoveCategory::Physical
    }
}

impl MoveCategory {
    pub fn from_str(s: &str) -> Option<MoveCategory> {
        match s.trim() {
            s if s.eq_ignore_ascii_case("physical") => Some(MoveCategory::Physical),
            s if s.eq_ignore_ascii_case("special") => Some(MoveCategory::Special),
            s if s.eq_ignore_ascii_case("status") => Some(MoveCategory::Status),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            MoveCategory::Physical => "Physical",
            MoveCategory::Special => "Special",
            MoveCategory::Status => "Status",
        }
    }
}

string_enum_serde!(MoveCategory, "move category");

// ============================================================================
// Major Status Conditions
// ============================================================================

/// Major status conditions. A Pokémon carries at most one (`Option<Status>`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// Burn: residual 1/16, halves physical damage.
    Brn,
    /// Paralysis: halves speed.
    Par,
    /// Poison: residual 1/8.
    Psn,
    /// Toxic: ramping residual n/16.
    Tox,
    Slp,
    Frz,
}

impl Status {
    pub fn from_str(s: &str) -> Option<Status> {
        match s.trim() {
            s if s.eq_ignore_ascii_case("brn") => Some(Status::Brn),
            s if s.eq_ignore_ascii_case("par") => Some(Status::Par),
            s if s.eq_ignore_ascii_case("psn") => Some(Status::Psn),
            s if s.eq_ignore_ascii_case("tox") => Some(Status::Tox),
            s if s.eq_ignore_ascii_case("slp") => Some(Status::Slp),
            s if s.eq_ignore_ascii_case("frz") => Some(Status::Frz),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Status::Brn => "brn",
            Status::Par => "par",
            Status::Psn => "psn",
            Status::Tox => "tox",
            Status::Slp => "slp",
            Status::Frz => "frz",
        }
    }
}

string_enum_serde!(Status, "status condition");

// ============================================================================
// Weather & Terrain
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Weather {
    #[default]
    None,
    Sun,
    Rain,
    Sand,
    Hail,
}

impl Weather {
    /// Accepts both the field tags seen on the wire and plain names.
    pub fn from_str(s: &str) -> Option<Weather> {
        match s.trim() {
            s if s.eq_ignore_ascii_case("none") => Some(Weather::None),
            s if s.eq_ignore_ascii_case("sunnyday") || s.eq_ignore_ascii_case("sun") => {
                Some(Weather::Sun)
            }
            s if s.eq_ignore_ascii_case("raindance") || s.eq_ignore_ascii_case("rain") => {
                Some(Weather::Rain)
            }
            s if s.eq_ignore_ascii_case("sandstorm") || s.eq_ignore_ascii_case("sand") => {
                Some(Weather::Sand)
            }
            s if s.eq_ignore_ascii_case("hail") => Some(Weather::Hail),
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Weather::None => "none",
            Weather::Sun => "sunnyday",
            Weather::Rain => "raindance",
            Weather::Sand => "sandstorm",
            Weather::Hail => "hail",
        }
    }
}

string_enum_serde!(Weather, "weather");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Terrain {
    #[default]
    None,
    Electric,
    Grassy,
    Psychic,
    Misty,
}

impl Terrain {
    pub fn from_str(s: &str) -> Option<Terrain> {
        match s.trim() {
            s if s.eq_ignore_ascii_case("none") => Some(Terrain::None),
            s if s.eq_ignore_ascii_case("electricterrain") || s.eq_ignore_ascii_case("electric") => {
                Some(Terrain::Electric)
            }
            s if s.eq_ignore_ascii_case("grassyterrain") || s.eq_ignore_ascii_case("grassy") => {
                Some(Terrain::Grassy)
            }
            s if s.eq_ignore_ascii_case("psychicterrain") || s.eq_ignore_ascii_case("psychic") => {
                Some(Terrain::Psychic)
            }
            s if s.eq_ignore_ascii_case("mistyterrain") || s.eq_ignore_ascii_case("misty") => {
                Some(Terrain::Misty)
            }
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Terrain::None => "none",
            Terrain::Electric => "electricterrain",
            Terrain::Grassy => "grassyterrain",
            Terrain::Psychic => "psychicterrain",
            Terrain::Misty => "mistyterrain",
        }
    }
}

string_enum_serde!(Terrain, "terrain");

// ============================================================================
// Stats & Boost Stages
// ============================================================================

/// The six permanent stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stat {
    Hp,
    Atk,
    Def,
    Spa,
    Spd,
    Spe,
}

/// A full stat block (base stats or computed stats).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub hp: u16,
    pub atk: u16,
    pub def: u16,
    pub spa: u16,
    pub spd: u16,
    pub spe: u16,
}

impl Stats {
    pub const fn get(&self, stat: Stat) -> u16 {
        match stat {
            Stat::Hp => self.hp,
            Stat::Atk => self.atk,
            Stat::Def => self.def,
            Stat::Spa => self.spa,
            Stat::Spd => self.spd,
            Stat::Spe => self.spe,
        }
    }

    pub fn set(&mut self, stat: Stat, value: u16) {
        match stat {
            Stat::Hp => self.hp = value,
            Stat::Atk => self.atk = value,
            Stat::Def => self.def = value,
            Stat::Spa => self.spa = value,
            Stat::Spd => self.spd = value,
            Stat::Spe => self.spe = value,
        }
    }
}

/// Number of boostable stages (Atk, Def, SpA, SpD, Spe, Acc, Eva).
pub const BOOST_STATS: usize = 7;

/// Stages that can be raised or lowered in battle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BoostStat {
    Atk = 0,
    Def = 1,
    Spa = 2,
    Spd = 3,
    Spe = 4,
    Accuracy = 5,
    Evasion = 6,
}

impl BoostStat {
    pub const ALL: [BoostStat; BOOST_STATS] = [
        BoostStat::Atk,
        BoostStat::Def,
        BoostStat::Spa,
        BoostStat::Spd,
        BoostStat::Spe,
        BoostStat::Accuracy,
        BoostStat::Evasion,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_str(s: &str) -> Option<BoostStat> {
        match s.trim() {
            s if s.eq_ignore_ascii_case("atk") => Some(BoostStat::Atk),
            s if s.eq_ignore_ascii_case("def") => Some(BoostStat::Def),
            s if s.eq_ignore_ascii_case("spa") => Some(BoostStat::Spa),
            s if s.eq_ignore_ascii_case("spd") => Some(BoostStat::Spd),
            s if s.eq_ignore_ascii_case("spe") => Some(BoostStat::Spe),
            s if s.eq_ignore_ascii_case("accuracy") || s.eq_ignore_ascii_case("acc") => {
                Some(BoostStat::Accuracy)
            }
            s if s.eq_ignore_ascii_case("evasion") || s.eq_ignore_ascii_case("eva") => {
                Some(BoostStat::Evasion)
            }
            _ => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            BoostStat::Atk => "atk",
            BoostStat::Def => "def",
            BoostStat::Spa => "spa",
            BoostStat::Spd => "spd",
            BoostStat::Spe => "spe",
            BoostStat::Accuracy => "accuracy",
            BoostStat::Evasion => "evasion",
        }
    }

    /// The non-HP stat this stage scales, if any.
    pub const fn stat(self) -> Option<Stat> {
        match self {
            BoostStat::Atk => Some(Stat::Atk),
            BoostStat::Def => Some(Stat::Def),
            BoostStat::Spa => Some(Stat::Spa),
            BoostStat::Spd => Some(Stat::Spd),
            BoostStat::Spe => Some(Stat::Spe),
            BoostStat::Accuracy | BoostStat::Evasion => None,
        }
    }
}

string_enum_serde!(BoostStat, "boost stage");

/// Normalize a move/species key the way the wire does: lowercase, no spaces
/// or hyphens.
pub fn normalize_id(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '\'' | '.'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
