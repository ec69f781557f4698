//! Type effectiveness chart.
//!
//! Effectiveness is stored on a 4-point fixed scale: 0 = immune, 1 = 0.25x,
//! 2 = 0.5x, 4 = 1x, 8 = 2x, 16 = 4x. Dual-type defenders multiply the two
//! single-type lookups; an immunity in either lookup forces the product to 0.

use crate::core_data::{Type, TYPE_COUNT};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Neutral effectiveness on the 4-scale.
pub const NEUTRAL: u8 = 4;

/// Super effective single-type hit.
pub const SUPER_EFFECTIVE: u8 = 8;

/// Resisted single-type hit.
pub const NOT_VERY_EFFECTIVE: u8 = 2;

/// Immune.
pub const IMMUNE: u8 = 0;

/// 18x18 effectiveness table indexed `[attacking][defending]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeChart {
    table: [[u8; TYPE_COUNT]; TYPE_COUNT],
}

/// Non-neutral chart entries as (attacking, defending, effectiveness).
/// Everything absent is neutral (4).
const CHART_EXCEPTIONS: &[(Type, Type, u8)] = &[
    // Normal
    (Type::Normal, Type::Rock, NOT_VERY_EFFECTIVE),
    (Type::Normal, Type::Ghost, IMMUNE),
    (Type::Normal, Type::Steel, NOT_VERY_EFFECTIVE),
    // Fighting
    (Type::Fighting, Type::Normal, SUPER_EFFECTIVE),
    (Type::Fighting, Type::Flying, NOT_VERY_EFFECTIVE),
    (Type::Fighting, Type::Poison, NOT_VERY_EFFECTIVE),
    (Type::Fighting, Type::Rock, SUPER_EFFECTIVE),
    (Type::Fighting, Type::Bug, NOT_VERY_EFFECTIVE),
    (Type::Fighting, Type::Ghost, IMMUNE),
    (Type::Fighting, Type::Steel, SUPER_EFFECTIVE),
    (Type::Fighting, Type::Psychic, NOT_VERY_EFFECTIVE),
    (Type::Fighting, Type::Ice, SUPER_EFFECTIVE),
    (Type::Fighting, Type::Dark, SUPER_EFFECTIVE),
    (Type::Fighting, Type::Fairy, NOT_VERY_EFFECTIVE),
    // Flying
    (Type::Flying, Type::Fighting, SUPER_EFFECTIVE),
    (Type::Flying, Type::Rock, NOT_VERY_EFFECTIVE),
    (Type::Flying, Type::Bug, SUPER_EFFECTIVE),
    (Type::Flying, Type::Steel, NOT_VERY_EFFECTIVE),
    (Type::Flying, Type::Grass, SUPER_EFFECTIVE),
    (Type::Flying, Type::Electric, NOT_VERY_EFFECTIVE),
    // Poison
    (Type::Poison, Type::Poison, NOT_VERY_EFFECTIVE),
    (Type::Poison, Type::Ground, NOT_VERY_EFFECTIVE),
    (Type::Poison, Type::Rock, NOT_VERY_EFFECTIVE),
    (Type::Poison, Type::Ghost, NOT_VERY_EFFECTIVE),
    (Type::Poison, Type::Steel, IMMUNE),
    (Type::Poison, Type::Grass, SUPER_EFFECTIVE),
    (Type::Poison, Type::Fairy, SUPER_EFFECTIVE),
    // Ground
    (Type::Ground, Type::Flying, IMMUNE),
    (Type::Ground, Type::Poison, SUPER_EFFECTIVE),
    (Type::Ground, Type::Rock, SUPER_EFFECTIVE),
    (Type::Ground, Type::Bug, NOT_VERY_EFFECTIVE),
    (Type::Ground, Type::Steel, SUPER_EFFECTIVE),
    (Type::Ground, Type::Fire, SUPER_EFFECTIVE),
    (Type::Ground, Type::Grass, NOT_VERY_EFFECTIVE),
    (Type::Ground, Type::Electric, SUPER_EFFECTIVE),
    // Rock
    (Type::Rock, Type::Fighting, NOT_VERY_EFFECTIVE),
    (Type::Rock, Type::Flying, SUPER_EFFECTIVE),
    (Type::Rock, Type::Ground, NOT_VERY_EFFECTIVE),
    (Type::Rock, Type::Bug, SUPER_EFFECTIVE),
    (Type::Rock, Type::Steel, NOT_VERY_EFFECTIVE),
    (Type::Rock, Type::Fire, SUPER_EFFECTIVE),
    (Type::Rock, Type::Ice, SUPER_EFFECTIVE),
    // Bug
    (Type::Bug, Type::Fighting, NOT_VERY_EFFECTIVE),
    (Type::Bug, Type::Flying, NOT_VERY_EFFECTIVE),
    (Type::Bug, Type::Poison, NOT_VERY_EFFECTIVE),
    (Type::Bug, Type::Ghost, NOT_VERY_EFFECTIVE),
    (Type::Bug, Type::Steel, NOT_VERY_EFFECTIVE),
    (Type::Bug, Type::Fire, NOT_VERY_EFFECTIVE),
    (Type::Bug, Type::Grass, SUPER_EFFECTIVE),
    (Type::Bug, Type::Psychic, SUPER_EFFECTIVE),
    (Type::Bug, Type::Dark, SUPER_EFFECTIVE),
    (Type::Bug, Type::Fairy, NOT_VERY_EFFECTIVE),
    // Ghost
    (Type::Ghost, Type::Normal, IMMUNE),
    (Type::Ghost, Type::Ghost, SUPER_EFFECTIVE),
    (Type::Ghost, Type::Psychic, SUPER_EFFECTIVE),
    (Type::Ghost, Type::Dark, NOT_VERY_EFFECTIVE),
    // Steel
    (Type::Steel, Type::Rock, SUPER_EFFECTIVE),
    (Type::Steel, Type::Steel, NOT_VERY_EFFECTIVE),
    (Type::Steel, Type::Fire, NOT_VERY_EFFECTIVE),
    (Type::Steel, Type::Water, NOT_VERY_EFFECTIVE),
    (Type::Steel, Type::Electric, NOT_VERY_EFFECTIVE),
    (Type::Steel, Type::Ice, SUPER_EFFECTIVE),
    (Type::Steel, Type::Fairy, SUPER_EFFECTIVE),
    // Fire
    (Type::Fire, Type::Rock, NOT_VERY_EFFECTIVE),
    (Type::Fire, Type::Bug, SUPER_EFFECTIVE),
    (Type::Fire, Type::Steel, SUPER_EFFECTIVE),
    (Type::Fire, Type::Fire, NOT_VERY_EFFECTIVE),
    (Type::Fire, Type::Water, NOT_VERY_EFFECTIVE),
    (Type::Fire, Type::Grass, SUPER_EFFECTIVE),
    (Type::Fire, Type::Ice, SUPER_EFFECTIVE),
    (Type::Fire, Type::Dragon, NOT_VERY_EFFECTIVE),
    // Water
    (Type::Water, Type::Ground, SUPER_EFFECTIVE),
    (Type::Water, Type::Rock, SUPER_EFFECTIVE),
    (Type::Water, Type::Fire, SUPER_EFFECTIVE),
    (Type::Water, Type::Water, NOT_VERY_EFFECTIVE),
    (Type::Water, Type::Grass, NOT_VERY_EFFECTIVE),
    (Type::Water, Type::Dragon, NOT_VERY_EFFECTIVE),
    // Grass
    (Type::Grass, Type::Flying, NOT_VERY_EFFECTIVE),
    (Type::Grass, Type::Poison, NOT_VERY_EFFECTIVE),
    (Type::Grass, Type::Ground, SUPER_EFFECTIVE),
    (Type::Grass, Type::Rock, SUPER_EFFECTIVE),
    (Type::Grass, Type::Bug, NOT_VERY_EFFECTIVE),
    (Type::Grass, Type::Steel, NOT_VERY_EFFECTIVE),
    (Type::Grass, Type::Fire, NOT_VERY_EFFECTIVE),
    (Type::Grass, Type::Water, SUPER_EFFECTIVE),
    (Type::Grass, Type::Grass, NOT_VERY_EFFECTIVE),
    (Type::Grass, Type::Dragon, NOT_VERY_EFFECTIVE),
    // Electric
    (Type::Electric, Type::Flying, SUPER_EFFECTIVE),
    (Type::Electric, Type::Ground, IMMUNE),
    (Type::Electric, Type::Water, SUPER_EFFECTIVE),
    (Type::Electric, Type::Grass, NOT_VERY_EFFECTIVE),
    (Type::Electric, Type::Electric, NOT_VERY_EFFECTIVE),
    (Type::Electric, Type::Dragon, NOT_VERY_EFFECTIVE),
    // Psychic
    (Type::Psychic, Type::Fighting, SUPER_EFFECTIVE),
    (Type::Psychic, Type::Poison, SUPER_EFFECTIVE),
    (Type::Psychic, Type::Steel, NOT_VERY_EFFECTIVE),
    (Type::Psychic, Type::Psychic, NOT_VERY_EFFECTIVE),
    (Type::Psychic, Type::Dark, IMMUNE),
    // Ice
    (Type::Ice, Type::Flying, SUPER_EFFECTIVE),
    (Type::Ice, Type::Ground, SUPER_EFFECTIVE),
    (Type::Ice, Type::Steel, NOT_VERY_EFFECTIVE),
    (Type::Ice, Type::Fire, NOT_VERY_EFFECTIVE),
    (Type::Ice, Type::Water, NOT_VERY_EFFECTIVE),
    (Type::Ice, Type::Grass, SUPER_EFFECTIVE),
    (Type::Ice, Type::Ice, NOT_VERY_EFFECTIVE),
    (Type::Ice, Type::Dragon, SUPER_EFFECTIVE),
    // Dragon
    (Type::Dragon, Type::Steel, NOT_VERY_EFFECTIVE),
    (Type::Dragon, Type::Dragon, SUPER_EFFECTIVE),
    (Type::Dragon, Type::Fairy, IMMUNE),
    // Dark
    (Type::Dark, Type::Fighting, NOT_VERY_EFFECTIVE),
    (Type::Dark, Type::Ghost, SUPER_EFFECTIVE),
    (Type::Dark, Type::Psychic, SUPER_EFFECTIVE),
    (Type::Dark, Type::Dark, NOT_VERY_EFFECTIVE),
    (Type::Dark, Type::Fairy, NOT_VERY_EFFECTIVE),
    // Fairy
    (Type::Fairy, Type::Fighting, SUPER_EFFECTIVE),
    (Type::Fairy, Type::Poison, NOT_VERY_EFFECTIVE),
    (Type::Fairy, Type::Steel, NOT_VERY_EFFECTIVE),
    (Type::Fairy, Type::Fire, NOT_VERY_EFFECTIVE),
    (Type::Fairy, Type::Dragon, SUPER_EFFECTIVE),
    (Type::Fairy, Type::Dark, SUPER_EFFECTIVE),
];

/// One defender entry in a pokemon-showdown `typechart.json` export.
/// `damageTaken` codes: 0 = neutral, 1 = weak, 2 = resist, 3 = immune.
#[derive(Deserialize)]
struct TypeChartEntry {
    #[serde(rename = "damageTaken", default)]
    damage_taken: BTreeMap<String, u8>,
}

impl Default for TypeChart {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TypeChart {
    /// The built-in modern-generation chart.
    pub fn builtin() -> TypeChart {
        let mut table = [[NEUTRAL; TYPE_COUNT]; TYPE_COUNT];
        for &(atk, def, eff) in CHART_EXCEPTIONS {
            table[atk as usize][def as usize] = eff;
        }
        TypeChart { table }
    }

    /// Parse a pokemon-showdown shaped `typechart.json` document.
    ///
    /// Unknown type names are skipped; missing entries stay neutral.
    pub fn from_showdown_json(json: &str) -> Result<TypeChart, serde_json::Error> {
        let doc: BTreeMap<String, TypeChartEntry> = serde_json::from_str(json)?;
        let mut table = [[NEUTRAL; TYPE_COUNT]; TYPE_COUNT];

        for (defender_name, entry) in &doc {
            let Some(defender) = Type::from_str(defender_name) else {
                continue;
            };
            for (attacker_name, code) in &entry.damage_taken {
                let Some(attacker) = Type::from_str(attacker_name) else {
                    continue;
                };
                table[attacker as usize][defender as usize] = match code {
                    1 => SUPER_EFFECTIVE,
                    2 => NOT_VERY_EFFECTIVE,
                    3 => IMMUNE,
                    _ => NEUTRAL,
                };
            }
        }

        Ok(TypeChart { table })
    }

    /// Single-type lookup on the 4-scale.
    #[inline]
    pub fn effectiveness(&self, attacking: Type, defending: Type) -> u8 {
        self.table[attacking as usize][defending as usize]
    }

    /// Dual-type lookup on the 4-scale. A 0 in either factor forces 0.
    pub fn dual_effectiveness(
        &self,
        attacking: Type,
        defender_primary: Type,
        defender_secondary: Option<Type>,
    ) -> u8 {
        let first = self.effectiveness(attacking, defender_primary);
        let second = match defender_secondary {
            Some(t) if t != defender_primary => self.effectiveness(attacking, t),
            _ => NEUTRAL,
        };
        ((first as u16 * second as u16) / NEUTRAL as u16) as u8
    }

    /// Dual-type lookup as a real multiplier in {0, 0.25, 0.5, 1, 2, 4}.
    pub fn multiplier(
        &self,
        attacking: Type,
        defender_primary: Type,
        defender_secondary: Option<Type>,
    ) -> f64 {
        self.dual_effectiveness(attacking, defender_primary, defender_secondary) as f64
            / NEUTRAL as f64
    }
}
