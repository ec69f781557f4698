//! Damage calculation.
//!
//! # Architecture
//!
//! 1. **Base damage**: `((2 * Level / 5 + 2) * Power * Atk / Def) / 50 + 2`
//! 2. **Modifier chain**: an ordered sequence of single-method stages, each
//!    taking the running damage and returning a new value. The standard chain
//!    is burn, weather, crit, STAB, type effectiveness, random roll.
//!
//! Type immunity short-circuits before the formula: an effectiveness product
//! of 0 yields 0 damage, and damage-derived effects (recoil, drain) never
//! fire. Anything that lands deals at least 1 HP.

use crate::battle::moves::Move;
use crate::battle::pokemon::Pokemon;
use crate::core_data::{MoveCategory, Stat, Status, Type, Weather};
use crate::typechart::TypeChart;
use rand::rngs::StdRng;
use rand::Rng;

/// Everything a modifier stage may consult for one calculation.
pub struct DamageContext<'a> {
    pub attacker: &'a Pokemon,
    pub defender: &'a Pokemon,
    pub move_used: &'a Move,
    pub crit: bool,
    pub weather: Weather,
    pub chart: &'a TypeChart,
}

impl<'a> DamageContext<'a> {
    /// Type effectiveness product over the defender's types, as a multiplier.
    pub fn effectiveness(&self) -> f64 {
        self.chart.multiplier(
            self.move_used.move_type,
            self.defender.primary_type,
            self.defender.secondary_type,
        )
    }

    pub fn has_stab(&self) -> bool {
        self.attacker.has_type(self.move_used.move_type)
    }
}

/// One stage of the damage pipeline.
pub trait DamageModifier: Send + Sync {
    fn apply(&self, damage: f64, ctx: &DamageContext<'_>, rng: &mut StdRng) -> f64;
}

/// Burn halves physical damage, except on a crit.
struct BurnModifier;

impl DamageModifier for BurnModifier {
    fn apply(&self, damage: f64, ctx: &DamageContext<'_>, _rng: &mut StdRng) -> f64 {
        if ctx.move_used.category == MoveCategory::Physical
            && ctx.attacker.status == Some(Status::Brn)
            && !ctx.crit
        {
            damage * 0.5
        } else {
            damage
        }
    }
}

/// Rain boosts Water and weakens Fire; sun is the mirror image.
struct WeatherModifier;

impl DamageModifier for WeatherModifier {
    fn apply(&self, damage: f64, ctx: &DamageContext<'_>, _rng: &mut StdRng) -> f64 {
        match (ctx.weather, ctx.move_used.move_type) {
            (Weather::Rain, Type::Water) => damage * 1.5,
            (Weather::Rain, Type::Fire) => damage * 0.5,
            (Weather::Sun, Type::Fire) => damage * 1.5,
            (Weather::Sun, Type::Water) => damage * 0.5,
            _ => damage,
        }
    }
}

struct CriticalHitModifier;

impl DamageModifier for CriticalHitModifier {
    fn apply(&self, damage: f64, ctx: &DamageContext<'_>, _rng: &mut StdRng) -> f64 {
        if ctx.crit {
            damage * 1.5
        } else {
            damage
        }
    }
}

/// Same-type attack bonus.
struct StabModifier;

impl DamageModifier for StabModifier {
    fn apply(&self, damage: f64, ctx: &DamageContext<'_>, _rng: &mut StdRng) -> f64 {
        if ctx.has_stab() {
            damage * 1.5
        } else {
            damage
        }
    }
}

struct TypeEffectivenessModifier;

impl DamageModifier for TypeEffectivenessModifier {
    fn apply(&self, damage: f64, ctx: &DamageContext<'_>, _rng: &mut StdRng) -> f64 {
        damage * ctx.effectiveness()
    }
}

/// Uniform roll in [0.85, 1.0].
struct RandomModifier;

impl DamageModifier for RandomModifier {
    fn apply(&self, damage: f64, _ctx: &DamageContext<'_>, rng: &mut StdRng) -> f64 {
        damage * rng.gen_range(0.85..=1.0)
    }
}

/// Ordered damage pipeline. The composition is static but the trait keeps
/// the stages open to extension.
pub struct ModifierChain {
    modifiers: Vec<Box<dyn DamageModifier>>,
}

impl ModifierChain {
    /// The standard order: burn, weather, crit, STAB, type, random.
    pub fn standard() -> ModifierChain {
        ModifierChain {
            modifiers: vec![
                Box::new(BurnModifier),
                Box::new(WeatherModifier),
                Box::new(CriticalHitModifier),
                Box::new(StabModifier),
                Box::new(TypeEffectivenessModifier),
                Box::new(RandomModifier),
            ],
        }
    }

    pub fn apply_all(&self, mut damage: f64, ctx: &DamageContext<'_>, rng: &mut StdRng) -> f64 {
        for modifier in &self.modifiers {
            damage = modifier.apply(damage, ctx, rng);
        }
        damage
    }
}

/// Base damage before modifiers.
pub fn base_damage(level: u8, base_power: u16, attack: f64, defense: f64) -> f64 {
    if defense <= 0.0 {
        return 0.0;
    }
    let level_factor = 2.0 * level as f64 / 5.0 + 2.0;
    (level_factor * base_power as f64 * attack / defense) / 50.0 + 2.0
}

/// Full damage computation for one hit.
///
/// Status moves and 0-power moves deal 0. An immune defender takes 0. Any
/// hit that connects deals at least 1.
pub fn compute_damage(chain: &ModifierChain, ctx: &DamageContext<'_>, rng: &mut StdRng) -> u16 {
    let mv = ctx.move_used;
    if mv.category == MoveCategory::Status || mv.base_power == 0 {
        return 0;
    }
    if ctx.effectiveness() == 0.0 {
        return 0;
    }

    // Stage-modified stats; status effects on damage are chain stages so the
    // crit/burn interaction stays in one place.
    let (attack, defense) = match mv.category {
        MoveCategory::Physical => (
            ctx.attacker.stat_with_stages(Stat::Atk),
            ctx.defender.stat_with_stages(Stat::Def),
        ),
        _ => (
            ctx.attacker.stat_with_stages(Stat::Spa),
            ctx.defender.stat_with_stages(Stat::Spd),
        ),
    };

    let base = base_damage(ctx.attacker.level, mv.base_power, attack, defense);
    let final_damage = chain.apply_all(base, ctx, rng);

    (final_damage.floor() as i64).max(1).min(u16::MAX as i64) as u16
}
