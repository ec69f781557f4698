//! Per-battle Pokémon state.
//!
//! `Pokemon` is a plain value: no references back to the observation that
//! produced it. The simulation engine is the only mutator, and always inside
//! a cloned `BattleState`.

use crate::battle::moves::Move;
use crate::core_data::{BoostStat, Stat, Stats, Status, Type, BOOST_STATS};
use bitflags::bitflags;

bitflags! {
    /// Volatile battle conditions.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct Volatiles: u8 {
        const MUST_RECHARGE = 1 << 0;
        const FIRST_TURN    = 1 << 1;
        const FOCUS_ENERGY  = 1 << 2;
    }
}

/// Stage boosts, clamped to [-6, 6] on every write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Boosts([i8; BOOST_STATS]);

impl Boosts {
    #[inline]
    pub fn get(&self, stat: BoostStat) -> i8 {
        self.0[stat.index()]
    }

    /// Add a delta to a stage, clamping to the legal range.
    pub fn apply(&mut self, stat: BoostStat, delta: i8) {
        let current = self.0[stat.index()];
        self.0[stat.index()] = (current + delta).clamp(-6, 6);
    }

    /// Overwrite a stage (observation import), still clamped.
    pub fn set(&mut self, stat: BoostStat, value: i8) {
        self.0[stat.index()] = value.clamp(-6, 6);
    }

    pub fn clear(&mut self, stat: BoostStat) {
        self.0[stat.index()] = 0;
    }

    /// Sum of the offensive stages the evaluator rewards (atk + spa + spe).
    pub fn offensive_sum(&self) -> i32 {
        self.get(BoostStat::Atk) as i32
            + self.get(BoostStat::Spa) as i32
            + self.get(BoostStat::Spe) as i32
    }

    pub fn iter(&self) -> impl Iterator<Item = (BoostStat, i8)> + '_ {
        BoostStat::ALL.iter().map(move |&s| (s, self.get(s)))
    }
}

#[derive(Debug, PartialEq)]
pub struct Pokemon {
    // Identity
    pub species: String,
    pub level: u8,
    pub primary_type: Type,
    pub secondary_type: Option<Type>,

    // Combat
    pub max_hp: u16,
    pub current_hp: u16,
    pub base_stats: Stats,
    /// Computed stats at this level (HP mirror of `max_hp`).
    pub stats: Stats,

    // Dynamic
    pub boosts: Boosts,
    /// Remaining turns per stage; `None` = no timer (permanent).
    pub boost_timers: [Option<u8>; BOOST_STATS],
    pub status: Option<Status>,
    /// Toxic ramp counter.
    pub status_counter: u8,
    pub volatiles: Volatiles,
    pub protect_counter: u8,

    // Moves (at most 4)
    pub moves: Vec<Move>,

    // Derived
    pub is_active: bool,
    pub ability: Option<String>,
    pub item: Option<String>,
}

impl Pokemon {
    pub fn new(species: impl Into<String>, level: u8, types: (Type, Option<Type>)) -> Pokemon {
        Pokemon {
            species: species.into(),
            level,
            primary_type: types.0,
            secondary_type: types.1.filter(|&t| t != types.0),
            max_hp: 1,
            current_hp: 1,
            base_stats: Stats::default(),
            stats: Stats::default(),
            boosts: Boosts::default(),
            boost_timers: [None; BOOST_STATS],
            status: None,
            status_counter: 0,
            volatiles: Volatiles::empty(),
            protect_counter: 0,
            moves: Vec::new(),
            is_active: false,
            ability: None,
            item: None,
        }
    }

    #[inline]
    pub fn is_fainted(&self) -> bool {
        self.current_hp == 0
    }

    pub fn has_type(&self, t: Type) -> bool {
        self.primary_type == t || self.secondary_type == Some(t)
    }

    pub fn hp_ratio(&self) -> f64 {
        if self.max_hp == 0 {
            0.0
        } else {
            self.current_hp as f64 / self.max_hp as f64
        }
    }

    /// Take damage; dropping to 0 faints the Pokémon.
    pub fn damage(&mut self, amount: u16) {
        self.current_hp = self.current_hp.saturating_sub(amount);
        if self.current_hp == 0 {
            self.faint();
        }
    }

    pub fn heal(&mut self, amount: u16) {
        self.current_hp = (self.current_hp + amount).min(self.max_hp);
    }

    pub fn faint(&mut self) {
        self.current_hp = 0;
        self.is_active = false;
    }

    /// Apply a permanent stage change.
    pub fn boost(&mut self, stat: BoostStat, delta: i8) {
        self.boosts.apply(stat, delta);
    }

    /// Apply a stage change that wears off after `turns` end-of-turn phases.
    pub fn boost_with_timer(&mut self, stat: BoostStat, delta: i8, turns: Option<u8>) {
        self.boosts.apply(stat, delta);
        self.boost_timers[stat.index()] = turns;
    }

    /// End-of-turn timer tick; expired stages reset to 0.
    pub fn decrement_boost_timers(&mut self) {
        for stat in BoostStat::ALL {
            if let Some(left) = self.boost_timers[stat.index()] {
                if left <= 1 {
                    self.boosts.clear(stat);
                    self.boost_timers[stat.index()] = None;
                } else {
                    self.boost_timers[stat.index()] = Some(left - 1);
                }
            }
        }
    }

    /// Inflict a major status. Fails if one is already present or the target
    /// has fainted. Toxic resets the ramp counter.
    pub fn try_set_status(&mut self, status: Status) -> bool {
        if self.status.is_some() || self.is_fainted() {
            return false;
        }
        self.status = Some(status);
        self.status_counter = 0;
        true
    }

    /// Stat after the stage multiplier only: `(2+s)/2` for `s >= 0`,
    /// `2/(2-s)` for `s < 0`. The damage pipeline uses this form; burn lives
    /// in the modifier chain so a crit can bypass it.
    pub fn stat_with_stages(&self, stat: Stat) -> f64 {
        let base = self.stats.get(stat) as f64;
        let stage = match stat {
            Stat::Hp => 0,
            Stat::Atk => self.boosts.get(BoostStat::Atk),
            Stat::Def => self.boosts.get(BoostStat::Def),
            Stat::Spa => self.boosts.get(BoostStat::Spa),
            Stat::Spd => self.boosts.get(BoostStat::Spd),
            Stat::Spe => self.boosts.get(BoostStat::Spe),
        };

        let multiplier = if stage >= 0 {
            (2 + stage) as f64 / 2.0
        } else {
            2.0 / (2 - stage) as f64
        };

        base * multiplier
    }

    /// Stat after stage and status modifiers. Burn halves attack, paralysis
    /// halves speed.
    pub fn effective_stat(&self, stat: Stat) -> f64 {
        let mut value = self.stat_with_stages(stat);
        if stat == Stat::Atk && self.status == Some(Status::Brn) {
            value *= 0.5;
        }
        if stat == Stat::Spe && self.status == Some(Status::Par) {
            value *= 0.5;
        }
        value
    }
}

impl Clone for Pokemon {
    /// Field-by-field clone; the moves vector is cloned element-wise so no
    /// PP counter or boost map is ever shared with the source.
    fn clone(&self) -> Pokemon {
        Pokemon {
            species: self.species.clone(),
            level: self.level,
            primary_type: self.primary_type,
            secondary_type: self.secondary_type,
            max_hp: self.max_hp,
            current_hp: self.current_hp,
            base_stats: self.base_stats,
            stats: self.stats,
            boosts: self.boosts,
            boost_timers: self.boost_timers,
            status: self.status,
            status_counter: self.status_counter,
            volatiles: self.volatiles,
            protect_counter: self.protect_counter,
            moves: self.moves.iter().cloned().collect(),
            is_active: self.is_active,
            ability: self.ability.clone(),
            item: self.item.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::Dex;

    fn lapras() -> Pokemon {
        let mut p = Pokemon::new("lapras", 50, (Type::Water, Some(Type::Ice)));
        p.max_hp = 200;
        p.current_hp = 200;
        p.stats = Stats {
            hp: 200,
            atk: 100,
            def: 100,
            spa: 100,
            spd: 100,
            spe: 80,
        };
        p
    }

    #[test]
    fn test_damage_and_faint() {
        let mut p = lapras();
        p.is_active = true;
        p.damage(150);
        assert_eq!(p.current_hp, 50);
        assert!(!p.is_fainted());

        p.damage(999);
        assert_eq!(p.current_hp, 0);
        assert!(p.is_fainted());
        assert!(!p.is_active, "a fainted Pokemon is never active");
    }

    #[test]
    fn test_heal_caps_at_max() {
        let mut p = lapras();
        p.current_hp = 190;
        p.heal(50);
        assert_eq!(p.current_hp, 200);
    }

    #[test]
    fn test_boost_clamp() {
        let mut p = lapras();
        p.boost(BoostStat::Atk, 4);
        p.boost(BoostStat::Atk, 4);
        assert_eq!(p.boosts.get(BoostStat::Atk), 6);
        p.boost(BoostStat::Atk, -13);
        assert_eq!(p.boosts.get(BoostStat::Atk), -6);
    }

    #[test]
    fn test_boost_timer_expiry() {
        let mut p = lapras();
        p.boost_with_timer(BoostStat::Spe, -1, Some(1));
        assert_eq!(p.boosts.get(BoostStat::Spe), -1);
        p.decrement_boost_timers();
        assert_eq!(p.boosts.get(BoostStat::Spe), 0);
        assert_eq!(p.boost_timers[BoostStat::Spe.index()], None);
    }

    #[test]
    fn test_permanent_boost_survives_ticks() {
        let mut p = lapras();
        p.boost(BoostStat::Atk, 2);
        for _ in 0..5 {
            p.decrement_boost_timers();
        }
        assert_eq!(p.boosts.get(BoostStat::Atk), 2);
    }

    #[test]
    fn test_status_exclusivity() {
        let mut p = lapras();
        assert!(p.try_set_status(Status::Brn));
        assert!(!p.try_set_status(Status::Par));
        assert_eq!(p.status, Some(Status::Brn));
    }

    #[test]
    fn test_toxic_resets_counter() {
        let mut p = lapras();
        p.status_counter = 3;
        assert!(p.try_set_status(Status::Tox));
        assert_eq!(p.status_counter, 0);
    }

    #[test]
    fn test_effective_stat_stages() {
        let mut p = lapras();
        assert_eq!(p.effective_stat(Stat::Atk), 100.0);

        p.boost(BoostStat::Atk, 1);
        assert_eq!(p.effective_stat(Stat::Atk), 150.0);

        p.boost(BoostStat::Atk, -2); // net -1
        assert!((p.effective_stat(Stat::Atk) - 100.0 * 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_effective_stat_status_modifiers() {
        let mut p = lapras();
        p.status = Some(Status::Brn);
        assert_eq!(p.effective_stat(Stat::Atk), 50.0);
        assert_eq!(p.effective_stat(Stat::Spa), 100.0);

        let mut q = lapras();
        q.status = Some(Status::Par);
        assert_eq!(q.effective_stat(Stat::Spe), 40.0);
        assert_eq!(q.effective_stat(Stat::Atk), 100.0);
    }

    #[test]
    fn test_clone_shares_nothing() {
        let dex = Dex::builtin();
        let mut p = lapras();
        p.moves = vec![Move::from_data(dex.get_move("surf"))];

        let mut c = p.clone();
        c.moves[0].use_pp();
        c.boost(BoostStat::Spe, 2);
        c.damage(50);

        assert_eq!(p.moves[0].current_pp, p.moves[0].max_pp);
        assert_eq!(p.boosts.get(BoostStat::Spe), 0);
        assert_eq!(p.current_hp, 200);
    }
}
