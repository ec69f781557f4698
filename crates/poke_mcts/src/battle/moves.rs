//! Runtime move instances.
//!
//! A `Move` is the per-battle copy of a `MoveData` entry: the static fields
//! plus a PP counter. States own their moves outright so search clones never
//! share PP with the live observation.

use crate::core_data::{MoveCategory, Status, Type};
use crate::dex::{BoostDeltas, Dex, MoveData, MoveFlags};

#[derive(Debug, Clone, PartialEq)]
pub struct Move {
    pub id: String,
    pub base_power: u16,
    pub move_type: Type,
    pub category: MoveCategory,
    /// `None` means the move always hits.
    pub accuracy: Option<f64>,
    pub priority: i8,
    pub current_pp: u8,
    pub max_pp: u8,
    pub status: Option<Status>,
    pub target_boosts: BoostDeltas,
    pub self_boosts: BoostDeltas,
    pub recoil: Option<(u8, u8)>,
    pub drain: Option<(u8, u8)>,
    pub crit_ratio: u8,
    pub expected_hits: f32,
    pub flags: MoveFlags,
}

impl Move {
    /// Instantiate with full PP.
    pub fn from_data(data: &MoveData) -> Move {
        Move::with_pp(data, data.pp, data.pp)
    }

    /// Instantiate with an observed PP count.
    pub fn with_pp(data: &MoveData, current_pp: u8, max_pp: u8) -> Move {
        let max_pp = max_pp.max(1);
        Move {
            id: data.id.clone(),
            base_power: data.base_power,
            move_type: data.move_type,
            category: data.category,
            accuracy: data.accuracy,
            priority: data.priority,
            current_pp: current_pp.min(max_pp),
            max_pp,
            status: data.status,
            target_boosts: data.target_boosts.clone(),
            self_boosts: data.self_boosts.clone(),
            recoil: data.recoil,
            drain: data.drain,
            crit_ratio: data.crit_ratio,
            expected_hits: data.expected_hits,
            flags: data.flags,
        }
    }

    /// The tackle-class move synthesized when nothing else is usable.
    pub fn fallback() -> Move {
        Move::from_data(Dex::fallback_move())
    }

    /// Spend one PP, clamped at zero.
    pub fn use_pp(&mut self) {
        self.current_pp = self.current_pp.saturating_sub(1);
    }

    #[inline]
    pub fn has_pp(&self) -> bool {
        self.current_pp > 0
    }

    #[inline]
    pub fn is_status(&self) -> bool {
        self.category == MoveCategory::Status
    }
}
