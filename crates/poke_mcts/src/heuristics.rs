//! Battle heuristics: expected-damage move scoring, the best-attack picker
//! used by the opponent model and rollouts, and the scalar state evaluation
//! the search backs up.

use crate::battle::pokemon::Pokemon;
use crate::battle::state::{BattleState, Player};
use crate::typechart::TypeChart;
use rand::rngs::StdRng;
use rand::Rng;

/// Accuracy stage multiplier: `(3+s)/3` for `s >= 0`, `3/(3-s)` otherwise.
pub fn accuracy_stage_multiplier(stage: i8) -> f64 {
    if stage >= 0 {
        (3 + stage) as f64 / 3.0
    } else {
        3.0 / (3 - stage) as f64
    }
}

/// Evasion stage multiplier: `3/(3+s)` for `s >= 0`, `(3-s)/3` otherwise.
pub fn evasion_stage_multiplier(stage: i8) -> f64 {
    if stage >= 0 {
        3.0 / (3 + stage) as f64
    } else {
        (3 - stage) as f64 / 3.0
    }
}

/// Expected-power score of one move: base power, STAB, type effectiveness
/// (may be 0), and the accuracy factor. Status moves score a flat 0.1.
pub fn move_damage_score(
    mv: &crate::battle::moves::Move,
    attacker: &Pokemon,
    defender: Option<&Pokemon>,
    chart: &TypeChart,
) -> f64 {
    if mv.is_status() {
        return 0.1;
    }

    let mut score = mv.base_power as f64;
    if attacker.has_type(mv.move_type) {
        score *= 1.5;
    }
    if let Some(d) = defender {
        score *= chart.multiplier(mv.move_type, d.primary_type, d.secondary_type);
    }
    if let Some(accuracy) = mv.accuracy {
        score *= accuracy;
    }
    score
}

/// Index of the attacker's highest-scoring move with PP left.
///
/// When nothing qualifies as a real attack (every scored move is a status
/// move or out of PP, or everything is immune), a uniformly random index is
/// returned instead of pretending there is a best choice.
pub fn best_attack_index(
    attacker: &Pokemon,
    defender: Option<&Pokemon>,
    chart: &TypeChart,
    rng: &mut StdRng,
) -> Option<usize> {
    if attacker.moves.is_empty() {
        return None;
    }

    let random_fallback = rng.gen_range(0..attacker.moves.len());
    let mut best_idx = 0usize;
    let mut max_score = -1.0f64;
    let mut has_valid_attack = false;

    for (i, mv) in attacker.moves.iter().enumerate() {
        if !mv.has_pp() {
            continue;
        }
        let score = move_damage_score(mv, attacker, defender, chart);
        if !mv.is_status() && score > 0.1 {
            has_valid_attack = true;
        }
        if score > max_score {
            max_score = score;
            best_idx = i;
        }
    }

    if !has_valid_attack && max_score <= 0.1 {
        return Some(random_fallback);
    }
    Some(best_idx)
}

/// Per-side score used by the non-terminal evaluation: each survivor is
/// worth `1 + hp_ratio`, minus 0.5 when statused, plus 0.1 per positive
/// offensive stage, floored at 0.1.
fn side_score(state: &BattleState, player: Player) -> f64 {
    let mut score = 0.0;
    for p in state.team_of(player) {
        if p.is_fainted() || p.max_hp == 0 {
            continue;
        }
        let mut member = 1.0 + p.hp_ratio();
        if p.status.is_some() {
            member -= 0.5;
        }
        let boosts = p.boosts.offensive_sum();
        if boosts > 0 {
            member += 0.1 * boosts as f64;
        }
        score += member.max(0.1);
    }
    score
}

/// Scalar reward in [0, 1] from the agent's perspective.
///
/// Terminal states score 1.0 on a win; losses give partial credit for the
/// damage that was dealt. Everything else is the balance of the two side
/// scores.
pub fn evaluate_state(state: &BattleState) -> f64 {
    if state.won {
        return 1.0;
    }
    if state.lost {
        let opp_hp = state.team_hp_ratio(Player::Opponent);
        return 0.2 * (1.0 - opp_hp);
    }

    let own = side_score(state, Player::Agent);
    let opp = side_score(state, Player::Opponent);
    if own + opp == 0.0 {
        return 0.5;
    }
    (own / (own + opp)).clamp(0.0, 1.0)
}
