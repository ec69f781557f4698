//! Benchmarks for BattleState cloning performance.
//!
//! `clone` is the hot path of the search: every expansion and rollout starts
//! from a copied state, thousands per decision. This benchmark keeps the
//! hand-written clone honest.
//!
//! Run with:
//!   cargo bench --package poke_mcts --bench state_clone

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use poke_mcts::{BattleEngine, BattleState, Dex, Move, Player, Pokemon, Stats, TurnAction};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn build_member(dex: &Dex, species: &str, move_ids: &[&str]) -> Pokemon {
    let data = dex.get_species(species);
    let level = 50u8;
    let stat = |base: u16| ((2 * base as u32 + 31) * level as u32 / 100 + 5) as u16;
    let hp = ((2 * data.base_stats.hp as u32 + 31) * level as u32 / 100 + level as u32 + 10) as u16;

    let mut p = Pokemon::new(
        data.id.clone(),
        level,
        (data.primary_type(), data.secondary_type()),
    );
    p.base_stats = data.base_stats;
    p.stats = Stats {
        hp,
        atk: stat(data.base_stats.atk),
        def: stat(data.base_stats.def),
        spa: stat(data.base_stats.spa),
        spd: stat(data.base_stats.spd),
        spe: stat(data.base_stats.spe),
    };
    p.max_hp = hp;
    p.current_hp = hp;
    p.moves = move_ids
        .iter()
        .map(|id| Move::from_data(dex.get_move(id)))
        .collect();
    p
}

/// A fully populated 6v6 state.
fn setup_full_battle() -> BattleState {
    let dex = Dex::builtin();
    let mut state = BattleState::new();

    let team = [
        ("garchomp", ["earthquake", "outrage", "stoneedge", "swordsdance"]),
        ("metagross", ["meteormash", "zenheadbutt", "bulletpunch", "agility"]),
        ("gengar", ["shadowball", "sludgebomb", "focusblast", "thunderbolt"]),
        ("gyarados", ["waterfall", "earthquake", "dragondance", "crunch"]),
        ("clefable", ["moonblast", "flamethrower", "calmmind", "thunderwave"]),
        ("scizor", ["bulletpunch", "xscissor", "swordsdance", "knockoff"]),
    ];
    let opponents = [
        ("tyranitar", ["stoneedge", "crunch", "earthquake", "dragondance"]),
        ("starmie", ["surf", "psychic", "icebeam", "thunderbolt"]),
        ("heracross", ["megahorn", "closecombat", "stoneedge", "knockoff"]),
        ("togekiss", ["airslash", "moonblast", "aurasphere", "nastyplot"]),
        ("mamoswine", ["earthquake", "iciclecrash", "iceshard", "stoneedge"]),
        ("arcanine", ["flareblitz", "extremespeed", "crunch", "willowisp"]),
    ];

    for (species, moves) in team {
        state.team.push(build_member(dex, species, &moves));
    }
    for (species, moves) in opponents {
        state.opponent_team.push(build_member(dex, species, &moves));
    }
    state.set_active(Player::Agent, Some(0));
    state.set_active(Player::Opponent, Some(0));
    state.turn = 5;
    state.available_moves = state.team[0].moves.iter().map(|m| m.id.clone()).collect();
    state
}

fn bench_state_clone(c: &mut Criterion) {
    let state = setup_full_battle();

    c.bench_function("state_clone", |b| {
        b.iter(|| {
            let cloned = black_box(&state).clone();
            black_box(cloned)
        })
    });
}

fn bench_state_clone_throughput(c: &mut Criterion) {
    let state = setup_full_battle();

    let mut group = c.benchmark_group("state_clone_throughput");
    group.throughput(Throughput::Elements(1));
    group.bench_function("clone_full_6v6", |b| {
        b.iter(|| {
            let cloned = black_box(&state).clone();
            black_box(cloned)
        })
    });
    group.finish();
}

fn bench_clone_and_simulate(c: &mut Criterion) {
    let engine = BattleEngine::default();
    let state = setup_full_battle();

    c.bench_function("clone_and_simulate_turn", |b| {
        let mut rng = StdRng::seed_from_u64(1);
        b.iter(|| {
            let mut cloned = black_box(&state).clone();
            engine.simulate_turn(&mut cloned, TurnAction::None, TurnAction::None, &mut rng);
            black_box(cloned)
        })
    });
}

criterion_group!(
    benches,
    bench_state_clone,
    bench_state_clone_throughput,
    bench_clone_and_simulate
);
criterion_main!(benches);
