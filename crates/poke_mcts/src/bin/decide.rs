//! Line-oriented decision loop.
//!
//! Reads one observation JSON document per stdin line and writes the chosen
//! action (or an error object) per line on stdout. This is the surface the
//! replay/accuracy harnesses drive.
//!
//! Usage:
//!   decide [--seed N] [--iterations N] [--data DIR]

use poke_mcts::agent::Agent;
use poke_mcts::config::SearchConfig;
use poke_mcts::dex::Dex;
use poke_mcts::obs::Observation;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Serialize)]
#[serde(untagged)]
enum Reply {
    Action(poke_mcts::search::Action),
    Error { error: String },
    Pass { pass: bool },
}

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut seed: u64 = 0;
    let mut config = SearchConfig::default();
    let mut data_dir: Option<PathBuf> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--seed" if i + 1 < args.len() => {
                seed = args[i + 1].parse().unwrap_or(0);
                i += 2;
            }
            "--iterations" if i + 1 < args.len() => {
                if let Ok(n) = args[i + 1].parse() {
                    config.iterations = n;
                }
                i += 2;
            }
            "--data" if i + 1 < args.len() => {
                data_dir = Some(PathBuf::from(&args[i + 1]));
                i += 2;
            }
            _ => i += 1,
        }
    }

    let agent = match data_dir {
        Some(dir) => match Dex::load(&dir) {
            Ok(dex) => Agent::with_dex(dex, config),
            Err(err) => {
                eprintln!("failed to load data tables: {err}");
                std::process::exit(1);
            }
        },
        None => Agent::new(config),
    };

    let mut rng = StdRng::seed_from_u64(seed);
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let reply = match serde_json::from_str::<Observation>(&line) {
            Ok(obs) => match agent.choose_action(&obs, &mut rng) {
                Some(action) => Reply::Action(action),
                None => Reply::Pass { pass: true },
            },
            Err(err) => Reply::Error {
                error: format!("invalid observation: {err}"),
            },
        };

        let encoded = serde_json::to_string(&reply).expect("reply serializes");
        if writeln!(out, "{encoded}").is_err() {
            break;
        }
    }
}
