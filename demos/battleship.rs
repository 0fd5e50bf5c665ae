//! Battleship example: evolve networks that sink a fleet in few shots.
//!
//! Each network sees the 10x10 board as 100 sensors (0 unknown, -1 miss,
//! 1 hit) plus 5 "ship sunk" sensors, and outputs one score per square. It
//! fires at the highest-scoring square it has not fired at yet. Fitness is
//! the negated average number of shots over a handful of games.
//!
//! Run with: `cargo run --release --example battleship -- --help`
//!
//! With `--output-location`, every round's stable is saved under `gen_<n>/`
//! and the best network so far as `best_gen<n>_<score>.network`. A saved
//! `gen_<n>/` directory can seed a later run through `--class-location`.

use std::path::{Path, PathBuf};

use clap::Parser;
use neurostable::{persist, Network, NetworkError, Topology, Trainer, TrainerConfig};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const SIDE: usize = 10;
const SQUARES: usize = SIDE * SIDE;
const FLEET: [usize; 5] = [5, 4, 3, 3, 2];
const GAMES: u64 = 5;

#[derive(Parser)]
#[command(name = "battleship")]
#[command(about = "Evolve networks that play battleship")]
struct Cli {
    /// Networks per generation
    #[arg(long, default_value = "20")]
    class_size: usize,

    /// Top networks crossed into the next generation
    #[arg(long, default_value = "3")]
    cream: usize,

    /// Rounds of training to run
    #[arg(long, default_value = "5")]
    rounds: usize,

    /// Worker threads for evaluation
    #[arg(long, default_value = "5")]
    threads: usize,

    /// Directory of .network files to seed the first class with
    #[arg(long)]
    class_location: Option<PathBuf>,

    /// Directory to save every class and the best network into
    #[arg(long)]
    output_location: Option<PathBuf>,

    /// Random seed
    #[arg(long, default_value = "42")]
    seed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shot {
    Miss,
    Hit,
    /// Hit that sank a ship of this length.
    Sunk(usize),
}

struct Board {
    /// Ship index per square.
    squares: [Option<usize>; SQUARES],
    /// Unhit squares left per ship.
    afloat: Vec<usize>,
}

impl Board {
    fn random<R: Rng>(rng: &mut R) -> Self {
        let mut squares = [None; SQUARES];
        for (ship, &len) in FLEET.iter().enumerate() {
            loop {
                let x = rng.random_range(0..SIDE);
                let y = rng.random_range(0..SIDE);
                let cells: Vec<(usize, usize)> = if rng.random::<bool>() {
                    (0..len).map(|n| (x, y + n)).collect()
                } else {
                    (0..len).map(|n| (x + n, y)).collect()
                };
                let fits = cells
                    .iter()
                    .all(|&(x, y)| x < SIDE && y < SIDE && squares[y * SIDE + x].is_none());
                if fits {
                    for (x, y) in cells {
                        squares[y * SIDE + x] = Some(ship);
                    }
                    break;
                }
            }
        }
        Self {
            squares,
            afloat: FLEET.to_vec(),
        }
    }

    fn fire(&mut self, square: usize) -> Shot {
        match self.squares[square].take() {
            None => Shot::Miss,
            Some(ship) => {
                self.afloat[ship] -= 1;
                if self.afloat[ship] == 0 {
                    Shot::Sunk(FLEET[ship])
                } else {
                    Shot::Hit
                }
            }
        }
    }

    fn won(&self) -> bool {
        self.afloat.iter().all(|&left| left == 0)
    }
}

/// Play one game and return the number of shots taken.
fn play(network: &mut Network, board_seed: u64) -> Result<usize, NetworkError> {
    network.reset();
    let mut board = Board::random(&mut ChaCha8Rng::seed_from_u64(board_seed));
    let mut fired = [false; SQUARES];
    let mut turns = 0;

    while !board.won() {
        let scores = network.output();
        let target = scores[..SQUARES]
            .iter()
            .enumerate()
            .filter(|(square, _)| !fired[*square])
            .fold(None, |best: Option<(usize, f64)>, (square, &score)| match best {
                Some((_, top)) if top >= score => best,
                _ => Some((square, score)),
            })
            .map_or(0, |(square, _)| square);
        fired[target] = true;

        match board.fire(target) {
            Shot::Miss => network.set_input(target, -1.0)?,
            Shot::Hit => network.set_input(target, 1.0)?,
            Shot::Sunk(len) => {
                network.set_input(target, 1.0)?;
                network.set_input(SQUARES + len - 1, 1.0)?;
            }
        }
        turns += 1;
    }
    Ok(turns)
}

/// Mean number of shots over `GAMES` boards starting at `first_board`.
fn average_turns(network: &mut Network, first_board: u64) -> Result<f64, NetworkError> {
    let mut total = 0;
    for seed in first_board..first_board + GAMES {
        total += play(network, seed)?;
    }
    Ok(total as f64 / GAMES as f64)
}

fn best_file_name(generation: u32, score: f64) -> String {
    format!("best_gen{}_{:.2}.{}", generation, score, persist::EXTENSION)
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    println!("Battleship Example");
    println!("==================\n");

    let seeded = match &cli.class_location {
        Some(dir) => match persist::load_stable(dir) {
            Ok(networks) if !networks.is_empty() => Some(networks),
            Ok(_) => {
                eprintln!("No .network files in {}", dir.display());
                return;
            }
            Err(err) => {
                eprintln!("Could not load class from {}: {err}", dir.display());
                return;
            }
        },
        None => None,
    };

    let config = TrainerConfig {
        class_size: seeded.as_ref().map_or(cli.class_size, Vec::len),
        topology: Topology::new(SQUARES + FLEET.len(), [103, SQUARES]),
        cream: cli.cream,
        threads: cli.threads,
        seed: cli.seed,
    };
    let mut trainer = match Trainer::new(config, |turns: &f64| -turns) {
        Ok(trainer) => trainer,
        Err(err) => {
            eprintln!("Could not create trainer: {err}");
            return;
        }
    };
    let installed = match seeded {
        Some(networks) => {
            println!("Resuming from {} saved networks", networks.len());
            trainer.set_stable(networks)
        }
        None => trainer.spawn_class(),
    };
    if let Err(err) = installed {
        eprintln!("Could not set up the first class: {err}");
        return;
    }

    for round in 0..cli.rounds {
        let first_board = round as u64 * GAMES;
        let summary = match trainer.run_round(|network: &mut Network| {
            average_turns(network, first_board)
        }) {
            Ok(summary) => summary,
            Err(err) => {
                eprintln!("Round {round} failed: {err}");
                return;
            }
        };
        println!(
            "Round {}: best {:.1} turns ({}), worst {:.1} turns",
            summary.round, -summary.best_score, summary.best_name, -summary.worst_score
        );

        if let Some(dir) = &cli.output_location {
            if let Err(err) = save_round(&trainer, dir) {
                eprintln!("Could not save round {round}: {err}");
            }
        }
    }

    if let Some(best) = trainer.best() {
        println!(
            "\nWinning network {} sank the fleet in an average of {:.1} turns",
            best.network.display_name(),
            best.result
        );
    }
}

/// Save the stable under `gen_<n>/` and the best network beside it.
fn save_round<F>(trainer: &Trainer<f64, F>, dir: &Path) -> Result<(), persist::PersistError>
where
    F: neurostable::Fitness<f64, Score = f64>,
{
    let generation = trainer
        .stable()
        .iter()
        .map(Network::generation)
        .max()
        .unwrap_or(0);
    persist::save_stable(trainer.stable(), dir.join(format!("gen_{generation}")))?;
    if let Some(best) = trainer.best() {
        persist::save_to(
            &best.network,
            dir.join(best_file_name(best.network.generation(), best.score)),
        )?;
    }
    Ok(())
}
