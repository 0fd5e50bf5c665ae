//! XOR example.
//!
//! Evolves a fixed 2-3-1 network to reproduce the XOR truth table, a
//! classic benchmark for neuroevolution.
//!
//! Run with: `cargo run --example xor`

use neurostable::{Network, NetworkError, Topology, Trainer, TrainerConfig};

const CASES: [([f64; 2], f64); 4] = [
    ([0.0, 0.0], 0.0),
    ([0.0, 1.0], 1.0),
    ([1.0, 0.0], 1.0),
    ([1.0, 1.0], 0.0),
];

/// Outputs for every row of the truth table.
fn xor_outputs(network: &mut Network) -> Result<Vec<f64>, NetworkError> {
    network.reset();
    CASES
        .iter()
        .map(|(inputs, _)| {
            network.set_inputs(inputs)?;
            Ok(network.output()[0])
        })
        .collect()
}

/// Max fitness is 4.0 (perfect solution).
#[allow(clippy::ptr_arg)]
fn xor_fitness(outputs: &Vec<f64>) -> f64 {
    let error: f64 = outputs
        .iter()
        .zip(&CASES)
        .map(|(output, (_, expected))| (output - expected).powi(2))
        .sum();
    4.0 - error
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    println!("XOR Example");
    println!("===========\n");

    let config = TrainerConfig {
        class_size: 60,
        topology: Topology::new(2, [3, 1]),
        cream: 6,
        threads: 4,
        seed: 42,
    };
    let generations = 100;

    println!("Population: {}", config.class_size);
    println!("Generations: {}", generations);
    println!("Cream: {}", config.cream);
    println!();

    let mut trainer = match Trainer::new(config, xor_fitness) {
        Ok(trainer) => trainer,
        Err(err) => {
            eprintln!("Could not create trainer: {err}");
            return;
        }
    };
    let summaries = match trainer.train(xor_outputs, generations) {
        Ok(summaries) => summaries,
        Err(err) => {
            eprintln!("Training failed: {err}");
            return;
        }
    };

    let solved = summaries.iter().find(|s| s.best_score >= 3.9).map(|s| s.round);
    for summary in summaries.iter().filter(|s| s.round % 10 == 0 || s.round == generations - 1) {
        println!(
            "Gen {:3}: best={:.4}, worst={:.4}, champion={}",
            summary.round, summary.best_score, summary.worst_score, summary.best_name
        );
    }
    println!();

    let Some(champion) = trainer.best() else {
        return;
    };
    println!("Evolution Complete!");
    println!("==================");
    println!("Best fitness: {:.4}", champion.score);
    println!("Champion: {}", champion.network.display_name());
    if let Some(round) = solved {
        println!("Solution found at generation: {}", round);
    }

    println!("\nChampion XOR outputs:");
    for ((inputs, expected), output) in CASES.iter().zip(&champion.result) {
        let rounded = if *output > 0.5 { 1.0 } else { 0.0 };
        let status = if (rounded - expected).abs() < 0.1 { "✓" } else { "✗" };
        println!(
            "  {} XOR {} = {:.4} (expected {}) {}",
            inputs[0] as i32, inputs[1] as i32, output, *expected as i32, status
        );
    }
}
