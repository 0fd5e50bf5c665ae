//! # Neurostable
//!
//! Neuro-evolution of fixed-topology, fully connected feed-forward networks.
//!
//! ## Features
//!
//! - **Memoized Evaluation**: every node carries a change counter; a neuron
//!   recomputes only when one of its inputs changed since it last looked, so
//!   repeated reads with a few updated sensors stay cheap
//! - **Arena-Graph Model**: `SlotMap` storage for nodes and connections, with
//!   connections also addressable by `(source, target)` identity
//! - **Weight Genetics**: uniform multi-parent crossover and bounded additive
//!   mutation, all driven by a caller-supplied seedable generator
//! - **Parallel Trainer**: ranked selection with elitism and new blood; each
//!   round's evaluations run on a `rayon` worker pool
//! - **Genotype Trait**: implements `symbios_genetics::Genotype` for use with
//!   other evolutionary algorithms
//!
//! ## Quick Start
//!
//! ```rust
//! use neurostable::{Network, Topology};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut rng = ChaCha8Rng::seed_from_u64(42);
//! let mut net = Network::new(Topology::new(3, [4, 2])).with_name("sampler");
//! net.initialise(&mut rng);
//!
//! net.set_inputs(&[1.0, 0.0, -1.0]).unwrap();
//! let first = net.output();
//!
//! // Nothing changed, so nothing is recomputed.
//! assert_eq!(net.output(), first);
//! ```
//!
//! ## Training
//!
//! ```rust
//! use neurostable::{Network, Topology, Trainer, TrainerConfig};
//! use std::convert::Infallible;
//!
//! let config = TrainerConfig {
//!     class_size: 8,
//!     topology: Topology::new(2, [3, 1]),
//!     cream: 2,
//!     threads: 2,
//!     seed: 7,
//! };
//!
//! // Reward networks whose output is close to 1 for input (1, 1).
//! let mut trainer = Trainer::new(config, |out: &f64| -(1.0 - out).abs()).unwrap();
//! let summaries = trainer
//!     .train(
//!         |net: &mut Network| -> Result<f64, Infallible> {
//!             net.set_inputs(&[1.0, 1.0]).unwrap();
//!             Ok(net.output()[0])
//!         },
//!         3,
//!     )
//!     .unwrap();
//!
//! assert_eq!(summaries.len(), 3);
//! assert!(summaries[2].best_score >= summaries[0].best_score);
//! ```
//!
//! ## Architecture
//!
//! Node identities are assigned sequentially at construction, so two networks
//! built from the same [`Topology`] share every connection identity. That is
//! what makes crossover a per-connection choice of parent: no alignment step
//! is needed, and a mismatch in topology is rejected up front.
//!
//! The [`Trainer`] owns the only generator used for seeding, crossover and
//! mutation, and uses it exclusively between evaluation phases. Tasks receive
//! networks mutably but never see the generator, which keeps a seeded run
//! reproducible however the pool schedules work.

pub mod activation;
pub mod graph;
pub mod network;
pub mod persist;
pub mod trainer;
pub mod util;

// Re-exports for convenience
pub use activation::Activation;
pub use graph::{
    Connection, ConnectionId, ConnectionIdentity, GraphError, Node, NodeId, NodeKind,
    DEFAULT_MUTATION_RATE, MAX_WEIGHT, MIN_WEIGHT,
};
pub use network::{Network, NetworkError, Topology};
pub use persist::{NetworkBlob, PersistError};
pub use trainer::{BoxError, Champion, Fitness, RoundSummary, TrainError, Trainer, TrainerConfig};
pub use util::{clamp, Identifier, Namer};
