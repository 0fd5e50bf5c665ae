//! Generational trainer for a population ("stable") of networks.
//!
//! Each round evaluates every network of the stable on a caller-supplied
//! task, concurrently on a fixed-size worker pool, ranks the results with a
//! caller-supplied fitness, and replaces the stable wholesale:
//!
//! 1. `cream` freshly seeded networks ("new blood"),
//! 2. the remaining slots crossed from the top `cream` networks.
//!
//! The best network ever seen is carried into every later ranking, so the
//! recorded best score never decreases.
//!
//! All randomness comes from one generator owned by the trainer and used only
//! between evaluations, so a fixed seed reproduces a run exactly regardless of
//! how the worker pool schedules tasks.

use std::cmp::Ordering;
use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::network::{Network, NetworkError, Topology};
use crate::util::Namer;

/// Boxed error returned by a failing task.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Configuration for a [`Trainer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainerConfig {
    /// Number of networks per round.
    pub class_size: usize,
    /// Layer sizes shared by every network of the run.
    pub topology: Topology,
    /// Number of top networks used as breeding stock, and number of new
    /// random networks injected each round.
    pub cream: usize,
    /// Worker pool size for concurrent evaluation.
    pub threads: usize,
    /// Seed of the trainer's random generator.
    pub seed: u64,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            class_size: 20,
            topology: Topology::default(),
            cream: 3,
            threads: 5,
            seed: 0,
        }
    }
}

impl TrainerConfig {
    /// Create a config with default `threads` and `seed`.
    #[must_use]
    pub fn new(topology: Topology, class_size: usize, cream: usize) -> Self {
        Self {
            class_size,
            topology,
            cream,
            ..Default::default()
        }
    }

    /// Reject configurations that cannot run.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::InvalidConfig`] for a zero class size, cream or
    /// thread count, a cream larger than the class, and
    /// [`TrainError::Network`] for an invalid topology.
    pub fn validate(&self) -> Result<(), TrainError> {
        if self.class_size == 0 {
            return Err(TrainError::InvalidConfig(
                "class_size must be at least 1".to_string(),
            ));
        }
        if self.cream == 0 {
            return Err(TrainError::InvalidConfig(
                "cream must be at least 1".to_string(),
            ));
        }
        if self.cream > self.class_size {
            return Err(TrainError::InvalidConfig(format!(
                "cream ({}) cannot exceed class_size ({})",
                self.cream, self.class_size
            )));
        }
        if self.threads == 0 {
            return Err(TrainError::InvalidConfig(
                "threads must be at least 1".to_string(),
            ));
        }
        self.topology.validate()?;
        Ok(())
    }
}

/// Turns a task's raw result into a score. Higher is better.
///
/// Implemented for every `Fn(&T) -> S`.
pub trait Fitness<T> {
    /// Score type. Scores that cannot be ordered against themselves (NaN)
    /// rank below every other score. Apart from those, scores must be totally
    /// ordered; a type where two ordinary values are incomparable is not
    /// supported and may make the ranking sort panic.
    type Score: PartialOrd + Clone + fmt::Debug;

    /// Score one result.
    fn score(&self, result: &T) -> Self::Score;
}

impl<T, S, F> Fitness<T> for F
where
    F: Fn(&T) -> S,
    S: PartialOrd + Clone + fmt::Debug,
{
    type Score = S;

    fn score(&self, result: &T) -> S {
        self(result)
    }
}

/// A network together with its raw result and score.
#[derive(Debug, Clone)]
pub struct Champion<T, S> {
    /// The evaluated network.
    pub network: Network,
    /// Raw task result.
    pub result: T,
    /// Fitness of `result`.
    pub score: S,
}

/// What happened in one round.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundSummary<S> {
    /// Zero-based round index.
    pub round: usize,
    /// Highest score in the ranking, including the carried-over best.
    pub best_score: S,
    /// Lowest score in the ranking.
    pub worst_score: S,
    /// Display name of the best network.
    pub best_name: String,
    /// Display name of the worst network.
    pub worst_name: String,
    /// Number of networks ranked.
    pub ranked: usize,
}

/// Errors that end a training run.
#[derive(Debug)]
pub enum TrainError {
    /// The configuration cannot run.
    InvalidConfig(String),
    /// A replacement stable has the wrong number of networks.
    StableSize {
        /// Configured class size.
        expected: usize,
        /// Networks supplied.
        found: usize,
    },
    /// A round was started before any stable was spawned or installed.
    EmptyStable,
    /// Building or crossing a network failed.
    Network(NetworkError),
    /// A task failed; the round was aborted.
    Task {
        /// Display name of the network under evaluation.
        network: String,
        /// The task's error.
        source: BoxError,
    },
    /// The worker pool could not be built.
    Pool(rayon::ThreadPoolBuildError),
}

impl fmt::Display for TrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainError::InvalidConfig(reason) => write!(f, "invalid configuration: {}", reason),
            TrainError::StableSize { expected, found } => write!(
                f,
                "stable must hold {} networks, got {}",
                expected, found
            ),
            TrainError::EmptyStable => {
                write!(f, "no stable to train; call spawn_class() or set_stable() first")
            }
            TrainError::Network(err) => write!(f, "{}", err),
            TrainError::Task { network, source } => {
                write!(f, "task failed on {}: {}", network, source)
            }
            TrainError::Pool(err) => write!(f, "could not build worker pool: {}", err),
        }
    }
}

impl std::error::Error for TrainError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrainError::Network(err) => Some(err),
            TrainError::Task { source, .. } => Some(source.as_ref()),
            TrainError::Pool(err) => Some(err),
            _ => None,
        }
    }
}

impl From<NetworkError> for TrainError {
    fn from(err: NetworkError) -> Self {
        TrainError::Network(err)
    }
}

/// Descending order; scores that are not comparable with themselves go last.
fn rank<S: PartialOrd>(a: &S, b: &S) -> Ordering {
    let a_ordered = a.partial_cmp(a).is_some();
    let b_ordered = b.partial_cmp(b).is_some();
    match (a_ordered, b_ordered) {
        (true, true) => b.partial_cmp(a).unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => Ordering::Equal,
    }
}

fn seed<R: Rng>(
    topology: &Topology,
    namer: &mut Namer,
    rng: &mut R,
) -> Result<Network, TrainError> {
    let mut network = Network::try_new(topology.clone())?.with_name(namer.next_name());
    network.initialise(rng);
    Ok(network)
}

/// Runs rounds of evaluation, ranking and regeneration over a stable of networks.
pub struct Trainer<T, F: Fitness<T>, R = ChaCha8Rng> {
    config: TrainerConfig,
    fitness: F,
    rng: R,
    pool: ThreadPool,
    namer: Namer,
    stable: Vec<Network>,
    best: Option<Champion<T, F::Score>>,
    round: usize,
}

impl<T, F: Fitness<T>> Trainer<T, F, ChaCha8Rng> {
    /// Create a trainer whose generator is seeded from `config.seed`.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or the worker pool cannot be built.
    pub fn new(config: TrainerConfig, fitness: F) -> Result<Self, TrainError> {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self::with_rng(config, fitness, rng)
    }
}

impl<T, F: Fitness<T>, R: Rng> Trainer<T, F, R> {
    /// Create a trainer driven by the given generator. `config.seed` is ignored.
    ///
    /// # Errors
    ///
    /// Fails if the configuration is invalid or the worker pool cannot be built.
    pub fn with_rng(config: TrainerConfig, fitness: F, rng: R) -> Result<Self, TrainError> {
        config.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|index| format!("trainer-worker-{}", index))
            .build()
            .map_err(TrainError::Pool)?;

        Ok(Self {
            config,
            fitness,
            rng,
            pool,
            namer: Namer::default(),
            stable: Vec::new(),
            best: None,
            round: 0,
        })
    }

    /// Replace the display-name source.
    #[must_use]
    pub fn with_namer(mut self, namer: Namer) -> Self {
        self.namer = namer;
        self
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Current stable.
    #[must_use]
    pub fn stable(&self) -> &[Network] {
        &self.stable
    }

    /// Best network seen so far, with its result and score.
    #[must_use]
    pub const fn best(&self) -> Option<&Champion<T, F::Score>> {
        self.best.as_ref()
    }

    /// Number of rounds completed.
    #[must_use]
    pub const fn round(&self) -> usize {
        self.round
    }

    /// Fill the stable with `class_size` freshly seeded networks.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::Network`] if a network cannot be built.
    pub fn spawn_class(&mut self) -> Result<(), TrainError> {
        log::info!("Seeding {} networks", self.config.class_size);
        let stable = (0..self.config.class_size)
            .map(|_| self.seed_network())
            .collect::<Result<Vec<_>, _>>()?;
        self.stable = stable;
        log::info!("Networks seeded");
        Ok(())
    }

    /// Install a previously saved stable instead of spawning one.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::StableSize`] if the count differs from
    /// `class_size`, and a [`NetworkError::TopologyMismatch`] if any network
    /// was built from another topology. The current stable is kept on error.
    pub fn set_stable(&mut self, networks: Vec<Network>) -> Result<(), TrainError> {
        if networks.len() != self.config.class_size {
            return Err(TrainError::StableSize {
                expected: self.config.class_size,
                found: networks.len(),
            });
        }
        if let Some(stranger) = networks
            .iter()
            .find(|n| n.topology() != &self.config.topology)
        {
            return Err(NetworkError::TopologyMismatch {
                expected: self.config.topology.clone(),
                found: stranger.topology().clone(),
            }
            .into());
        }
        self.stable = networks;
        Ok(())
    }

    /// Build one fully random network.
    fn seed_network(&mut self) -> Result<Network, TrainError> {
        seed(&self.config.topology, &mut self.namer, &mut self.rng)
    }

    /// Evaluate, rank and regenerate the stable once.
    ///
    /// Blocks until every evaluation finishes. The task receives each network
    /// mutably and may drive its sensors; it is not reset beforehand. Results
    /// stay paired with their network whatever order the workers finish in.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::EmptyStable`] if there is nothing to evaluate and
    /// [`TrainError::Task`] if any task fails. On any error the stable, the
    /// best network and the round counter are left as they were. A panicking
    /// task propagates its panic to the caller.
    pub fn run_round<Task, E>(&mut self, task: Task) -> Result<RoundSummary<F::Score>, TrainError>
    where
        Task: Fn(&mut Network) -> Result<T, E> + Sync,
        E: Into<BoxError>,
        T: Send,
    {
        if self.stable.is_empty() {
            return Err(TrainError::EmptyStable);
        }
        let round = self.round;
        log::info!("Starting round {} with {} networks", round, self.stable.len());

        let pool = &self.pool;
        let stable = &mut self.stable;
        let mut results = pool.install(|| {
            stable
                .par_iter_mut()
                .map(|network| {
                    log::debug!("Evaluating {}", network.display_name());
                    task(network).map_err(|err| TrainError::Task {
                        network: network.display_name(),
                        source: err.into(),
                    })
                })
                .collect::<Result<Vec<T>, TrainError>>()
        })?;

        log::info!("Ranking winners");
        let mut scores: Vec<F::Score> = results.iter().map(|r| self.fitness.score(r)).collect();

        // The carried-over best goes last so that it loses ties.
        let candidates: Vec<(&Network, &F::Score)> = self
            .stable
            .iter()
            .zip(&scores)
            .chain(self.best.as_ref().map(|best| (&best.network, &best.score)))
            .collect();
        let mut order: Vec<usize> = (0..candidates.len()).collect();
        order.sort_by(|&a, &b| rank(candidates[a].1, candidates[b].1));

        let (best_network, best_score) = candidates[order[0]];
        let (worst_network, worst_score) = candidates[order[order.len() - 1]];
        log::info!("Best score was {:?} ({})", best_score, best_network.display_name());
        log::info!("Worst score was {:?} ({})", worst_score, worst_network.display_name());
        let summary = RoundSummary {
            round,
            best_score: best_score.clone(),
            worst_score: worst_score.clone(),
            best_name: best_network.display_name(),
            worst_name: worst_network.display_name(),
            ranked: candidates.len(),
        };

        let cream: Vec<&Network> = order
            .iter()
            .take(self.config.cream)
            .map(|&index| candidates[index].0)
            .collect();
        log::info!("Selected {} best networks", cream.len());

        let mut next = Vec::with_capacity(self.config.class_size);
        for _ in 0..self.config.cream {
            next.push(seed(&self.config.topology, &mut self.namer, &mut self.rng)?);
        }
        while next.len() < self.config.class_size {
            let mut child = Network::try_new(self.config.topology.clone())?
                .with_name(self.namer.next_name());
            child.cross(&mut self.rng, &cream)?;
            next.push(child);
        }
        log::info!("Produced {} new networks", next.len());

        // A carried-over best that stays on top is kept as is.
        let top = order[0];
        let mut previous = std::mem::replace(&mut self.stable, next);
        if top < previous.len() {
            self.best = Some(Champion {
                network: previous.swap_remove(top),
                result: results.swap_remove(top),
                score: scores.swap_remove(top),
            });
        }
        self.round += 1;
        Ok(summary)
    }

    /// Run `rounds` rounds back to back, spawning a stable first if none is
    /// installed. There is no early stopping.
    ///
    /// # Errors
    ///
    /// Returns [`TrainError::InvalidConfig`] for zero rounds and stops at the
    /// first failing round.
    pub fn train<Task, E>(
        &mut self,
        task: Task,
        rounds: usize,
    ) -> Result<Vec<RoundSummary<F::Score>>, TrainError>
    where
        Task: Fn(&mut Network) -> Result<T, E> + Sync,
        E: Into<BoxError>,
        T: Send,
    {
        if rounds == 0 {
            return Err(TrainError::InvalidConfig(
                "rounds must be at least 1".to_string(),
            ));
        }
        if self.stable.is_empty() {
            self.spawn_class()?;
        }
        (0..rounds).map(|_| self.run_round(&task)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

    fn small_config() -> TrainerConfig {
        TrainerConfig {
            class_size: 6,
            topology: Topology::new(3, [2]),
            cream: 2,
            threads: 2,
            seed: 42,
        }
    }

    /// Sum of outputs for a fixed input; deterministic per network.
    fn stimulus(network: &mut Network) -> Result<f64, Infallible> {
        network.reset();
        let _ = network.set_inputs(&[0.2, -0.1, 0.05]);
        Ok(network.output().iter().sum())
    }

    fn score(result: &f64) -> f64 {
        *result
    }

    type TestTrainer = Trainer<f64, fn(&f64) -> f64>;

    fn trainer(config: TrainerConfig) -> Result<TestTrainer, TrainError> {
        Trainer::new(config, score as fn(&f64) -> f64)
    }

    #[test]
    fn test_config_validation() {
        assert!(small_config().validate().is_ok());
        assert!(TrainerConfig::default().validate().is_ok());

        let cases = [
            TrainerConfig {
                class_size: 0,
                cream: 0,
                ..small_config()
            },
            TrainerConfig {
                cream: 0,
                ..small_config()
            },
            TrainerConfig {
                cream: 7,
                ..small_config()
            },
            TrainerConfig {
                threads: 0,
                ..small_config()
            },
            TrainerConfig {
                topology: Topology::new(3, Vec::new()),
                ..small_config()
            },
        ];
        for config in cases {
            assert!(config.validate().is_err(), "{config:?} should be rejected");
            assert!(trainer(config).is_err());
        }
    }

    #[test]
    fn test_rank_orders_descending_and_puts_nan_last() {
        let mut scores = vec![1.0, f64::NAN, 3.0, 2.0];
        scores.sort_by(rank);
        assert_eq!(&scores[..3], &[3.0, 2.0, 1.0]);
        assert!(scores[3].is_nan());
    }

    #[test]
    fn test_spawn_class_fills_stable() {
        let mut trainer = trainer(small_config()).unwrap();
        assert!(trainer.stable().is_empty());
        trainer.spawn_class().unwrap();
        assert_eq!(trainer.stable().len(), 6);
        for net in trainer.stable() {
            assert_eq!(net.topology(), &small_config().topology);
            assert!(net.weights().iter().any(|w| w.abs() > 1e-9));
        }
    }

    #[test]
    fn test_run_round_requires_stable() {
        let mut trainer = trainer(small_config()).unwrap();
        assert!(matches!(
            trainer.run_round(stimulus),
            Err(TrainError::EmptyStable)
        ));
    }

    #[test]
    fn test_round_keeps_class_size_and_records_best() {
        let mut trainer = trainer(small_config()).unwrap();
        trainer.spawn_class().unwrap();

        let summary = trainer.run_round(stimulus).unwrap();
        assert_eq!(summary.round, 0);
        assert_eq!(summary.ranked, 6);
        assert_eq!(trainer.stable().len(), 6);
        assert_eq!(trainer.round(), 1);

        let best = trainer.best().unwrap();
        assert_eq!(best.score, summary.best_score);
        assert!(summary.best_score >= summary.worst_score);

        let summary = trainer.run_round(stimulus).unwrap();
        assert_eq!(summary.ranked, 7, "carried-over best joins the ranking");
    }

    #[test]
    fn test_regeneration_layout() {
        let mut trainer = trainer(small_config()).unwrap();
        trainer.spawn_class().unwrap();
        trainer.run_round(stimulus).unwrap();

        let stable = trainer.stable();
        for new_blood in &stable[..2] {
            assert_eq!(new_blood.generation(), 0);
            assert!(new_blood.lineage().is_empty());
        }
        for child in &stable[2..] {
            assert_eq!(child.generation(), 1);
            assert_eq!(child.lineage().len(), 2);
        }
    }

    #[test]
    fn test_task_failure_aborts_round() {
        let mut trainer = trainer(small_config()).unwrap();
        trainer.spawn_class().unwrap();
        let before: Vec<Vec<f64>> = trainer.stable().iter().map(Network::weights).collect();

        let calls = AtomicUsize::new(0);
        let result = trainer.run_round(|network: &mut Network| {
            if calls.fetch_add(1, AtomicOrdering::SeqCst) == 3 {
                Err(format!("{} exploded", network.name()))
            } else {
                Ok(1.0)
            }
        });

        let err = result.unwrap_err();
        assert!(matches!(err, TrainError::Task { .. }));
        assert!(err.to_string().contains("exploded"));
        assert_eq!(trainer.round(), 0);
        assert!(trainer.best().is_none());
        let after: Vec<Vec<f64>> = trainer.stable().iter().map(Network::weights).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_set_stable_validates() {
        let mut trainer = trainer(small_config()).unwrap();
        let wrong_count = vec![Network::new(Topology::new(3, [2]))];
        assert!(matches!(
            trainer.set_stable(wrong_count),
            Err(TrainError::StableSize {
                expected: 6,
                found: 1
            })
        ));

        let wrong_shape: Vec<Network> = (0..6).map(|_| Network::new(Topology::new(3, [3]))).collect();
        assert!(matches!(
            trainer.set_stable(wrong_shape),
            Err(TrainError::Network(NetworkError::TopologyMismatch { .. }))
        ));

        let good: Vec<Network> = (0..6).map(|_| Network::new(Topology::new(3, [2]))).collect();
        trainer.set_stable(good).unwrap();
        assert_eq!(trainer.stable().len(), 6);
    }

    #[test]
    fn test_train_rejects_zero_rounds_and_autospawns() {
        let mut trainer = trainer(small_config()).unwrap();
        assert!(matches!(
            trainer.train(stimulus, 0),
            Err(TrainError::InvalidConfig(_))
        ));

        let summaries = trainer.train(stimulus, 3).unwrap();
        assert_eq!(summaries.len(), 3);
        assert_eq!(trainer.round(), 3);
        assert_eq!(
            summaries.iter().map(|s| s.round).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_cream_equal_to_class_size_is_all_new_blood() {
        let config = TrainerConfig {
            cream: 6,
            ..small_config()
        };
        let mut trainer = trainer(config).unwrap();
        trainer.train(stimulus, 1).unwrap();
        assert!(trainer.stable().iter().all(|n| n.generation() == 0));
    }

    fn names(networks: &[Network]) -> Vec<String> {
        networks.iter().map(|n| n.name().to_string()).collect()
    }

    fn constant(score: f64) -> impl Fn(&mut Network) -> Result<f64, Infallible> + Sync {
        move |_: &mut Network| -> Result<f64, Infallible> { Ok(score) }
    }

    #[test]
    fn test_carried_best_keeps_its_recorded_score() {
        let mut trainer = trainer(small_config()).unwrap();
        trainer.spawn_class().unwrap();
        let calls = AtomicUsize::new(0);

        let first = trainer
            .run_round(|_: &mut Network| -> Result<f64, Infallible> {
                calls.fetch_add(1, AtomicOrdering::SeqCst);
                Ok(100.0)
            })
            .unwrap();
        let champion = trainer.best().unwrap().network.name().to_string();

        let second = trainer
            .run_round(|_: &mut Network| -> Result<f64, Infallible> {
                calls.fetch_add(1, AtomicOrdering::SeqCst);
                Ok(1.0)
            })
            .unwrap();

        assert_eq!(calls.load(AtomicOrdering::SeqCst), 12, "the best is never re-run");
        assert_eq!(first.best_score, 100.0);
        assert_eq!(second.best_score, 100.0);
        assert_eq!(second.worst_score, 1.0);
        assert_eq!(second.ranked, 7);
        let best = trainer.best().unwrap();
        assert_eq!(best.network.name(), champion);
        assert_eq!(best.score, 100.0);
        assert_eq!(best.result, 100.0);
    }

    #[test]
    fn test_bred_children_descend_from_cream_only() {
        let mut trainer = trainer(small_config()).unwrap();
        trainer.spawn_class().unwrap();
        let before = names(trainer.stable());

        trainer
            .run_round(|network: &mut Network| -> Result<f64, Infallible> {
                let position = before
                    .iter()
                    .position(|name| name == network.name())
                    .unwrap_or(0);
                Ok(match position {
                    3 => 10.0,
                    5 => 9.0,
                    other => other as f64 * 0.1,
                })
            })
            .unwrap();

        let cream = vec![before[3].clone(), before[5].clone()];
        for child in &trainer.stable()[2..] {
            assert_eq!(child.lineage(), cream.as_slice());
        }
        for new_blood in &trainer.stable()[..2] {
            assert!(!before.contains(&new_blood.name().to_string()));
        }
        assert_eq!(trainer.best().unwrap().network.name(), before[3]);
    }

    #[test]
    fn test_ties_keep_stable_order_and_carried_best_goes_last() {
        let mut trainer = trainer(small_config()).unwrap();
        trainer.spawn_class().unwrap();
        let first_round = names(trainer.stable());

        let summary = trainer.run_round(constant(0.0)).unwrap();
        assert_eq!(trainer.best().unwrap().network.name(), first_round[0]);
        assert!(summary.best_name.starts_with(&first_round[0]));
        assert!(summary.worst_name.starts_with(&first_round[5]));
        for child in &trainer.stable()[2..] {
            assert_eq!(child.lineage(), &first_round[..2]);
        }

        let second_round = names(trainer.stable());
        let summary = trainer.run_round(constant(0.0)).unwrap();
        assert_eq!(summary.ranked, 7);
        assert_eq!(trainer.best().unwrap().network.name(), second_round[0]);
        assert!(summary.worst_name.starts_with(&first_round[0]));
        for child in &trainer.stable()[2..] {
            assert_eq!(child.lineage(), &second_round[..2]);
        }
    }

    #[test]
    fn test_nan_scores_rank_last_in_a_round() {
        let mut trainer = trainer(small_config()).unwrap();
        trainer.spawn_class().unwrap();
        let before = names(trainer.stable());

        let summary = trainer
            .run_round(|network: &mut Network| -> Result<f64, Infallible> {
                Ok(if network.name() == before[1] {
                    2.0
                } else if network.name() == before[4] {
                    1.0
                } else {
                    f64::NAN
                })
            })
            .unwrap();

        assert_eq!(summary.best_score, 2.0);
        assert!(summary.worst_score.is_nan());
        for child in &trainer.stable()[2..] {
            assert_eq!(child.lineage(), &[before[1].clone(), before[4].clone()]);
        }
    }

    #[test]
    fn test_breeding_failure_leaves_state_intact() {
        let mut trainer = trainer(small_config()).unwrap();
        trainer.spawn_class().unwrap();
        trainer.run_round(stimulus).unwrap();
        let stable_before: Vec<Vec<f64>> = trainer.stable().iter().map(Network::weights).collect();
        let best_before = trainer.best().unwrap().network.name().to_string();

        // Regeneration builds from the config, so an unusable topology fails
        // only after evaluation and ranking.
        trainer.config.topology = Topology::new(3, Vec::new());
        let err = trainer.run_round(stimulus).unwrap_err();

        assert!(matches!(
            err,
            TrainError::Network(NetworkError::InvalidTopology(_))
        ));
        let stable_after: Vec<Vec<f64>> = trainer.stable().iter().map(Network::weights).collect();
        assert_eq!(stable_after, stable_before);
        assert_eq!(trainer.best().unwrap().network.name(), best_before);
        assert_eq!(trainer.round(), 1);
    }
}
