//! Graph primitives: sensors, neurons and the weighted connections between them.
//!
//! Nodes and connections live in `SlotMap` arenas owned by a
//! [`Network`](crate::Network). A connection refers to its source by key only,
//! so there is no shared ownership between nodes.
//!
//! Every node carries a change counter (`last_changed`). Sensors bump it on
//! every write; neurons bump it whenever they recompute. A neuron remembers
//! the counters it last saw on its inputs and only recomputes when that
//! snapshot no longer matches.

use rand::Rng;
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use crate::activation::Activation;
use crate::util::clamp;

new_key_type! {
    /// Arena key of a node within one network.
    pub struct NodeId;

    /// Arena key of a connection within one network.
    pub struct ConnectionId;
}

/// Identity of a connection: `(source identity, target identity)`.
///
/// Unique within a network and stable across networks built from the same
/// [`Topology`](crate::Topology), which makes it the join key for crossover.
pub type ConnectionIdentity = (u64, u64);

/// Probability of a weight being perturbed during an ordinary mutation pass.
pub const DEFAULT_MUTATION_RATE: f64 = 0.015;

/// Lower bound of every connection weight.
pub const MIN_WEIGHT: f64 = -1.0;
/// Upper bound of every connection weight.
pub const MAX_WEIGHT: f64 = 1.0;

/// Errors raised by misuse of graph primitives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// Tried to wire an input into a sensor.
    SensorInput {
        /// Identity of the sensor.
        sensor: u64,
    },
    /// Tried to write a value into a neuron.
    NotASensor {
        /// Identity of the node.
        node: u64,
    },
}

impl std::fmt::Display for GraphError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GraphError::SensorInput { sensor } => {
                write!(f, "sensor {} cannot have inputs", sensor)
            }
            GraphError::NotASensor { node } => {
                write!(f, "node {} is a neuron; only sensors accept values", node)
            }
        }
    }
}

impl std::error::Error for GraphError {}

/// The role of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// External input channel. Its value is set from outside.
    Sensor,
    /// Computed unit.
    Neuron {
        /// Function applied to the weighted input sum.
        activation: Activation,
        /// Input change counters observed at the last recompute, `None` if the
        /// neuron has not been computed since construction or a weight change.
        seen: Option<Vec<u64>>,
    },
}

/// A sensor or neuron.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    identity: u64,
    layer: usize,
    kind: NodeKind,
    value: f64,
    last_changed: u64,
    inputs: Vec<ConnectionId>,
}

impl Node {
    /// Create a sensor holding 0.
    #[must_use]
    pub fn sensor(identity: u64, layer: usize) -> Self {
        Self {
            identity,
            layer,
            kind: NodeKind::Sensor,
            value: 0.0,
            last_changed: 0,
            inputs: Vec::new(),
        }
    }

    /// Create a neuron that has never been computed.
    #[must_use]
    pub fn neuron(identity: u64, layer: usize, activation: Activation) -> Self {
        Self {
            identity,
            layer,
            kind: NodeKind::Neuron {
                activation,
                seen: None,
            },
            value: 0.0,
            last_changed: 0,
            inputs: Vec::new(),
        }
    }

    /// Identity of this node, unique within its network.
    #[must_use]
    pub const fn identity(&self) -> u64 {
        self.identity
    }

    /// Layer index, 0 for sensors.
    #[must_use]
    pub const fn layer(&self) -> usize {
        self.layer
    }

    /// Role of this node.
    #[must_use]
    pub const fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Whether this node is a sensor.
    #[must_use]
    pub const fn is_sensor(&self) -> bool {
        matches!(self.kind, NodeKind::Sensor)
    }

    /// The stored value.
    ///
    /// For a neuron this is the cached result of its last recompute; use
    /// [`Network::node_value`](crate::Network::node_value) for an up-to-date read.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    /// Change counter.
    #[must_use]
    pub const fn last_changed(&self) -> u64 {
        self.last_changed
    }

    /// Incoming connections, in attachment order.
    #[must_use]
    pub fn inputs(&self) -> &[ConnectionId] {
        &self.inputs
    }

    /// Write a sensor value.
    ///
    /// The change counter is bumped on every write, including writes of an
    /// unchanged value.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::NotASensor`] for neurons.
    pub fn set(&mut self, value: f64) -> Result<(), GraphError> {
        if !self.is_sensor() {
            return Err(GraphError::NotASensor {
                node: self.identity,
            });
        }
        self.write(value);
        Ok(())
    }

    /// Store a value and bump the change counter without checking the kind.
    /// Callers must only use it on sensors.
    pub(crate) fn write(&mut self, value: f64) {
        self.value = value;
        self.last_changed += 1;
    }

    /// Attach an incoming connection. Attaching the same connection twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`GraphError::SensorInput`] for sensors.
    pub fn attach_input(&mut self, connection: ConnectionId) -> Result<(), GraphError> {
        if self.is_sensor() {
            return Err(GraphError::SensorInput {
                sensor: self.identity,
            });
        }
        if !self.inputs.contains(&connection) {
            self.inputs.push(connection);
        }
        Ok(())
    }

    /// Whether a neuron must recompute given its inputs' current change counters.
    /// Sensors are never stale.
    pub(crate) fn is_stale<I: IntoIterator<Item = u64>>(&self, versions: I) -> bool {
        match &self.kind {
            NodeKind::Sensor => false,
            NodeKind::Neuron { seen: None, .. } => true,
            NodeKind::Neuron {
                seen: Some(seen), ..
            } => !seen.iter().copied().eq(versions),
        }
    }

    /// Store a recomputed neuron value from its raw input sum.
    pub(crate) fn store(&mut self, sum: f64, versions: Vec<u64>) {
        if let NodeKind::Neuron { activation, seen } = &mut self.kind {
            self.value = activation.apply(sum);
            *seen = Some(versions);
            self.last_changed += 1;
        }
    }

    /// Forget the input snapshot so the next read recomputes.
    pub(crate) fn invalidate(&mut self) {
        if let NodeKind::Neuron { seen, .. } = &mut self.kind {
            *seen = None;
        }
    }

    /// Back to the just-constructed state: value 0, counter 0, no snapshot.
    pub(crate) fn clear_state(&mut self) {
        self.value = 0.0;
        self.last_changed = 0;
        self.invalidate();
    }
}

/// A weighted edge from a sensor or neuron into a neuron.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    identity: ConnectionIdentity,
    source: NodeId,
    target: NodeId,
    weight: f64,
}

impl Connection {
    /// Create a connection with weight 0.
    #[must_use]
    pub fn new(identity: ConnectionIdentity, source: NodeId, target: NodeId) -> Self {
        Self {
            identity,
            source,
            target,
            weight: 0.0,
        }
    }

    /// `(source identity, target identity)`.
    #[must_use]
    pub const fn identity(&self) -> ConnectionIdentity {
        self.identity
    }

    /// Upstream node.
    #[must_use]
    pub const fn source(&self) -> NodeId {
        self.source
    }

    /// Downstream neuron.
    #[must_use]
    pub const fn target(&self) -> NodeId {
        self.target
    }

    /// Current weight, always within `[-1, 1]`.
    #[must_use]
    pub const fn weight(&self) -> f64 {
        self.weight
    }

    /// Set the weight, clamped to `[-1, 1]`.
    pub fn set_weight(&mut self, weight: f64) {
        self.weight = clamp(weight, MIN_WEIGHT, MAX_WEIGHT);
    }

    /// Value carried to the target given the source's current value.
    #[inline]
    #[must_use]
    pub fn transmit(&self, source_value: f64) -> f64 {
        source_value * self.weight
    }

    /// With probability `rate`, add a uniform sample from `[-1, 1]` to the
    /// weight and clamp the result. Returns whether the weight was touched.
    ///
    /// Draws exactly one number when the mutation does not fire and two
    /// when it does, so a seeded generator replays identically.
    pub fn mutate<R: Rng>(&mut self, rng: &mut R, rate: f64) -> bool {
        if rng.random::<f64>() < rate {
            self.set_weight(self.weight + rng.random_range(-1.0..=1.0));
            true
        } else {
            false
        }
    }
}
