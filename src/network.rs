//! Layered feed-forward networks with memoized evaluation.
//!
//! A [`Network`] is built from a [`Topology`]: layer 0 holds one sensor per
//! input, every further layer holds neurons, and each node of a layer feeds
//! every node of the next. Nodes and connections are stored in `SlotMap`
//! arenas; connections are additionally indexed by their
//! [`ConnectionIdentity`] so that networks sharing a topology line up
//! gene-for-gene during crossover.
//!
//! Reads are lazy. A neuron recomputes only when one of its inputs changed
//! since its last computation, so repeatedly reading the outputs between
//! sensor writes costs a version comparison per edge and nothing more.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use symbios_genetics::Genotype;

use crate::activation::Activation;
use crate::graph::{
    Connection, ConnectionId, ConnectionIdentity, GraphError, Node, NodeId, DEFAULT_MUTATION_RATE,
};
use crate::persist::NetworkBlob;
use crate::util::Identifier;

/// Layer sizes of a network: the input count followed by one or more
/// neuron layer sizes, the last of which is the output layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topology {
    /// Number of sensors.
    pub inputs: usize,
    /// Sizes of the hidden and output layers, in order.
    pub layers: Vec<usize>,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            inputs: 2,
            layers: vec![1],
        }
    }
}

impl Topology {
    /// Create a topology from an input count and neuron layer sizes.
    #[must_use]
    pub fn new(inputs: usize, layers: impl Into<Vec<usize>>) -> Self {
        Self {
            inputs,
            layers: layers.into(),
        }
    }

    /// Rebuild a topology from a flat list of layer sizes, sensors first.
    #[must_use]
    pub fn from_sizes(sizes: &[usize]) -> Self {
        match sizes.split_first() {
            Some((&inputs, layers)) => Self::new(inputs, layers),
            None => Self::new(0, Vec::new()),
        }
    }

    /// All layer sizes, sensors first.
    pub fn sizes(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::once(self.inputs).chain(self.layers.iter().copied())
    }

    /// Number of output neurons.
    #[must_use]
    pub fn outputs(&self) -> usize {
        self.layers.last().copied().unwrap_or(0)
    }

    /// Total number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.sizes().sum()
    }

    /// Number of connections under full connectivity between consecutive layers.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        let sizes: Vec<usize> = self.sizes().collect();
        sizes.windows(2).map(|w| w[0] * w[1]).sum()
    }

    /// Check that the topology describes a usable network.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InvalidTopology`] when there are no inputs, no
    /// neuron layers, or an empty layer.
    pub fn validate(&self) -> Result<(), NetworkError> {
        if self.inputs == 0 {
            return Err(NetworkError::InvalidTopology(
                "a network needs at least one input".to_string(),
            ));
        }
        if self.layers.is_empty() {
            return Err(NetworkError::InvalidTopology(
                "a network needs at least one neuron layer".to_string(),
            ));
        }
        if let Some(index) = self.layers.iter().position(|&size| size == 0) {
            return Err(NetworkError::InvalidTopology(format!(
                "neuron layer {} is empty",
                index + 1
            )));
        }
        Ok(())
    }
}

/// Errors raised by network construction, input handling and crossover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    /// The topology cannot produce a network.
    InvalidTopology(String),
    /// Two networks that must share a topology do not.
    TopologyMismatch {
        /// Topology of the network being written.
        expected: Topology,
        /// Topology of the offending network.
        found: Topology,
    },
    /// Crossover was requested without any parent.
    NoParents,
    /// Sensor index out of range.
    InputIndex {
        /// Requested index.
        index: usize,
        /// Number of sensors.
        len: usize,
    },
    /// Wrong number of input values.
    InputLength {
        /// Number of sensors.
        expected: usize,
        /// Number of values supplied.
        found: usize,
    },
    /// No connection with this identity exists.
    UnknownConnection(ConnectionIdentity),
    /// Wrong number of weights supplied for the topology.
    WeightCount {
        /// Connections in the topology.
        expected: usize,
        /// Weights supplied.
        found: usize,
    },
    /// A graph primitive was misused.
    Graph(GraphError),
}

impl std::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NetworkError::InvalidTopology(reason) => write!(f, "invalid topology: {}", reason),
            NetworkError::TopologyMismatch { expected, found } => write!(
                f,
                "topology mismatch: expected layers {:?}, found {:?}",
                expected.sizes().collect::<Vec<_>>(),
                found.sizes().collect::<Vec<_>>()
            ),
            NetworkError::NoParents => write!(f, "crossover needs at least one parent"),
            NetworkError::InputIndex { index, len } => {
                write!(f, "input index {} out of bounds for {} sensors", index, len)
            }
            NetworkError::InputLength { expected, found } => {
                write!(f, "expected {} input values, got {}", expected, found)
            }
            NetworkError::UnknownConnection((source, target)) => {
                write!(f, "no connection from node {} to node {}", source, target)
            }
            NetworkError::WeightCount { expected, found } => {
                write!(f, "expected {} weights, got {}", expected, found)
            }
            NetworkError::Graph(err) => write!(f, "graph error: {}", err),
        }
    }
}

impl std::error::Error for NetworkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NetworkError::Graph(err) => Some(err),
            _ => None,
        }
    }
}

impl From<GraphError> for NetworkError {
    fn from(err: GraphError) -> Self {
        NetworkError::Graph(err)
    }
}

/// A fully connected, layered feed-forward network.
///
/// Serializes through [`NetworkBlob`], which keeps only the topology, the
/// weights and the lineage metadata.
#[derive(Debug, Serialize, Deserialize)]
#[serde(into = "NetworkBlob", try_from = "NetworkBlob")]
pub struct Network {
    nodes: SlotMap<NodeId, Node>,
    connections: SlotMap<ConnectionId, Connection>,
    layers: Vec<Vec<NodeId>>,
    by_identity: BTreeMap<ConnectionIdentity, ConnectionId>,
    topology: Topology,
    name: String,
    lineage: Vec<String>,
    generation: u32,
}

impl Network {
    /// Build a network with all weights at 0.
    ///
    /// # Panics
    ///
    /// Panics if the topology is invalid. Use [`try_new`](Self::try_new) for
    /// non-panicking construction.
    #[must_use]
    pub fn new(topology: Topology) -> Self {
        Self::try_new(topology).expect("invalid topology; use try_new() to handle the error")
    }

    /// Build a network with all weights at 0.
    ///
    /// Node identities are issued from a fresh [`Identifier`] in layer order,
    /// so two networks with the same topology have the same identity set.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InvalidTopology`] if the topology fails
    /// [`Topology::validate`].
    pub fn try_new(topology: Topology) -> Result<Self, NetworkError> {
        topology.validate()?;

        let mut identifier = Identifier::new();
        let mut nodes: SlotMap<NodeId, Node> = SlotMap::with_key();
        let mut connections: SlotMap<ConnectionId, Connection> = SlotMap::with_key();
        let mut by_identity = BTreeMap::new();
        let mut layers: Vec<Vec<NodeId>> = Vec::with_capacity(topology.layers.len() + 1);

        let sensors = (0..topology.inputs)
            .zip(&mut identifier)
            .map(|(_, identity)| nodes.insert(Node::sensor(identity, 0)))
            .collect();
        layers.push(sensors);

        for (index, &size) in topology.layers.iter().enumerate() {
            let layer = index + 1;
            let mut current = Vec::with_capacity(size);
            for identity in (&mut identifier).take(size) {
                let target = nodes.insert(Node::neuron(identity, layer, Activation::LogSigmoid));
                for &source in &layers[layer - 1] {
                    let key = (nodes[source].identity(), identity);
                    let conn_id = connections.insert(Connection::new(key, source, target));
                    nodes[target].attach_input(conn_id)?;
                    by_identity.insert(key, conn_id);
                }
                current.push(target);
            }
            layers.push(current);
        }

        Ok(Self {
            nodes,
            connections,
            layers,
            by_identity,
            topology,
            name: String::new(),
            lineage: Vec::new(),
            generation: 0,
        })
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Topology this network was built from.
    #[must_use]
    pub const fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Whether `other` was built from the same topology, and therefore has
    /// the same connection identity set.
    #[must_use]
    pub fn same_topology(&self, other: &Network) -> bool {
        self.topology == other.topology
            && self.by_identity.keys().eq(other.by_identity.keys())
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Replace the display name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Names of the parents this network was crossed from.
    #[must_use]
    pub fn lineage(&self) -> &[String] {
        &self.lineage
    }

    /// Number of crossovers separating this network from a freshly seeded one.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }

    pub(crate) fn restore_lineage(&mut self, generation: u32, lineage: Vec<String>) {
        self.generation = generation;
        self.lineage = lineage;
    }

    /// Name and generation, e.g. `"net-0007 (Gen. 3)"`.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{} (Gen. {})", self.name, self.generation)
    }

    /// Node ids by layer, sensors first.
    #[must_use]
    pub fn layers(&self) -> &[Vec<NodeId>] {
        &self.layers
    }

    /// Sensor ids.
    #[must_use]
    pub fn inputs(&self) -> &[NodeId] {
        &self.layers[0]
    }

    /// Output neuron ids.
    #[must_use]
    pub fn outputs(&self) -> &[NodeId] {
        &self.layers[self.layers.len() - 1]
    }

    /// Read-only view of a node.
    #[must_use]
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// All connections, in construction order.
    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    /// Identity set of this network's connections, in ascending order.
    pub fn connection_identities(&self) -> impl Iterator<Item = ConnectionIdentity> + '_ {
        self.by_identity.keys().copied()
    }

    /// Number of connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Connection with the given identity.
    #[must_use]
    pub fn connection(&self, identity: ConnectionIdentity) -> Option<&Connection> {
        self.by_identity
            .get(&identity)
            .map(|&conn_id| &self.connections[conn_id])
    }

    /// Weight of the connection with the given identity.
    #[must_use]
    pub fn weight(&self, identity: ConnectionIdentity) -> Option<f64> {
        self.connection(identity).map(Connection::weight)
    }

    /// All weights in construction order.
    #[must_use]
    pub fn weights(&self) -> Vec<f64> {
        self.connections.values().map(Connection::weight).collect()
    }

    /// Set one weight, clamped to `[-1, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::UnknownConnection`] if no connection has this identity.
    pub fn set_weight(
        &mut self,
        identity: ConnectionIdentity,
        weight: f64,
    ) -> Result<(), NetworkError> {
        let conn_id = *self
            .by_identity
            .get(&identity)
            .ok_or(NetworkError::UnknownConnection(identity))?;
        self.connections[conn_id].set_weight(weight);
        self.invalidate();
        Ok(())
    }

    /// Set all weights in construction order, as returned by [`weights`](Self::weights).
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::WeightCount`] if the count does not match; no
    /// weight is changed in that case.
    pub fn set_weights(&mut self, weights: &[f64]) -> Result<(), NetworkError> {
        if weights.len() != self.connections.len() {
            return Err(NetworkError::WeightCount {
                expected: self.connections.len(),
                found: weights.len(),
            });
        }
        for (conn, &weight) in self.connections.values_mut().zip(weights) {
            conn.set_weight(weight);
        }
        self.invalidate();
        Ok(())
    }

    /// Re-roll every weight (a mutation pass at rate 1).
    ///
    /// Used when seeding a population so that no network starts at all-zero
    /// weights.
    pub fn initialise<R: Rng>(&mut self, rng: &mut R) {
        self.mutate(rng, 1.0);
    }

    /// Run one mutation pass: each connection independently mutates with
    /// probability `rate`. Returns the number of weights touched.
    pub fn mutate<R: Rng>(&mut self, rng: &mut R, rate: f64) -> usize {
        let mutated = self
            .connections
            .values_mut()
            .map(|conn| conn.mutate(rng, rate))
            .filter(|&touched| touched)
            .count();
        self.invalidate();
        mutated
    }

    /// Uniform crossover from one or more parents, followed by a mutation
    /// pass at [`DEFAULT_MUTATION_RATE`].
    ///
    /// # Errors
    ///
    /// See [`cross_with_rate`](Self::cross_with_rate).
    pub fn cross<R: Rng>(&mut self, rng: &mut R, parents: &[&Network]) -> Result<(), NetworkError> {
        self.cross_with_rate(rng, parents, DEFAULT_MUTATION_RATE)
    }

    /// Uniform crossover from one or more parents.
    ///
    /// For every connection, one parent is picked uniformly at random and
    /// its weight copied; the copied weight then gets one mutation pass at
    /// `mutation_rate`. The generation becomes one more than the oldest
    /// parent's and the lineage records the parents' names.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::NoParents`] for an empty parent list and
    /// [`NetworkError::TopologyMismatch`] if any parent's connection identity
    /// set differs from this network's. Nothing is modified on error.
    pub fn cross_with_rate<R: Rng>(
        &mut self,
        rng: &mut R,
        parents: &[&Network],
        mutation_rate: f64,
    ) -> Result<(), NetworkError> {
        if parents.is_empty() {
            return Err(NetworkError::NoParents);
        }
        if let Some(stranger) = parents.iter().find(|p| !self.same_topology(p)) {
            return Err(NetworkError::TopologyMismatch {
                expected: self.topology.clone(),
                found: stranger.topology.clone(),
            });
        }

        for conn in self.connections.values_mut() {
            let parent = parents[rng.random_range(0..parents.len())];
            if let Some(weight) = parent.weight(conn.identity()) {
                conn.set_weight(weight);
            }
            conn.mutate(rng, mutation_rate);
        }

        self.generation = parents.iter().map(|p| p.generation).max().unwrap_or(0) + 1;
        self.lineage = parents.iter().map(|p| p.name.clone()).collect();
        self.invalidate();
        Ok(())
    }

    /// Set every sensor to 0. The sensors' change counters still advance, so
    /// the next read recomputes the whole network.
    pub fn reset(&mut self) {
        for &id in &self.layers[0] {
            self.nodes[id].write(0.0);
        }
    }

    /// Write one sensor.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InputIndex`] if `index` is out of range.
    pub fn set_input(&mut self, index: usize, value: f64) -> Result<(), NetworkError> {
        let id = *self.layers[0].get(index).ok_or(NetworkError::InputIndex {
            index,
            len: self.layers[0].len(),
        })?;
        self.nodes[id].set(value)?;
        Ok(())
    }

    /// Write every sensor, in order.
    ///
    /// # Errors
    ///
    /// Returns [`NetworkError::InputLength`] if `values` does not have one
    /// entry per sensor; no sensor is written in that case.
    pub fn set_inputs(&mut self, values: &[f64]) -> Result<(), NetworkError> {
        if values.len() != self.layers[0].len() {
            return Err(NetworkError::InputLength {
                expected: self.layers[0].len(),
                found: values.len(),
            });
        }
        for (index, &value) in values.iter().enumerate() {
            self.set_input(index, value)?;
        }
        Ok(())
    }

    /// Current sensor values.
    #[must_use]
    pub fn input(&self) -> Vec<f64> {
        self.layers[0].iter().map(|&id| self.nodes[id].value()).collect()
    }

    /// Current output values, recomputing only what changed since the last read.
    pub fn output(&mut self) -> Vec<f64> {
        let last = self.layers.len() - 1;
        self.settle(last);
        self.layers[last]
            .iter()
            .map(|&id| self.nodes[id].value())
            .collect()
    }

    /// Up-to-date value of any node. Only the node's ancestors are refreshed.
    pub fn node_value(&mut self, id: NodeId) -> Option<f64> {
        let layer = self.nodes.get(id)?.layer();
        if layer > 0 {
            self.settle(layer - 1);
            self.refresh(id);
        }
        Some(self.nodes[id].value())
    }

    /// Up-to-date value carried by a connection: source value times weight.
    pub fn connection_value(&mut self, identity: ConnectionIdentity) -> Option<f64> {
        let conn_id = *self.by_identity.get(&identity)?;
        let source = self.connections[conn_id].source();
        let value = self.node_value(source)?;
        Some(self.connections[conn_id].transmit(value))
    }

    /// Refresh every neuron in layers `1..=through`, in layer order.
    fn settle(&mut self, through: usize) {
        for layer in 1..=through.min(self.layers.len() - 1) {
            for index in 0..self.layers[layer].len() {
                let id = self.layers[layer][index];
                self.refresh(id);
            }
        }
    }

    /// Recompute one neuron if any input changed since its last computation.
    /// Its inputs must already be up to date.
    fn refresh(&mut self, id: NodeId) {
        let node = &self.nodes[id];
        let versions = node
            .inputs()
            .iter()
            .map(|&c| self.nodes[self.connections[c].source()].last_changed());
        if !node.is_stale(versions) {
            return;
        }

        let mut seen = Vec::with_capacity(node.inputs().len());
        let mut sum = 0.0;
        for &conn_id in node.inputs() {
            let conn = &self.connections[conn_id];
            let source = &self.nodes[conn.source()];
            seen.push(source.last_changed());
            sum += conn.transmit(source.value());
        }
        self.nodes[id].store(sum, seen);
    }

    /// Drop every neuron's input snapshot after a weight change.
    fn invalidate(&mut self) {
        for node in self.nodes.values_mut() {
            node.invalidate();
        }
    }
}

impl Clone for Network {
    /// Same topology, weights and lineage metadata; node state starts fresh
    /// (sensors at 0, no cached neuron values).
    fn clone(&self) -> Self {
        let mut nodes = self.nodes.clone();
        for node in nodes.values_mut() {
            node.clear_state();
        }
        Self {
            nodes,
            connections: self.connections.clone(),
            layers: self.layers.clone(),
            by_identity: self.by_identity.clone(),
            topology: self.topology.clone(),
            name: self.name.clone(),
            lineage: self.lineage.clone(),
            generation: self.generation,
        }
    }
}

impl Genotype for Network {
    fn mutate<R: Rng>(&mut self, rng: &mut R, rate: f32) {
        Network::mutate(self, rng, f64::from(rate));
    }

    fn crossover<R: Rng>(&self, other: &Self, rng: &mut R) -> Self {
        let mut child = self.clone();
        if let Err(err) = child.cross(rng, &[self, other]) {
            log::warn!(
                "crossover of {} with {} failed ({}); keeping a clone",
                self.display_name(),
                other.display_name(),
                err
            );
        }
        child
    }
}
