//! Saving and restoring networks.
//!
//! A network is stored as an opaque blob: the magic bytes `SNET`, a
//! little-endian `u32` format version, then a `bincode` encoded
//! [`NetworkBlob`]. Only what is needed to rebuild the network is kept:
//! layer sizes, weights in construction order and lineage metadata. Sensor
//! values and cached neuron state are not persisted.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::network::{Network, NetworkError, Topology};

const MAGIC: &[u8; 4] = b"SNET";

/// File extension used for saved networks.
pub const EXTENSION: &str = "network";

/// Current blob format version.
pub const FORMAT_VERSION: u32 = 1;

/// Serializable form of a [`Network`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkBlob {
    /// Layer sizes, sensors first.
    pub layer_sizes: Vec<usize>,
    /// Weights in construction order.
    pub weights: Vec<f64>,
    /// Generation counter.
    pub generation: u32,
    /// Display name.
    pub name: String,
    /// Parent names.
    pub lineage: Vec<String>,
}

impl From<&Network> for NetworkBlob {
    fn from(network: &Network) -> Self {
        Self {
            layer_sizes: network.topology().sizes().collect(),
            weights: network.weights(),
            generation: network.generation(),
            name: network.name().to_string(),
            lineage: network.lineage().to_vec(),
        }
    }
}

impl From<Network> for NetworkBlob {
    fn from(network: Network) -> Self {
        Self::from(&network)
    }
}

impl TryFrom<NetworkBlob> for Network {
    type Error = NetworkError;

    fn try_from(blob: NetworkBlob) -> Result<Self, Self::Error> {
        let mut network =
            Network::try_new(Topology::from_sizes(&blob.layer_sizes))?.with_name(blob.name);
        network.set_weights(&blob.weights)?;
        network.restore_lineage(blob.generation, blob.lineage);
        Ok(network)
    }
}

/// Errors that can occur while saving or loading networks.
#[derive(Debug)]
pub enum PersistError {
    /// Filesystem failure.
    Io(std::io::Error),
    /// Blob body could not be encoded or decoded.
    Encode(bincode::Error),
    /// Not a network blob.
    InvalidFormat(String),
    /// Blob written by an incompatible format version.
    VersionMismatch {
        /// Version this build reads.
        expected: u32,
        /// Version found in the blob.
        found: u32,
    },
    /// The blob decoded but does not describe a valid network.
    Network(NetworkError),
}

impl std::fmt::Display for PersistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Encode(e) => write!(f, "encoding error: {}", e),
            Self::InvalidFormat(msg) => write!(f, "invalid format: {}", msg),
            Self::VersionMismatch { expected, found } => {
                write!(f, "version mismatch: expected {}, found {}", expected, found)
            }
            Self::Network(e) => write!(f, "invalid network: {}", e),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Encode(e) => Some(e),
            Self::Network(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for PersistError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<bincode::Error> for PersistError {
    fn from(e: bincode::Error) -> Self {
        Self::Encode(e)
    }
}

impl From<NetworkError> for PersistError {
    fn from(e: NetworkError) -> Self {
        Self::Network(e)
    }
}

/// Encode a network into a blob.
///
/// # Errors
///
/// Returns [`PersistError::Encode`] if encoding fails.
pub fn to_bytes(network: &Network) -> Result<Vec<u8>, PersistError> {
    let body = bincode::serialize(&NetworkBlob::from(network))?;
    let mut bytes = Vec::with_capacity(MAGIC.len() + 4 + body.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&body);
    Ok(bytes)
}

/// Decode a network from a blob produced by [`to_bytes`].
///
/// # Errors
///
/// Fails on a wrong magic, an unknown format version, an undecodable body,
/// or a body that does not describe a valid network.
pub fn from_bytes(bytes: &[u8]) -> Result<Network, PersistError> {
    let header = MAGIC.len() + 4;
    if bytes.len() < header {
        return Err(PersistError::InvalidFormat(format!(
            "blob is {} bytes, shorter than its header",
            bytes.len()
        )));
    }
    if &bytes[..MAGIC.len()] != MAGIC {
        return Err(PersistError::InvalidFormat("invalid magic bytes".to_string()));
    }

    let mut version = [0u8; 4];
    version.copy_from_slice(&bytes[MAGIC.len()..header]);
    let found = u32::from_le_bytes(version);
    if found != FORMAT_VERSION {
        return Err(PersistError::VersionMismatch {
            expected: FORMAT_VERSION,
            found,
        });
    }

    let blob: NetworkBlob = bincode::deserialize(&bytes[header..])?;
    Ok(Network::try_from(blob)?)
}

/// File name a network is saved under, derived from its display name.
#[must_use]
pub fn file_name(network: &Network) -> String {
    let stem: String = network
        .name()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    let stem = if stem.is_empty() { "network" } else { stem.as_str() };
    format!("{}-gen{}.{}", stem, network.generation(), EXTENSION)
}

/// Save a network into `dir`, creating it if needed. Returns the file path.
///
/// # Errors
///
/// Returns [`PersistError::Io`] on filesystem failure.
pub fn save(network: &Network, dir: impl AsRef<Path>) -> Result<PathBuf, PersistError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join(file_name(network));
    save_to(network, &path)?;
    Ok(path)
}

/// Save a network to an exact file path. The parent directory must exist.
///
/// # Errors
///
/// Returns [`PersistError::Io`] on filesystem failure.
pub fn save_to(network: &Network, path: impl AsRef<Path>) -> Result<(), PersistError> {
    let path = path.as_ref();
    fs::write(path, to_bytes(network)?)?;
    log::debug!("Saved {} to {}", network.display_name(), path.display());
    Ok(())
}

/// Load a network from a file written by [`save`].
///
/// # Errors
///
/// See [`from_bytes`]; filesystem failures are returned as [`PersistError::Io`].
pub fn load(path: impl AsRef<Path>) -> Result<Network, PersistError> {
    let bytes = fs::read(path)?;
    from_bytes(&bytes)
}

/// Save every network of a stable into `dir`. File names are prefixed with
/// the network's position so that [`load_stable`] restores the same order.
///
/// # Errors
///
/// Returns [`PersistError::Io`] on filesystem failure.
pub fn save_stable(networks: &[Network], dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, PersistError> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let mut paths = Vec::with_capacity(networks.len());
    for (index, network) in networks.iter().enumerate() {
        let path = dir.join(format!("{:04}-{}", index, file_name(network)));
        save_to(network, &path)?;
        paths.push(path);
    }
    log::info!("Saved {} networks to {}", networks.len(), dir.display());
    Ok(paths)
}

/// Load every `*.network` file in `dir`, ordered by file name.
///
/// # Errors
///
/// Fails on the first file that cannot be read or decoded.
pub fn load_stable(dir: impl AsRef<Path>) -> Result<Vec<Network>, PersistError> {
    let dir = dir.as_ref();
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == EXTENSION))
        .collect();
    paths.sort();

    let networks = paths.iter().map(load).collect::<Result<Vec<_>, _>>()?;
    log::info!("Loaded {} networks from {}", networks.len(), dir.display());
    Ok(networks)
}
