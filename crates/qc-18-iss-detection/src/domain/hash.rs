//! State hash value object

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::fmt;

/// Width of a state hash (SHA-384)
pub const STATE_HASH_LEN: usize = 48;

/// Hash of the state produced by applying one round.
///
/// Only byte equality is meaningful. The `Ord` impl exists so diagnostics
/// can sort partitions deterministically.
#[serde_as]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateHash(#[serde_as(as = "Bytes")] pub [u8; STATE_HASH_LEN]);

impl StateHash {
    pub fn new(bytes: [u8; STATE_HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; STATE_HASH_LEN] {
        &self.0
    }

    /// First 8 bytes in hex, enough to tell partitions apart in logs
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl From<[u8; STATE_HASH_LEN]> for StateHash {
    fn from(bytes: [u8; STATE_HASH_LEN]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for StateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for StateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateHash({})", self.short())
    }
}

/// Hash identifying the current epoch. `None` before the first epoch change.
pub type EpochHash = Option<StateHash>;
