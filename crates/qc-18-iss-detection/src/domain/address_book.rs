//! Node identity and voting weight
//!
//! The address book snapshot is supplied from outside (stake comes from the
//! ledger) and is immutable for the lifetime of the rounds that use it.

use super::Weight;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Node identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node{}", self.0)
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Software version carried by every state signature.
///
/// Reports from a different version are cross-version noise and are dropped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SoftwareVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SoftwareVersion {
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }
}

impl fmt::Display for SoftwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Snapshot of `node_id -> weight` with a cached total.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AddressBook {
    weights: BTreeMap<NodeId, Weight>,
    total_weight: Weight,
}

impl AddressBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a node
    pub fn add_node(&mut self, node_id: NodeId, weight: Weight) {
        if let Some(previous) = self.weights.insert(node_id, weight) {
            self.total_weight = self.total_weight.saturating_sub(previous);
        }
        self.total_weight = self.total_weight.saturating_add(weight);
    }

    /// Builder-style variant of [`AddressBook::add_node`]
    pub fn with_node(mut self, node_id: NodeId, weight: Weight) -> Self {
        self.add_node(node_id, weight);
        self
    }

    /// Weight of a node, `None` if the node is unknown
    pub fn weight(&self, node_id: &NodeId) -> Option<Weight> {
        self.weights.get(node_id).copied()
    }

    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.weights.contains_key(node_id)
    }

    pub fn total_weight(&self) -> Weight {
        self.total_weight
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Nodes in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Weight)> + '_ {
        self.weights.iter().map(|(id, weight)| (*id, *weight))
    }
}

impl FromIterator<(NodeId, Weight)> for AddressBook {
    fn from_iter<I: IntoIterator<Item = (NodeId, Weight)>>(iter: I) -> Self {
        let mut book = AddressBook::new();
        for (node_id, weight) in iter {
            book.add_node(node_id, weight);
        }
        book
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_weight_tracks_replacements() {
        let mut book = AddressBook::new();
        book.add_node(NodeId(1), 40);
        book.add_node(NodeId(2), 60);
        assert_eq!(book.total_weight(), 100);

        book.add_node(NodeId(1), 10);
        assert_eq!(book.total_weight(), 70);
        assert_eq!(book.weight(&NodeId(1)), Some(10));
        assert_eq!(book.len(), 2);
    }

    #[test]
    fn test_unknown_node_has_no_weight() {
        let book: AddressBook = [(NodeId(1), 5)].into_iter().collect();
        assert_eq!(book.weight(&NodeId(9)), None);
        assert!(!book.contains(&NodeId(9)));
    }

    #[test]
    fn test_software_version_display() {
        assert_eq!(SoftwareVersion::new(0, 42, 1).to_string(), "0.42.1");
    }
}
