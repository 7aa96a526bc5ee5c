//! Partition finder
//!
//! Groups weighted hash reports for one round by hash value. Each group
//! (partition) caches its cumulative weight so quorum checks are O(1) per
//! report.

use super::{NodeId, StateHash, Weight};
use std::collections::{BTreeSet, HashMap};
use std::fmt::{self, Write};

/// Nodes that reported the same hash in one round
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    pub hash: StateHash,
    pub weight: Weight,
    pub members: BTreeSet<NodeId>,
}

impl Partition {
    fn new(hash: StateHash) -> Self {
        Self {
            hash,
            weight: 0,
            members: BTreeSet::new(),
        }
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

/// Aggregates `(node, weight, hash)` reports into partitions.
#[derive(Clone, Debug)]
pub struct PartitionFinder {
    total_weight: Weight,
    partitions: HashMap<StateHash, Partition>,
    /// Last hash and weight seen from each node
    reports: HashMap<NodeId, (StateHash, Weight)>,
    reported_weight: Weight,
}

impl PartitionFinder {
    pub fn new(total_weight: Weight) -> Self {
        Self {
            total_weight,
            partitions: HashMap::new(),
            reports: HashMap::new(),
            reported_weight: 0,
        }
    }

    /// Record a report. Returns `false` if nothing changed.
    ///
    /// A repeated `(node_id, hash)` pair is ignored. A different hash from a
    /// node that already reported moves its weight to the new partition.
    pub fn add(&mut self, node_id: NodeId, weight: Weight, hash: StateHash) -> bool {
        if let Some((previous_hash, previous_weight)) = self.reports.get(&node_id).copied() {
            if previous_hash == hash {
                return false;
            }
            self.remove_member(node_id, previous_hash, previous_weight);
        }

        let partition = self
            .partitions
            .entry(hash)
            .or_insert_with(|| Partition::new(hash));
        partition.weight = partition.weight.saturating_add(weight);
        partition.members.insert(node_id);

        self.reports.insert(node_id, (hash, weight));
        self.reported_weight = self.reported_weight.saturating_add(weight);
        true
    }

    fn remove_member(&mut self, node_id: NodeId, hash: StateHash, weight: Weight) {
        if let Some(partition) = self.partitions.get_mut(&hash) {
            partition.weight = partition.weight.saturating_sub(weight);
            partition.members.remove(&node_id);
            if partition.members.is_empty() {
                self.partitions.remove(&hash);
            }
        }
        self.reports.remove(&node_id);
        self.reported_weight = self.reported_weight.saturating_sub(weight);
    }

    /// Partitions sorted by weight descending, ties by ascending hash bytes
    pub fn partitions_by_weight_desc(&self) -> Vec<&Partition> {
        let mut partitions: Vec<&Partition> = self.partitions.values().collect();
        partitions.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.hash.cmp(&b.hash)));
        partitions
    }

    /// The heaviest partition (ties resolved like the diagnostic ordering)
    pub fn largest_partition(&self) -> Option<&Partition> {
        self.partitions
            .values()
            .min_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.hash.cmp(&b.hash)))
    }

    pub fn partition(&self, hash: &StateHash) -> Option<&Partition> {
        self.partitions.get(hash)
    }

    /// Hash reported by a node, if any
    pub fn hash_of(&self, node_id: &NodeId) -> Option<StateHash> {
        self.reports.get(node_id).map(|(hash, _)| *hash)
    }

    /// Nodes whose reported hash differs from `consensus_hash`, ascending
    pub fn dissenting_nodes(&self, consensus_hash: &StateHash) -> Vec<(NodeId, StateHash)> {
        let mut nodes: Vec<(NodeId, StateHash)> = self
            .reports
            .iter()
            .filter(|(_, (hash, _))| hash != consensus_hash)
            .map(|(node_id, (hash, _))| (*node_id, *hash))
            .collect();
        nodes.sort_by_key(|(node_id, _)| *node_id);
        nodes
    }

    pub fn total_weight(&self) -> Weight {
        self.total_weight
    }

    pub fn reported_weight(&self) -> Weight {
        self.reported_weight
    }

    /// Weight of nodes that have not reported yet
    pub fn unreported_weight(&self) -> Weight {
        self.total_weight.saturating_sub(self.reported_weight)
    }

    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    pub fn reporter_count(&self) -> usize {
        self.reports.len()
    }

    /// Render a stable, multi-line diagnostic of all partitions.
    pub fn write_report<W: Write>(&self, out: &mut W) -> fmt::Result {
        writeln!(
            out,
            "{} partition(s), reported weight {} of {} ({} unreported)",
            self.partitions.len(),
            self.reported_weight,
            self.total_weight,
            self.unreported_weight()
        )?;
        for partition in self.partitions_by_weight_desc() {
            let share = if self.total_weight == 0 {
                0.0
            } else {
                partition.weight as f64 * 100.0 / self.total_weight as f64
            };
            let members: Vec<String> = partition.members.iter().map(|n| n.0.to_string()).collect();
            writeln!(
                out,
                "  {}: weight {} ({:.2}% of total), {} member(s) [{}]",
                partition.hash.short(),
                partition.weight,
                share,
                partition.member_count(),
                members.join(", ")
            )?;
        }
        Ok(())
    }

    /// [`PartitionFinder::write_report`] into a `String`
    pub fn report(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_report(&mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::hash::STATE_HASH_LEN;

    fn test_hash(n: u8) -> StateHash {
        let mut bytes = [0u8; STATE_HASH_LEN];
        bytes[0] = n;
        StateHash(bytes)
    }

    #[test]
    fn test_reports_accumulate_per_hash() {
        let mut finder = PartitionFinder::new(100);
        assert!(finder.add(NodeId(1), 40, test_hash(1)));
        assert!(finder.add(NodeId(2), 30, test_hash(1)));
        assert!(finder.add(NodeId(3), 10, test_hash(2)));

        assert_eq!(finder.partition(&test_hash(1)).unwrap().weight, 70);
        assert_eq!(finder.partition(&test_hash(2)).unwrap().weight, 10);
        assert_eq!(finder.reported_weight(), 80);
        assert_eq!(finder.unreported_weight(), 20);
        assert_eq!(finder.partition_count(), 2);
    }

    #[test]
    fn test_duplicate_report_is_idempotent() {
        let mut finder = PartitionFinder::new(100);
        assert!(finder.add(NodeId(1), 40, test_hash(1)));
        assert!(!finder.add(NodeId(1), 40, test_hash(1)));

        let partition = finder.partition(&test_hash(1)).unwrap();
        assert_eq!(partition.weight, 40);
        assert_eq!(partition.member_count(), 1);
        assert_eq!(finder.reported_weight(), 40);
    }

    #[test]
    fn test_changed_hash_moves_weight() {
        let mut finder = PartitionFinder::new(100);
        finder.add(NodeId(1), 40, test_hash(1));
        finder.add(NodeId(2), 10, test_hash(1));
        assert!(finder.add(NodeId(1), 40, test_hash(2)));

        assert_eq!(finder.partition(&test_hash(1)).unwrap().weight, 10);
        assert_eq!(finder.partition(&test_hash(2)).unwrap().weight, 40);
        assert_eq!(finder.reported_weight(), 50);
        assert_eq!(finder.hash_of(&NodeId(1)), Some(test_hash(2)));
    }

    #[test]
    fn test_empty_partition_is_removed() {
        let mut finder = PartitionFinder::new(100);
        finder.add(NodeId(1), 40, test_hash(1));
        finder.add(NodeId(1), 40, test_hash(2));

        assert!(finder.partition(&test_hash(1)).is_none());
        assert_eq!(finder.partition_count(), 1);
    }

    #[test]
    fn test_ordering_weight_desc_then_hash_asc() {
        let mut finder = PartitionFinder::new(100);
        finder.add(NodeId(1), 10, test_hash(9));
        finder.add(NodeId(2), 30, test_hash(5));
        finder.add(NodeId(3), 30, test_hash(3));
        finder.add(NodeId(4), 20, test_hash(1));

        let order: Vec<StateHash> = finder
            .partitions_by_weight_desc()
            .iter()
            .map(|p| p.hash)
            .collect();
        assert_eq!(
            order,
            vec![test_hash(3), test_hash(5), test_hash(1), test_hash(9)]
        );
        assert_eq!(finder.largest_partition().unwrap().hash, test_hash(3));
    }

    #[test]
    fn test_dissenting_nodes_sorted_by_id() {
        let mut finder = PartitionFinder::new(100);
        finder.add(NodeId(7), 10, test_hash(2));
        finder.add(NodeId(1), 50, test_hash(1));
        finder.add(NodeId(3), 10, test_hash(3));

        let dissent = finder.dissenting_nodes(&test_hash(1));
        assert_eq!(
            dissent,
            vec![(NodeId(3), test_hash(3)), (NodeId(7), test_hash(2))]
        );
    }

    #[test]
    fn test_report_is_stable() {
        let mut a = PartitionFinder::new(100);
        a.add(NodeId(2), 30, test_hash(1));
        a.add(NodeId(1), 40, test_hash(1));
        a.add(NodeId(3), 20, test_hash(2));

        let mut b = PartitionFinder::new(100);
        b.add(NodeId(3), 20, test_hash(2));
        b.add(NodeId(1), 40, test_hash(1));
        b.add(NodeId(2), 30, test_hash(1));

        let report = a.report();
        assert_eq!(report, b.report());

        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "2 partition(s), reported weight 90 of 100 (10 unreported)"
        );
        assert_eq!(
            lines[1],
            "  0100000000000000: weight 70 (70.00% of total), 2 member(s) [1, 2]"
        );
        assert_eq!(
            lines[2],
            "  0200000000000000: weight 20 (20.00% of total), 1 member(s) [3]"
        );
    }
}
