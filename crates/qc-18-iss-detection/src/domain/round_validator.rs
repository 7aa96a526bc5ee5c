//! Round hash validator
//!
//! Owns the accumulation state of a single round and decides its
//! [`HashValidityStatus`].
//!
//! ## Decision rule
//!
//! Evaluated after every mutating call while the round is undecided:
//!
//! 1. A partition whose weight satisfies the quorum threshold becomes the
//!    consensus hash. With the self hash known the round is `Valid` (equal)
//!    or `SelfIss` (different). Without it the round waits, remembering the
//!    consensus hash.
//! 2. If the largest partition could not reach quorum even if every
//!    unreported node joined it, the round is `CatastrophicIss` (self hash
//!    known) or `CatastrophicLackOfData` (unknown).
//! 3. Otherwise the round stays `Undecided`.
//!
//! Eviction from the window resolves a still undecided round to
//! `LackOfData`.
//!
//! ## Concurrency
//!
//! All state sits behind one mutex. The transition out of `Undecided`
//! happens under that lock, so exactly one caller observes `decided == true`.
//! The nodes dissenting at that moment are captured under the same lock;
//! anything reported afterwards is flagged as late dissent instead.

use super::{
    AddressBook, HashReport, HashValidityStatus, NodeId, PartitionFinder, QuorumThreshold,
    ReportOutcome, Round, StateHash, Weight,
};
use parking_lot::Mutex;
use std::sync::Arc;

struct ValidatorState {
    finder: PartitionFinder,
    self_hash: Option<StateHash>,
    consensus_hash: Option<StateHash>,
    status: HashValidityStatus,
    /// Dissenters as of the decision, empty until then
    decision_dissenters: Vec<(NodeId, StateHash)>,
}

/// Accumulates hash reports for one round and classifies it.
pub struct RoundHashValidator {
    round: Round,
    address_book: Arc<AddressBook>,
    threshold: QuorumThreshold,
    state: Mutex<ValidatorState>,
}

impl RoundHashValidator {
    /// Create a validator weighting reports with `address_book`.
    pub fn new(round: Round, address_book: Arc<AddressBook>, threshold: QuorumThreshold) -> Self {
        let total_weight = address_book.total_weight();
        Self {
            round,
            address_book,
            threshold,
            state: Mutex::new(ValidatorState {
                finder: PartitionFinder::new(total_weight),
                self_hash: None,
                consensus_hash: None,
                status: HashValidityStatus::Undecided,
                decision_dissenters: Vec::new(),
            }),
        }
    }

    pub fn round(&self) -> Round {
        self.round
    }

    /// Address book snapshot this round is weighted with
    pub fn address_book(&self) -> &Arc<AddressBook> {
        &self.address_book
    }

    pub fn total_weight(&self) -> Weight {
        self.address_book.total_weight()
    }

    pub fn threshold(&self) -> QuorumThreshold {
        self.threshold
    }

    /// Report a peer's hash. Returns `true` if this call decided the round.
    pub fn report_network_hash(&self, node_id: NodeId, weight: Weight, hash: StateHash) -> bool {
        self.record_network_hash(node_id, weight, hash).decided
    }

    /// Report a peer's hash and describe the effect in detail.
    pub fn record_network_hash(
        &self,
        node_id: NodeId,
        weight: Weight,
        hash: StateHash,
    ) -> ReportOutcome {
        let mut state = self.state.lock();

        if !state.finder.add(node_id, weight, hash) {
            return ReportOutcome::default();
        }

        if state.status.is_decided() {
            let late_dissent = state
                .consensus_hash
                .map(|consensus| consensus != hash)
                .unwrap_or(false);
            return ReportOutcome {
                applied: true,
                decided: false,
                late_dissent,
            };
        }

        ReportOutcome {
            applied: true,
            decided: Self::evaluate(&mut state, self.threshold),
            late_dissent: false,
        }
    }

    /// Apply a weighted report addressed to this round.
    pub fn record_report(&self, report: &HashReport) -> ReportOutcome {
        debug_assert_eq!(report.round, self.round);
        self.record_network_hash(report.node_id, report.weight, report.hash)
    }

    /// Report this node's own hash. Returns `true` if this call decided the round.
    ///
    /// Only the first self hash counts.
    pub fn report_self_hash(&self, hash: StateHash) -> bool {
        let mut state = self.state.lock();

        if let Some(existing) = state.self_hash {
            if existing != hash {
                tracing::warn!(
                    round = self.round,
                    existing = %existing.short(),
                    ignored = %hash.short(),
                    "[qc-18] Conflicting self hash ignored"
                );
            }
            return false;
        }

        state.self_hash = Some(hash);
        Self::evaluate(&mut state, self.threshold)
    }

    /// Resolve an undecided round to `LackOfData`.
    ///
    /// Returns `true` if this call decided the round.
    pub fn force_decide(&self) -> bool {
        let mut state = self.state.lock();
        if state.status.is_decided() {
            return false;
        }
        state.status = HashValidityStatus::LackOfData;
        true
    }

    fn evaluate(state: &mut ValidatorState, threshold: QuorumThreshold) -> bool {
        if state.status.is_decided() {
            return false;
        }

        let total = state.finder.total_weight();

        if state.consensus_hash.is_none() {
            if let Some(largest) = state.finder.largest_partition() {
                if threshold.is_satisfied_by(largest.weight, total) {
                    state.consensus_hash = Some(largest.hash);
                }
            }
        }

        if let Some(consensus) = state.consensus_hash {
            return match state.self_hash {
                Some(self_hash) => {
                    state.status = if self_hash == consensus {
                        HashValidityStatus::Valid
                    } else {
                        HashValidityStatus::SelfIss
                    };
                    state.decision_dissenters = state.finder.dissenting_nodes(&consensus);
                    true
                }
                None => false,
            };
        }

        let largest = state
            .finder
            .largest_partition()
            .map(|p| p.weight)
            .unwrap_or(0);
        let best_case = largest.saturating_add(state.finder.unreported_weight());
        if !threshold.is_satisfied_by(best_case, total) {
            state.status = if state.self_hash.is_some() {
                HashValidityStatus::CatastrophicIss
            } else {
                HashValidityStatus::CatastrophicLackOfData
            };
            return true;
        }

        false
    }

    pub fn status(&self) -> HashValidityStatus {
        self.state.lock().status
    }

    pub fn consensus_hash(&self) -> Option<StateHash> {
        self.state.lock().consensus_hash
    }

    pub fn self_hash(&self) -> Option<StateHash> {
        self.state.lock().self_hash
    }

    pub fn reported_weight(&self) -> Weight {
        self.state.lock().finder.reported_weight()
    }

    /// Nodes that disagree with the consensus hash (empty without one)
    pub fn dissenting_nodes(&self) -> Vec<(NodeId, StateHash)> {
        let state = self.state.lock();
        match state.consensus_hash {
            Some(consensus) => state.finder.dissenting_nodes(&consensus),
            None => Vec::new(),
        }
    }

    /// Nodes that disagreed with the consensus hash when the round decided.
    ///
    /// Reports applied after the decision are not included.
    pub fn decision_dissenters(&self) -> Vec<(NodeId, StateHash)> {
        self.state.lock().decision_dissenters.clone()
    }

    /// Deterministic partition diagnostic for logs
    pub fn partition_report(&self) -> String {
        self.state.lock().finder.report()
    }
}

impl std::fmt::Debug for RoundHashValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RoundHashValidator")
            .field("round", &self.round)
            .field("status", &state.status)
            .field("self_hash", &state.self_hash)
            .field("consensus_hash", &state.consensus_hash)
            .field("reported_weight", &state.finder.reported_weight())
            .finish()
    }
}
