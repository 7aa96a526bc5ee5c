//! Sliding window of round validators
//!
//! Rounds enter in strictly increasing order and leave from the bottom.
//! Evicted validators are handed back to the caller exactly once so it can
//! force a decision and classify them.

use super::{
    HashReport, NodeId, ReportDisposition, ReportOutcome, Round, RoundHashValidator, StateHash,
};
use crate::error::{IssError, IssResult};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Validator handed back by [`RoundWindow::advance`]
pub type EvictedRound = (Round, Arc<RoundHashValidator>);

/// A report that reached a validator
#[derive(Debug)]
pub struct RoutedReport {
    pub validator: Arc<RoundHashValidator>,
    /// The report as weighted by the round's address book
    pub report: HashReport,
    pub outcome: ReportOutcome,
}

/// Bounded map from round to validator.
#[derive(Debug)]
pub struct RoundWindow {
    capacity: usize,
    rounds: BTreeMap<Round, Arc<RoundHashValidator>>,
    /// Highest round passed to `advance`, including rounds without a slot
    highest_round: Option<Round>,
}

impl RoundWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            rounds: BTreeMap::new(),
            highest_round: None,
        }
    }

    /// Move the window forward to `new_round`.
    ///
    /// Rounds below `evict_below` are removed and returned in ascending
    /// order. `slot` is `None` for rounds that are not tracked (the ignored
    /// round). Nothing is modified when an error is returned.
    pub fn advance(
        &mut self,
        new_round: Round,
        slot: Option<RoundHashValidator>,
        evict_below: Round,
    ) -> IssResult<Vec<EvictedRound>> {
        if let Some(highest) = self.highest_round {
            if new_round <= highest {
                return Err(IssError::RoundWindow {
                    reason: format!("round {new_round} is not above highest round {highest}"),
                });
            }
        }
        if new_round < evict_below {
            return Err(IssError::RoundWindow {
                reason: format!("round {new_round} is below eviction bound {evict_below}"),
            });
        }
        if let Some(validator) = &slot {
            if validator.round() != new_round {
                return Err(IssError::RoundWindow {
                    reason: format!(
                        "validator for round {} offered as slot for round {new_round}",
                        validator.round()
                    ),
                });
            }
        }

        let retained = self.rounds.range(evict_below..).count();
        let incoming = usize::from(slot.is_some());
        if retained + incoming > self.capacity {
            return Err(IssError::RoundWindow {
                reason: format!(
                    "{} rounds exceed capacity {}",
                    retained + incoming,
                    self.capacity
                ),
            });
        }

        let kept = self.rounds.split_off(&evict_below);
        let evicted = std::mem::replace(&mut self.rounds, kept);

        if let Some(validator) = slot {
            self.rounds.insert(new_round, Arc::new(validator));
        }
        self.highest_round = Some(new_round);

        Ok(evicted.into_iter().collect())
    }

    /// Drop every tracked round without handing any back.
    ///
    /// Returns how many validators were discarded.
    pub fn reset(&mut self) -> usize {
        let dropped = self.rounds.len();
        self.rounds.clear();
        self.highest_round = None;
        dropped
    }

    /// Route a peer report to the validator of `round`.
    pub fn insert_report(
        &self,
        round: Round,
        node_id: NodeId,
        hash: StateHash,
    ) -> Result<RoutedReport, ReportDisposition> {
        let validator = match self.rounds.get(&round) {
            Some(validator) => validator,
            None => return Err(self.classify_missing(round)),
        };

        let weight = validator
            .address_book()
            .weight(&node_id)
            .ok_or(ReportDisposition::UnknownNode)?;
        let report = HashReport {
            node_id,
            weight,
            hash,
            round,
        };

        let outcome = validator.record_report(&report);
        Ok(RoutedReport {
            validator: validator.clone(),
            report,
            outcome,
        })
    }

    fn classify_missing(&self, round: Round) -> ReportDisposition {
        match (self.lowest_round(), self.highest_round) {
            (_, None) => ReportDisposition::RoundTooNew,
            (_, Some(highest)) if round > highest => ReportDisposition::RoundTooNew,
            (Some(lowest), _) if round < lowest => ReportDisposition::RoundTooOld,
            (None, Some(highest)) if round < highest => ReportDisposition::RoundTooOld,
            _ => ReportDisposition::RoundNotTracked,
        }
    }

    pub fn get(&self, round: Round) -> Option<Arc<RoundHashValidator>> {
        self.rounds.get(&round).cloned()
    }

    /// Tracked rounds in ascending order
    pub fn rounds(&self) -> impl Iterator<Item = Round> + '_ {
        self.rounds.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn lowest_round(&self) -> Option<Round> {
        self.rounds.keys().next().copied()
    }

    pub fn highest_round(&self) -> Option<Round> {
        self.highest_round
    }
}
