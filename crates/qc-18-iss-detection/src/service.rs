//! Hash agreement manager - the ISS detector
//!
//! Drives the per-round lifecycle:
//!
//! ```text
//! [NEW] ──round_completed──→ [ACCUMULATING] ──quorum / no quorum possible──→ [DECIDED]
//!                                  │                                              │
//!                                  └────────────── eviction (force) ──────────────┴──→ [EVICTED]
//! ```
//!
//! Peer reports may arrive from many threads at once. They take the window
//! read lock; round boundaries take the write lock, so a report for a round
//! being evicted either lands first or is dropped as too old. Classification
//! always runs after the window lock is released.

use crate::config::IssDetectionConfig;
use crate::domain::{
    AddressBook, EpochHash, HashValidityStatus, NodeId, RateLimiter, ReportDisposition, Round,
    RoundHashValidator, RoundWindow, SoftwareVersion, StateHash,
};
use crate::error::{IssError, IssResult};
use crate::events::{IssNotification, IssType, StateSignaturePayload};
use crate::metrics;
use crate::ports::inbound::IssDetectorApi;
use crate::ports::outbound::{IssNotificationSink, IssRecordStore, TimeSource};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Identity this node signs its own state hashes with
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NodeIdentity {
    pub node_id: NodeId,
    pub software_version: SoftwareVersion,
    pub epoch_hash: EpochHash,
}

/// One rate limiter per log severity class
struct IssLogLimiters {
    self_iss: RateLimiter,
    catastrophic: RateLimiter,
    lack_of_data: RateLimiter,
    other_iss: RateLimiter,
}

impl IssLogLimiters {
    fn new(time: Arc<dyn TimeSource>, seconds: u64) -> Self {
        Self {
            self_iss: RateLimiter::from_secs(time.clone(), seconds),
            catastrophic: RateLimiter::from_secs(time.clone(), seconds),
            lack_of_data: RateLimiter::from_secs(time.clone(), seconds),
            other_iss: RateLimiter::from_secs(time, seconds),
        }
    }
}

/// ISS detector
pub struct HashAgreementManager<N, R>
where
    N: IssNotificationSink,
    R: IssRecordStore,
{
    config: IssDetectionConfig,
    identity: NodeIdentity,
    address_book: RwLock<Arc<AddressBook>>,
    window: RwLock<RoundWindow>,
    limiters: IssLogLimiters,
    notifier: Arc<N>,
    record_store: Arc<R>,
    /// Last fatal ISS round persisted by a previous run, already handled
    restored_iss_round: Option<Round>,
    /// Highest round that raised a fatal ISS, persisted across restarts
    last_iss_round: Mutex<Option<Round>>,
}

impl<N, R> HashAgreementManager<N, R>
where
    N: IssNotificationSink,
    R: IssRecordStore,
{
    /// Create a detector.
    ///
    /// # Errors
    ///
    /// Fails if the config is invalid, the address book carries no weight,
    /// or the durable ISS record cannot be read.
    pub fn new(
        config: IssDetectionConfig,
        address_book: AddressBook,
        identity: NodeIdentity,
        time: Arc<dyn TimeSource>,
        notifier: Arc<N>,
        record_store: Arc<R>,
    ) -> IssResult<Self> {
        config.validate()?;
        if address_book.total_weight() == 0 {
            return Err(IssError::EmptyAddressBook);
        }

        let last_iss_round = record_store.load_last_iss_round()?;
        if let Some(round) = last_iss_round {
            info!(round, "[qc-18] Loaded last ISS round");
        }

        Ok(Self {
            window: RwLock::new(RoundWindow::new(config.window_capacity())),
            limiters: IssLogLimiters::new(time, config.seconds_between_iss_logs),
            address_book: RwLock::new(Arc::new(address_book)),
            restored_iss_round: last_iss_round,
            last_iss_round: Mutex::new(last_iss_round),
            config,
            identity,
            notifier,
            record_store,
        })
    }

    /// Replace the address book used for rounds completed from now on.
    ///
    /// Rounds already tracked keep the snapshot they were created with.
    pub fn set_address_book(&self, address_book: AddressBook) -> IssResult<()> {
        if address_book.total_weight() == 0 {
            return Err(IssError::EmptyAddressBook);
        }
        info!(
            nodes = address_book.len(),
            total_weight = address_book.total_weight(),
            "[qc-18] Address book updated"
        );
        *self.address_book.write() = Arc::new(address_book);
        Ok(())
    }

    pub fn config(&self) -> &IssDetectionConfig {
        &self.config
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    /// Rounds currently held in the window, ascending
    pub fn tracked_rounds(&self) -> Vec<Round> {
        self.window.read().rounds().collect()
    }

    /// Most recent round passed to `round_completed`
    pub fn latest_round(&self) -> Option<Round> {
        self.window.read().highest_round()
    }

    pub fn last_iss_round(&self) -> Option<Round> {
        *self.last_iss_round.lock()
    }

    /// Partition diagnostic of a tracked round
    pub fn partition_report(&self, round: Round) -> Option<String> {
        self.window
            .read()
            .get(round)
            .map(|validator| validator.partition_report())
    }

    /// Convenience entry point for gossip payloads.
    pub fn handle_state_signature(
        &self,
        payload: &StateSignaturePayload,
    ) -> IssResult<(ReportDisposition, Vec<IssNotification>)> {
        self.handle_peer_signature(
            payload.sender,
            payload.round,
            payload.state_hash,
            payload.software_version,
            payload.epoch_hash,
        )
    }

    fn is_ignored(&self, round: Round) -> bool {
        self.config.ignored_round == Some(round)
    }

    fn drop_report(
        &self,
        node_id: NodeId,
        round: Round,
        disposition: ReportDisposition,
    ) -> IssResult<(ReportDisposition, Vec<IssNotification>)> {
        debug!(
            node = %node_id,
            round,
            reason = disposition.as_str(),
            "[qc-18] Dropped state hash report"
        );
        metrics::record_report_dropped(disposition.as_str());
        Ok((disposition, Vec::new()))
    }

    /// Classify a validator that just decided.
    fn classify(&self, validator: &RoundHashValidator) -> IssResult<Vec<IssNotification>> {
        let round = validator.round();
        let status = validator.status();
        let mut emitted = Vec::new();

        match status {
            HashValidityStatus::Undecided => {
                return Err(IssError::UndecidedClassification { round });
            }
            HashValidityStatus::Valid => {
                debug!(round, "[qc-18] Round state hash agreed");
                self.report_dissenters(validator, &mut emitted);
            }
            HashValidityStatus::SelfIss => {
                if let Some(skipped) = self.limiters.self_iss.request_and_trigger() {
                    error!(
                        round,
                        node = %self.identity.node_id,
                        self_hash = ?validator.self_hash(),
                        consensus_hash = ?validator.consensus_hash(),
                        skipped,
                        "[qc-18] SELF ISS: this node disagrees with the network\n{}",
                        validator.partition_report()
                    );
                } else {
                    metrics::record_log_suppressed(IssType::SelfIss.as_str());
                }
                let notification = IssNotification::new(round, IssType::SelfIss)
                    .with_self_hash(validator.self_hash())
                    .with_consensus_hash(validator.consensus_hash());
                self.dispatch_fatal(notification, &mut emitted);
                self.report_dissenters(validator, &mut emitted);
            }
            HashValidityStatus::CatastrophicIss | HashValidityStatus::CatastrophicLackOfData => {
                if let Some(skipped) = self.limiters.catastrophic.request_and_trigger() {
                    error!(
                        round,
                        status = %status,
                        self_hash = ?validator.self_hash(),
                        reported_weight = validator.reported_weight(),
                        total_weight = validator.total_weight(),
                        skipped,
                        "[qc-18] CATASTROPHIC ISS: no state hash can reach quorum\n{}",
                        validator.partition_report()
                    );
                } else {
                    metrics::record_log_suppressed(IssType::CatastrophicIss.as_str());
                }
                let notification = IssNotification::new(round, IssType::CatastrophicIss)
                    .with_self_hash(validator.self_hash());
                self.dispatch_fatal(notification, &mut emitted);
            }
            HashValidityStatus::LackOfData => {
                if let Some(skipped) = self.limiters.lack_of_data.request_and_trigger() {
                    info!(
                        round,
                        reported_weight = validator.reported_weight(),
                        total_weight = validator.total_weight(),
                        self_hash_known = validator.self_hash().is_some(),
                        skipped,
                        "[qc-18] Lack of data: round left the window undecided\n{}",
                        validator.partition_report()
                    );
                } else {
                    metrics::record_log_suppressed(IssType::LackOfData.as_str());
                }
                let notification = IssNotification::new(round, IssType::LackOfData)
                    .with_self_hash(validator.self_hash())
                    .with_consensus_hash(validator.consensus_hash());
                self.notifier.notify(notification.clone());
                emitted.push(notification);
            }
        }

        metrics::record_round_decided(status.as_str());
        Ok(emitted)
    }

    /// Emit an `OtherIss` for every peer disagreeing with consensus.
    fn report_dissenters(&self, validator: &RoundHashValidator, emitted: &mut Vec<IssNotification>) {
        for (node_id, hash) in validator.decision_dissenters() {
            if node_id == self.identity.node_id {
                continue;
            }
            self.emit_other_iss(validator, node_id, hash, emitted);
        }
    }

    fn emit_other_iss(
        &self,
        validator: &RoundHashValidator,
        node_id: NodeId,
        hash: StateHash,
        emitted: &mut Vec<IssNotification>,
    ) {
        let round = validator.round();
        if let Some(skipped) = self.limiters.other_iss.request_and_trigger() {
            warn!(
                round,
                node = %node_id,
                node_hash = %hash.short(),
                consensus_hash = ?validator.consensus_hash(),
                skipped,
                "[qc-18] Node disagrees with consensus state hash"
            );
        } else {
            metrics::record_log_suppressed(IssType::OtherIss.as_str());
        }
        metrics::record_other_node_iss();

        let notification = IssNotification::new(round, IssType::OtherIss)
            .with_self_hash(validator.self_hash())
            .with_consensus_hash(validator.consensus_hash())
            .with_proof(node_id, hash);
        self.notifier.notify(notification.clone());
        emitted.push(notification);
    }

    /// Notify and persist a fatal ISS unless a previous run already handled it.
    fn dispatch_fatal(&self, notification: IssNotification, emitted: &mut Vec<IssNotification>) {
        let round = notification.round;

        if let Some(restored) = self.restored_iss_round {
            if round <= restored {
                info!(
                    round,
                    last_iss_round = restored,
                    iss_type = %notification.iss_type,
                    "[qc-18] ISS already handled before restart, not dispatching again"
                );
                return;
            }
        }

        {
            let mut last = self.last_iss_round.lock();
            if last.map_or(true, |highest| round > highest) {
                *last = Some(round);
                if let Err(e) = self.record_store.save_last_iss_round(round) {
                    error!(round, error = %e, "[qc-18] Failed to persist last ISS round");
                }
            }
        }

        self.notifier.notify(notification.clone());
        emitted.push(notification);
    }
}

impl<N, R> IssDetectorApi for HashAgreementManager<N, R>
where
    N: IssNotificationSink,
    R: IssRecordStore,
{
    fn round_completed(&self, round: Round) -> IssResult<Vec<IssNotification>> {
        let evicted = {
            let mut window = self.window.write();

            if let Some(previous) = window.highest_round() {
                let expected = previous.saturating_add(1);
                if round != expected {
                    return Err(IssError::RoundOutOfOrder {
                        expected,
                        actual: round,
                    });
                }
            }

            let slot = if self.is_ignored(round) {
                info!(round, "[qc-18] Ignoring round, no state hash validation");
                None
            } else {
                let book = self.address_book.read().clone();
                Some(RoundHashValidator::new(
                    round,
                    book,
                    self.config.quorum_threshold,
                ))
            };

            let evict_below = round
                .saturating_add(1)
                .saturating_sub(window.capacity() as Round);
            let evicted = window.advance(round, slot, evict_below)?;
            metrics::set_tracked_rounds(window.len());
            evicted
        };

        let mut emitted = Vec::new();
        for (evicted_round, validator) in evicted {
            if validator.force_decide() {
                debug!(round = evicted_round, "[qc-18] Evicted undecided round");
                emitted.extend(self.classify(&validator)?);
            }
        }
        Ok(emitted)
    }

    fn handle_peer_signature(
        &self,
        node_id: NodeId,
        round: Round,
        hash: StateHash,
        software_version: SoftwareVersion,
        epoch_hash: EpochHash,
    ) -> IssResult<(ReportDisposition, Vec<IssNotification>)> {
        if software_version != self.identity.software_version {
            return self.drop_report(node_id, round, ReportDisposition::ForeignSoftwareVersion);
        }
        if epoch_hash != self.identity.epoch_hash {
            return self.drop_report(node_id, round, ReportDisposition::ForeignEpoch);
        }
        if !self.address_book.read().contains(&node_id) {
            return self.drop_report(node_id, round, ReportDisposition::UnknownNode);
        }
        if self.is_ignored(round) {
            return self.drop_report(node_id, round, ReportDisposition::IgnoredRound);
        }

        let routed = match self.window.read().insert_report(round, node_id, hash) {
            Ok(routed) => routed,
            Err(disposition) => return self.drop_report(node_id, round, disposition),
        };

        let outcome = routed.outcome;
        if !outcome.applied {
            return self.drop_report(node_id, round, ReportDisposition::Duplicate);
        }

        if outcome.decided {
            let emitted = self.classify(&routed.validator)?;
            return Ok((ReportDisposition::Decided, emitted));
        }

        let mut emitted = Vec::new();
        let report = routed.report;
        if outcome.late_dissent && report.node_id != self.identity.node_id {
            self.emit_other_iss(&routed.validator, report.node_id, report.hash, &mut emitted);
        }
        Ok((ReportDisposition::Accepted, emitted))
    }

    fn self_hash_computed(&self, round: Round, hash: StateHash) -> IssResult<Vec<IssNotification>> {
        if self.is_ignored(round) {
            debug!(round, "[qc-18] Self hash for ignored round");
            return Ok(Vec::new());
        }

        let validator = self
            .window
            .read()
            .get(round)
            .ok_or(IssError::RoundNotTracked { round })?;

        if validator.report_self_hash(hash) {
            self.classify(&validator)
        } else {
            Ok(Vec::new())
        }
    }

    fn overriding_state_loaded(
        &self,
        round: Round,
        hash: StateHash,
    ) -> IssResult<Vec<IssNotification>> {
        let dropped = self.window.write().reset();
        info!(
            round,
            dropped_rounds = dropped,
            "[qc-18] Overriding state loaded, round window reset"
        );

        let mut emitted = self.round_completed(round)?;
        emitted.extend(self.self_hash_computed(round, hash)?);
        Ok(emitted)
    }

    fn round_status(&self, round: Round) -> Option<HashValidityStatus> {
        self.window.read().get(round).map(|validator| validator.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{CollectingNotificationSink, InMemoryIssRecordStore, ManualTimeSource};
    use crate::domain::STATE_HASH_LEN;
    use std::time::Duration;

    const VERSION: SoftwareVersion = SoftwareVersion::new(0, 42, 0);

    type TestManager = HashAgreementManager<CollectingNotificationSink, InMemoryIssRecordStore>;

    fn test_hash(n: u8) -> StateHash {
        let mut bytes = [0u8; STATE_HASH_LEN];
        bytes[0] = n;
        StateHash(bytes)
    }

    /// Node 0 is this node (weight 10); nodes 1..=3 carry 40/30/20.
    fn book() -> AddressBook {
        AddressBook::new()
            .with_node(NodeId(0), 10)
            .with_node(NodeId(1), 40)
            .with_node(NodeId(2), 30)
            .with_node(NodeId(3), 20)
    }

    struct Harness {
        manager: TestManager,
        sink: Arc<CollectingNotificationSink>,
        store: Arc<InMemoryIssRecordStore>,
        time: Arc<ManualTimeSource>,
    }

    fn harness_with(config: IssDetectionConfig, store: InMemoryIssRecordStore) -> Harness {
        let sink = Arc::new(CollectingNotificationSink::new());
        let store = Arc::new(store);
        let time = Arc::new(ManualTimeSource::new(0));
        let manager = HashAgreementManager::new(
            config,
            book(),
            NodeIdentity {
                node_id: NodeId(0),
                software_version: VERSION,
                epoch_hash: None,
            },
            time.clone(),
            sink.clone(),
            store.clone(),
        )
        .unwrap();
        Harness {
            manager,
            sink,
            store,
            time,
        }
    }

    fn harness() -> Harness {
        harness_with(
            IssDetectionConfig {
                round_window_capacity: Some(3),
                ..Default::default()
            },
            InMemoryIssRecordStore::new(),
        )
    }

    fn peer(h: &Harness, node: u64, round: Round, hash: StateHash) -> ReportDisposition {
        h.manager
            .handle_peer_signature(NodeId(node), round, hash, VERSION, None)
            .unwrap()
            .0
    }

    #[test]
    fn test_valid_round_emits_nothing() {
        let h = harness();
        h.manager.round_completed(1).unwrap();
        h.manager.self_hash_computed(1, test_hash(1)).unwrap();

        assert_eq!(peer(&h, 1, 1, test_hash(1)), ReportDisposition::Accepted);
        assert_eq!(peer(&h, 2, 1, test_hash(1)), ReportDisposition::Decided);

        assert_eq!(h.manager.round_status(1), Some(HashValidityStatus::Valid));
        assert!(h.sink.is_empty());
    }

    #[test]
    fn test_self_iss_is_dispatched_and_persisted() {
        let h = harness();
        h.manager.round_completed(1).unwrap();
        h.manager.self_hash_computed(1, test_hash(9)).unwrap();
        peer(&h, 1, 1, test_hash(1));
        peer(&h, 2, 1, test_hash(1));

        let notifications = h.sink.take();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].iss_type, IssType::SelfIss);
        assert_eq!(notifications[0].self_hash, Some(test_hash(9)));
        assert_eq!(notifications[0].consensus_hash, Some(test_hash(1)));
        assert_eq!(h.store.load_last_iss_round().unwrap(), Some(1));
        assert_eq!(h.manager.last_iss_round(), Some(1));
    }

    #[test]
    fn test_previously_handled_iss_not_dispatched_again() {
        let h = harness_with(
            IssDetectionConfig {
                round_window_capacity: Some(3),
                ..Default::default()
            },
            InMemoryIssRecordStore::with_round(5),
        );
        h.manager.round_completed(5).unwrap();
        h.manager.self_hash_computed(5, test_hash(9)).unwrap();
        peer(&h, 1, 5, test_hash(1));
        peer(&h, 2, 5, test_hash(1));

        assert_eq!(h.manager.round_status(5), Some(HashValidityStatus::SelfIss));
        assert!(h.sink.is_empty());

        // Rounds past the restored one are new
        h.manager.round_completed(6).unwrap();
        h.manager.self_hash_computed(6, test_hash(9)).unwrap();
        peer(&h, 1, 6, test_hash(1));
        peer(&h, 2, 6, test_hash(1));
        assert_eq!(h.sink.take().len(), 1);
        assert_eq!(h.manager.last_iss_round(), Some(6));
    }

    #[test]
    fn test_lower_round_catastrophic_after_higher_self_iss() {
        let h = harness();
        h.manager.round_completed(1).unwrap();
        h.manager.round_completed(2).unwrap();

        h.manager.self_hash_computed(2, test_hash(9)).unwrap();
        peer(&h, 1, 2, test_hash(1));
        peer(&h, 2, 2, test_hash(1));
        assert_eq!(h.manager.round_status(2), Some(HashValidityStatus::SelfIss));

        h.manager.self_hash_computed(1, test_hash(1)).unwrap();
        peer(&h, 1, 1, test_hash(1));
        peer(&h, 2, 1, test_hash(2));
        let (disposition, emitted) = h
            .manager
            .handle_peer_signature(NodeId(3), 1, test_hash(3), VERSION, None)
            .unwrap();

        assert_eq!(disposition, ReportDisposition::Decided);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].iss_type, IssType::CatastrophicIss);
        let dispatched: Vec<(Round, IssType)> = h
            .sink
            .take()
            .into_iter()
            .map(|n| (n.round, n.iss_type))
            .collect();
        assert_eq!(
            dispatched,
            vec![(2, IssType::SelfIss), (1, IssType::CatastrophicIss)]
        );

        // The persisted round never moves backwards
        assert_eq!(h.manager.last_iss_round(), Some(2));
        assert_eq!(h.store.load_last_iss_round().unwrap(), Some(2));
    }

    #[test]
    fn test_catastrophic_iss() {
        let h = harness();
        h.manager.round_completed(1).unwrap();
        h.manager.self_hash_computed(1, test_hash(1)).unwrap();
        peer(&h, 1, 1, test_hash(1));
        peer(&h, 2, 1, test_hash(2));
        let (disposition, emitted) = h
            .manager
            .handle_peer_signature(NodeId(3), 1, test_hash(3), VERSION, None)
            .unwrap();

        assert_eq!(disposition, ReportDisposition::Decided);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].iss_type, IssType::CatastrophicIss);
        assert_eq!(
            h.manager.round_status(1),
            Some(HashValidityStatus::CatastrophicIss)
        );
    }

    #[test]
    fn test_eviction_yields_lack_of_data_once() {
        let h = harness();
        h.manager.round_completed(1).unwrap();
        h.manager.self_hash_computed(1, test_hash(1)).unwrap();
        peer(&h, 3, 1, test_hash(1));

        assert!(h.manager.round_completed(2).unwrap().is_empty());
        assert!(h.manager.round_completed(3).unwrap().is_empty());
        let emitted = h.manager.round_completed(4).unwrap();

        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].iss_type, IssType::LackOfData);
        assert_eq!(emitted[0].round, 1);
        assert_eq!(h.manager.tracked_rounds(), vec![2, 3, 4]);
        assert_eq!(h.manager.round_completed(5).unwrap().len(), 1);
    }

    #[test]
    fn test_decided_round_evicts_silently() {
        let h = harness();
        h.manager.round_completed(1).unwrap();
        h.manager.self_hash_computed(1, test_hash(1)).unwrap();
        peer(&h, 1, 1, test_hash(1));
        peer(&h, 2, 1, test_hash(1));

        for round in 2..=4 {
            assert!(h.manager.round_completed(round).unwrap().is_empty());
        }
        assert!(h.sink.is_empty());
    }

    #[test]
    fn test_out_of_order_round_is_error() {
        let h = harness();
        h.manager.round_completed(1).unwrap();
        assert!(matches!(
            h.manager.round_completed(3),
            Err(IssError::RoundOutOfOrder {
                expected: 2,
                actual: 3
            })
        ));
        assert!(h.manager.round_completed(1).is_err());
    }

    #[test]
    fn test_self_hash_for_untracked_round_is_error() {
        let h = harness();
        assert!(matches!(
            h.manager.self_hash_computed(7, test_hash(1)),
            Err(IssError::RoundNotTracked { round: 7 })
        ));
    }

    #[test]
    fn test_foreign_reports_are_dropped() {
        let h = harness();
        h.manager.round_completed(1).unwrap();

        let (d, _) = h
            .manager
            .handle_peer_signature(
                NodeId(1),
                1,
                test_hash(1),
                SoftwareVersion::new(0, 41, 0),
                None,
            )
            .unwrap();
        assert_eq!(d, ReportDisposition::ForeignSoftwareVersion);

        let (d, _) = h
            .manager
            .handle_peer_signature(NodeId(1), 1, test_hash(1), VERSION, Some(test_hash(5)))
            .unwrap();
        assert_eq!(d, ReportDisposition::ForeignEpoch);

        assert_eq!(peer(&h, 99, 1, test_hash(1)), ReportDisposition::UnknownNode);
        assert_eq!(peer(&h, 1, 2, test_hash(1)), ReportDisposition::RoundTooNew);
    }

    #[test]
    fn test_duplicate_report_dropped() {
        let h = harness();
        h.manager.round_completed(1).unwrap();
        assert_eq!(peer(&h, 1, 1, test_hash(1)), ReportDisposition::Accepted);
        assert_eq!(peer(&h, 1, 1, test_hash(1)), ReportDisposition::Duplicate);
    }

    #[test]
    fn test_other_iss_for_dissenters() {
        let h = harness();
        h.manager.round_completed(1).unwrap();
        h.manager.self_hash_computed(1, test_hash(1)).unwrap();
        peer(&h, 3, 1, test_hash(7));
        peer(&h, 1, 1, test_hash(1));
        peer(&h, 2, 1, test_hash(1));

        let notifications = h.sink.take();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].iss_type, IssType::OtherIss);
        assert_eq!(notifications[0].proof_node_id, Some(NodeId(3)));
        assert_eq!(notifications[0].node_hash, Some(test_hash(7)));

        // Late dissent after the decision
        h.manager.round_completed(2).unwrap();
        h.manager.self_hash_computed(2, test_hash(1)).unwrap();
        peer(&h, 1, 2, test_hash(1));
        peer(&h, 2, 2, test_hash(1));
        let (disposition, emitted) = h
            .manager
            .handle_peer_signature(NodeId(3), 2, test_hash(8), VERSION, None)
            .unwrap();
        assert_eq!(disposition, ReportDisposition::Accepted);
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].proof_node_id, Some(NodeId(3)));
    }

    #[test]
    fn test_dissent_landing_before_classification_reported_once() {
        let h = harness();
        h.manager.round_completed(1).unwrap();
        h.manager.self_hash_computed(1, test_hash(1)).unwrap();
        let validator = h.manager.window.read().get(1).unwrap();

        // Decided by another thread that has not classified yet
        validator.record_network_hash(NodeId(1), 40, test_hash(1));
        assert!(validator.record_network_hash(NodeId(2), 30, test_hash(1)).decided);

        let (disposition, emitted) = h
            .manager
            .handle_peer_signature(NodeId(3), 1, test_hash(7), VERSION, None)
            .unwrap();
        assert_eq!(disposition, ReportDisposition::Accepted);
        assert_eq!(emitted.len(), 1);

        assert!(h.manager.classify(&validator).unwrap().is_empty());
        let other_iss: Vec<_> = h
            .sink
            .take()
            .into_iter()
            .filter(|n| n.proof_node_id == Some(NodeId(3)))
            .collect();
        assert_eq!(other_iss.len(), 1);
    }

    #[test]
    fn test_ignored_round_never_validated() {
        let h = harness_with(
            IssDetectionConfig {
                round_window_capacity: Some(3),
                ignored_round: Some(2),
                ..Default::default()
            },
            InMemoryIssRecordStore::new(),
        );
        h.manager.round_completed(1).unwrap();
        h.manager.round_completed(2).unwrap();
        h.manager.round_completed(3).unwrap();

        assert_eq!(h.manager.tracked_rounds(), vec![1, 3]);
        assert!(h.manager.self_hash_computed(2, test_hash(1)).unwrap().is_empty());
        assert_eq!(peer(&h, 1, 2, test_hash(1)), ReportDisposition::IgnoredRound);
        assert_eq!(h.manager.round_status(2), None);
    }

    #[test]
    fn test_override_resets_without_lack_of_data() {
        let h = harness();
        h.manager.round_completed(1).unwrap();
        h.manager.round_completed(2).unwrap();

        let emitted = h.manager.overriding_state_loaded(1_000, test_hash(4)).unwrap();
        assert!(emitted.is_empty());
        assert_eq!(h.manager.tracked_rounds(), vec![1_000]);
        assert_eq!(h.manager.latest_round(), Some(1_000));
        assert!(h.sink.is_empty());

        h.manager.round_completed(1_001).unwrap();
    }

    #[test]
    fn test_lack_of_data_logs_are_rate_limited_but_all_notified() {
        let h = harness();
        for round in 1..=10 {
            h.manager.round_completed(round).unwrap();
        }
        // Rounds 1..=7 evicted undecided
        assert_eq!(h.sink.len(), 7);
        assert_eq!(h.manager.limiters.lack_of_data.denied_requests(), 6);

        h.time.advance(Duration::from_secs(300));
        h.manager.round_completed(11).unwrap();
        assert_eq!(h.manager.limiters.lack_of_data.denied_requests(), 0);
    }

    #[test]
    fn test_empty_address_book_rejected() {
        let result = HashAgreementManager::new(
            IssDetectionConfig::default(),
            AddressBook::new(),
            NodeIdentity {
                node_id: NodeId(0),
                software_version: VERSION,
                epoch_hash: None,
            },
            Arc::new(ManualTimeSource::new(0)),
            Arc::new(CollectingNotificationSink::new()),
            Arc::new(InMemoryIssRecordStore::new()),
        );
        assert!(matches!(result, Err(IssError::EmptyAddressBook)));
    }

    #[test]
    fn test_address_book_change_applies_to_new_rounds() {
        let h = harness();
        h.manager.round_completed(1).unwrap();
        h.manager
            .set_address_book(book().with_node(NodeId(4), 50))
            .unwrap();
        h.manager.round_completed(2).unwrap();

        // Node 4 passes the current-book check but round 1 predates it
        assert_eq!(peer(&h, 4, 1, test_hash(1)), ReportDisposition::UnknownNode);
        assert_eq!(peer(&h, 4, 2, test_hash(1)), ReportDisposition::Accepted);
    }
}
